//! Remaining-term inference per portfolio row.
//!
//! Resolution order, first match wins:
//!
//! 1. Fund-of-funds units in Multimercado / Renda Fixa / FIDC: 366 days
//! 2. Cash (`Caixa`) other than checking accounts: 1 day
//! 3. Checking account `C/C`: 1 day
//! 4. Floating-rate government bonds (`LFT`): maturity minus as-of date
//! 5. Inflation-indexed semiannual bonds (`NTN-B` / `NTNB`): coupon-weighted term
//! 6. The row's stored term, when positive
//!
//! Zero means "not applicable"; such rows are left out of the average term.

use crate::domain::portfolio::PortfolioRow;
use chrono::{Months, NaiveDate};
use std::iter::successors;

pub const FUND_OF_FUNDS_TERM_DAYS: f64 = 366.0;
pub const CASH_TERM_DAYS: f64 = 1.0;

const FUND_OF_FUNDS_SECONDARY: &str = "Cotas de Fundos";
const FUND_OF_FUNDS_CLASSES: [&str; 3] = ["Multimercado", "Renda Fixa", "FIDC"];
const CASH_PRIMARY: &str = "Caixa";
const CHECKING_ACCOUNT_TYPE: &str = "CONTAS CORRENTES";
const CHECKING_ACCOUNT_ID: &str = "C/C";

/// Funds whose `NTNB...` identifiers carry the maturity as a trailing
/// `dd/mm/yyyy` instead of an embedded `yyyymmdd` token.
pub const TAIL_DATE_NTNB_FUNDS: [&str; 1] = ["PHIP11"];

const SEMESTER: Months = Months::new(6);
const FIRST_COUPON_RATE: f64 = 0.03;
const COUPON_DECAY: f64 = 0.97;

/// Remaining term in days for `row`, never negative.
///
/// `today` anchors the coupon schedule of inflation-indexed bonds.
pub fn term_days(row: &PortfolioRow, today: NaiveDate) -> f64 {
    raw_term_days(row, today).max(0.0)
}

fn raw_term_days(row: &PortfolioRow, today: NaiveDate) -> f64 {
    let primary = row.primary.trim();
    let secondary = row.secondary.trim();
    let instrument_type = row.instrument_type.trim();
    let instrument = row.instrument.trim();
    let fund = row.fund.trim();

    if secondary == FUND_OF_FUNDS_SECONDARY && FUND_OF_FUNDS_CLASSES.contains(&primary) {
        return FUND_OF_FUNDS_TERM_DAYS;
    }
    if primary == CASH_PRIMARY && instrument_type != CHECKING_ACCOUNT_TYPE {
        return CASH_TERM_DAYS;
    }
    if instrument_type == CHECKING_ACCOUNT_TYPE && instrument == CHECKING_ACCOUNT_ID {
        return CASH_TERM_DAYS;
    }

    if instrument.starts_with("LFT - ") {
        return days_between(parse_tail_date(instrument), row.as_of);
    } else if instrument.starts_with("LFT") {
        if let Some(maturity) = parse_embedded_date(instrument, 3) {
            return days_between(Some(maturity), row.as_of);
        }
    }

    if instrument.starts_with("NTN-B") && !instrument.ends_with("Over") {
        let maturity = parse_tail_date(instrument);
        return coupon_weighted_term(maturity, row.as_of, today, row.market_value);
    }
    if instrument.starts_with("NTNB") {
        let maturity = if TAIL_DATE_NTNB_FUNDS.contains(&fund) {
            parse_tail_date(instrument)
        } else {
            parse_embedded_date(instrument, 4)
        };
        return coupon_weighted_term(maturity, row.as_of, today, row.market_value);
    }

    row.term_days.filter(|d| *d > 0.0).unwrap_or(0.0)
}

/// Value-weighted effective term of an amortizing semiannual-coupon bond.
///
/// The schedule is anchored on calendar coupon dates: walking back from
/// `maturity` in six-month steps until on or before `today` gives the number
/// of remaining coupons. The first coupon is 3% of `value`, each later one 97%
/// of the previous; whatever principal is left is redeemed at maturity. Each
/// cash flow is weighted by its distance in days from `as_of`.
pub fn coupon_weighted_term(
    maturity: Option<NaiveDate>,
    as_of: Option<NaiveDate>,
    today: NaiveDate,
    value: f64,
) -> f64 {
    let (Some(maturity), Some(as_of)) = (maturity, as_of) else {
        return 0.0;
    };
    if value <= 0.0 {
        return 0.0;
    }

    let Some((periods, anchor)) = successors(Some(maturity), |d| d.checked_sub_months(SEMESTER))
        .enumerate()
        .find(|(_, d)| *d <= today)
    else {
        return 0.0;
    };

    let coupon_dates = successors(anchor.checked_add_months(SEMESTER), |d| {
        d.checked_add_months(SEMESTER)
    });
    let coupon_values = successors(Some(value * FIRST_COUPON_RATE), |c| Some(c * COUPON_DECAY));

    let (weighted, paid) = coupon_dates
        .zip(coupon_values)
        .take(periods)
        .fold((0.0, 0.0), |(weighted, paid), (date, coupon)| {
            (
                weighted + coupon * days_between(Some(date), Some(as_of)),
                paid + coupon,
            )
        });

    let principal = (value - paid).max(0.0);
    let weighted = weighted + principal * days_between(Some(maturity), Some(as_of));
    weighted / value
}

fn days_between(end: Option<NaiveDate>, start: Option<NaiveDate>) -> f64 {
    match (end, start) {
        (Some(end), Some(start)) => (end - start).num_days() as f64,
        _ => 0.0,
    }
}

/// `dd/mm/yyyy` in the last ten characters of `s`.
pub fn parse_tail_date(s: &str) -> Option<NaiveDate> {
    let chars: Vec<char> = s.trim().chars().collect();
    if chars.len() < 10 {
        return None;
    }
    let tail: String = chars[chars.len() - 10..].iter().collect();
    NaiveDate::parse_from_str(&tail, "%d/%m/%Y").ok()
}

/// `yyyymmdd` token of eight ASCII digits starting at character `start`.
pub fn parse_embedded_date(s: &str, start: usize) -> Option<NaiveDate> {
    let token: String = s.chars().skip(start).take(8).collect();
    if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = token[0..4].parse().ok()?;
    let month = token[4..6].parse().ok()?;
    let day = token[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
