//! Position simulator.
//!
//! Applies a batch of orders to a snapshot, producing a proposed snapshot. The
//! input snapshot is never modified. Sale validation is a separate, caller-owned
//! step run against the pre-order snapshot.

use crate::domain::error::PretradeError;
use crate::domain::order::{Order, Side};
use crate::domain::portfolio::{Field, PortfolioRow, PortfolioSnapshot};
use tracing::debug;

/// Tolerance when comparing a sale's value against the held value.
pub const SALE_TOLERANCE: f64 = 1e-9;

/// Classification for an instrument the fund does not yet hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewInstrument {
    pub instrument: String,
    pub instrument_type: String,
    pub primary: String,
    pub secondary: String,
    pub committee: String,
}

pub fn apply_orders(
    snapshot: &PortfolioSnapshot,
    fund: &str,
    orders: &[Order],
) -> Result<PortfolioSnapshot, PretradeError> {
    if snapshot.is_empty() {
        return Err(PretradeError::EmptyPortfolio);
    }
    for field in Field::REQUIRED {
        if !snapshot.has_column(field) {
            return Err(PretradeError::MissingColumn {
                column: field.name().to_string(),
            });
        }
    }

    let columns = snapshot.columns().clone();
    let mut rows = snapshot.rows().to_vec();

    for order in orders {
        if order.fund != fund {
            return Err(PretradeError::FundMismatch {
                order_fund: order.fund.clone(),
                fund: fund.to_string(),
            });
        }

        let delta = order.signed_value();
        let mut matched = 0usize;
        for row in rows
            .iter_mut()
            .filter(|r| r.fund == fund && r.instrument == order.instrument)
        {
            row.market_value += delta;
            matched += 1;
        }
        if matched == 0 {
            return Err(PretradeError::UnknownInstrument {
                instrument: order.instrument.clone(),
                fund: fund.to_string(),
            });
        }
        debug!(
            fund,
            instrument = %order.instrument,
            side = %order.side,
            delta,
            rows = matched,
            "applied order"
        );
    }

    Ok(PortfolioSnapshot::with_columns(rows, columns))
}

/// Check every sell order against the value currently held, collecting all
/// problems instead of stopping at the first.
pub fn validate_sales(
    snapshot: &PortfolioSnapshot,
    fund: &str,
    orders: &[Order],
) -> Result<(), PretradeError> {
    let mut issues = Vec::new();

    for order in orders.iter().filter(|o| o.side == Side::Sell) {
        let held = snapshot.held_value(fund, &order.instrument);
        if held <= 0.0 {
            issues.push(format!(
                "cannot sell {}: fund {} holds no position in it",
                order.instrument, fund
            ));
            continue;
        }
        let sale = order.value();
        if sale > held + SALE_TOLERANCE {
            issues.push(format!(
                "sale of {} ({:.2}) exceeds the value held by fund {} ({:.2})",
                order.instrument, sale, fund, held
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(PretradeError::Validation { issues })
    }
}

/// Add zero-value rows for instruments the fund does not hold yet, so orders
/// on them can be simulated. Pairs already held are left untouched.
pub fn register_instruments(
    snapshot: &PortfolioSnapshot,
    fund: &str,
    instruments: &[NewInstrument],
) -> PortfolioSnapshot {
    let fund_type = snapshot
        .fund_rows(fund)
        .map(|r| r.fund_type.trim())
        .find(|t| !t.is_empty())
        .unwrap_or("")
        .to_string();

    let mut rows = snapshot.rows().to_vec();
    for new in instruments {
        let instrument = new.instrument.trim();
        if instrument.is_empty()
            || rows
                .iter()
                .any(|r| r.fund == fund && r.instrument == instrument)
        {
            continue;
        }
        debug!(fund, instrument, "registering new instrument");
        rows.push(PortfolioRow {
            fund_type: fund_type.clone(),
            instrument_type: new.instrument_type.clone(),
            primary: new.primary.clone(),
            secondary: new.secondary.clone(),
            committee: new.committee.clone(),
            ..PortfolioRow::new(fund, instrument, 0.0)
        });
    }

    PortfolioSnapshot::with_columns(rows, snapshot.columns().clone())
}
