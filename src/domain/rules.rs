//! Compliance rule evaluators.
//!
//! Each evaluator receives the snapshot to judge, the order under review and
//! its own section of the rules document, and produces one [`RuleResult`].
//! Allocation rules compare the share of NAV held in a target; the average
//! term rule compares the value-weighted term of the fund's holdings.

use crate::domain::error::PretradeError;
use crate::domain::limits::{resolve, AllocationLimit, EvaluationContext, Resolution, TermLimit};
use crate::domain::maturity::term_days;
use crate::domain::order::Order;
use crate::domain::portfolio::{Field, PortfolioRow, PortfolioSnapshot};
use crate::domain::rule_result::{RuleId, RuleResult};
use crate::domain::target::matched_value;
use serde_yaml::Value;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Issuer whose holdings do not count towards the tax allocation of the
/// funds in [`TAX_EXCLUDED_FUNDS`].
pub const TAX_EXCLUDED_ISSUER: &str = "28.819.553/0001-90";

/// Fund names, folded by [`fold_name`].
pub const TAX_EXCLUDED_FUNDS: [&str; 12] = [
    "rio guaimbe fim",
    "guaimbe fim",
    "perola negra fim",
    "ambar branco fim",
    "trindade fim",
    "tsadik fim",
    "quartzo azul fim",
    "quartzo fim",
    "tavola fim",
    "tavola",
    "brutus fim",
    "brutus",
];

pub trait RuleEvaluator {
    fn rule(&self) -> RuleId;

    fn evaluate(
        &self,
        snapshot: &PortfolioSnapshot,
        order: &Order,
        limits: Option<&Value>,
        ctx: &EvaluationContext,
    ) -> Result<RuleResult, PretradeError>;
}

/// Evaluators in reporting order.
pub fn registry() -> Vec<Box<dyn RuleEvaluator>> {
    vec![
        Box::new(AllocationRule::regulatory()),
        Box::new(AllocationRule::tax()),
        Box::new(AverageTermRule),
    ]
}

/// Minimum share of NAV in a configured target.
#[derive(Debug, Clone, Copy)]
pub struct AllocationRule {
    rule: RuleId,
    issuer_exclusion: bool,
}

impl AllocationRule {
    pub fn regulatory() -> Self {
        AllocationRule {
            rule: RuleId::RegulatoryAllocation,
            issuer_exclusion: false,
        }
    }

    pub fn tax() -> Self {
        AllocationRule {
            rule: RuleId::TaxAllocation,
            issuer_exclusion: true,
        }
    }

    fn excludes_issuer(&self, snapshot: &PortfolioSnapshot, fund: &str) -> bool {
        self.issuer_exclusion
            && snapshot.has_column(Field::TaxId)
            && TAX_EXCLUDED_FUNDS.contains(&fold_name(fund).as_str())
    }
}

impl RuleEvaluator for AllocationRule {
    fn rule(&self) -> RuleId {
        self.rule
    }

    fn evaluate(
        &self,
        snapshot: &PortfolioSnapshot,
        order: &Order,
        limits: Option<&Value>,
        _ctx: &EvaluationContext,
    ) -> Result<RuleResult, PretradeError> {
        let fund = order.fund.as_str();
        let fund_type = snapshot.fund_type(fund);
        let entry = match resolve(limits, fund, &fund_type) {
            Resolution::Entry(entry) => entry,
            Resolution::Exempt | Resolution::Missing => {
                return Ok(RuleResult::exempt(self.rule, fund));
            }
        };
        let limit = AllocationLimit::from_entry(self.rule, entry)?;

        let mut rows = snapshot.fund_rows_ex_futures(fund);
        if self.excludes_issuer(snapshot, fund) {
            rows.retain(|r| r.tax_id.trim() != TAX_EXCLUDED_ISSUER);
        }
        if rows.is_empty() || !snapshot.has_column(Field::MarketValue) {
            return Ok(RuleResult {
                rule: self.rule,
                passed: false,
                current: 0.0,
                proposed: 0.0,
                limit: limit.min,
                message: format!("{}: no rows for fund {}", self.rule.label(), fund),
            });
        }

        let current = matched_value(rows.iter().copied(), &limit.target);
        let order_counts = rows
            .iter()
            .any(|r| r.instrument == order.instrument && limit.target.matches(r));
        let proposed = if order_counts {
            current + order.signed_value()
        } else {
            current
        };

        let nav = snapshot.nav_ex_futures(fund);
        let subset: f64 = rows.iter().map(|r| r.market_value).sum();
        let current_ratio = ratio(current, if nav != 0.0 { nav } else { subset });
        let proposed_ratio = ratio(proposed, nav);

        debug!(
            rule = self.rule.id(),
            fund,
            target = %limit.target,
            current_ratio,
            proposed_ratio,
            min = limit.min,
            "allocation evaluated"
        );

        Ok(RuleResult {
            rule: self.rule,
            passed: proposed_ratio >= limit.min,
            current: current_ratio,
            proposed: proposed_ratio,
            limit: limit.min,
            message: format!(
                "{}: {:.2}% of NAV in target (min {:.2}%)",
                self.rule.label(),
                proposed_ratio * 100.0,
                limit.min * 100.0
            ),
        })
    }
}

/// Minimum value-weighted average term of the fund's holdings.
#[derive(Debug, Clone, Copy)]
pub struct AverageTermRule;

impl RuleEvaluator for AverageTermRule {
    fn rule(&self) -> RuleId {
        RuleId::AverageTerm
    }

    fn evaluate(
        &self,
        snapshot: &PortfolioSnapshot,
        order: &Order,
        limits: Option<&Value>,
        ctx: &EvaluationContext,
    ) -> Result<RuleResult, PretradeError> {
        let rule = RuleId::AverageTerm;
        let fund = order.fund.as_str();
        let fund_type = snapshot.fund_type(fund);
        let limit = match resolve(limits, fund, &fund_type) {
            Resolution::Exempt => return Ok(RuleResult::exempt(rule, fund)),
            Resolution::Missing => TermLimit::default_for(&fund_type),
            Resolution::Entry(entry) => TermLimit::from_entry(rule, entry)?,
        };
        if !limit.requires_check {
            return Ok(RuleResult::exempt(rule, fund));
        }

        let rows = snapshot.fund_rows_ex_futures(fund);
        if rows.is_empty() || !snapshot.has_column(Field::MarketValue) {
            return Ok(RuleResult {
                rule,
                passed: false,
                current: 0.0,
                proposed: 0.0,
                limit: limit.limit_days,
                message: format!("{}: insufficient data for fund {}", rule.label(), fund),
            });
        }

        let (weight, weighted) = weighted_term(&rows, ctx);
        let current = if weight > 0.0 { weighted / weight } else { 0.0 };

        let order_term = rows
            .iter()
            .rev()
            .find(|r| r.instrument == order.instrument)
            .map(|r| term_days(r, ctx.today))
            .unwrap_or(0.0);
        let (weight, weighted) = if order_term > 0.0 {
            let delta = order.signed_value();
            (weight + delta, weighted + delta * order_term)
        } else {
            (weight, weighted)
        };
        let proposed = if weight > 0.0 { weighted / weight } else { current };

        debug!(
            fund,
            current,
            proposed,
            limit = limit.limit_days,
            "average term evaluated"
        );

        Ok(RuleResult {
            rule,
            passed: proposed > limit.limit_days,
            current,
            proposed,
            limit: limit.limit_days,
            message: format!(
                "{}: {:.1} days (min {:.0} days)",
                rule.label(),
                proposed,
                limit.limit_days
            ),
        })
    }
}

/// Sum of values and of value times term over rows with a positive term.
fn weighted_term(rows: &[&PortfolioRow], ctx: &EvaluationContext) -> (f64, f64) {
    rows.iter()
        .map(|r| (r.market_value, term_days(r, ctx.today)))
        .filter(|(_, term)| *term > 0.0)
        .fold((0.0, 0.0), |(w, p), (value, term)| (w + value, p + value * term))
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Lower-case, trimmed, with accents removed.
pub fn fold_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_lowercase()
}
