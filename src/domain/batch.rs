//! Batch pre-trade check: validate, simulate, evaluate.

use crate::domain::error::PretradeError;
use crate::domain::limits::EvaluationContext;
use crate::domain::order::Order;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::rule_result::RuleResult;
use crate::domain::runner::evaluate_rules;
use crate::domain::simulator::{apply_orders, register_instruments, validate_sales, NewInstrument};
use crate::ports::rules_port::RulesPort;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub fund: String,
    pub orders: Vec<Order>,
    pub proposed_nav: f64,
    pub results: Vec<RuleResult>,
}

impl BatchReport {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Check a batch of orders for `fund` against the rules document.
///
/// Sales are validated against `snapshot` before anything is applied. Rules
/// are then judged on the proposed snapshot, with a zero-quantity order on
/// the batch's first instrument as context so the batch is not counted twice.
pub fn check_batch(
    snapshot: &PortfolioSnapshot,
    fund: &str,
    orders: &[Order],
    new_instruments: &[NewInstrument],
    config: &dyn RulesPort,
    ctx: &EvaluationContext,
) -> Result<BatchReport, PretradeError> {
    let Some(first) = orders.first() else {
        return Err(PretradeError::validation("no valid orders to process"));
    };
    if !snapshot.has_fund(fund) {
        return Err(PretradeError::UnknownFund {
            fund: fund.to_string(),
        });
    }

    validate_sales(snapshot, fund, orders)?;
    let base = register_instruments(snapshot, fund, new_instruments);
    let proposed = apply_orders(&base, fund, orders)?;
    let proposed_nav = proposed.nav_ex_futures(fund);

    let results = evaluate_rules(&proposed, &first.as_context(), config, ctx);
    let failed = results.iter().filter(|r| !r.passed).count();
    info!(fund, orders = orders.len(), proposed_nav, failed, "batch checked");

    Ok(BatchReport {
        fund: fund.to_string(),
        orders: orders.to_vec(),
        proposed_nav,
        results,
    })
}
