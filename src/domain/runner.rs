//! Runs every registered rule against one snapshot and order.

use crate::domain::limits::EvaluationContext;
use crate::domain::order::Order;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::rule_result::RuleResult;
use crate::domain::rules::registry;
use crate::ports::rules_port::RulesPort;
use tracing::{debug, warn};

/// One result per rule, in registry order. An evaluator error becomes a
/// failing result and does not stop the remaining rules.
pub fn evaluate_rules(
    snapshot: &PortfolioSnapshot,
    order: &Order,
    config: &dyn RulesPort,
    ctx: &EvaluationContext,
) -> Vec<RuleResult> {
    registry()
        .iter()
        .map(|evaluator| {
            let rule = evaluator.rule();
            match evaluator.evaluate(snapshot, order, config.rule_limits(rule), ctx) {
                Ok(result) => {
                    debug!(rule = rule.id(), passed = result.passed, "rule evaluated");
                    result
                }
                Err(err) => {
                    warn!(rule = rule.id(), error = %err, "rule evaluation failed");
                    RuleResult::error(rule, &err)
                }
            }
        })
        .collect()
}
