//! Rule identifiers and evaluation results.

use crate::domain::error::PretradeError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleId {
    #[serde(rename = "enquadramento_cvm")]
    RegulatoryAllocation,
    #[serde(rename = "enquadramento_tributario")]
    TaxAllocation,
    #[serde(rename = "prazo_medio")]
    AverageTerm,
}

impl RuleId {
    /// Evaluation and reporting order.
    pub const ALL: [RuleId; 3] = [
        RuleId::RegulatoryAllocation,
        RuleId::TaxAllocation,
        RuleId::AverageTerm,
    ];

    /// Key of this rule under `limits` in the rules document.
    pub fn id(self) -> &'static str {
        match self {
            RuleId::RegulatoryAllocation => "enquadramento_cvm",
            RuleId::TaxAllocation => "enquadramento_tributario",
            RuleId::AverageTerm => "prazo_medio",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleId::RegulatoryAllocation => "Investment policy (regulation)",
            RuleId::TaxAllocation => "Tax allocation",
            RuleId::AverageTerm => "Average term",
        }
    }

    /// Whether values are ratios of NAV (otherwise days).
    pub fn is_ratio(self) -> bool {
        !matches!(self, RuleId::AverageTerm)
    }

    pub fn from_id(id: &str) -> Option<RuleId> {
        RuleId::ALL.into_iter().find(|r| r.id() == id)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Verdict of one rule for one fund.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule: RuleId,
    pub passed: bool,
    pub current: f64,
    pub proposed: f64,
    pub limit: f64,
    pub message: String,
}

impl RuleResult {
    /// Passing result for a fund outside the rule's scope.
    pub fn exempt(rule: RuleId, fund: &str) -> Self {
        RuleResult {
            rule,
            passed: true,
            current: 0.0,
            proposed: 0.0,
            limit: 0.0,
            message: format!("{}: fund {} is exempt", rule.label(), fund),
        }
    }

    /// Failing result standing in for an evaluator that errored.
    pub fn error(rule: RuleId, err: &PretradeError) -> Self {
        RuleResult {
            rule,
            passed: false,
            current: 0.0,
            proposed: 0.0,
            limit: 0.0,
            message: format!("rule execution error: {err}"),
        }
    }
}
