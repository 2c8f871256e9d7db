//! Per-fund limit resolution.
//!
//! A rule's section of the rules document maps a fund name or a fund type to
//! an entry. The fund name wins over the fund type. Null-like entries mark the
//! fund as explicitly exempt.

use crate::domain::error::PretradeError;
use crate::domain::rule_result::RuleId;
use crate::domain::target::TargetSpec;
use crate::domain::target_parser;
use chrono::{Local, NaiveDate};
use serde_yaml::Value;

/// Text values treated the same as a YAML null.
const EXEMPT_MARKERS: [&str; 3] = ["~", "NA", "N/A"];

/// Ambient inputs shared by every evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub today: NaiveDate,
}

impl EvaluationContext {
    pub fn new(today: NaiveDate) -> Self {
        EvaluationContext { today }
    }

    /// Context dated with the local calendar day.
    pub fn local() -> Self {
        EvaluationContext {
            today: Local::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Entry(&'a Value),
    Exempt,
    Missing,
}

/// Look up the entry for `fund`, falling back to `fund_type`.
pub fn resolve<'a>(rule_limits: Option<&'a Value>, fund: &str, fund_type: &str) -> Resolution<'a> {
    let Some(section) = rule_limits.filter(|v| v.is_mapping()) else {
        return Resolution::Missing;
    };
    match section.get(fund).or_else(|| section.get(fund_type)) {
        None => Resolution::Missing,
        Some(value) if is_exemption(value) => Resolution::Exempt,
        Some(value) => Resolution::Entry(value),
    }
}

pub fn is_exemption(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim().to_uppercase();
            EXEMPT_MARKERS.contains(&s.as_str())
        }
        _ => false,
    }
}

/// Minimum share of NAV that the target must reach.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationLimit {
    pub min: f64,
    pub target: TargetSpec,
}

impl AllocationLimit {
    /// A bare number is a minimum with an empty target; a mapping carries
    /// `min` and an optional `alvo`. Booleans are rejected rather than read
    /// as 0 or 1.
    pub fn from_entry(rule: RuleId, entry: &Value) -> Result<Self, PretradeError> {
        if let Some(min) = entry.as_f64() {
            return Ok(AllocationLimit {
                min,
                target: TargetSpec::nothing(),
            });
        }
        if !entry.is_mapping() {
            return Err(invalid(rule, "entry", "expected a number or a mapping"));
        }
        let min = match entry.get("min") {
            None | Some(Value::Null) => 0.0,
            Some(v) => number(v).ok_or_else(|| invalid(rule, "min", "expected a number"))?,
        };
        let target = match entry.get("alvo") {
            Some(alvo) => target_parser::parse(alvo)?,
            None => TargetSpec::nothing(),
        };
        Ok(AllocationLimit { min, target })
    }
}

/// Minimum weighted average term in days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermLimit {
    pub requires_check: bool,
    pub limit_days: f64,
}

impl TermLimit {
    pub fn new(requires_check: bool, limit_days: f64) -> Self {
        TermLimit {
            requires_check,
            limit_days,
        }
    }

    /// Built-in limits by fund type when the document has no entry.
    pub fn default_for(fund_type: &str) -> Self {
        match fund_type.trim().to_uppercase().as_str() {
            "ETF" => TermLimit::new(true, 720.0),
            "FIA" | "FII" => TermLimit::new(false, 0.0),
            _ => TermLimit::new(true, 365.0),
        }
    }

    pub fn from_entry(rule: RuleId, entry: &Value) -> Result<Self, PretradeError> {
        match entry {
            Value::Bool(b) => Ok(TermLimit::new(*b, 0.0)),
            Value::Number(_) => Ok(TermLimit::new(true, entry.as_f64().unwrap_or(0.0))),
            Value::Mapping(_) => {
                let requires_check = match entry.get("exige") {
                    None | Some(Value::Null) => true,
                    Some(Value::Bool(b)) => *b,
                    Some(_) => return Err(invalid(rule, "exige", "expected true or false")),
                };
                let limit_days = match entry.get("dias").or_else(|| entry.get("limite")) {
                    None | Some(Value::Null) => 0.0,
                    Some(v) => {
                        number(v).ok_or_else(|| invalid(rule, "dias", "expected a number"))?
                    }
                };
                Ok(TermLimit::new(requires_check, limit_days))
            }
            // Unrecognised scalars keep the generic one-year floor.
            _ => Ok(TermLimit::new(true, 365.0)),
        }
    }
}

/// Numbers, or numeric text such as `"0.67"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) => value.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn invalid(rule: RuleId, key: &str, reason: &str) -> PretradeError {
    PretradeError::ConfigInvalid {
        section: rule.id().to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
