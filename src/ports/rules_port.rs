//! Rules document access port.

use crate::domain::rule_result::RuleId;
use serde_yaml::Value;

pub trait RulesPort {
    /// The rule's section under `limits`: fund name or fund type to entry.
    fn rule_limits(&self, rule: RuleId) -> Option<&Value>;
}
