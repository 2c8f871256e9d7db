//! YAML rules document adapter.
//!
//! Document layout:
//!
//! ```yaml
//! limits:
//!   enquadramento_cvm:
//!     ALPHA: {min: 0.67, alvo: {any: [Renda Variável]}}
//!     FIA: 0.67
//!   prazo_medio:
//!     ETF: {exige: true, dias: 720}
//!     BETA: ~
//! ```

use crate::domain::error::PretradeError;
use crate::domain::limits::{is_exemption, AllocationLimit, TermLimit};
use crate::domain::rule_result::RuleId;
use crate::ports::rules_port::RulesPort;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Locations tried, in order, when no explicit path is given.
pub const DEFAULT_SEARCH_PATHS: [&str; 2] = ["config/rules_config.yaml", "rules_config.yaml"];

#[derive(Debug, Default, Deserialize)]
struct RulesDocument {
    #[serde(default)]
    limits: BTreeMap<String, Value>,
}

#[derive(Debug)]
pub struct YamlRulesAdapter {
    document: RulesDocument,
    source: String,
}

impl YamlRulesAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PretradeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PretradeError::ConfigNotFound {
                searched: vec![path.display().to_string()],
            },
            _ => PretradeError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_string(content: &str) -> Result<Self, PretradeError> {
        Self::parse(content, "<string>")
    }

    /// Load the first existing file among `candidates`.
    pub fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, PretradeError> {
        let found = candidates
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.is_file());
        match found {
            Some(path) => {
                info!(path = %path.display(), "loading rules document");
                Self::from_file(path)
            }
            None => Err(PretradeError::ConfigNotFound {
                searched: candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect(),
            }),
        }
    }

    /// The explicit path if given, else the default search paths.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PretradeError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let defaults: Vec<PathBuf> =
                    DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect();
                Self::locate(&defaults)
            }
        }
    }

    fn parse(content: &str, source: &str) -> Result<Self, PretradeError> {
        // An empty file deserializes to null, which is an empty document.
        let document = match serde_yaml::from_str::<Option<RulesDocument>>(content) {
            Ok(doc) => doc.unwrap_or_default(),
            Err(e) => {
                return Err(PretradeError::ConfigParse {
                    file: source.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        Ok(Self {
            document,
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rule keys under `limits` that no evaluator reads.
    pub fn unknown_rules(&self) -> Vec<&str> {
        self.document
            .limits
            .keys()
            .map(String::as_str)
            .filter(|k| RuleId::from_id(k).is_none())
            .collect()
    }

    /// Parse every entry of every known rule and collect all problems.
    pub fn validate(&self) -> Result<usize, PretradeError> {
        let mut issues = Vec::new();
        let mut checked = 0usize;

        for rule in RuleId::ALL {
            let Some(section) = self.rule_limits(rule) else {
                continue;
            };
            let Some(entries) = section.as_mapping() else {
                issues.push(format!("{}: expected a mapping of fund or fund type to limit", rule.id()));
                continue;
            };
            for (key, entry) in entries {
                if is_exemption(entry) {
                    checked += 1;
                    continue;
                }
                let parsed = match rule {
                    RuleId::AverageTerm => TermLimit::from_entry(rule, entry).map(|_| ()),
                    _ => AllocationLimit::from_entry(rule, entry).map(|_| ()),
                };
                match parsed {
                    Ok(()) => checked += 1,
                    Err(e) => issues.push(format!("{} / {}: {e}", rule.id(), key_text(key))),
                }
            }
        }

        if issues.is_empty() {
            Ok(checked)
        } else {
            Err(PretradeError::Validation { issues })
        }
    }
}

impl RulesPort for YamlRulesAdapter {
    fn rule_limits(&self, rule: RuleId) -> Option<&Value> {
        self.document.limits.get(rule.id())
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
