//! Application settings validation.
//!
//! Reads the optional INI settings file into [`Settings`], rejecting values
//! that would only fail later in the run.

use crate::domain::error::PretradeError;
use crate::ports::settings_port::SettingsPort;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub portfolio: Option<PathBuf>,
    pub fund: Option<String>,
    pub latest_only: bool,
    pub rules: Option<PathBuf>,
    pub report_output: Option<PathBuf>,
    pub reference_date: Option<NaiveDate>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            portfolio: None,
            fund: None,
            latest_only: true,
            rules: None,
            report_output: None,
            reference_date: None,
        }
    }
}

pub fn load_settings(config: &dyn SettingsPort) -> Result<Settings, PretradeError> {
    Ok(Settings {
        portfolio: path(config, "portfolio", "path")?,
        fund: text(config, "portfolio", "fund")?,
        latest_only: config.get_bool("portfolio", "latest_only", true),
        rules: path(config, "rules", "path")?,
        report_output: path(config, "report", "output")?,
        reference_date: reference_date(config)?,
    })
}

/// A present key must not be blank; an absent one is `None`.
fn text(config: &dyn SettingsPort, section: &str, key: &str) -> Result<Option<String>, PretradeError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Err(PretradeError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must not be empty"),
        }),
        Some(s) => Ok(Some(s.trim().to_string())),
    }
}

fn path(config: &dyn SettingsPort, section: &str, key: &str) -> Result<Option<PathBuf>, PretradeError> {
    Ok(text(config, section, key)?.map(PathBuf::from))
}

fn reference_date(config: &dyn SettingsPort) -> Result<Option<NaiveDate>, PretradeError> {
    text(config, "engine", "reference_date")?
        .map(|s| parse_date(&s, "engine", "reference_date"))
        .transpose()
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, PretradeError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| PretradeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("invalid {key} format, expected YYYY-MM-DD"),
    })
}
