//! Domain error types.

/// Top-level error type for pretrade.
#[derive(Debug, thiserror::Error)]
pub enum PretradeError {
    #[error("{}", format_issues(.issues))]
    Validation { issues: Vec<String> },

    #[error("portfolio is empty")]
    EmptyPortfolio,

    #[error("missing required column: {column}")]
    MissingColumn { column: String },

    #[error("order fund {order_fund} does not match selected fund {fund}")]
    FundMismatch { order_fund: String, fund: String },

    #[error("instrument {instrument} not found in fund {fund}")]
    UnknownInstrument { instrument: String, fund: String },

    #[error("fund {fund} not found in portfolio")]
    UnknownFund { fund: String },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("rules configuration not found (searched: {})", .searched.join(", "))]
    ConfigNotFound { searched: Vec<String> },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid target spec: {reason}")]
    TargetParse { reason: String },

    #[error("portfolio load error: {reason}")]
    PortfolioLoad { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PretradeError {
    /// Wrap a single message as a one-item validation error.
    pub fn validation(issue: impl Into<String>) -> Self {
        PretradeError::Validation {
            issues: vec![issue.into()],
        }
    }

    /// Flatten this error into the itemized list shown to the user.
    pub fn issues(&self) -> Vec<String> {
        match self {
            PretradeError::Validation { issues } => issues.clone(),
            other => vec![other.to_string()],
        }
    }
}

fn format_issues(issues: &[String]) -> String {
    match issues {
        [] => "validation failed".to_string(),
        [single] => single.clone(),
        many => {
            let mut out = format!("{} validation errors:", many.len());
            for issue in many {
                out.push_str("\n  - ");
                out.push_str(issue);
            }
            out
        }
    }
}

impl From<&PretradeError> for std::process::ExitCode {
    fn from(err: &PretradeError) -> Self {
        let code: u8 = match err {
            PretradeError::Io(_) => 1,
            PretradeError::ConfigNotFound { .. }
            | PretradeError::ConfigParse { .. }
            | PretradeError::ConfigMissing { .. } => 2,
            PretradeError::PortfolioLoad { .. } => 3,
            PretradeError::Validation { .. }
            | PretradeError::EmptyPortfolio
            | PretradeError::MissingColumn { .. }
            | PretradeError::FundMismatch { .. }
            | PretradeError::UnknownInstrument { .. }
            | PretradeError::UnknownFund { .. }
            | PretradeError::InvalidOrder { .. } => 4,
            PretradeError::ConfigInvalid { .. } | PretradeError::TargetParse { .. } => 5,
            PretradeError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_issue_displays_plainly() {
        let err = PretradeError::validation("sale exceeds held value");
        assert_eq!(err.to_string(), "sale exceeds held value");
    }

    #[test]
    fn multiple_issues_are_itemized() {
        let err = PretradeError::Validation {
            issues: vec!["first".into(), "second".into()],
        };
        assert_eq!(
            err.to_string(),
            "2 validation errors:\n  - first\n  - second"
        );
        assert_eq!(err.issues(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn non_validation_error_flattens_to_one_issue() {
        let err = PretradeError::EmptyPortfolio;
        assert_eq!(err.issues(), vec!["portfolio is empty".to_string()]);
    }

    #[test]
    fn config_not_found_lists_searched_paths() {
        let err = PretradeError::ConfigNotFound {
            searched: vec!["a.yaml".into(), "b.yaml".into()],
        };
        assert_eq!(
            err.to_string(),
            "rules configuration not found (searched: a.yaml, b.yaml)"
        );
    }
}
