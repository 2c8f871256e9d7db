#![allow(dead_code)]

use chrono::NaiveDate;
use pretrade::domain::batch::BatchReport;
use pretrade::domain::error::PretradeError;
use pretrade::domain::limits::EvaluationContext;
use pretrade::domain::order::{Order, Side};
use pretrade::domain::portfolio::{PortfolioRow, PortfolioSnapshot};
use pretrade::domain::rule_result::RuleId;
use pretrade::ports::portfolio_port::PortfolioPort;
use pretrade::ports::report_port::ReportPort;
use pretrade::ports::rules_port::RulesPort;
use serde_yaml::Value;
use std::cell::RefCell;
use std::io::Write;

/// Rules document held in memory.
pub struct MockRulesPort {
    pub limits: Value,
}

impl MockRulesPort {
    pub fn empty() -> Self {
        Self {
            limits: Value::Null,
        }
    }

    /// `yaml` is the content under `limits`.
    pub fn from_yaml(yaml: &str) -> Self {
        Self {
            limits: serde_yaml::from_str(yaml).unwrap(),
        }
    }
}

impl RulesPort for MockRulesPort {
    fn rule_limits(&self, rule: RuleId) -> Option<&Value> {
        self.limits.get(rule.id())
    }
}

pub struct MockPortfolioPort {
    pub snapshot: Option<PortfolioSnapshot>,
}

impl PortfolioPort for MockPortfolioPort {
    fn load_portfolio(&self) -> Result<PortfolioSnapshot, PretradeError> {
        self.snapshot.clone().ok_or_else(|| PretradeError::PortfolioLoad {
            reason: "no snapshot configured".into(),
        })
    }
}

pub struct MockReportPort {
    pub rendered: RefCell<Vec<BatchReport>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            rendered: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn render(&self, report: &BatchReport) -> String {
        self.rendered.borrow_mut().push(report.clone());
        format!("{} results", report.results.len())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ctx() -> EvaluationContext {
    EvaluationContext::new(date(2024, 9, 2))
}

pub fn make_row(fund: &str, instrument: &str, value: f64, primary: &str) -> PortfolioRow {
    PortfolioRow {
        fund_type: "FIM".into(),
        primary: primary.into(),
        secondary: "Outros".into(),
        committee: primary.into(),
        instrument_type: "outros".into(),
        ..PortfolioRow::new(fund, instrument, value)
    }
}

/// ALPHA: 600k equities, 400k fixed income, 250k futures margin. BETA: one ETF row.
pub fn sample_snapshot() -> PortfolioSnapshot {
    let mut futures = make_row("ALPHA", "DOL FUT", 250_000.0, "Derivativos");
    futures.secondary = "Futuros".into();
    let mut lft = make_row("ALPHA", "LFT - 01/09/2027", 400_000.0, "Renda Fixa");
    lft.as_of = Some(date(2024, 9, 1));
    let mut etf = make_row("BETA", "BOVA11", 50_000.0, "Renda Variável");
    etf.fund_type = "ETF".into();
    PortfolioSnapshot::new(vec![
        make_row("ALPHA", "PETR4", 600_000.0, "Renda Variável"),
        lft,
        futures,
        etf,
    ])
}

pub fn order(fund: &str, instrument: &str, qty: f64, price: f64, side: Side) -> Order {
    Order::new(fund, instrument, qty, price, side).unwrap()
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
