//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_portfolio_adapter::{load_orders, CsvPortfolioAdapter};
use crate::adapters::file_settings_adapter::FileSettingsAdapter;
use crate::adapters::text_report_adapter::{format_brl, TextReportAdapter};
use crate::adapters::yaml_rules_adapter::YamlRulesAdapter;
use crate::domain::batch::{check_batch, BatchReport};
use crate::domain::error::PretradeError;
use crate::domain::limits::EvaluationContext;
use crate::domain::order::Order;
use crate::domain::settings_validation::{load_settings, parse_date, Settings};
use crate::domain::simulator::NewInstrument;
use crate::ports::portfolio_port::PortfolioPort;
use crate::ports::report_port::ReportPort;

/// Exit code when the batch was evaluated and at least one rule failed.
pub const RULE_FAILURE_EXIT: u8 = 10;

#[derive(Parser, Debug)]
#[command(name = "pretrade", about = "Pre-trade compliance checks for investment funds")]
pub struct Cli {
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a batch of orders and evaluate every rule
    Check(CheckArgs),
    /// List the funds in a portfolio file
    Funds {
        #[arg(short, long)]
        portfolio: Option<PathBuf>,
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Keep every as-of date instead of each fund's latest
        #[arg(long)]
        all_dates: bool,
    },
    /// Parse every entry of the rules document
    ValidateRules {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(short, long)]
    pub portfolio: Option<PathBuf>,
    #[arg(short, long)]
    pub fund: Option<String>,
    #[arg(short, long)]
    pub rules: Option<PathBuf>,
    #[arg(short, long)]
    pub settings: Option<PathBuf>,
    /// Order as ATIVO:SIDE:QTY:PRICE, repeatable
    #[arg(long = "order")]
    pub orders: Vec<String>,
    /// CSV batch with columns ativo, quantidade, preco, tipo
    #[arg(long = "orders")]
    pub orders_file: Option<PathBuf>,
    /// Instrument not yet held, as ATIVO:TIPO:CATEGORIA:CATEGORIA2:COMITE
    #[arg(long = "new-instrument")]
    pub new_instruments: Vec<String>,
    /// Write the Markdown report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Reference date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub all_dates: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match cli.command {
        Command::Check(args) => run_check(&args),
        Command::Funds {
            portfolio,
            settings,
            all_dates,
        } => run_funds(portfolio, settings.as_deref(), all_dates),
        Command::ValidateRules { rules } => run_validate_rules(rules.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    // A subscriber may already be installed when run is called repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(err: &PretradeError) -> ExitCode {
    for issue in err.issues() {
        eprintln!("error: {issue}");
    }
    err.into()
}

pub fn load_settings_file(path: Option<&Path>) -> Result<Settings, PretradeError> {
    match path {
        Some(p) => {
            eprintln!("Loading settings from {}", p.display());
            load_settings(&FileSettingsAdapter::from_file(p)?)
        }
        None => Ok(Settings::default()),
    }
}

fn run_check(args: &CheckArgs) -> ExitCode {
    let (report, output) = match check(args) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    let reporter = TextReportAdapter::new();
    match output {
        Some(path) => {
            if let Err(e) = reporter.write(&report, &path) {
                return fail(&e);
            }
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{}", reporter.render(&report)),
    }

    for r in report.failures() {
        eprintln!("FAILED {}: {}", r.rule, r.message);
    }
    if report.all_passed() {
        eprintln!("All rules passed for {}", report.fund);
        ExitCode::SUCCESS
    } else {
        ExitCode::from(RULE_FAILURE_EXIT)
    }
}

fn check(args: &CheckArgs) -> Result<(BatchReport, Option<PathBuf>), PretradeError> {
    let settings = load_settings_file(args.settings.as_deref())?;

    let portfolio_path = args
        .portfolio
        .clone()
        .or(settings.portfolio.clone())
        .ok_or_else(|| missing("portfolio", "path"))?;
    let fund = args
        .fund
        .clone()
        .or(settings.fund.clone())
        .ok_or_else(|| missing("portfolio", "fund"))?;
    let today = match &args.date {
        Some(d) => parse_date(d, "engine", "reference_date")?,
        None => settings
            .reference_date
            .unwrap_or_else(|| EvaluationContext::local().today),
    };
    let ctx = EvaluationContext::new(today);

    let rules = YamlRulesAdapter::load(args.rules.as_deref().or(settings.rules.as_deref()))?;
    eprintln!("Rules loaded from {}", rules.source());
    for unknown in rules.unknown_rules() {
        eprintln!("warning: rules document has unknown rule '{unknown}'");
    }

    eprintln!("Loading portfolio from {}", portfolio_path.display());
    let snapshot = CsvPortfolioAdapter::new(portfolio_path)
        .with_latest_only(settings.latest_only && !args.all_dates)
        .load_portfolio()?;
    eprintln!("  {} rows, {} funds", snapshot.len(), snapshot.funds().len());

    let orders = collect_orders(args, &fund)?;
    let new_instruments: Vec<NewInstrument> = args
        .new_instruments
        .iter()
        .map(|s| parse_new_instrument(s))
        .collect();

    eprintln!("Checking {} order(s) for {} as of {}", orders.len(), fund, today);
    let report = check_batch(&snapshot, &fund, &orders, &new_instruments, &rules, &ctx)?;
    Ok((report, args.output.clone().or(settings.report_output)))
}

fn missing(section: &str, key: &str) -> PretradeError {
    PretradeError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Inline orders first, then the batch file. All problems are reported together.
fn collect_orders(args: &CheckArgs, fund: &str) -> Result<Vec<Order>, PretradeError> {
    let mut orders = Vec::new();
    let mut issues = Vec::new();

    for raw in &args.orders {
        match parse_inline_order(raw, fund) {
            Ok(o) => orders.push(o),
            Err(e) => issues.push(format!("--order {raw}: {e}")),
        }
    }
    if let Some(path) = &args.orders_file {
        match load_orders(path, fund) {
            Ok(batch) => orders.extend(batch),
            Err(e) => issues.extend(e.issues()),
        }
    }

    if issues.is_empty() {
        Ok(orders)
    } else {
        Err(PretradeError::Validation { issues })
    }
}

/// `ATIVO:SIDE:QTY:PRICE`; the instrument may itself contain colons.
pub fn parse_inline_order(raw: &str, fund: &str) -> Result<Order, PretradeError> {
    let mut parts = raw.rsplitn(4, ':');
    let (Some(price), Some(qty), Some(side), Some(instrument)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PretradeError::InvalidOrder {
            reason: "expected ATIVO:SIDE:QTY:PRICE".to_string(),
        });
    };
    if instrument.trim().is_empty() {
        return Err(PretradeError::InvalidOrder {
            reason: "instrument is empty".to_string(),
        });
    }
    Order::parse(fund, instrument, qty, price, side)
}

/// `ATIVO:TIPO:CATEGORIA:CATEGORIA2:COMITE`; trailing parts may be omitted.
pub fn parse_new_instrument(raw: &str) -> NewInstrument {
    let mut parts = raw.splitn(5, ':').map(|s| s.trim().to_string());
    NewInstrument {
        instrument: parts.next().unwrap_or_default(),
        instrument_type: parts.next().unwrap_or_default(),
        primary: parts.next().unwrap_or_default(),
        secondary: parts.next().unwrap_or_default(),
        committee: parts.next().unwrap_or_default(),
    }
}

fn run_funds(portfolio: Option<PathBuf>, settings: Option<&Path>, all_dates: bool) -> ExitCode {
    let settings = match load_settings_file(settings) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let Some(path) = portfolio.or(settings.portfolio) else {
        return fail(&missing("portfolio", "path"));
    };

    let snapshot = match CsvPortfolioAdapter::new(path)
        .with_latest_only(settings.latest_only && !all_dates)
        .load_portfolio()
    {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let funds = snapshot.funds();
    if funds.is_empty() {
        eprintln!("No funds found");
        return ExitCode::SUCCESS;
    }
    for fund in &funds {
        println!(
            "{}\t{}\t{}",
            fund,
            snapshot.fund_type(fund),
            format_brl(snapshot.nav_ex_futures(fund))
        );
    }
    eprintln!("{} funds found", funds.len());
    ExitCode::SUCCESS
}

fn run_validate_rules(rules: Option<&Path>) -> ExitCode {
    let adapter = match YamlRulesAdapter::load(rules) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    eprintln!("Validating rules: {}", adapter.source());

    for unknown in adapter.unknown_rules() {
        eprintln!("warning: unknown rule '{unknown}' is ignored");
    }
    match adapter.validate() {
        Ok(count) => {
            eprintln!("{count} entries valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Side;

    #[test]
    fn inline_order_parses() {
        let order = parse_inline_order("PETR4:buy:100:32.5", "ALPHA").unwrap();
        assert_eq!(order.instrument, "PETR4");
        assert_eq!(order.side, Side::Buy);
        assert!((order.value() - 3_250.0).abs() < 1e-9);
    }

    #[test]
    fn inline_order_instrument_may_contain_colons() {
        let order = parse_inline_order("FUNDO A:B:venda:1:10", "ALPHA").unwrap();
        assert_eq!(order.instrument, "FUNDO A:B");
        assert_eq!(order.side, Side::Sell);
    }

    #[test]
    fn inline_order_rejects_short_form() {
        assert!(parse_inline_order("PETR4:buy:100", "ALPHA").is_err());
        assert!(parse_inline_order(":buy:1:1", "ALPHA").is_err());
    }

    #[test]
    fn new_instrument_fills_missing_parts() {
        let new = parse_new_instrument("VALE3:acoes:Renda Variável");
        assert_eq!(new.instrument, "VALE3");
        assert_eq!(new.instrument_type, "acoes");
        assert_eq!(new.primary, "Renda Variável");
        assert_eq!(new.secondary, "");
        assert_eq!(new.committee, "");
    }

    #[test]
    fn cli_parses_check_command() {
        let cli = Cli::try_parse_from([
            "pretrade",
            "check",
            "--portfolio",
            "carteira.csv",
            "--fund",
            "ALPHA",
            "--order",
            "PETR4:buy:1:1",
            "--order",
            "VALE3:sell:2:2",
            "--date",
            "2024-09-02",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Check(args) => {
                assert_eq!(args.orders.len(), 2);
                assert_eq!(args.fund.as_deref(), Some("ALPHA"));
                assert_eq!(args.date.as_deref(), Some("2024-09-02"));
            }
            other => panic!("expected check, got {other:?}"),
        }
    }
}
