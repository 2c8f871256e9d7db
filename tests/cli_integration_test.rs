//! CLI integration tests: real CSV, YAML and INI files on disk, dispatched
//! through `cli::run`.

mod common;

use clap::Parser;
use common::*;
use pretrade::cli::{self, Cli, RULE_FAILURE_EXIT};
use std::process::ExitCode;
use tempfile::TempDir;

const PORTFOLIO_CSV: &str = "\
Nome do Fundo;Tipo do Fundo;Ativo;PL Parcela;Categoria;Categoria 2;Categoria Comite;Prazo;DataBase
ALPHA;FIM;PETR4;600.000,00;Renda Variável;Outros;Renda Variável;;02/09/2024
ALPHA;FIM;LFT - 01/09/2027;400.000,00;Renda Fixa;Outros;Renda Fixa;;02/09/2024
ALPHA;FIM;DOL FUT;250.000,00;Derivativos;Futuros;Derivativos;;02/09/2024
BETA;ETF;BOVA11;50.000,00;Renda Variável;Outros;Renda Variável;;02/09/2024
";

const RULES_YAML: &str = r#"
limits:
  enquadramento_cvm:
    ALPHA:
      min: 0.67
      alvo:
        any: [Renda Variável]
    ETF: ~
  enquadramento_tributario:
    FIM: ~
  prazo_medio:
    ALPHA: {exige: true, dias: 1000}
"#;

// ExitCode has no PartialEq on every supported toolchain; compare debug output.
fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(expected)));
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["pretrade"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

struct Fixture {
    portfolio: tempfile::NamedTempFile,
    rules: tempfile::NamedTempFile,
}

impl Fixture {
    fn new() -> Self {
        Self {
            portfolio: write_temp(PORTFOLIO_CSV, ".csv"),
            rules: write_temp(RULES_YAML, ".yaml"),
        }
    }

    fn portfolio(&self) -> &str {
        self.portfolio.path().to_str().unwrap()
    }

    fn rules(&self) -> &str {
        self.rules.path().to_str().unwrap()
    }

    fn check(&self, extra: &[&str]) -> ExitCode {
        let mut args = vec![
            "check",
            "--portfolio",
            self.portfolio(),
            "--rules",
            self.rules(),
            "--fund",
            "ALPHA",
            "--date",
            "2024-09-02",
        ];
        args.extend_from_slice(extra);
        run(&args)
    }
}

mod check_command {
    use super::*;

    #[test]
    fn passing_batch_exits_zero_and_writes_report() {
        let fixture = Fixture::new();
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("relatorio.md");

        let code = fixture.check(&["--order", "PETR4:buy:1:100000", "--output", out.to_str().unwrap()]);
        assert_exit(code, 0);

        let report = std::fs::read_to_string(&out).unwrap();
        assert!(report.contains("**Fundo:** ALPHA"));
        assert!(report.contains("todas as regras atendidas"));
        assert!(report.contains("| PETR4 | compra | 1 | R$ 100.000,00 | R$ 100.000,00 |"));
        assert!(report.contains("| Enquadramento CVM | OK | 60,00% | 70,00% | 67,00% |"));
    }

    #[test]
    fn failing_rule_exits_with_rule_failure_code() {
        let fixture = Fixture::new();
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("relatorio.md");

        let code = fixture.check(&["--order", "PETR4:venda:1:100000", "--output", out.to_str().unwrap()]);
        assert_exit(code, RULE_FAILURE_EXIT);

        let report = std::fs::read_to_string(&out).unwrap();
        assert!(report.contains("há regras violadas"));
        assert!(report.contains("FALHOU"));
    }

    #[test]
    fn oversized_sale_is_a_validation_error() {
        let fixture = Fixture::new();
        assert_exit(fixture.check(&["--order", "LFT - 01/09/2027:sell:1:500000"]), 4);
    }

    #[test]
    fn malformed_inline_order_is_a_validation_error() {
        let fixture = Fixture::new();
        assert_exit(fixture.check(&["--order", "PETR4:hold:1:1"]), 4);
    }

    #[test]
    fn no_orders_is_rejected() {
        let fixture = Fixture::new();
        assert_exit(fixture.check(&[]), 4);
    }

    #[test]
    fn orders_file_feeds_the_batch() {
        let fixture = Fixture::new();
        let orders = write_temp(
            "ativo;quantidade;preco;tipo\nPETR4;1;50000;compra\nPETR4;1;50000;compra\n",
            ".csv",
        );
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("r.md");
        let code = fixture.check(&[
            "--orders",
            orders.path().to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ]);
        assert_exit(code, 0);
        let report = std::fs::read_to_string(&out).unwrap();
        assert_eq!(report.matches("| PETR4 | compra |").count(), 2);
    }

    #[test]
    fn new_instrument_can_be_bought() {
        let fixture = Fixture::new();
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("r.md");
        let code = fixture.check(&[
            "--new-instrument",
            "VALE3:acoes:Renda Variável:Outros:Renda Variável",
            "--order",
            "VALE3:buy:1:100000",
            "--output",
            out.to_str().unwrap(),
        ]);
        assert_exit(code, 0);
    }

    #[test]
    fn unknown_instrument_is_rejected() {
        let fixture = Fixture::new();
        assert_exit(fixture.check(&["--order", "VALE3:buy:1:1"]), 4);
    }

    #[test]
    fn missing_rules_file_is_config_error() {
        let fixture = Fixture::new();
        let code = run(&[
            "check",
            "--portfolio",
            fixture.portfolio(),
            "--rules",
            "/nonexistent/rules_config.yaml",
            "--fund",
            "ALPHA",
            "--order",
            "PETR4:buy:1:1",
        ]);
        assert_exit(code, 2);
    }

    #[test]
    fn missing_fund_is_config_error() {
        let fixture = Fixture::new();
        let code = run(&[
            "check",
            "--portfolio",
            fixture.portfolio(),
            "--rules",
            fixture.rules(),
            "--order",
            "PETR4:buy:1:1",
        ]);
        assert_exit(code, 2);
    }

    #[test]
    fn missing_portfolio_file_is_load_error() {
        let fixture = Fixture::new();
        let code = run(&[
            "check",
            "--portfolio",
            "/nonexistent/carteira.csv",
            "--rules",
            fixture.rules(),
            "--fund",
            "ALPHA",
            "--order",
            "PETR4:buy:1:1",
        ]);
        assert_exit(code, 3);
    }

    #[test]
    fn bad_reference_date_is_invalid_config() {
        let fixture = Fixture::new();
        let code = run(&[
            "check",
            "--portfolio",
            fixture.portfolio(),
            "--rules",
            fixture.rules(),
            "--fund",
            "ALPHA",
            "--date",
            "02/09/2024",
            "--order",
            "PETR4:buy:1:1",
        ]);
        assert_exit(code, 5);
    }
}

mod settings_file {
    use super::*;

    #[test]
    fn settings_supply_every_path() {
        let fixture = Fixture::new();
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("from_settings.md");
        let ini = format!(
            "[portfolio]\npath = {}\nfund = ALPHA\n\n[rules]\npath = {}\n\n[report]\noutput = {}\n\n[engine]\nreference_date = 2024-09-02\n",
            fixture.portfolio(),
            fixture.rules(),
            out.display()
        );
        let settings = write_temp(&ini, ".ini");

        let code = run(&[
            "check",
            "--settings",
            settings.path().to_str().unwrap(),
            "--order",
            "PETR4:buy:1:100000",
        ]);
        assert_exit(code, 0);
        assert!(out.is_file());
    }

    #[test]
    fn missing_settings_file_is_config_error() {
        let code = run(&["check", "--settings", "/nonexistent/pretrade.ini", "--order", "PETR4:buy:1:1"]);
        assert_exit(code, 2);
    }
}

mod other_commands {
    use super::*;

    #[test]
    fn funds_lists_portfolio() {
        let fixture = Fixture::new();
        assert_exit(run(&["funds", "--portfolio", fixture.portfolio()]), 0);
    }

    #[test]
    fn funds_without_portfolio_is_config_error() {
        assert_exit(run(&["funds"]), 2);
    }

    #[test]
    fn validate_rules_accepts_good_document() {
        let fixture = Fixture::new();
        assert_exit(run(&["validate-rules", "--rules", fixture.rules()]), 0);
    }

    #[test]
    fn validate_rules_reports_bad_entries() {
        let rules = write_temp(
            "limits:\n  enquadramento_cvm:\n    ALPHA: {min: abc}\n    BETA: [1, 2]\n",
            ".yaml",
        );
        assert_exit(run(&["validate-rules", "--rules", rules.path().to_str().unwrap()]), 4);
    }

    #[test]
    fn validate_rules_rejects_unparseable_yaml() {
        let rules = write_temp("limits: [unclosed\n", ".yaml");
        assert_exit(run(&["validate-rules", "--rules", rules.path().to_str().unwrap()]), 2);
    }
}
