//! CSV portfolio and order batch adapter.
//!
//! Headers are matched case- and space-insensitively against a list of
//! aliases per canonical column. Both `,` and `;` delimited files are read.

use crate::domain::error::PretradeError;
use crate::domain::order::Order;
use crate::domain::portfolio::{Field, PortfolioRow, PortfolioSnapshot};
use crate::ports::portfolio_port::PortfolioPort;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

const HIGH_LIQUIDITY: [&str; 5] = ["alta", "alta liquidez", "d+0", "d0", "d+1"];
const LOW_LIQUIDITY: [&str; 5] = ["baixa", "baixa liquidez", "d+30", "d+60", "d+90"];

fn aliases(field: Field) -> &'static [&'static str] {
    match field {
        Field::FundName => &["nome do fundo", "nome_fundo", "fundo", "nome"],
        Field::FundType => &["tipo do fundo", "tipo", "tipofundo", "tipo_fundo", "tipofundoinvest"],
        Field::Instrument => &["ativo", "id_ativo", "idativo"],
        Field::MarketValue => &["valor", "pl parcela", "valor(r$)", "valor r$"],
        Field::Primary => &["categoria"],
        Field::Secondary => &["categoria 2"],
        Field::Committee => &["categoria comitê", "categoria comite"],
        Field::InstrumentType => &["tipo de ativo", "tipo ativo", "tipo_ativo", "tipoativo"],
        Field::Liquidity => &["liquidez", "liquidezativo", "liquidezativoinvest", "liquidez_ativo_invest"],
        Field::Quantity => &["qtde", "quantidade", "qtd", "qde"],
        Field::Price => &["pu/cota", "pu", "preco", "preço", "preco unitario", "preco_unitario"],
        Field::TermDays => &["prazo_dias", "prazo", "duracao", "duration_days"],
        Field::TaxId => &[
            "cnpj",
            "cnpj do ativo",
            "cnpj do fundo",
            "cnpjfundo",
            "cnpjfundo invest",
            "cnpjfundoinvest",
            "cnpjfundoinvestimento",
            "cnpj_fundo_invest",
            "cnpjfundoinv",
        ],
        Field::AsOf => &["database", "data base", "data_base", "dtbase", "data da base", "databasefund"],
    }
}

const SIDE_ALIASES: [&str; 5] = ["tipo", "side", "lado", "operacao", "operação"];

pub struct CsvPortfolioAdapter {
    path: PathBuf,
    latest_only: bool,
}

impl CsvPortfolioAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            latest_only: true,
        }
    }

    /// Keep every as-of date instead of only each fund's latest.
    pub fn with_latest_only(mut self, latest_only: bool) -> Self {
        self.latest_only = latest_only;
        self
    }

    pub fn parse(content: &str, latest_only: bool) -> Result<PortfolioSnapshot, PretradeError> {
        let mut rdr = reader(content);
        let headers = rdr.headers().map_err(load_error)?.clone();
        let header_index = index_headers(&headers);

        let columns: HashMap<Field, usize> = Field::ALL
            .into_iter()
            .filter_map(|field| find_column(&header_index, aliases(field)).map(|i| (field, i)))
            .collect();
        let present: BTreeSet<Field> = columns.keys().copied().collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(load_error)?;
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            let text = |field: Field| -> String {
                columns
                    .get(&field)
                    .and_then(|&i| record.get(i))
                    .unwrap_or("")
                    .to_string()
            };
            let number = |field: Field| parse_number(&text(field));
            rows.push(PortfolioRow {
                fund: text(Field::FundName).trim().to_string(),
                fund_type: text(Field::FundType),
                instrument: text(Field::Instrument).trim().to_string(),
                market_value: number(Field::MarketValue).unwrap_or(0.0),
                primary: text(Field::Primary),
                secondary: text(Field::Secondary),
                committee: text(Field::Committee),
                instrument_type: text(Field::InstrumentType),
                liquidity: normalize_liquidity(&text(Field::Liquidity)),
                quantity: number(Field::Quantity),
                price: number(Field::Price),
                term_days: number(Field::TermDays),
                tax_id: text(Field::TaxId),
                as_of: parse_date(&text(Field::AsOf)),
            });
        }

        if latest_only {
            rows = keep_latest(rows);
        }
        debug!(rows = rows.len(), columns = present.len(), "portfolio parsed");
        Ok(PortfolioSnapshot::with_columns(rows, present))
    }
}

impl PortfolioPort for CsvPortfolioAdapter {
    fn load_portfolio(&self) -> Result<PortfolioSnapshot, PretradeError> {
        let content = fs::read_to_string(&self.path).map_err(|e| PretradeError::PortfolioLoad {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        Self::parse(&content, self.latest_only)
    }
}

/// Read an order batch (`ativo, quantidade, preco, tipo`) for `fund`.
pub fn load_orders(path: &Path, fund: &str) -> Result<Vec<Order>, PretradeError> {
    let content = fs::read_to_string(path).map_err(|e| PretradeError::PortfolioLoad {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    parse_orders(&content, fund)
}

/// Lines with a blank instrument are skipped; every invalid line is reported.
pub fn parse_orders(content: &str, fund: &str) -> Result<Vec<Order>, PretradeError> {
    let mut rdr = reader(content);
    let headers = rdr.headers().map_err(load_error)?.clone();
    let header_index = index_headers(&headers);

    let required = [
        ("ativo", find_column(&header_index, aliases(Field::Instrument))),
        ("quantidade", find_column(&header_index, aliases(Field::Quantity))),
        ("preco", find_column(&header_index, aliases(Field::Price))),
        ("tipo", find_column(&header_index, &SIDE_ALIASES)),
    ];
    let missing: Vec<String> = required
        .iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| format!("order file is missing column '{name}'"))
        .collect();
    if !missing.is_empty() {
        return Err(PretradeError::Validation { issues: missing });
    }
    let [instrument, quantity, price, side] = required.map(|(_, idx)| idx.unwrap_or_default());

    let mut orders = Vec::new();
    let mut issues = Vec::new();
    for (n, record) in rdr.records().enumerate() {
        // Header is line 1.
        let line = n + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                issues.push(format!("line {line}: {e}"));
                continue;
            }
        };
        let field = |i: usize| record.get(i).unwrap_or("");
        if field(instrument).trim().is_empty() {
            continue;
        }
        let parsed = parse_number(field(quantity))
            .zip(parse_number(field(price)))
            .ok_or_else(|| PretradeError::InvalidOrder {
                reason: "quantity and price must be numbers".to_string(),
            })
            .and_then(|(q, p)| Order::new(fund, field(instrument), q, p, field(side).parse()?));
        match parsed {
            Ok(order) => orders.push(order),
            Err(e) => issues.push(format!("line {line}: {e}")),
        }
    }

    if issues.is_empty() {
        Ok(orders)
    } else {
        Err(PretradeError::Validation { issues })
    }
}

fn reader(content: &str) -> csv::Reader<&[u8]> {
    let first_line = content.lines().next().unwrap_or("");
    let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    };
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes())
}

fn index_headers(headers: &csv::StringRecord) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        index.entry(header_key(h)).or_insert(i);
    }
    index
}

fn header_key(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn find_column(index: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| index.get(&header_key(name)).copied())
}

fn load_error(e: csv::Error) -> PretradeError {
    PretradeError::PortfolioLoad {
        reason: format!("CSV parse error: {e}"),
    }
}

/// Plain `1234.56`, or Brazilian `1.234,56`, optionally prefixed by `R$`.
fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_start_matches("R$").trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .or_else(|| s.replace('.', "").replace(',', ".").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn normalize_liquidity(raw: &str) -> String {
    let s = raw.trim().to_lowercase();
    if HIGH_LIQUIDITY.contains(&s.as_str()) {
        "alta".to_string()
    } else if LOW_LIQUIDITY.contains(&s.as_str()) {
        "baixa".to_string()
    } else {
        s
    }
}

/// Keep each fund's rows at its latest as-of date. A fund with no dated row
/// keeps everything.
fn keep_latest(rows: Vec<PortfolioRow>) -> Vec<PortfolioRow> {
    let mut latest: HashMap<String, NaiveDate> = HashMap::new();
    for row in &rows {
        if let Some(date) = row.as_of {
            latest
                .entry(row.fund.clone())
                .and_modify(|d| *d = (*d).max(date))
                .or_insert(date);
        }
    }
    rows.into_iter()
        .filter(|row| match latest.get(&row.fund) {
            None => true,
            Some(max) => row.as_of == Some(*max),
        })
        .collect()
}
