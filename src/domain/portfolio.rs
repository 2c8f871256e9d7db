//! Portfolio rows and snapshots.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Secondary category marking derivatives margin rows, excluded from NAV.
pub const FUTURES_CATEGORY: &str = "futuros";

/// Fund type reported when no row carries one.
pub const UNKNOWN_FUND_TYPE: &str = "DESCONHECIDO";

/// Canonical columns of the portfolio table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    FundName,
    FundType,
    Instrument,
    MarketValue,
    Primary,
    Secondary,
    Committee,
    InstrumentType,
    Liquidity,
    Quantity,
    Price,
    TermDays,
    TaxId,
    AsOf,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::FundName,
        Field::FundType,
        Field::Instrument,
        Field::MarketValue,
        Field::Primary,
        Field::Secondary,
        Field::Committee,
        Field::InstrumentType,
        Field::Liquidity,
        Field::Quantity,
        Field::Price,
        Field::TermDays,
        Field::TaxId,
        Field::AsOf,
    ];

    /// Columns the position simulator cannot work without.
    pub const REQUIRED: [Field; 3] = [Field::FundName, Field::Instrument, Field::MarketValue];

    pub fn name(self) -> &'static str {
        match self {
            Field::FundName => "nome do fundo",
            Field::FundType => "tipo do fundo",
            Field::Instrument => "ativo",
            Field::MarketValue => "valor",
            Field::Primary => "categoria",
            Field::Secondary => "categoria 2",
            Field::Committee => "categoria comitê",
            Field::InstrumentType => "tipo de ativo",
            Field::Liquidity => "liquidez",
            Field::Quantity => "quantidade",
            Field::Price => "preco",
            Field::TermDays => "prazo_dias",
            Field::TaxId => "cnpj",
            Field::AsOf => "database",
        }
    }
}

/// One line of a fund's holdings.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PortfolioRow {
    pub fund: String,
    pub fund_type: String,
    pub instrument: String,
    pub market_value: f64,
    pub primary: String,
    pub secondary: String,
    pub committee: String,
    pub instrument_type: String,
    pub liquidity: String,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub term_days: Option<f64>,
    pub tax_id: String,
    pub as_of: Option<NaiveDate>,
}

impl PortfolioRow {
    pub fn new(fund: &str, instrument: &str, market_value: f64) -> Self {
        PortfolioRow {
            fund: fund.to_string(),
            instrument: instrument.to_string(),
            market_value,
            ..Default::default()
        }
    }

    pub fn is_futures(&self) -> bool {
        norm(&self.secondary) == FUTURES_CATEGORY
    }

    /// The three classification dimensions, in fixed order.
    pub fn categories(&self) -> [&str; 3] {
        [&self.primary, &self.secondary, &self.committee]
    }
}

/// Ordered collection of portfolio rows for one or more funds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    rows: Vec<PortfolioRow>,
    columns: BTreeSet<Field>,
}

impl PortfolioSnapshot {
    /// Snapshot carrying every canonical column.
    pub fn new(rows: Vec<PortfolioRow>) -> Self {
        PortfolioSnapshot {
            rows,
            columns: Field::ALL.into_iter().collect(),
        }
    }

    /// Snapshot whose source table only provided `columns`.
    pub fn with_columns(rows: Vec<PortfolioRow>, columns: BTreeSet<Field>) -> Self {
        PortfolioSnapshot { rows, columns }
    }

    pub fn rows(&self) -> &[PortfolioRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PortfolioRow> {
        self.rows
    }

    pub fn columns(&self) -> &BTreeSet<Field> {
        &self.columns
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn fund_rows<'a>(&'a self, fund: &'a str) -> impl Iterator<Item = &'a PortfolioRow> + 'a {
        self.rows.iter().filter(move |r| r.fund == fund)
    }

    pub fn has_fund(&self, fund: &str) -> bool {
        self.rows.iter().any(|r| r.fund == fund)
    }

    /// Fund names in first-seen order.
    pub fn funds(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.fund.as_str()))
            .map(|r| r.fund.clone())
            .collect()
    }

    /// First non-empty fund type of the fund's rows, upper-cased.
    pub fn fund_type(&self, fund: &str) -> String {
        self.fund_rows(fund)
            .map(|r| r.fund_type.trim())
            .find(|t| !t.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| UNKNOWN_FUND_TYPE.to_string())
    }

    /// The fund's rows excluding derivatives margin.
    pub fn fund_rows_ex_futures<'a>(&'a self, fund: &'a str) -> Vec<&'a PortfolioRow> {
        self.fund_rows(fund).filter(|r| !r.is_futures()).collect()
    }

    /// Net asset value: market value of the fund ex-futures.
    pub fn nav_ex_futures(&self, fund: &str) -> f64 {
        self.fund_rows(fund)
            .filter(|r| !r.is_futures())
            .map(|r| r.market_value)
            .sum()
    }

    /// Sum of market values held in `instrument` by `fund`.
    pub fn held_value(&self, fund: &str, instrument: &str) -> f64 {
        self.fund_rows(fund)
            .filter(|r| r.instrument == instrument)
            .map(|r| r.market_value)
            .sum()
    }

    pub fn holds(&self, fund: &str, instrument: &str) -> bool {
        self.fund_rows(fund).any(|r| r.instrument == instrument)
    }
}

/// Trimmed, lower-cased projection used for case-insensitive comparisons.
pub fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}
