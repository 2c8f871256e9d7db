//! Target specification AST and row selection.
//!
//! A [`TargetSpec`] is a recursive boolean expression over portfolio-row
//! fields. Selection is structural recursion producing one boolean per row:
//!
//! - `Groups`: logical OR of the children (empty matches nothing)
//! - `All`: logical AND of the children (empty matches everything)
//! - `AtivoEquals`, `Any`, `ColumnIn`: trimmed, lower-cased set membership
//! - `AtivoPrefix`: literal prefix on the untrimmed identifier
//! - `Regex`: case-insensitive search over `"primary | secondary | committee"`

use crate::domain::portfolio::{norm, PortfolioRow};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// Row fields addressable by a per-column value list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Primary,
    Secondary,
    Committee,
    InstrumentType,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Primary,
        Column::Secondary,
        Column::Committee,
        Column::InstrumentType,
    ];

    /// Key used for this column in the rules document.
    pub fn key(self) -> &'static str {
        match self {
            Column::Primary => "categoria",
            Column::Secondary => "categoria 2",
            Column::Committee => "categoria comitê",
            Column::InstrumentType => "tipo de ativo",
        }
    }

    fn value(self, row: &PortfolioRow) -> &str {
        match self {
            Column::Primary => &row.primary,
            Column::Secondary => &row.secondary,
            Column::Committee => &row.committee,
            Column::InstrumentType => &row.instrument_type,
        }
    }
}

/// Case-insensitive compiled pattern, compared by its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        regex::RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    Groups(Vec<TargetSpec>),
    All(Vec<TargetSpec>),
    AtivoEquals(BTreeSet<String>),
    AtivoPrefix(Vec<String>),
    Any(BTreeSet<String>),
    ColumnIn(Column, BTreeSet<String>),
    Regex(Pattern),
}

impl TargetSpec {
    /// Spec that selects no row.
    pub fn nothing() -> Self {
        TargetSpec::Groups(Vec::new())
    }

    /// Build a normalized value set for the membership variants.
    pub fn value_set<I, S>(values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values.into_iter().map(|v| norm(v.as_ref())).collect()
    }

    pub fn matches(&self, row: &PortfolioRow) -> bool {
        match self {
            TargetSpec::Groups(specs) => specs.iter().any(|s| s.matches(row)),
            TargetSpec::All(specs) => specs.iter().all(|s| s.matches(row)),
            TargetSpec::AtivoEquals(values) => values.contains(&norm(&row.instrument)),
            TargetSpec::AtivoPrefix(prefixes) => {
                prefixes.iter().any(|p| row.instrument.starts_with(p.as_str()))
            }
            TargetSpec::Any(values) => {
                !values.is_empty() && row.categories().iter().any(|c| values.contains(&norm(c)))
            }
            TargetSpec::ColumnIn(column, values) => values.contains(&norm(column.value(row))),
            TargetSpec::Regex(pattern) => pattern.is_match(&row_text(row)),
        }
    }
}

/// Inclusion mask, one entry per row.
pub fn select<'a, I>(rows: I, spec: &TargetSpec) -> Vec<bool>
where
    I: IntoIterator<Item = &'a PortfolioRow>,
{
    rows.into_iter().map(|row| spec.matches(row)).collect()
}

/// Sum of market values of the rows matched by `spec`.
pub fn matched_value<'a, I>(rows: I, spec: &TargetSpec) -> f64
where
    I: IntoIterator<Item = &'a PortfolioRow>,
{
    rows.into_iter()
        .filter(|row| spec.matches(row))
        .map(|row| row.market_value)
        .sum()
}

fn row_text(row: &PortfolioRow) -> String {
    row.categories().join(" | ")
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        let joined = |values: &BTreeSet<String>| {
            values.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        match self {
            TargetSpec::Groups(specs) => {
                write!(f, "ANY_OF(")?;
                list(f, specs)?;
                write!(f, ")")
            }
            TargetSpec::All(specs) => {
                write!(f, "ALL_OF(")?;
                list(f, specs)?;
                write!(f, ")")
            }
            TargetSpec::AtivoEquals(values) => write!(f, "ativo IN [{}]", joined(values)),
            TargetSpec::AtivoPrefix(prefixes) => {
                write!(f, "ativo STARTS_WITH [{}]", prefixes.join(", "))
            }
            TargetSpec::Any(values) => write!(f, "any category IN [{}]", joined(values)),
            TargetSpec::ColumnIn(column, values) => {
                write!(f, "{} IN [{}]", column.key(), joined(values))
            }
            TargetSpec::Regex(pattern) => write!(f, "categories ~ /{}/i", pattern.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(instrument: &str, primary: &str, secondary: &str, committee: &str) -> PortfolioRow {
        PortfolioRow {
            primary: primary.into(),
            secondary: secondary.into(),
            committee: committee.into(),
            instrument_type: "acoes".into(),
            ..PortfolioRow::new("ALPHA", instrument, 1.0)
        }
    }

    fn rows() -> Vec<PortfolioRow> {
        vec![
            row("PETR4", "Renda Variável", "Outros", "Renda Variável"),
            row("LFT - 01/09/2027", "Renda Fixa", "Outros", "Renda Fixa"),
            row(" Cota XP ", "Multimercado", "Cotas de Fundos", "Multimercado"),
        ]
    }

    #[test]
    fn any_matches_any_category_case_insensitive() {
        let spec = TargetSpec::Any(TargetSpec::value_set(["  renda VARIÁVEL "]));
        assert_eq!(select(&rows(), &spec), vec![true, false, false]);
    }

    #[test]
    fn empty_any_matches_nothing() {
        let spec = TargetSpec::Any(BTreeSet::new());
        assert_eq!(select(&rows(), &spec), vec![false, false, false]);
    }

    #[test]
    fn column_in_checks_only_that_column() {
        let spec = TargetSpec::ColumnIn(Column::Secondary, TargetSpec::value_set(["cotas de fundos"]));
        assert_eq!(select(&rows(), &spec), vec![false, false, true]);
        let spec = TargetSpec::ColumnIn(Column::InstrumentType, TargetSpec::value_set(["ACOES"]));
        assert_eq!(select(&rows(), &spec), vec![true, true, true]);
    }

    #[test]
    fn ativo_equals_is_trimmed_and_case_insensitive() {
        let spec = TargetSpec::AtivoEquals(TargetSpec::value_set(["cota xp", "petr4"]));
        assert_eq!(select(&rows(), &spec), vec![true, false, true]);
    }

    #[test]
    fn ativo_prefix_is_literal() {
        let spec = TargetSpec::AtivoPrefix(vec!["LFT".into()]);
        assert_eq!(select(&rows(), &spec), vec![false, true, false]);
        let lower = TargetSpec::AtivoPrefix(vec!["lft".into()]);
        assert_eq!(select(&rows(), &lower), vec![false, false, false]);
        let untrimmed = TargetSpec::AtivoPrefix(vec!["Cota".into()]);
        assert_eq!(select(&rows(), &untrimmed), vec![false, false, false]);
    }

    #[test]
    fn regex_searches_joined_categories() {
        let spec = TargetSpec::Regex(Pattern::new(r"fixa \| outros").unwrap());
        assert_eq!(select(&rows(), &spec), vec![false, true, false]);
        let spec = TargetSpec::Regex(Pattern::new("^multi").unwrap());
        assert_eq!(select(&rows(), &spec), vec![false, false, true]);
    }

    #[test]
    fn groups_is_or_and_all_is_and() {
        let rv = TargetSpec::Any(TargetSpec::value_set(["Renda Variável"]));
        let outros = TargetSpec::ColumnIn(Column::Secondary, TargetSpec::value_set(["Outros"]));
        let groups = TargetSpec::Groups(vec![rv.clone(), outros.clone()]);
        let all = TargetSpec::All(vec![rv, outros]);
        assert_eq!(select(&rows(), &groups), vec![true, true, false]);
        assert_eq!(select(&rows(), &all), vec![true, false, false]);
    }

    #[test]
    fn nothing_selects_no_row() {
        assert_eq!(select(&rows(), &TargetSpec::nothing()), vec![false, false, false]);
    }

    #[test]
    fn empty_all_selects_every_row() {
        assert_eq!(select(&rows(), &TargetSpec::All(vec![])), vec![true, true, true]);
    }

    #[test]
    fn matched_value_sums_selected_rows() {
        let mut data = rows();
        data[0].market_value = 600.0;
        data[1].market_value = 400.0;
        let spec = TargetSpec::AtivoPrefix(vec!["PETR".into(), "LFT".into()]);
        assert!((matched_value(&data, &spec) - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_renders_tree() {
        let spec = TargetSpec::Groups(vec![
            TargetSpec::Any(TargetSpec::value_set(["FIDC"])),
            TargetSpec::AtivoPrefix(vec!["NTNB".into()]),
        ]);
        assert_eq!(
            spec.to_string(),
            "ANY_OF(any category IN [fidc], ativo STARTS_WITH [NTNB])"
        );
    }
}
