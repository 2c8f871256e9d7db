//! Markdown report adapter implementing [`ReportPort`].
//!
//! Numbers use Brazilian formatting: `R$ 1.234,56`, `12,34%`, `365,0 dias`.

use crate::domain::batch::BatchReport;
use crate::domain::order::{Order, Side};
use crate::domain::rule_result::{RuleId, RuleResult};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        TextReportAdapter
    }
}

impl ReportPort for TextReportAdapter {
    fn render(&self, report: &BatchReport) -> String {
        let mut out = String::new();
        out.push_str("# Relatório de Pré-Trading - Validação de Regras\n\n");
        out.push_str(&format!("**Fundo:** {}\n\n", report.fund));
        out.push_str(&format!(
            "**PL proposto:** {}\n\n",
            format_brl(report.proposed_nav)
        ));
        out.push_str(&format!(
            "**Resultado:** {}\n\n",
            if report.all_passed() {
                "todas as regras atendidas"
            } else {
                "há regras violadas"
            }
        ));
        out.push_str(&format_orders_table(&report.orders));
        out.push_str(&format_rules_table(&report.results));
        out.push_str(&format_observations(&report.results));
        out
    }
}

fn rule_label(rule: RuleId) -> &'static str {
    match rule {
        RuleId::RegulatoryAllocation => "Enquadramento CVM",
        RuleId::TaxAllocation => "Enquadramento Tributário",
        RuleId::AverageTerm => "Prazo Médio",
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Buy => "compra",
        Side::Sell => "venda",
    }
}

pub fn format_orders_table(orders: &[Order]) -> String {
    let mut out = String::from("## Resumo das Ordens\n\n");
    if orders.is_empty() {
        out.push_str("Nenhuma ordem encontrada.\n\n");
        return out;
    }
    out.push_str("| Ativo | Tipo | Quantidade | Preço | Total |\n");
    out.push_str("|---|:---:|---:|---:|---:|\n");
    for o in orders {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            o.instrument,
            side_label(o.side),
            group_thousands(o.quantity, 0),
            format_brl(o.price),
            format_brl(o.value())
        ));
    }
    out.push('\n');
    out
}

pub fn format_rules_table(results: &[RuleResult]) -> String {
    let mut out = String::from("## Detalhamento das Regras\n\n");
    if results.is_empty() {
        out.push_str("Sem resultados.\n\n");
        return out;
    }
    out.push_str("| Regra | Status | Atual | Proposto | Limite |\n");
    out.push_str("|---|:---:|---:|---:|---:|\n");
    for r in results {
        let (current, proposed, limit) = if r.rule.is_ratio() {
            (
                format_pct(r.current),
                format_pct(r.proposed),
                format_limit_pct(r.limit),
            )
        } else {
            (
                format_days(r.current, 1),
                format_days(r.proposed, 1),
                format_days(r.limit, 0),
            )
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            rule_label(r.rule),
            if r.passed { "OK" } else { "FALHOU" },
            current,
            proposed,
            limit
        ));
    }
    out.push('\n');
    out
}

pub fn format_observations(results: &[RuleResult]) -> String {
    let messages: Vec<&str> = results
        .iter()
        .map(|r| r.message.as_str())
        .filter(|m| !m.is_empty())
        .collect();
    if messages.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Observações\n\n");
    for m in messages {
        out.push_str(&format!("- {m}\n"));
    }
    out
}

/// `1234567.891` with 2 decimals becomes `1.234.567,89`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    if let Some(frac) = frac_part {
        grouped.push(',');
        grouped.push_str(frac);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_brl(value: f64) -> String {
    format!("R$ {}", group_thousands(value, 2))
}

pub fn format_pct(ratio: f64) -> String {
    format!("{}%", group_thousands(ratio * 100.0, 2))
}

/// Limits above 1 are taken as already in percent.
pub fn format_limit_pct(limit: f64) -> String {
    let pct = if limit > 1.0 { limit } else { limit * 100.0 };
    format!("{}%", group_thousands(pct, 2))
}

pub fn format_days(days: f64, decimals: usize) -> String {
    format!("{} dias", format!("{:.*}", decimals, days).replace('.', ","))
}
