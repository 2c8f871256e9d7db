//! Parser from the rules document's `alvo` mappings into [`TargetSpec`].
//!
//! Key precedence at one level: `groups`, then `all`, then `ativo_equals`,
//! then `ativo_prefix`. Otherwise `any`, the per-column lists and `regex` are
//! combined with OR. A mapping with none of these keys, or a non-mapping
//! value, selects nothing.

use crate::domain::error::PretradeError;
use crate::domain::target::{Column, Pattern, TargetSpec};
use serde_yaml::Value;

pub fn parse(value: &Value) -> Result<TargetSpec, PretradeError> {
    if !value.is_mapping() {
        return Ok(TargetSpec::nothing());
    }

    if let Some(Value::Sequence(items)) = value.get("groups") {
        let specs = items.iter().map(parse).collect::<Result<Vec<_>, _>>()?;
        return Ok(TargetSpec::Groups(specs));
    }

    if let Some(Value::Sequence(items)) = value.get("all") {
        let specs = items.iter().map(parse).collect::<Result<Vec<_>, _>>()?;
        return Ok(TargetSpec::All(specs));
    }

    if let Some(values) = value.get("ativo_equals") {
        return Ok(TargetSpec::AtivoEquals(TargetSpec::value_set(text_list(values))));
    }

    if let Some(values) = value.get("ativo_prefix") {
        return Ok(TargetSpec::AtivoPrefix(text_list(values)));
    }

    let mut parts = Vec::new();

    if let Some(values) = value.get("any") {
        let set = TargetSpec::value_set(text_list(values));
        if !set.is_empty() {
            parts.push(TargetSpec::Any(set));
        }
    }

    for column in Column::ALL {
        let found = value
            .get(column.key())
            .or_else(|| alias(column).and_then(|a| value.get(a)));
        if let Some(values) = found {
            parts.push(TargetSpec::ColumnIn(
                column,
                TargetSpec::value_set(text_list(values)),
            ));
        }
    }

    if let Some(Value::String(source)) = value.get("regex") {
        if !source.trim().is_empty() {
            let pattern = Pattern::new(source).map_err(|e| PretradeError::TargetParse {
                reason: format!("invalid regex '{source}': {e}"),
            })?;
            parts.push(TargetSpec::Regex(pattern));
        }
    }

    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => TargetSpec::Groups(parts),
    })
}

fn alias(column: Column) -> Option<&'static str> {
    match column {
        Column::Committee => Some("categoria comite"),
        _ => None,
    }
}

/// A list of scalars, or a single scalar treated as a one-item list.
fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
