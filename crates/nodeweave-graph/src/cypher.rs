//! Cypher fragment rendering.
//!
//! Labels, property keys, and edge types are interpolated directly; they are
//! guaranteed to be plain identifiers by `SchemaDefinition`. Values always
//! travel as parameters.

use nodeweave_core::{Direction, Properties};

use crate::runner::Params;

/// Render `(ident:Label {key: $prefix_key, ...})`, adding the parameters to `params`.
pub(crate) fn node_pattern(
    identifier: Option<&str>,
    label: &str,
    conditions: &Properties,
    prefix: &str,
    params: &mut Params,
) -> String {
    let ident = identifier.unwrap_or_default();
    if conditions.is_empty() {
        return format!("({ident}:{label})");
    }
    format!(
        "({ident}:{label} {})",
        property_map(conditions, prefix, params)
    )
}

/// Render `{key: $prefix_key, ...}`, adding the parameters to `params`.
pub(crate) fn property_map(properties: &Properties, prefix: &str, params: &mut Params) -> String {
    let entries: Vec<String> = properties
        .iter()
        .map(|(key, value)| {
            let name = format!("{prefix}_{key}");
            params.insert(name.clone(), value.clone());
            format!("{key}: ${name}")
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Render the relationship part of a pattern, e.g. `-[r:LIKES]->`.
pub(crate) fn relationship(
    identifier: Option<&str>,
    edge_type: Option<&str>,
    direction: Direction,
) -> String {
    let inner = match (identifier, edge_type) {
        (None, None) => String::new(),
        (ident, Some(ty)) => format!("[{}:{ty}]", ident.unwrap_or_default()),
        (Some(ident), None) => format!("[{ident}]"),
    };
    match direction {
        Direction::Out => format!("-{inner}->"),
        Direction::In => format!("<-{inner}-"),
        Direction::Either => format!("-{inner}-"),
    }
}

/// Edge-creating pattern between two bound identifiers.
///
/// `Either` has no direction to create, so the edge points away from `source`.
pub(crate) fn create_edge(
    source: &str,
    target: &str,
    edge_type: &str,
    direction: Direction,
) -> String {
    match direction {
        Direction::In => format!("({source})<-[:{edge_type}]-({target})"),
        Direction::Out | Direction::Either => format!("({source})-[:{edge_type}]->({target})"),
    }
}
