//! Resolving everything known about a single field of a message.

use crate::{
    message,
    registry::SchemaRegistry,
    validation::check_field,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;

/// The resolved view of one field: its definition, its current value and
/// whether that value satisfies the definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub segment: String,
    /// 1-based field number within the segment.
    pub field: usize,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub data_type: String,
    pub length: Option<usize>,
    pub table: Option<String>,
    /// Code → label values of [`FieldInfo::table`], when the table is registered.
    pub table_values: Option<BTreeMap<String, String>>,
    pub value: String,
    pub is_valid: bool,
    pub validation_message: Option<String>,
}

/// Resolve the field at raw position `field_position` of segment line
/// `line_index`.
///
/// `lines` is the output of [`message::split`]. Position 0 is the segment id
/// and never resolves. `None` when the line doesn't exist, its segment isn't
/// registered, or the segment definition has no field at that position.
#[instrument(level = "trace", skip(lines, registry))]
pub fn resolve_field(
    lines: &[&str],
    line_index: usize,
    field_position: usize,
    registry: &SchemaRegistry,
) -> Option<FieldInfo> {
    let line = lines.get(line_index)?;
    let fields = message::fields(line);
    let segment_id = fields[0];
    let segment = registry.segment(segment_id)?;
    let definition = segment.fields.get(field_position.checked_sub(1)?)?;

    let value = fields.get(field_position).copied().unwrap_or_default();
    let validation_message = check_field(segment_id, field_position, definition, Some(value));
    let table_values = definition
        .table
        .as_deref()
        .and_then(|table| registry.table(table))
        .map(|table| table.values.clone());

    Some(FieldInfo {
        segment: segment_id.to_string(),
        field: field_position,
        name: definition.name.clone(),
        description: definition.description.clone(),
        required: definition.required,
        data_type: definition.data_type.clone(),
        length: definition.length,
        table: definition.table.clone(),
        table_values,
        value: value.to_string(),
        is_valid: validation_message.is_none(),
        validation_message,
    })
}

/// Split `text` and resolve a field in it; see [`resolve_field`].
pub fn inspect(
    text: &str,
    line_index: usize,
    field_position: usize,
    registry: &SchemaRegistry,
) -> Option<FieldInfo> {
    resolve_field(&message::split(text), line_index, field_position, registry)
}
