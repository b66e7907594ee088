use crate::error::{Error, Result};
use crate::ir::{is_truthy, json_eq, FieldCatalog, FieldKind, Record, ResolvedValue};
use serde_json::Value as Json;

/// Resolve a record's raw value for `field_name` against the catalog.
pub fn resolve_field(catalog: &FieldCatalog, record: &Record, field_name: &str) -> Result<ResolvedValue> {
    let descriptor = catalog
        .get(field_name)
        .ok_or_else(|| Error::FieldNotFound(field_name.to_string()))?;
    let raw = record.get(field_name).unwrap_or(&Json::Null);

    match &descriptor.kind {
        FieldKind::Reference => resolve_reference(field_name, raw),
        FieldKind::Selection(pairs) => Ok(resolve_selection(pairs, raw)),
        FieldKind::Scalar => Ok(ResolvedValue {
            value: raw.clone(),
            label: raw.clone(),
        }),
    }
}

/// `[id, label]` pair, or any falsy value for an unset reference.
fn resolve_reference(field_name: &str, raw: &Json) -> Result<ResolvedValue> {
    if !is_truthy(raw) {
        return Ok(ResolvedValue::missing());
    }
    match raw.as_array().map(Vec::as_slice) {
        Some([id, label, ..]) => Ok(ResolvedValue {
            value: id.clone(),
            label: label.clone(),
        }),
        _ => Err(Error::malformed(field_name, raw)),
    }
}

/// First pair whose key equals the raw value wins.
fn resolve_selection(pairs: &[(Json, String)], raw: &Json) -> ResolvedValue {
    match pairs.iter().find(|(key, _)| json_eq(key, raw)) {
        Some((_, label)) => ResolvedValue {
            value: raw.clone(),
            label: Json::String(label.clone()),
        },
        None => ResolvedValue::missing(),
    }
}
