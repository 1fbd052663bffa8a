// src/domain/diff.rs

use crate::domain::lead::Lead;
use crate::domain::schema::is_lead_field;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The stored and incoming values of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// Field name -> change. Empty means the update is a no-op.
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// Compares the raw update payload against the stored lead.
///
/// Only keys the caller sent are compared, and only lead attributes count;
/// transport keys such as `id` or `updatedAt` never show up in a change set.
/// Values compare structurally, so a resent tag list in the same order is
/// not a change.
pub fn diff_payload(
    existing: &Lead,
    payload: &Map<String, Value>,
) -> Result<ChangeSet, serde_json::Error> {
    let stored = existing.attributes()?;
    let mut changes = ChangeSet::new();

    for (field, incoming) in payload {
        if !is_lead_field(field) {
            continue;
        }
        let current = stored.get(field).unwrap_or(&Value::Null);
        if !same_value(current, incoming) {
            changes.insert(
                field.clone(),
                FieldChange {
                    from: current.clone(),
                    to: incoming.clone(),
                },
            );
        }
    }

    Ok(changes)
}

/// JSON equality, except numbers compare by value: `5000000` equals `5000000.0`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}
