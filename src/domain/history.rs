// src/domain/history.rs

use crate::domain::diff::ChangeSet;
use crate::domain::lead::LeadDraft;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// What a history entry records about its lead.
///
/// On the wire a creation is `{"action":"created", ...snapshot}`, a deletion
/// is `{"action":"deleted"}`, and an update is the bare change set.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryDiff {
    Created(LeadDraft),
    Changed(ChangeSet),
    Deleted,
}

/// One immutable audit record. Never updated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub buyer_id: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub diff: HistoryDiff,
}

impl HistoryDiff {
    pub fn action(&self) -> &'static str {
        match self {
            HistoryDiff::Created(_) => "created",
            HistoryDiff::Changed(_) => "updated",
            HistoryDiff::Deleted => "deleted",
        }
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            HistoryDiff::Created(snapshot) => {
                let mut map = Map::new();
                map.insert("action".to_string(), Value::from("created"));
                if let Value::Object(fields) = serde_json::to_value(snapshot)? {
                    map.extend(fields);
                }
                Ok(Value::Object(map))
            }
            HistoryDiff::Changed(changes) => serde_json::to_value(changes),
            HistoryDiff::Deleted => {
                let mut map = Map::new();
                map.insert("action".to_string(), Value::from("deleted"));
                Ok(Value::Object(map))
            }
        }
    }

    fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut map) = value else {
            return Err(serde_json::Error::custom("history diff must be an object"));
        };
        match map.get("action").and_then(Value::as_str) {
            Some("deleted") => Ok(HistoryDiff::Deleted),
            Some("created") => {
                map.remove("action");
                Ok(HistoryDiff::Created(serde_json::from_value(Value::Object(
                    map,
                ))?))
            }
            Some(other) => Err(serde_json::Error::custom(format!(
                "unknown history action '{other}'"
            ))),
            None => Ok(HistoryDiff::Changed(serde_json::from_value(
                Value::Object(map),
            )?)),
        }
    }
}

impl Serialize for HistoryDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HistoryDiff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        HistoryDiff::from_json(value).map_err(D::Error::custom)
    }
}
