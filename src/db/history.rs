// src/db/history.rs
//! Append-only audit log. The schema triggers reject updates and deletes.

use crate::domain::history::{HistoryDiff, HistoryEntry};
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// How many entries a single-lead view carries.
pub const RECENT_HISTORY: i64 = 5;

pub fn record(
    conn: &Connection,
    buyer_id: &str,
    changed_by: &str,
    diff: HistoryDiff,
    now: DateTime<Utc>,
) -> Result<HistoryEntry, ServerError> {
    let entry = HistoryEntry {
        id: Uuid::new_v4().to_string(),
        buyer_id: buyer_id.to_string(),
        changed_by: changed_by.to_string(),
        changed_at: now,
        diff,
    };

    conn.execute(
        "insert into buyer_history (id, buyer_id, changed_by, changed_at, diff)
         values (?1, ?2, ?3, ?4, ?5)",
        params![
            &entry.id,
            &entry.buyer_id,
            &entry.changed_by,
            entry.changed_at,
            serde_json::to_string(&entry.diff)?,
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert history failed: {e}")))?;

    Ok(entry)
}

/// Newest first. `limit` of `None` returns the whole trail.
/// Works for leads that have since been deleted.
pub fn for_buyer(
    conn: &Connection,
    buyer_id: &str,
    limit: Option<i64>,
) -> Result<Vec<HistoryEntry>, ServerError> {
    let mut stmt = conn.prepare(
        "select id, buyer_id, changed_by, changed_at, diff
         from buyer_history
         where buyer_id = ?1
         order by changed_at desc, rowid desc
         limit ?2",
    )?;

    let rows = stmt.query_map(params![buyer_id, limit.unwrap_or(-1)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, DateTime<Utc>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, buyer_id, changed_by, changed_at, diff_json) = row?;
        entries.push(HistoryEntry {
            id,
            buyer_id,
            changed_by,
            changed_at,
            diff: serde_json::from_str(&diff_json)?,
        });
    }
    Ok(entries)
}
