// src/db/leads.rs
use crate::domain::lead::{Lead, LeadDraft};
use crate::domain::query::{LeadFilter, LeadQuery};
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const LEAD_COLUMNS: &str = r#"
    id, full_name, email, phone, city, property_type, bhk, purpose,
    budget_min, budget_max, timeline, source, status, notes, tags,
    owner_id, created_at, updated_at
"#;

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    let tags_json: String = row.get("tags")?;
    let tags = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            14,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    Ok(Lead {
        id: row.get("id")?,
        fields: LeadDraft {
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            city: row.get("city")?,
            property_type: row.get("property_type")?,
            bhk: row.get("bhk")?,
            purpose: row.get("purpose")?,
            budget_min: row.get("budget_min")?,
            budget_max: row.get("budget_max")?,
            timeline: row.get("timeline")?,
            source: row.get("source")?,
            status: row.get("status")?,
            notes: row.get("notes")?,
            tags,
            owner_id: row.get("owner_id")?,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn tags_json(draft: &LeadDraft) -> Result<String, ServerError> {
    Ok(serde_json::to_string(&draft.tags)?)
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Lead>, ServerError> {
    let sql = format!("SELECT {LEAD_COLUMNS} FROM buyers WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], lead_from_row).optional()?)
}

/// Inserts a new lead row.
pub fn insert(conn: &Connection, lead: &Lead) -> Result<(), ServerError> {
    insert_many(conn, std::slice::from_ref(lead)).map(|_| ())
}

/// Inserts every lead with one prepared statement.
///
/// Callers that need all-or-nothing semantics pass a `Transaction`;
/// the first failing row aborts the loop and leaves the rollback to them.
pub fn insert_many(conn: &Connection, leads: &[Lead]) -> Result<usize, ServerError> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO buyers (
            id, full_name, email, phone, city, property_type, bhk, purpose,
            budget_min, budget_max, timeline, source, status, notes, tags,
            owner_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )?;

    for lead in leads {
        let f = &lead.fields;
        stmt.execute(params![
            &lead.id,
            &f.full_name,
            &f.email,
            &f.phone,
            f.city,
            f.property_type,
            f.bhk,
            f.purpose,
            f.budget_min,
            f.budget_max,
            f.timeline,
            f.source,
            f.status,
            &f.notes,
            tags_json(f)?,
            &f.owner_id,
            lead.created_at,
            lead.updated_at,
        ])?;
    }

    Ok(leads.len())
}

/// Overwrites a lead's attributes, but only if nobody else wrote it since
/// `expected_updated_at` was read. Returns false when the row moved on
/// (or vanished).
pub fn update_if_unchanged(
    conn: &Connection,
    id: &str,
    draft: &LeadDraft,
    expected_updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool, ServerError> {
    let updated = conn.execute(
        r#"
        UPDATE buyers SET
            full_name = ?1, email = ?2, phone = ?3, city = ?4, property_type = ?5,
            bhk = ?6, purpose = ?7, budget_min = ?8, budget_max = ?9, timeline = ?10,
            source = ?11, status = ?12, notes = ?13, tags = ?14, owner_id = ?15,
            updated_at = ?16
        WHERE id = ?17 AND updated_at = ?18
        "#,
        params![
            &draft.full_name,
            &draft.email,
            &draft.phone,
            draft.city,
            draft.property_type,
            draft.bhk,
            draft.purpose,
            draft.budget_min,
            draft.budget_max,
            draft.timeline,
            draft.source,
            draft.status,
            &draft.notes,
            tags_json(draft)?,
            &draft.owner_id,
            now,
            id,
            expected_updated_at,
        ],
    )?;
    Ok(updated == 1)
}

/// Removes a lead from the primary store. Its history stays.
pub fn delete(conn: &Connection, id: &str) -> Result<bool, ServerError> {
    let deleted = conn.execute("DELETE FROM buyers WHERE id = ?1", params![id])?;
    Ok(deleted == 1)
}

/// Builds the WHERE clause and its bind values in the same order.
fn where_clause(filter: &LeadFilter) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    let exact = [
        ("city", filter.city.map(|v| v.as_str())),
        ("property_type", filter.property_type.map(|v| v.as_str())),
        ("status", filter.status.map(|v| v.as_str())),
        ("timeline", filter.timeline.map(|v| v.as_str())),
    ];
    for (column, value) in exact {
        if let Some(value) = value {
            clauses.push(format!("{column} = ?"));
            binds.push(SqlValue::Text(value.to_string()));
        }
    }

    if let Some(search) = &filter.search {
        // SQLite LIKE is case-insensitive for ASCII; escape its wildcards.
        let pattern = format!("%{}%", escape_like(search));
        clauses.push(
            "(full_name LIKE ? ESCAPE '\\' OR phone LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')"
                .to_string(),
        );
        for _ in 0..3 {
            binds.push(SqlValue::Text(pattern.clone()));
        }
    }

    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), binds)
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn count(conn: &Connection, filter: &LeadFilter) -> Result<i64, ServerError> {
    let (where_sql, binds) = where_clause(filter);
    let sql = format!("SELECT COUNT(*) FROM buyers {where_sql}");
    Ok(conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?)
}

/// Runs the query's filter and sort. `paged` applies its page/limit;
/// exports pass `false` to get every match.
pub fn find(conn: &Connection, query: &LeadQuery, paged: bool) -> Result<Vec<Lead>, ServerError> {
    let (where_sql, mut binds) = where_clause(&query.filter);
    // Sort columns come from a closed enum, never from raw input.
    let mut sql = format!(
        "SELECT {LEAD_COLUMNS} FROM buyers {where_sql} ORDER BY {} {}, rowid {}",
        query.sort_by.column(),
        query.sort_order.keyword(),
        query.sort_order.keyword(),
    );
    if paged {
        sql.push_str(" LIMIT ? OFFSET ?");
        binds.push(SqlValue::Integer(query.limit));
        binds.push(SqlValue::Integer(query.offset()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(binds.iter()), lead_from_row)?;

    let mut leads = Vec::new();
    for row in rows {
        leads.push(row?);
    }
    Ok(leads)
}
