// src/leads/queries.rs
use crate::db::{history, leads, Database};
use crate::domain::history::HistoryEntry;
use crate::domain::lead::Lead;
use crate::domain::query::{LeadQuery, Page};
use crate::errors::ServerError;

/// A lead with its most recent audit entries, newest first.
pub fn get_lead(db: &Database, id: &str) -> Result<(Lead, Vec<HistoryEntry>), ServerError> {
    db.with_conn(|conn| {
        let lead = leads::find_by_id(conn, id)?.ok_or(ServerError::NotFound)?;
        let recent = history::for_buyer(conn, id, Some(history::RECENT_HISTORY))?;
        Ok((lead, recent))
    })
}

/// The full audit trail, which outlives the lead itself.
pub fn lead_history(db: &Database, id: &str) -> Result<Vec<HistoryEntry>, ServerError> {
    db.with_conn(|conn| {
        let entries = history::for_buyer(conn, id, None)?;
        if entries.is_empty() && leads::find_by_id(conn, id)?.is_none() {
            return Err(ServerError::NotFound);
        }
        Ok(entries)
    })
}

pub fn list_leads(db: &Database, query: &LeadQuery) -> Result<Page<Lead>, ServerError> {
    db.with_conn(|conn| {
        let total = leads::count(conn, &query.filter)?;
        let data = leads::find(conn, query, true)?;
        Ok(Page::new(data, total, query))
    })
}

/// Every lead matching the query's filter and sort, ignoring paging.
pub fn export_leads(db: &Database, query: &LeadQuery) -> Result<Vec<Lead>, ServerError> {
    db.with_conn(|conn| leads::find(conn, query, false))
}
