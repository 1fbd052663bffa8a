// src/leads/import.rs
use crate::db::{leads, Database};
use crate::domain::lead::Lead;
use crate::domain::user::Actor;
use crate::errors::ServerError;
use crate::spreadsheets::import_csv::{parse_and_validate, RowError};
use chrono::Utc;
use serde::Serialize;
use std::io::Read;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
}

/// Parses, validates and stores a CSV upload owned by `actor`.
///
/// Valid rows are committed together or not at all. Invalid rows are
/// reported alongside and never block the valid ones. Imports do not
/// write history entries.
pub fn import_leads<R: Read>(
    db: &Database,
    input: R,
    actor: &Actor,
) -> Result<ImportSummary, ServerError> {
    let parsed = parse_and_validate(input, &actor.id)?;

    if parsed.valid_rows.is_empty() {
        warn!(
            actor = %actor.id,
            rows = parsed.total_rows,
            "import rejected, no valid rows"
        );
        return Err(ServerError::NoValidRows(parsed.errors));
    }

    let now = Utc::now();
    let new_leads: Vec<Lead> = parsed
        .valid_rows
        .into_iter()
        .map(|draft| Lead::new(draft, now))
        .collect();

    let inserted = db
        .with_conn(|conn| {
            let tx = conn.transaction()?;
            let inserted = leads::insert_many(&tx, &new_leads)?;
            tx.commit()?;
            Ok(inserted)
        })
        .map_err(|e| {
            warn!(actor = %actor.id, error = %e, "import rolled back");
            ServerError::Transaction(e.to_string())
        })?;

    if !parsed.errors.is_empty() {
        warn!(
            actor = %actor.id,
            rejected = parsed.errors.len(),
            "import skipped invalid rows"
        );
    }
    info!(actor = %actor.id, inserted, "import committed");

    Ok(ImportSummary {
        total_rows: parsed.total_rows,
        success_count: inserted,
        error_count: parsed.errors.len(),
        errors: parsed.errors,
    })
}
