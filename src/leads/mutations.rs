// src/leads/mutations.rs
use crate::db::{history, leads, Database};
use crate::domain::diff::{diff_payload, ChangeSet};
use crate::domain::history::HistoryDiff;
use crate::domain::lead::Lead;
use crate::domain::schema::{is_lead_field, validate};
use crate::domain::user::Actor;
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

#[derive(Debug)]
pub enum UpdateOutcome {
    /// The payload matched what is stored; nothing was written.
    Unchanged(Lead),
    Updated { lead: Lead, changes: ChangeSet },
}

fn authorize(lead: &Lead, actor: &Actor) -> Result<(), ServerError> {
    if actor.is_admin() || lead.fields.owner_id == actor.id {
        Ok(())
    } else {
        Err(ServerError::Forbidden(
            "Not authorized to modify this buyer".into(),
        ))
    }
}

fn load(conn: &rusqlite::Connection, id: &str) -> Result<Lead, ServerError> {
    leads::find_by_id(conn, id)?.ok_or(ServerError::NotFound)
}

/// Creates a lead owned by `actor`. Any `ownerId` in the payload is replaced.
pub fn create_lead(
    db: &Database,
    payload: &Map<String, Value>,
    actor: &Actor,
) -> Result<Lead, ServerError> {
    let mut candidate = payload.clone();
    candidate.insert("ownerId".into(), Value::from(actor.id.as_str()));

    let draft = validate(&candidate).map_err(ServerError::Validation)?;
    let lead = Lead::new(draft, Utc::now());

    db.with_conn(|conn| {
        let tx = conn.transaction()?;
        leads::insert(&tx, &lead)?;
        history::record(
            &tx,
            &lead.id,
            &actor.id,
            HistoryDiff::Created(lead.fields.clone()),
            lead.created_at,
        )?;
        tx.commit()?;
        Ok(())
    })?;

    info!(lead_id = %lead.id, actor = %actor.id, "buyer created");
    Ok(lead)
}

/// Applies a partial update.
///
/// The merged record is validated as a whole, but the change set is computed
/// from the raw payload, so a value that normalizes to what is stored (a blank
/// string for an absent optional field) still counts as a change.
pub fn update_lead(
    db: &Database,
    id: &str,
    payload: &Map<String, Value>,
    actor: &Actor,
) -> Result<UpdateOutcome, ServerError> {
    let expected = client_version(payload)?;

    let outcome = db.with_conn(|conn| {
        let existing = load(conn, id)?;
        authorize(&existing, actor)?;

        if !actor.is_admin() {
            if let Some(owner) = payload.get("ownerId") {
                if owner.as_str() != Some(existing.fields.owner_id.as_str()) {
                    return Err(ServerError::Forbidden(
                        "Only admins can reassign a buyer".into(),
                    ));
                }
            }
        }

        if let Some(expected) = expected {
            if expected != existing.updated_at {
                return Err(ServerError::Conflict(
                    "Buyer was modified by someone else, reload and try again".into(),
                ));
            }
        }

        let mut merged = existing.attributes()?;
        for (field, value) in payload {
            if is_lead_field(field) {
                merged.insert(field.clone(), value.clone());
            }
        }
        let draft = validate(&merged).map_err(ServerError::Validation)?;

        let changes = diff_payload(&existing, payload)?;
        if changes.is_empty() {
            return Ok(UpdateOutcome::Unchanged(existing));
        }

        let now = Utc::now();
        let tx = conn.transaction()?;
        if !leads::update_if_unchanged(&tx, id, &draft, existing.updated_at, now)? {
            return Err(ServerError::Conflict(
                "Buyer was modified by someone else, reload and try again".into(),
            ));
        }
        history::record(&tx, id, &actor.id, HistoryDiff::Changed(changes.clone()), now)?;
        tx.commit()?;

        Ok(UpdateOutcome::Updated {
            lead: Lead {
                id: existing.id,
                fields: draft,
                created_at: existing.created_at,
                updated_at: now,
            },
            changes,
        })
    })?;

    match &outcome {
        UpdateOutcome::Unchanged(_) => debug!(lead_id = %id, "update was a no-op"),
        UpdateOutcome::Updated { changes, .. } => info!(
            lead_id = %id,
            actor = %actor.id,
            fields = changes.len(),
            "buyer updated"
        ),
    }
    Ok(outcome)
}

/// The `updatedAt` the client last saw, if it sent one.
fn client_version(payload: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, ServerError> {
    match payload.get("updatedAt") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| ServerError::BadRequest("updatedAt must be an RFC 3339 timestamp".into())),
        Some(_) => Err(ServerError::BadRequest(
            "updatedAt must be an RFC 3339 timestamp".into(),
        )),
    }
}

pub fn delete_lead(db: &Database, id: &str, actor: &Actor) -> Result<(), ServerError> {
    db.with_conn(|conn| {
        let existing = load(conn, id)?;
        authorize(&existing, actor)?;

        let tx = conn.transaction()?;
        if !leads::delete(&tx, id)? {
            return Err(ServerError::NotFound);
        }
        history::record(&tx, id, &actor.id, HistoryDiff::Deleted, Utc::now())?;
        tx.commit()?;
        Ok(())
    })?;

    info!(lead_id = %id, actor = %actor.id, "buyer deleted");
    Ok(())
}
