// src/spreadsheets/export_csv.rs
use crate::domain::lead::Lead;
use crate::errors::ServerError;
use crate::spreadsheets::import_csv::CSV_COLUMNS;
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;

/// Writes leads in the import column order, so an export re-imports as-is.
pub fn write_leads_csv<W: Write>(leads: &[Lead], out: W) -> Result<(), ServerError> {
    let mut writer = csv::Writer::from_writer(out);

    writer.write_record(CSV_COLUMNS).map_err(write_error)?;

    for lead in leads {
        let f = &lead.fields;
        let opt_num = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();

        writer
            .write_record([
                f.full_name.clone(),
                f.email.clone().unwrap_or_default(),
                f.phone.clone(),
                f.city.to_string(),
                f.property_type.to_string(),
                f.bhk.map(|b| b.to_string()).unwrap_or_default(),
                f.purpose.to_string(),
                opt_num(f.budget_min),
                opt_num(f.budget_max),
                f.timeline.to_string(),
                f.source.to_string(),
                f.notes.clone().unwrap_or_default(),
                f.tags.join(","),
                f.status.to_string(),
            ])
            .map_err(write_error)?;
    }

    writer.flush().map_err(|e| write_error(e.into()))?;
    Ok(())
}

/// `buyers-export-2024-05-01T10-20-30.123Z.csv`
pub fn export_filename(now: DateTime<Utc>) -> String {
    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "-");
    format!("buyers-export-{stamp}.csv")
}

fn write_error(err: csv::Error) -> ServerError {
    tracing::error!("CSV export failed: {err}");
    ServerError::InternalError
}
