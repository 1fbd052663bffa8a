// src/spreadsheets/import_csv.rs
use crate::domain::lead::LeadDraft;
use crate::domain::schema::{validate, FieldError};
use crate::errors::ServerError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Read;
use tracing::debug;

/// Import headers, also the export column order.
pub const CSV_COLUMNS: [&str; 14] = [
    "fullName",
    "email",
    "phone",
    "city",
    "propertyType",
    "bhk",
    "purpose",
    "budgetMin",
    "budgetMax",
    "timeline",
    "source",
    "notes",
    "tags",
    "status",
];

pub const MAX_IMPORT_ROWS: usize = 200;

/// A rejected data row. `row` is 1-based over data rows (header excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl RowError {
    fn new(row: usize, detail: impl std::fmt::Display) -> Self {
        Self {
            row,
            message: format!("row {row}: {detail}"),
        }
    }
}

#[derive(Debug)]
pub struct ParsedImport {
    pub valid_rows: Vec<LeadDraft>,
    pub errors: Vec<RowError>,
    pub total_rows: usize,
}

/// Streams the CSV once, validating each row with the same rules as a
/// single create. Nothing here touches storage.
pub fn parse_and_validate<R: Read>(input: R, owner_id: &str) -> Result<ParsedImport, ServerError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let positions = column_positions(&headers)?;

    let mut parsed = ParsedImport {
        valid_rows: Vec::new(),
        errors: Vec::new(),
        total_rows: 0,
    };

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row = index + 1;
        parsed.total_rows = row;

        if parsed.valid_rows.len() >= MAX_IMPORT_ROWS {
            parsed.errors.push(RowError::new(
                row,
                format_args!("exceeded maximum import limit of {MAX_IMPORT_ROWS} rows"),
            ));
            continue;
        }

        if record.len() != headers.len() {
            parsed.errors.push(RowError::new(
                row,
                format_args!("expected {} fields, found {}", headers.len(), record.len()),
            ));
            continue;
        }

        let candidate = row_to_candidate(&record, &positions, owner_id);
        match validate(&candidate) {
            Ok(draft) => parsed.valid_rows.push(draft),
            Err(errors) => parsed
                .errors
                .push(RowError::new(row, FieldError::summarize(&errors))),
        }
    }

    debug!(
        total = parsed.total_rows,
        valid = parsed.valid_rows.len(),
        rejected = parsed.errors.len(),
        "parsed import"
    );
    Ok(parsed)
}

/// Maps each expected column to its index in this file's header row.
fn column_positions(headers: &csv::StringRecord) -> Result<[usize; 14], ServerError> {
    let mut positions = [0usize; 14];
    let mut missing = Vec::new();

    for (slot, column) in positions.iter_mut().zip(CSV_COLUMNS) {
        match headers.iter().position(|h| h == column) {
            Some(i) => *slot = i,
            None => missing.push(column.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(ServerError::MissingHeaders(missing))
    }
}

fn row_to_candidate(
    record: &csv::StringRecord,
    positions: &[usize; 14],
    owner_id: &str,
) -> Map<String, Value> {
    let mut candidate = Map::new();

    for (column, &i) in CSV_COLUMNS.iter().zip(positions) {
        let cell = record.get(i).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        let value = match *column {
            // Unparseable budgets stay strings so the validator names the field.
            "budgetMin" | "budgetMax" => cell
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(cell)),
            "tags" => Value::Array(
                cell.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(Value::from)
                    .collect(),
            ),
            _ => Value::from(cell),
        };
        candidate.insert(column.to_string(), value);
    }

    candidate.insert("ownerId".to_string(), Value::from(owner_id));
    candidate
}

fn csv_error(err: csv::Error) -> ServerError {
    ServerError::CsvFormat(err.to_string())
}
