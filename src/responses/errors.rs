// responses/errors.rs
use crate::errors::ServerError;
use crate::responses::json::send_json;
use astra::{Body, Response, ResponseBuilder};
use serde_json::{json, Value};
use tracing::error;

/// Convert a ServerError into `{"success": false, "message": ..., "errors"?: [...]}`.
pub fn error_to_response(err: ServerError) -> Response {
    let status = err.status();
    if status >= 500 {
        error!("{err}");
    }

    // Storage details stay in the log.
    let message = match &err {
        ServerError::DbError(_) => "Server Error".to_string(),
        other => other.to_string(),
    };

    let mut body = json!({ "success": false, "message": message });
    let errors = match &err {
        ServerError::Validation(fields) => serde_json::to_value(fields).ok(),
        ServerError::NoValidRows(rows) => serde_json::to_value(rows).ok(),
        ServerError::MissingHeaders(cols) => Some(json!(cols)),
        _ => None,
    };
    if let Some(errors) = errors {
        body["errors"] = errors;
    }

    let mut resp = send_json(status, &body).unwrap_or_else(|_| fallback());
    if let ServerError::TooManyRequests { retry_after } = err {
        if let Ok(value) = retry_after.to_string().parse() {
            resp.headers_mut().insert("Retry-After", value);
        }
    }
    resp
}

fn fallback() -> Response {
    ResponseBuilder::new()
        .status(500)
        .header("Content-Type", "application/json")
        .body(Body::from("{\"success\":false}"))
        .unwrap()
}
