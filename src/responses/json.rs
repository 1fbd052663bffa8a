// responses/json.rs
use crate::errors::ServerError;
use crate::responses::ResultResp;
use astra::{Body, ResponseBuilder};
use serde::Serialize;
use serde_json::{json, Value};

/// `{"success": true, ...body}`. `body` must serialize to an object.
pub fn json_response<T: Serialize>(status: u16, body: &T) -> ResultResp {
    let mut value = serde_json::to_value(body)?;
    if let Value::Object(map) = &mut value {
        map.insert("success".to_string(), Value::Bool(true));
    }
    send_json(status, &value)
}

/// `{"success": true, "message": ...}`
pub fn json_message(status: u16, message: &str) -> ResultResp {
    send_json(status, &json!({ "success": true, "message": message }))
}

pub(crate) fn send_json(status: u16, value: &Value) -> ResultResp {
    let body = serde_json::to_vec(value)?;

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .map_err(|_| ServerError::InternalError)
}
