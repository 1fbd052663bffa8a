pub mod csv;
pub mod errors;
pub mod json;

pub use crate::errors::ResultResp;
pub use csv::csv_response;
pub use errors::error_to_response;
pub use json::{json_message, json_response};
