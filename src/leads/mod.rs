//! Lead use-cases: everything the HTTP layer calls into.

pub mod import;
pub mod mutations;
pub mod queries;

pub use import::import_leads;
pub use mutations::{create_lead, delete_lead, update_lead, UpdateOutcome};
pub use queries::{export_leads, get_lead, lead_history, list_leads};
