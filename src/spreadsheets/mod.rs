pub mod export_csv;
pub mod import_csv;

pub use export_csv::{export_filename, write_leads_csv};
