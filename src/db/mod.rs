pub mod auth;
pub mod connection;
pub mod history;
pub mod leads;

pub use connection::Database;
