mod auth_tests;
mod buyer_tests;
mod import_export_tests;
mod rate_limit_tests;
