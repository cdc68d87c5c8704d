pub mod api;
pub mod error_codes;
