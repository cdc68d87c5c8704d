pub mod api;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod format;
pub mod state;
