//! Pharma field-sales CRM core: leads, the sales pipeline, deals, visit
//! reports and the activity log behind a JSON API.

pub mod domain;
pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;
