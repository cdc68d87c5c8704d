//! Wire and aggregate types shared by the CRM backend and its clients.

pub mod domain;
pub mod shared;
pub mod system;
