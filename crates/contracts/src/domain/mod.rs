pub mod common;

pub mod a001_category;
pub mod a002_contact_role;
pub mod a003_account;
pub mod a004_contact;
pub mod a005_lead;
pub mod a006_pipeline_stage;
pub mod a007_deal;
pub mod a008_visit_report;
pub mod a009_activity;
