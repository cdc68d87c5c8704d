#![allow(dead_code)]

use std::time::Duration;

use backend::shared::context::ServiceContext;
use backend::shared::data::db;
use backend::domain::{a001_category, a002_contact_role, a005_lead, a006_pipeline_stage};
use chrono::FixedOffset;
use contracts::domain::a001_category::aggregate::{Category, CategoryDto};
use contracts::domain::a002_contact_role::aggregate::{ContactRole, ContactRoleDto};
use contracts::domain::a005_lead::aggregate::{Lead, LeadDto, LeadPatch, LeadSource, LeadStatus};
use contracts::domain::a006_pipeline_stage::aggregate::{PipelineStage, PipelineStageDto};
use sea_orm::DatabaseConnection;
use tempfile::TempDir;
use uuid::Uuid;

pub async fn setup() -> DatabaseConnection {
    db::connect_in_memory()
        .await
        .expect("in-memory database with migrations")
}

/// File-backed database with a real pool, for tests where operations must
/// actually overlap. The directory must outlive the connection.
pub async fn setup_pooled(max_connections: u32) -> (TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = db::connect_file(
        &dir.path().join("crm.db"),
        max_connections,
        Duration::from_secs(10),
    )
    .await
    .expect("file database with migrations");
    (dir, conn)
}

pub fn ctx() -> ServiceContext {
    ctx_for(Uuid::new_v4())
}

pub fn ctx_for(actor: Uuid) -> ServiceContext {
    ServiceContext::new(
        actor,
        Duration::from_secs(10),
        FixedOffset::east_opt(7 * 3600).unwrap(),
    )
}

pub fn ctx_with_deadline(deadline: Duration) -> ServiceContext {
    ServiceContext::new(
        Uuid::new_v4(),
        deadline,
        FixedOffset::east_opt(7 * 3600).unwrap(),
    )
}

pub async fn category(db: &DatabaseConnection, code: &str, order: i32) -> Category {
    a001_category::service::create(
        db,
        &ctx(),
        CategoryDto {
            code: code.into(),
            name: code.to_uppercase(),
            order: Some(order),
            ..Default::default()
        },
    )
    .await
    .expect("category")
}

pub async fn role(db: &DatabaseConnection, code: &str, order: i32) -> ContactRole {
    a002_contact_role::service::create(
        db,
        &ctx(),
        ContactRoleDto {
            code: code.into(),
            name: code.to_uppercase(),
            order: Some(order),
        },
    )
    .await
    .expect("contact role")
}

pub async fn stage(
    db: &DatabaseConnection,
    code: &str,
    order: i32,
    is_won: bool,
    is_lost: bool,
) -> PipelineStage {
    a006_pipeline_stage::service::create(
        db,
        &ctx(),
        PipelineStageDto {
            code: code.into(),
            name: code.replace('_', " "),
            order: Some(order),
            is_won: Some(is_won),
            is_lost: Some(is_lost),
            ..Default::default()
        },
    )
    .await
    .expect("pipeline stage")
}

/// Lead for "Acme Hospital" from a referral, created as `new`
pub async fn new_lead(db: &DatabaseConnection) -> Lead {
    a005_lead::service::create(
        db,
        &ctx(),
        LeadDto {
            first_name: "Dewi".into(),
            last_name: "Lestari".into(),
            email: Some("dewi@acmehospital.id".into()),
            company_name: Some("Acme Hospital".into()),
            job_title: Some("Procurement Lead".into()),
            source: Some(LeadSource::Referral),
            ..Default::default()
        },
    )
    .await
    .expect("lead")
}

pub async fn qualified_lead(db: &DatabaseConnection) -> Lead {
    let lead = new_lead(db).await;
    a005_lead::service::update(
        db,
        &ctx(),
        lead.base.id,
        LeadPatch {
            status: Some(LeadStatus::Qualified),
            ..Default::default()
        },
    )
    .await
    .expect("qualify lead")
}

/// Category, contact role and the standard five-stage pipeline
pub struct Catalog {
    pub category: Category,
    pub role: ContactRole,
    pub prospecting: PipelineStage,
    pub proposal: PipelineStage,
    pub negotiation: PipelineStage,
    pub won: PipelineStage,
    pub lost: PipelineStage,
}

pub async fn catalog(db: &DatabaseConnection) -> Catalog {
    Catalog {
        category: category(db, "hospital", 1).await,
        role: role(db, "pharmacist", 1).await,
        prospecting: stage(db, "prospecting", 1, false, false).await,
        proposal: stage(db, "proposal", 2, false, false).await,
        negotiation: stage(db, "negotiation", 3, false, false).await,
        won: stage(db, "closed_won", 4, true, false).await,
        lost: stage(db, "closed_lost", 5, false, true).await,
    }
}
