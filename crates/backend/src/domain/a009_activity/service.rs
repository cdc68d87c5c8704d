use contracts::domain::a003_account::aggregate::Account;
use contracts::domain::a004_contact::aggregate::Contact;
use contracts::domain::a005_lead::aggregate::Lead;
use contracts::domain::a007_deal::aggregate::Deal;
use contracts::domain::a009_activity::aggregate::{Activity, ActivityDto, ActivityListQuery};
use contracts::shared::api::{Page, PageRequest};
use contracts::shared::error_codes::{FIELD_INVALID_FORMAT, FIELD_REQUIRED};
use sea_orm::{ConnectionTrait, DatabaseConnection};

use super::repository;
use crate::domain::{
    a003_account::repository as account_repository, a004_contact::repository as contact_repository,
    a005_lead::repository as lead_repository, a007_deal::repository as deal_repository,
};
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

/// Записать активность через `conn`, обычно транзакцию того изменения
/// состояния, которое она описывает
pub async fn record<C: ConnectionTrait>(conn: &C, activity: &Activity) -> Result<(), ServiceError> {
    repository::insert(conn, activity).await?;
    tracing::debug!(
        activity_id = %activity.id,
        activity_type = activity.activity_type.as_str(),
        "Activity recorded"
    );
    Ok(())
}

pub async fn list(
    db: &DatabaseConnection,
    query: &ActivityListQuery,
    page: PageRequest,
) -> Result<Page<Activity>, ServiceError> {
    Ok(repository::list(db, query, page).await?)
}

/// Ручная запись (звонки, письма, задачи). Нужна хотя бы одна ссылка, и
/// каждая ссылка должна существовать.
pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: ActivityDto,
) -> Result<Activity, ServiceError> {
    let mut activity = Activity::new(dto.activity_type, ctx.actor, dto.description.trim());
    activity.account_id = dto.account_id;
    activity.contact_id = dto.contact_id;
    activity.lead_id = dto.lead_id;
    activity.deal_id = dto.deal_id;
    if let Some(timestamp) = dto.timestamp {
        activity.timestamp = timestamp;
    }
    if let Some(metadata) = dto.metadata {
        if !metadata.is_object() {
            return Err(ServiceError::field(
                "metadata",
                FIELD_INVALID_FORMAT,
                "metadata must be a JSON object",
            ));
        }
        activity.metadata = metadata;
    }

    if activity.description.is_empty() {
        return Err(ServiceError::field(
            "description",
            FIELD_REQUIRED,
            "description is required",
        ));
    }
    if !activity.has_link() {
        return Err(ServiceError::field(
            "account_id",
            FIELD_REQUIRED,
            "at least one of account_id, contact_id, lead_id, deal_id is required",
        ));
    }

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if let Some(id) = activity.account_id {
            account_repository::get_by_id(&txn, id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Account>(id))?;
        }
        if let Some(id) = activity.contact_id {
            contact_repository::get_by_id(&txn, id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Contact>(id))?;
        }
        if let Some(id) = activity.lead_id {
            lead_repository::get_by_id(&txn, id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Lead>(id))?;
        }
        if let Some(id) = activity.deal_id {
            deal_repository::get_by_id(&txn, id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Deal>(id))?;
        }
        record(&txn, &activity).await?;
        Ok(activity)
    })
    .await;
    ctx.settle(txn, outcome).await
}
