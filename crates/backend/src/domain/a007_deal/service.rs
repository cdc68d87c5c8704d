//! Сделки и машина этапов, двигающая их по воронке.
//!
//! Статус сделки никогда не берётся из входных данных: он выводится из этапа
//! при каждой записи ссылки на этап.

use chrono::NaiveDate;
use contracts::domain::a003_account::aggregate::{Account, AccountId};
use contracts::domain::a004_contact::aggregate::{Contact, ContactId};
use contracts::domain::a006_pipeline_stage::aggregate::{PipelineStage, PipelineStageId};
use contracts::domain::a007_deal::aggregate::{
    Deal, DealDto, DealId, DealListQuery, DealPatch, DealStatus,
};
use contracts::domain::a009_activity::aggregate::{Activity, ActivityType};
use contracts::shared::api::{FieldError, Page, PageRequest};
use contracts::shared::error_codes::{
    FIELD_NOT_ALLOWED, FIELD_REQUIRED, INVALID_STAGE, INVALID_STATUS,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::json;

use super::repository;
use crate::domain::a003_account::repository as account_repository;
use crate::domain::a004_contact::repository as contact_repository;
use crate::domain::a006_pipeline_stage::repository as stage_repository;
use crate::domain::a009_activity::service as activity_service;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

/// Перевести `deal` на `stage` и вывести статус.
///
/// Вход в терминальный статус проставляет `actual_close_date = today`, если
/// дата ещё не задана; возврат в `open` её очищает.
pub fn apply_stage(deal: &mut Deal, stage: &PipelineStage, today: NaiveDate) {
    deal.stage_id = stage.base.id;
    deal.status = stage.deal_status();
    if deal.status.is_terminal() {
        if deal.actual_close_date.is_none() {
            deal.actual_close_date = Some(today);
        }
    } else {
        deal.actual_close_date = None;
    }
}

pub async fn get(db: &DatabaseConnection, id: DealId) -> Result<Deal, ServiceError> {
    repository::get_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found::<Deal>(id))
}

pub async fn list(
    db: &DatabaseConnection,
    query: &DealListQuery,
    page: PageRequest,
) -> Result<Page<Deal>, ServiceError> {
    Ok(repository::list(db, query, page).await?)
}

/// Контакт должен существовать и относиться к контрагенту сделки
async fn check_contact<C: ConnectionTrait>(
    conn: &C,
    contact_id: ContactId,
    account_id: AccountId,
) -> Result<(), ServiceError> {
    let contact = contact_repository::get_by_id(conn, contact_id)
        .await?
        .ok_or_else(|| ServiceError::not_found::<Contact>(contact_id))?;
    if contact.account_id != account_id {
        return Err(ServiceError::field(
            "contact_id",
            FIELD_NOT_ALLOWED,
            "contact belongs to a different account",
        ));
    }
    Ok(())
}

/// Прямое создание сделки. Целевой этап должен быть активным и нетерминальным.
pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: DealDto,
) -> Result<Deal, ServiceError> {
    let mut missing = Vec::new();
    if dto.account_id.is_none() {
        missing.push(FieldError::new("account_id", FIELD_REQUIRED, "account_id is required"));
    }
    if dto.stage_id.is_none() {
        missing.push(FieldError::new("stage_id", FIELD_REQUIRED, "stage_id is required"));
    }
    let (Some(account_id), Some(stage_id)) = (dto.account_id, dto.stage_id) else {
        return Err(ServiceError::Validation(missing));
    };

    let mut deal = Deal::new_for_insert(
        dto.title.trim().to_string(),
        account_id,
        stage_id,
        DealStatus::Open,
    );
    deal.description = dto.description;
    deal.contact_id = dto.contact_id;
    deal.value = dto.value.unwrap_or(0);
    deal.probability = dto.probability.unwrap_or(0);
    deal.expected_close_date = dto.expected_close_date;
    deal.assigned_to = dto.assigned_to;
    deal.source = dto.source;
    deal.notes = dto.notes;
    deal.created_by = Some(ctx.actor);
    ServiceError::check(deal.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let stage = stage_repository::get_by_id(&txn, stage_id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<PipelineStage>(stage_id))?;
        if !stage.is_active || stage.is_terminal() {
            return Err(ServiceError::invalid_state(
                INVALID_STAGE,
                format!("deals cannot be created in stage '{}'", stage.base.code),
            ));
        }
        account_repository::get_by_id(&txn, account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Account>(account_id))?;
        if let Some(contact_id) = deal.contact_id {
            check_contact(&txn, contact_id, account_id).await?;
        }
        apply_stage(&mut deal, &stage, ctx.today());

        repository::insert(&txn, &deal).await?;
        let mut activity = Activity::new(
            ActivityType::Deal,
            ctx.actor,
            format!("Deal '{}' created in stage {}", deal.title, stage.name),
        );
        activity.deal_id = Some(deal.base.id);
        activity.account_id = Some(deal.account_id);
        activity.contact_id = deal.contact_id;
        activity.metadata = json!({ "event": "deal:created", "stage_id": stage.base.id });
        activity_service::record(&txn, &activity).await?;
        Ok(deal)
    })
    .await;
    let deal = ctx.settle(txn, outcome).await?;
    tracing::info!(deal_id = %deal.base.id, stage_id = %deal.stage_id, "Deal created");
    Ok(deal)
}

/// Обновление полей сделки, кроме этапа
pub async fn update(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: DealId,
    patch: DealPatch,
) -> Result<Deal, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let mut deal = repository::get_by_id(&txn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Deal>(id))?;
        let expected_version = deal.base.metadata.version;

        if let Some(status) = patch.status {
            if status != deal.status {
                return Err(ServiceError::invalid_state(
                    INVALID_STATUS,
                    format!(
                        "deal status is derived from its stage and is '{}'; move the deal instead",
                        deal.status.as_str()
                    ),
                ));
            }
        }
        if let Some(contact_id) = patch.contact_id {
            check_contact(&txn, contact_id, deal.account_id).await?;
            deal.contact_id = Some(contact_id);
        }
        if let Some(title) = patch.title {
            deal.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            deal.description = Some(description);
        }
        if let Some(value) = patch.value {
            deal.value = value;
        }
        if let Some(probability) = patch.probability {
            deal.probability = probability;
        }
        if let Some(date) = patch.expected_close_date {
            deal.expected_close_date = Some(date);
        }
        if let Some(assigned_to) = patch.assigned_to {
            deal.assigned_to = Some(assigned_to);
        }
        if let Some(notes) = patch.notes {
            deal.notes = Some(notes);
        }
        ServiceError::check(deal.validate())?;

        deal.base.touch();
        deal.base.metadata.increment_version();
        if !repository::save(&txn, &deal, expected_version).await? {
            return Err(ServiceError::Conflict);
        }
        Ok(deal)
    })
    .await;
    let deal = ctx.settle(txn, outcome).await?;
    tracing::info!(deal_id = %id, "Deal updated");
    Ok(deal)
}

pub async fn delete(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: DealId,
) -> Result<(), ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if !repository::soft_delete(&txn, id, ctx.now()).await? {
            return Err(ServiceError::not_found::<Deal>(id));
        }
        Ok(())
    })
    .await;
    ctx.settle(txn, outcome).await?;
    tracing::info!(deal_id = %id, "Deal deleted");
    Ok(())
}

/// Перевод сделки на другой этап с записью активности `deal` о переходе.
/// Перевод на текущий этап ничего не меняет.
pub async fn move_deal(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: DealId,
    target_stage_id: PipelineStageId,
) -> Result<Deal, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let mut deal = repository::get_by_id(&txn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Deal>(id))?;
        let target = stage_repository::get_by_id(&txn, target_stage_id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<PipelineStage>(target_stage_id))?;
        if !target.is_active {
            return Err(ServiceError::invalid_state(
                INVALID_STAGE,
                format!("stage '{}' is inactive", target.base.code),
            ));
        }
        if deal.stage_id == target.base.id {
            return Ok((deal, None));
        }

        let expected_version = deal.base.metadata.version;
        let from_stage_id = deal.stage_id;
        let from_status = deal.status;
        let from_name = stage_repository::get_by_id(&txn, from_stage_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| from_stage_id.to_string());

        apply_stage(&mut deal, &target, ctx.today());
        deal.base.touch();
        deal.base.metadata.increment_version();
        if !repository::save(&txn, &deal, expected_version).await? {
            return Err(ServiceError::Conflict);
        }

        let mut activity = Activity::new(
            ActivityType::Deal,
            ctx.actor,
            format!("Deal moved from {} to {}", from_name, target.name),
        );
        activity.deal_id = Some(deal.base.id);
        activity.account_id = Some(deal.account_id);
        activity.metadata = json!({
            "event": "deal:moved",
            "from_stage_id": from_stage_id,
            "to_stage_id": target.base.id,
            "from_status": from_status.as_str(),
            "to_status": deal.status.as_str(),
        });
        activity_service::record(&txn, &activity).await?;
        Ok((deal, Some(from_status)))
    })
    .await;
    let (deal, moved_from) = ctx.settle(txn, outcome).await?;
    if let Some(from_status) = moved_from {
        tracing::info!(
            deal_id = %id,
            stage_id = %deal.stage_id,
            from_status = from_status.as_str(),
            to_status = deal.status.as_str(),
            "Deal moved"
        );
    }
    Ok(deal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a006_pipeline_stage::aggregate::PipelineStageDto;

    fn stage(code: &str, is_won: bool, is_lost: bool) -> PipelineStage {
        PipelineStage::new_for_insert(PipelineStageDto {
            code: code.into(),
            name: code.into(),
            is_won: Some(is_won),
            is_lost: Some(is_lost),
            ..Default::default()
        })
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    #[test]
    fn test_won_stage_closes_deal_today() {
        let proposal = stage("proposal", false, false);
        let won = stage("closed_won", true, false);
        let mut deal = Deal::new_for_insert(
            "Oncology tender".into(),
            AccountId::new_v4(),
            proposal.base.id,
            DealStatus::Open,
        );
        apply_stage(&mut deal, &won, day(3));
        assert_eq!(deal.stage_id, won.base.id);
        assert_eq!(deal.status, DealStatus::Won);
        assert_eq!(deal.actual_close_date, Some(day(3)));
    }

    #[test]
    fn test_reopening_clears_close_date() {
        let proposal = stage("proposal", false, false);
        let lost = stage("closed_lost", false, true);
        let mut deal = Deal::new_for_insert(
            "Vaccine supply".into(),
            AccountId::new_v4(),
            proposal.base.id,
            DealStatus::Open,
        );
        apply_stage(&mut deal, &lost, day(3));
        apply_stage(&mut deal, &proposal, day(4));
        assert_eq!(deal.stage_id, proposal.base.id);
        assert_eq!(deal.status, DealStatus::Open);
        assert_eq!(deal.actual_close_date, None);
    }

    #[test]
    fn test_terminal_to_terminal_keeps_first_close_date() {
        let won = stage("closed_won", true, false);
        let lost = stage("closed_lost", false, true);
        let mut deal = Deal::new_for_insert(
            "Clinic renewal".into(),
            AccountId::new_v4(),
            won.base.id,
            DealStatus::Open,
        );
        apply_stage(&mut deal, &won, day(1));
        apply_stage(&mut deal, &lost, day(9));
        assert_eq!(deal.status, DealStatus::Lost);
        assert_eq!(deal.actual_close_date, Some(day(1)));
    }
}
