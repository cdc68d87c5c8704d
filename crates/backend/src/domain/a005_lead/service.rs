//! Лиды и конвертация.
//!
//! Конвертация лида создаёт (или находит) контрагента и контакт, открывает
//! сделку, перепривязывает к ней историю активностей и визитов лида и
//! закрывает лид, всё в одной транзакции.

use chrono::NaiveDate;
use contracts::domain::a001_category::aggregate::{Category, CategoryId};
use contracts::domain::a003_account::aggregate::{Account, AccountStatus};
use contracts::domain::a004_contact::aggregate::Contact;
use contracts::domain::a005_lead::aggregate::{
    ConvertLeadRequest, ConvertLeadResponse, CreateAccountFromLeadRequest,
    CreateAccountFromLeadResponse, Lead, LeadDto, LeadId, LeadListQuery, LeadPatch, LeadStatus,
};
use contracts::domain::a006_pipeline_stage::aggregate::PipelineStage;
use contracts::domain::a007_deal::aggregate::{Deal, DealStatus};
use contracts::domain::a009_activity::aggregate::{Activity, ActivityType};
use contracts::shared::api::{Page, PageRequest};
use contracts::shared::error_codes::{
    ACCOUNT_CREATION_FAILED, COMPANY_NAME_REQUIRED, CONTACT_CREATION_FAILED, FIELD_REQUIRED,
    INVALID_STAGE, INVALID_STATUS, LEAD_ALREADY_CONVERTED, LEAD_ALREADY_HAS_ACCOUNT,
    LEAD_CANNOT_CONVERT, LEAD_NOT_FOUND, OPPORTUNITY_CREATION_FAILED, STAGE_NOT_FOUND,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::json;
use uuid::Uuid;

use super::repository::{self, ConversionLinks};
use crate::domain::a001_category::repository as category_repository;
use crate::domain::a002_contact_role::repository as role_repository;
use crate::domain::a003_account::repository as account_repository;
use crate::domain::a004_contact::repository as contact_repository;
use crate::domain::a006_pipeline_stage::repository as stage_repository;
use crate::domain::a007_deal::repository as deal_repository;
use crate::domain::a007_deal::service::apply_stage;
use crate::domain::a008_visit_report::repository as visit_repository;
use crate::domain::a009_activity::repository as activity_repository;
use crate::domain::a009_activity::service as activity_service;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

fn lead_not_found(id: LeadId) -> ServiceError {
    ServiceError::not_found_as::<Lead>(LEAD_NOT_FOUND, id)
}

async fn load<C: ConnectionTrait>(conn: &C, id: LeadId) -> Result<Lead, ServiceError> {
    repository::get_by_id(conn, id)
        .await?
        .ok_or_else(|| lead_not_found(id))
}

/// Предпочтительная категория, если указана, должна существовать
async fn check_category<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<CategoryId>,
) -> Result<(), ServiceError> {
    if let Some(category_id) = category_id {
        category_repository::get_by_id(conn, category_id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<Category>(category_id))?;
    }
    Ok(())
}

pub async fn get(db: &DatabaseConnection, id: LeadId) -> Result<Lead, ServiceError> {
    load(db, id).await
}

pub async fn list(
    db: &DatabaseConnection,
    query: &LeadListQuery,
    page: PageRequest,
) -> Result<Page<Lead>, ServiceError> {
    Ok(repository::list(db, query, page).await?)
}

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: LeadDto,
) -> Result<Lead, ServiceError> {
    let mut lead = Lead::new_for_insert(dto);
    lead.created_by = Some(ctx.actor);
    ServiceError::check(lead.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        check_category(&txn, lead.preferred_category_id).await?;
        repository::insert(&txn, &lead).await?;
        Ok(lead)
    })
    .await;
    let lead = ctx.settle(txn, outcome).await?;
    tracing::info!(lead_id = %lead.base.id, code = %lead.base.code, "Lead created");
    Ok(lead)
}

/// Частичное обновление. У конвертированного лида можно менять только заметки,
/// и никакое обновление не может выставить `status = converted`.
pub async fn update(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: LeadId,
    patch: LeadPatch,
) -> Result<Lead, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let mut lead = load(&txn, id).await?;
        let expected_version = lead.base.metadata.version;

        if lead.is_converted() && !patch.is_notes_only() {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_CONVERTED,
                "a converted lead only accepts note changes",
            ));
        }
        if patch.status == Some(LeadStatus::Converted) {
            return Err(ServiceError::invalid_state(
                INVALID_STATUS,
                "leads become converted only through the convert operation",
            ));
        }
        check_category(&txn, patch.preferred_category_id).await?;

        let from_status = lead.status;
        lead.apply_patch(patch);
        ServiceError::check(lead.validate())?;

        lead.base.touch();
        lead.base.metadata.increment_version();
        if !repository::save(&txn, &lead, expected_version).await? {
            return Err(ServiceError::Conflict);
        }
        Ok((lead, from_status))
    })
    .await;
    let (lead, from_status) = ctx.settle(txn, outcome).await?;
    if from_status != lead.status {
        tracing::info!(
            lead_id = %id,
            from = from_status.as_str(),
            to = lead.status.as_str(),
            "Lead status changed"
        );
    }
    Ok(lead)
}

pub async fn delete(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: LeadId,
) -> Result<(), ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let lead = load(&txn, id).await?;
        if lead.is_converted() {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_CONVERTED,
                "converted leads cannot be deleted",
            ));
        }
        if !repository::soft_delete(&txn, id, ctx.now()).await? {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_CONVERTED,
                "lead was converted while being deleted",
            ));
        }
        Ok(())
    })
    .await;
    ctx.settle(txn, outcome).await?;
    tracing::info!(lead_id = %id, "Lead deleted");
    Ok(())
}

// ============================================================================
// Account and contact resolution
// ============================================================================

/// Новый контрагент с компанией, адресом и контактными данными лида
fn account_from_lead(lead: &Lead, company: &str, category_id: CategoryId, actor: Uuid) -> Account {
    let mut account = Account::new_for_insert(company.trim().to_string(), category_id);
    account.address = lead.address.clone();
    account.phone = lead.phone.clone();
    account.email = lead.email.clone();
    account.website = lead.website.clone();
    account.status = AccountStatus::Active;
    account.assigned_to = lead.assigned_to;
    account.source_lead_id = Some(lead.base.id);
    account.created_by = Some(actor);
    account
}

/// Категория контрагента, создаваемого из `lead`: предпочтительная, если она
/// ещё существует, иначе первая в порядке справочника
async fn category_for<C: ConnectionTrait>(
    conn: &C,
    lead: &Lead,
) -> Result<Category, ServiceError> {
    if let Some(preferred) = lead.preferred_category_id {
        if let Some(category) = category_repository::get_by_id(conn, preferred).await? {
            return Ok(category);
        }
        tracing::warn!(
            lead_id = %lead.base.id,
            category_id = %preferred,
            "Preferred category is gone, falling back to catalog order"
        );
    }
    category_repository::first_in_catalog(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::subordinate(
                ACCOUNT_CREATION_FAILED,
                "no category available for the new account",
            )
        })
}

async fn create_account<C: ConnectionTrait>(
    conn: &C,
    ctx: &ServiceContext,
    lead: &Lead,
    company: &str,
) -> Result<Account, ServiceError> {
    let category = category_for(conn, lead).await?;
    let account = account_from_lead(lead, company, category.base.id, ctx.actor);
    let errors = account.validate();
    if !errors.is_empty() {
        return Err(ServiceError::subordinate(
            ACCOUNT_CREATION_FAILED,
            format!("account from lead is invalid: {}", errors[0].message),
        ));
    }
    account_repository::insert(conn, &account)
        .await
        .map_err(|e| ServiceError::subordinate_db(ACCOUNT_CREATION_FAILED, "account insert failed", e))?;
    tracing::info!(
        lead_id = %lead.base.id,
        account_id = %account.base.id,
        category = %category.base.code,
        "Account created from lead"
    );
    Ok(account)
}

async fn create_contact<C: ConnectionTrait>(
    conn: &C,
    ctx: &ServiceContext,
    lead: &Lead,
    account: &Account,
) -> Result<Contact, ServiceError> {
    if lead.full_name().is_empty() {
        return Err(ServiceError::subordinate(
            CONTACT_CREATION_FAILED,
            "lead has no person name for the contact",
        ));
    }
    let role = role_repository::first_in_catalog(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::subordinate(CONTACT_CREATION_FAILED, "no contact role available")
        })?;
    let mut contact = Contact::new_for_insert(
        account.base.id,
        lead.first_name.trim().to_string(),
        lead.last_name.trim().to_string(),
        role.base.id,
    );
    contact.email = lead.email.clone();
    contact.phone = lead.phone.clone();
    contact.position = lead.job_title.clone();
    contact.source_lead_id = Some(lead.base.id);
    contact.created_by = Some(ctx.actor);
    let errors = contact.validate();
    if !errors.is_empty() {
        return Err(ServiceError::subordinate(
            CONTACT_CREATION_FAILED,
            format!("contact from lead is invalid: {}", errors[0].message),
        ));
    }
    contact_repository::insert(conn, &contact)
        .await
        .map_err(|e| ServiceError::subordinate_db(CONTACT_CREATION_FAILED, "contact insert failed", e))?;
    Ok(contact)
}

/// Контрагент новой сделки.
///
/// Порядок: создать по компании лида, указанный в запросе, уже привязанный
/// к лиду.
async fn resolve_account<C: ConnectionTrait>(
    conn: &C,
    ctx: &ServiceContext,
    lead: &Lead,
    req: &ConvertLeadRequest,
) -> Result<(Account, bool), ServiceError> {
    if req.create_account {
        if let Some(company) = lead.company() {
            return Ok((create_account(conn, ctx, lead, company).await?, true));
        }
    }
    let existing = req.account_id.or(lead.account_id);
    let Some(account_id) = existing else {
        return Err(ServiceError::subordinate(
            ACCOUNT_CREATION_FAILED,
            "a deal requires an account: give account_id or create one from the lead's company",
        ));
    };
    let account = account_repository::get_by_id(conn, account_id)
        .await?
        .ok_or_else(|| {
            ServiceError::subordinate(
                ACCOUNT_CREATION_FAILED,
                format!("account {} does not exist", account_id),
            )
        })?;
    Ok((account, false))
}

async fn resolve_contact<C: ConnectionTrait>(
    conn: &C,
    ctx: &ServiceContext,
    lead: &Lead,
    account: &Account,
    req: &ConvertLeadRequest,
) -> Result<Option<Contact>, ServiceError> {
    if req.create_contact {
        return Ok(Some(create_contact(conn, ctx, lead, account).await?));
    }
    let Some(contact_id) = req.contact_id.or(lead.contact_id) else {
        return Ok(None);
    };
    let contact = contact_repository::get_by_id(conn, contact_id)
        .await?
        .ok_or_else(|| {
            ServiceError::subordinate(
                CONTACT_CREATION_FAILED,
                format!("contact {} does not exist", contact_id),
            )
        })?;
    if contact.account_id != account.base.id {
        return Err(ServiceError::subordinate(
            CONTACT_CREATION_FAILED,
            format!("contact {} belongs to a different account", contact_id),
        ));
    }
    Ok(Some(contact))
}

/// Сделка, получаемая конвертацией `lead` в этап `stage`
fn deal_from_lead(
    lead: &Lead,
    req: &ConvertLeadRequest,
    stage: &PipelineStage,
    account: &Account,
    contact: Option<&Contact>,
    actor: Uuid,
    today: NaiveDate,
) -> Deal {
    let mut deal = Deal::new_for_insert(
        req.title.trim().to_string(),
        account.base.id,
        stage.base.id,
        DealStatus::Open,
    );
    deal.description = req.description.clone();
    deal.contact_id = contact.map(|c| c.base.id);
    deal.value = req.value.unwrap_or(0);
    deal.probability = req.probability.unwrap_or(0);
    deal.expected_close_date = req.expected_close_date;
    deal.assigned_to = lead.assigned_to;
    deal.source = Some(lead.source.as_str().to_string());
    deal.notes = lead.notes.clone();
    deal.lead_id = Some(lead.base.id);
    deal.created_by = Some(actor);
    apply_stage(&mut deal, stage, today);
    deal
}

// ============================================================================
// Conversion
// ============================================================================

/// Конвертация квалифицированного лида в сделку.
///
/// Всё выполняется в одной транзакции. Любая ошибка откатывает контрагента,
/// контакт, сделку, перепривязанную историю и сам лид.
pub async fn convert(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: LeadId,
    req: ConvertLeadRequest,
) -> Result<ConvertLeadResponse, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let lead = load(&txn, id).await?;
        if lead.is_converted() {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_CONVERTED,
                format!("lead {} is already converted", lead.base.code),
            ));
        }
        if lead.status != LeadStatus::Qualified {
            return Err(ServiceError::invalid_state(
                LEAD_CANNOT_CONVERT,
                format!(
                    "only qualified leads can be converted, lead is '{}'",
                    lead.status.as_str()
                ),
            ));
        }
        ServiceError::check(req.validate())?;
        let stage_id = req.stage_id.ok_or_else(|| {
            ServiceError::field("stage_id", FIELD_REQUIRED, "stage_id is required")
        })?;
        let stage = stage_repository::get_by_id(&txn, stage_id)
            .await?
            .ok_or_else(|| ServiceError::not_found_as::<PipelineStage>(STAGE_NOT_FOUND, stage_id))?;
        if !stage.is_active {
            return Err(ServiceError::invalid_state(
                INVALID_STAGE,
                format!("stage '{}' is inactive", stage.base.code),
            ));
        }

        let (account, account_created) = resolve_account(&txn, ctx, &lead, &req).await?;
        let contact = resolve_contact(&txn, ctx, &lead, &account, &req).await?;

        let deal = deal_from_lead(
            &lead,
            &req,
            &stage,
            &account,
            contact.as_ref(),
            ctx.actor,
            ctx.today(),
        );
        let errors = deal.validate();
        if !errors.is_empty() {
            return Err(ServiceError::subordinate(
                OPPORTUNITY_CREATION_FAILED,
                format!("deal from lead is invalid: {}", errors[0].message),
            ));
        }
        deal_repository::insert(&txn, &deal)
            .await
            .map_err(|e| ServiceError::subordinate_db(OPPORTUNITY_CREATION_FAILED, "deal insert failed", e))?;

        let relinked_activities =
            activity_repository::relink_lead(&txn, lead.base.id, deal.base.id, account.base.id)
                .await?;
        let relinked_visit_reports =
            visit_repository::relink_lead(&txn, lead.base.id, deal.base.id, account.base.id)
                .await?;

        let mut activity = Activity::new(
            ActivityType::Deal,
            ctx.actor,
            format!("Lead {} converted to deal '{}'", lead.base.code, deal.title),
        );
        activity.lead_id = Some(lead.base.id);
        activity.deal_id = Some(deal.base.id);
        activity.account_id = Some(account.base.id);
        activity.contact_id = contact.as_ref().map(|c| c.base.id);
        activity.metadata = json!({
            "event": "lead:converted",
            "stage_id": stage.base.id,
            "account_created": account_created,
            "contact_created": req.create_contact,
        });
        activity_service::record(&txn, &activity).await?;

        let links = ConversionLinks {
            deal_id: deal.base.id,
            account_id: account.base.id,
            contact_id: contact.as_ref().map(|c| c.base.id),
            converted_by: ctx.actor,
            converted_at: ctx.now(),
        };
        if !repository::finalize_conversion(&txn, lead.base.id, &links).await? {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_CONVERTED,
                format!("lead {} was converted concurrently", lead.base.code),
            ));
        }
        let lead = load(&txn, id).await?;
        Ok(ConvertLeadResponse {
            lead,
            deal,
            account,
            contact,
            relinked_activities,
            relinked_visit_reports,
        })
    })
    .await;
    let response = ctx.settle(txn, outcome).await?;
    tracing::info!(
        lead_id = %id,
        deal_id = %response.deal.base.id,
        account_id = %response.account.base.id,
        relinked_activities = response.relinked_activities,
        relinked_visit_reports = response.relinked_visit_reports,
        "Lead converted"
    );
    Ok(response)
}

/// Создать контрагента (и, при необходимости, контакт) по компании лида и
/// привязать его к лиду без конвертации.
pub async fn create_account_from_lead(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: LeadId,
    req: CreateAccountFromLeadRequest,
) -> Result<CreateAccountFromLeadResponse, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let lead = load(&txn, id).await?;
        if lead.account_id.is_some() {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_HAS_ACCOUNT,
                format!("lead {} already has an account", lead.base.code),
            ));
        }
        let Some(company) = lead.company() else {
            return Err(ServiceError::invalid_state(
                COMPANY_NAME_REQUIRED,
                "lead has no company name",
            ));
        };

        let account = create_account(&txn, ctx, &lead, company).await?;
        let contact = if req.create_contact {
            Some(create_contact(&txn, ctx, &lead, &account).await?)
        } else {
            None
        };
        let linked = repository::link_account(
            &txn,
            lead.base.id,
            account.base.id,
            contact.as_ref().map(|c| c.base.id),
            ctx.now(),
        )
        .await?;
        if !linked {
            return Err(ServiceError::invalid_state(
                LEAD_ALREADY_HAS_ACCOUNT,
                format!("lead {} was linked to an account concurrently", lead.base.code),
            ));
        }
        let lead = load(&txn, id).await?;
        Ok(CreateAccountFromLeadResponse {
            lead,
            account,
            contact,
        })
    })
    .await;
    ctx.settle(txn, outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a006_pipeline_stage::aggregate::PipelineStageDto;
    use contracts::domain::common::PostalAddress;

    fn qualified_lead() -> Lead {
        let mut lead = Lead::new_for_insert(LeadDto {
            first_name: " Budi ".into(),
            last_name: "Santoso".into(),
            email: Some("budi@rsharapan.id".into()),
            phone: Some("+62 21 555 0101".into()),
            company_name: Some("RS Harapan".into()),
            job_title: Some("Head of Pharmacy".into()),
            address: PostalAddress {
                city: Some("Bandung".into()),
                ..Default::default()
            },
            notes: Some("met at the oncology symposium".into()),
            ..Default::default()
        });
        lead.status = LeadStatus::Qualified;
        lead
    }

    fn stage(is_won: bool) -> PipelineStage {
        PipelineStage::new_for_insert(PipelineStageDto {
            code: if is_won { "closed_won" } else { "proposal" }.into(),
            name: "Stage".into(),
            is_won: Some(is_won),
            ..Default::default()
        })
    }

    #[test]
    fn test_account_copies_lead_details() {
        let lead = qualified_lead();
        let actor = Uuid::new_v4();
        let category = CategoryId::new_v4();
        let account = account_from_lead(&lead, "RS Harapan", category, actor);
        assert_eq!(account.name, "RS Harapan");
        assert_eq!(account.category_id, category);
        assert_eq!(account.address.city.as_deref(), Some("Bandung"));
        assert_eq!(account.email, lead.email);
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.source_lead_id, Some(lead.base.id));
        assert_eq!(account.created_by, Some(actor));
    }

    #[test]
    fn test_deal_takes_lead_defaults() {
        let lead = qualified_lead();
        let account = account_from_lead(&lead, "RS Harapan", CategoryId::new_v4(), Uuid::nil());
        let req = ConvertLeadRequest {
            title: "Chemo supply 2026".into(),
            stage_id: None,
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let deal = deal_from_lead(&lead, &req, &stage(false), &account, None, Uuid::nil(), today);
        assert_eq!(deal.value, 0);
        assert_eq!(deal.probability, 0);
        assert_eq!(deal.source.as_deref(), Some("other"));
        assert_eq!(deal.notes, lead.notes);
        assert_eq!(deal.lead_id, Some(lead.base.id));
        assert_eq!(deal.status, DealStatus::Open);
        assert_eq!(deal.actual_close_date, None);
    }

    #[test]
    fn test_deal_in_won_stage_is_closed_on_creation() {
        let lead = qualified_lead();
        let account = account_from_lead(&lead, "RS Harapan", CategoryId::new_v4(), Uuid::nil());
        let req = ConvertLeadRequest {
            title: "Signed framework".into(),
            value: Some(250_000_000),
            probability: Some(100),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let deal = deal_from_lead(&lead, &req, &stage(true), &account, None, Uuid::nil(), today);
        assert_eq!(deal.status, DealStatus::Won);
        assert_eq!(deal.actual_close_date, Some(today));
        assert_eq!(deal.value, 250_000_000);
    }
}
