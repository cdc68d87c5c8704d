//! Жизненный цикл отчёта о визите: `draft → submitted → approved | rejected`.
//!
//! Каждый переход - один условный UPDATE, фильтр которого и есть предусловие
//! перехода. Если UPDATE ничего не затронул, отчёт перечитывается, чтобы
//! объяснить вызывающему причину отказа.

use contracts::domain::a003_account::aggregate::Account;
use contracts::domain::a004_contact::aggregate::Contact;
use contracts::domain::a005_lead::aggregate::Lead;
use contracts::domain::a007_deal::aggregate::Deal;
use contracts::domain::a008_visit_report::aggregate::{
    RejectVisitRequest, VisitPhotoRequest, VisitReport, VisitReportDto, VisitReportId,
    VisitReportListQuery, VisitReportPatch, VisitStatus,
};
use contracts::domain::a009_activity::aggregate::{Activity, ActivityType};
use contracts::domain::common::GeoLocation;
use contracts::shared::api::{Page, PageRequest};
use contracts::shared::error_codes::{
    FIELD_INVALID_FORMAT, FIELD_NOT_ALLOWED, FIELD_OUT_OF_RANGE, FIELD_REQUIRED,
    INVALID_OPERATION, INVALID_STATUS, LEAD_NOT_FOUND,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::{json, Value};

use super::repository;
use crate::domain::a003_account::repository as account_repository;
use crate::domain::a004_contact::repository as contact_repository;
use crate::domain::a005_lead::repository as lead_repository;
use crate::domain::a007_deal::repository as deal_repository;
use crate::domain::a009_activity::service as activity_service;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;
use crate::shared::format::parse_visit_date;

async fn load<C: ConnectionTrait>(conn: &C, id: VisitReportId) -> Result<VisitReport, ServiceError> {
    repository::get_by_id(conn, id)
        .await?
        .ok_or_else(|| ServiceError::not_found::<VisitReport>(id))
}

fn bad_status(report: &VisitReport, action: &str) -> ServiceError {
    ServiceError::invalid_state(
        INVALID_STATUS,
        format!(
            "cannot {} visit report {} in status '{}'",
            action,
            report.base.code,
            report.status.as_str()
        ),
    )
}

fn check_location(field: &str, location: &GeoLocation) -> Result<(), ServiceError> {
    location
        .validate()
        .map_err(|message| ServiceError::field(field, FIELD_OUT_OF_RANGE, message))
}

// ============================================================================
// Preconditions
// ============================================================================

fn can_check_in(report: &VisitReport) -> Result<(), ServiceError> {
    if report.is_checked_in() {
        return Err(ServiceError::invalid_state(
            INVALID_OPERATION,
            format!("visit report {} is already checked in", report.base.code),
        ));
    }
    if !report.status.is_editable() {
        return Err(ServiceError::invalid_state(
            INVALID_OPERATION,
            format!(
                "visit report {} is {} and no longer accepts check-ins",
                report.base.code,
                report.status.as_str()
            ),
        ));
    }
    Ok(())
}

fn can_check_out(report: &VisitReport) -> Result<(), ServiceError> {
    if !report.is_checked_in() {
        return Err(ServiceError::invalid_state(
            INVALID_OPERATION,
            format!("visit report {} has no check-in yet", report.base.code),
        ));
    }
    if report.is_checked_out() {
        return Err(ServiceError::invalid_state(
            INVALID_OPERATION,
            format!("visit report {} is already checked out", report.base.code),
        ));
    }
    if !report.status.is_editable() {
        return Err(ServiceError::invalid_state(
            INVALID_OPERATION,
            format!(
                "visit report {} is {} and no longer accepts check-outs",
                report.base.code,
                report.status.as_str()
            ),
        ));
    }
    Ok(())
}

fn can_review(report: &VisitReport, action: &str) -> Result<(), ServiceError> {
    if report.status != VisitStatus::Submitted {
        return Err(bad_status(report, action));
    }
    Ok(())
}

fn can_update(report: &VisitReport, next: Option<VisitStatus>) -> Result<(), ServiceError> {
    if !report.status.is_editable() {
        return Err(bad_status(report, "update"));
    }
    if let Some(next) = next {
        if !report.status.can_update_to(next) {
            return Err(ServiceError::invalid_state(
                INVALID_STATUS,
                format!(
                    "visit report cannot go from '{}' to '{}' through update",
                    report.status.as_str(),
                    next.as_str()
                ),
            ));
        }
    }
    Ok(())
}

/// Объяснить, почему условный переход не затронул ни одной строки
async fn refusal<C: ConnectionTrait>(
    conn: &C,
    id: VisitReportId,
    precondition: impl Fn(&VisitReport) -> Result<(), ServiceError>,
) -> ServiceError {
    match load(conn, id).await {
        Ok(current) => match precondition(&current) {
            Err(err) => err,
            Ok(()) => ServiceError::Conflict,
        },
        Err(err) => err,
    }
}

/// Активность `visit` со ссылками отчёта
fn visit_activity(
    report: &VisitReport,
    ctx: &ServiceContext,
    description: String,
    metadata: Value,
) -> Activity {
    let mut activity = Activity::new(ActivityType::Visit, ctx.actor, description);
    activity.account_id = report.account_id;
    activity.contact_id = report.contact_id;
    activity.lead_id = report.lead_id;
    activity.deal_id = report.deal_id;
    activity.metadata = metadata;
    activity
}

// ============================================================================
// Queries
// ============================================================================

pub async fn get(db: &DatabaseConnection, id: VisitReportId) -> Result<VisitReport, ServiceError> {
    load(db, id).await
}

pub async fn list(
    db: &DatabaseConnection,
    query: &VisitReportListQuery,
    page: PageRequest,
) -> Result<Page<VisitReport>, ServiceError> {
    Ok(repository::list(db, query, page).await?)
}

// ============================================================================
// Operations
// ============================================================================

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: VisitReportDto,
) -> Result<VisitReport, ServiceError> {
    let Some(raw_date) = dto.visit_date.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Err(ServiceError::field(
            "visit_date",
            FIELD_REQUIRED,
            "visit_date is required",
        ));
    };
    let visit_date = parse_visit_date(raw_date, ctx.offset)
        .map_err(|message| ServiceError::field("visit_date", FIELD_INVALID_FORMAT, message))?;

    let mut report = VisitReport::new_for_insert(dto.sales_rep_id.unwrap_or(ctx.actor), visit_date);
    report.account_id = dto.account_id;
    report.contact_id = dto.contact_id;
    report.lead_id = dto.lead_id;
    report.deal_id = dto.deal_id;
    report.purpose = dto.purpose;
    report.notes = dto.notes;
    report.created_by = Some(ctx.actor);

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if let Some(account_id) = report.account_id {
            account_repository::get_by_id(&txn, account_id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Account>(account_id))?;
        }
        if let Some(contact_id) = report.contact_id {
            let contact = contact_repository::get_by_id(&txn, contact_id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Contact>(contact_id))?;
            match report.account_id {
                Some(account_id) if account_id != contact.account_id => {
                    return Err(ServiceError::field(
                        "contact_id",
                        FIELD_NOT_ALLOWED,
                        "contact belongs to a different account",
                    ));
                }
                Some(_) => {}
                None => report.account_id = Some(contact.account_id),
            }
        }
        if let Some(lead_id) = report.lead_id {
            lead_repository::get_by_id(&txn, lead_id)
                .await?
                .ok_or_else(|| ServiceError::not_found_as::<Lead>(LEAD_NOT_FOUND, lead_id))?;
        }
        if let Some(deal_id) = report.deal_id {
            deal_repository::get_by_id(&txn, deal_id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Deal>(deal_id))?;
        }

        repository::insert(&txn, &report).await?;
        let activity = visit_activity(
            &report,
            ctx,
            format!("Visit {} planned for {}", report.base.code, report.visit_date),
            json!({
                "event": "visit:created",
                "visit_report_id": report.base.id,
                "visit_date": report.visit_date,
            }),
        );
        activity_service::record(&txn, &activity).await?;
        Ok(report)
    })
    .await;
    let report = ctx.settle(txn, outcome).await?;
    tracing::info!(visit_report_id = %report.base.id, "Visit report created");
    Ok(report)
}

/// Редактирование черновика или отправленного отчёта. Из смен статуса здесь
/// допустима только `draft ↔ submitted`.
pub async fn update(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: VisitReportId,
    patch: VisitReportPatch,
) -> Result<VisitReport, ServiceError> {
    let visit_date = match patch.visit_date.as_deref() {
        Some(raw) => Some(
            parse_visit_date(raw, ctx.offset)
                .map_err(|message| ServiceError::field("visit_date", FIELD_INVALID_FORMAT, message))?,
        ),
        None => None,
    };

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let mut report = load(&txn, id).await?;
        can_update(&report, patch.status)?;
        let expected_version = report.base.metadata.version;
        let from_status = report.status;

        if let Some(contact_id) = patch.contact_id {
            let contact = contact_repository::get_by_id(&txn, contact_id)
                .await?
                .ok_or_else(|| ServiceError::not_found::<Contact>(contact_id))?;
            if matches!(report.account_id, Some(account_id) if account_id != contact.account_id) {
                return Err(ServiceError::field(
                    "contact_id",
                    FIELD_NOT_ALLOWED,
                    "contact belongs to a different account",
                ));
            }
            report.contact_id = Some(contact_id);
        }
        if let Some(date) = visit_date {
            report.visit_date = date;
        }
        if let Some(purpose) = patch.purpose {
            report.purpose = Some(purpose);
        }
        if let Some(notes) = patch.notes {
            report.notes = Some(notes);
        }
        if let Some(status) = patch.status {
            report.status = status;
        }

        report.base.touch();
        report.base.metadata.increment_version();
        if !repository::save(&txn, &report, expected_version).await? {
            let next = patch.status;
            return Err(refusal(&txn, id, |r| can_update(r, next)).await);
        }
        if from_status != report.status {
            let event = match report.status {
                VisitStatus::Submitted => "visit:submitted",
                _ => "visit:reverted",
            };
            let activity = visit_activity(
                &report,
                ctx,
                format!(
                    "Visit {} moved from {} to {}",
                    report.base.code,
                    from_status.as_str(),
                    report.status.as_str()
                ),
                json!({
                    "event": event,
                    "visit_report_id": report.base.id,
                    "from_status": from_status.as_str(),
                    "to_status": report.status.as_str(),
                }),
            );
            activity_service::record(&txn, &activity).await?;
        }
        Ok((report, from_status))
    })
    .await;
    let (report, from_status) = ctx.settle(txn, outcome).await?;
    if from_status != report.status {
        tracing::info!(
            visit_report_id = %id,
            from = from_status.as_str(),
            to = report.status.as_str(),
            "Visit report status changed"
        );
    }
    Ok(report)
}

pub async fn check_in(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: VisitReportId,
    location: GeoLocation,
) -> Result<VisitReport, ServiceError> {
    check_location("location", &location)?;
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if !repository::record_check_in(&txn, id, ctx.now(), &location).await? {
            return Err(refusal(&txn, id, can_check_in).await);
        }
        let report = load(&txn, id).await?;
        let activity = visit_activity(
            &report,
            ctx,
            format!("Checked in for visit {}", report.base.code),
            json!({
                "event": "visit:checked_in",
                "visit_report_id": report.base.id,
                "latitude": location.latitude,
                "longitude": location.longitude,
                "address": location.address,
            }),
        );
        activity_service::record(&txn, &activity).await?;
        Ok(report)
    })
    .await;
    let report = ctx.settle(txn, outcome).await?;
    tracing::info!(visit_report_id = %id, status = report.status.as_str(), "Visit checked in");
    Ok(report)
}

pub async fn check_out(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: VisitReportId,
    location: GeoLocation,
) -> Result<VisitReport, ServiceError> {
    check_location("location", &location)?;
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if !repository::record_check_out(&txn, id, ctx.now(), &location).await? {
            return Err(refusal(&txn, id, can_check_out).await);
        }
        let report = load(&txn, id).await?;
        let activity = visit_activity(
            &report,
            ctx,
            format!("Checked out of visit {}", report.base.code),
            json!({
                "event": "visit:checked_out",
                "visit_report_id": report.base.id,
                "latitude": location.latitude,
                "longitude": location.longitude,
                "address": location.address,
            }),
        );
        activity_service::record(&txn, &activity).await?;
        Ok(report)
    })
    .await;
    let report = ctx.settle(txn, outcome).await?;
    tracing::info!(visit_report_id = %id, "Visit checked out");
    Ok(report)
}

/// Утверждение отправленного отчёта. Из двух одновременных утверждений
/// успешно ровно одно; второе видит уже утверждённый отчёт.
pub async fn approve(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: VisitReportId,
) -> Result<VisitReport, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let approved =
            repository::record_review(&txn, id, VisitStatus::Approved, ctx.actor, ctx.now(), None)
                .await?;
        if !approved {
            return Err(refusal(&txn, id, |r| can_review(r, "approve")).await);
        }
        let report = load(&txn, id).await?;
        let activity = visit_activity(
            &report,
            ctx,
            format!("Visit {} approved", report.base.code),
            json!({ "event": "visit:approved", "visit_report_id": report.base.id }),
        );
        activity_service::record(&txn, &activity).await?;
        Ok(report)
    })
    .await;
    let report = ctx.settle(txn, outcome).await?;
    tracing::info!(visit_report_id = %id, approver = %ctx.actor, "Visit report approved");
    Ok(report)
}

pub async fn reject(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: VisitReportId,
    req: RejectVisitRequest,
) -> Result<VisitReport, ServiceError> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ServiceError::field(
            "reason",
            FIELD_REQUIRED,
            "a rejection reason is required",
        ));
    }
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let rejected = repository::record_review(
            &txn,
            id,
            VisitStatus::Rejected,
            ctx.actor,
            ctx.now(),
            Some(reason.clone()),
        )
        .await?;
        if !rejected {
            return Err(refusal(&txn, id, |r| can_review(r, "reject")).await);
        }
        let report = load(&txn, id).await?;
        let activity = visit_activity(
            &report,
            ctx,
            format!("Visit {} rejected: {}", report.base.code, reason),
            json!({
                "event": "visit:rejected",
                "visit_report_id": report.base.id,
                "reason": reason,
            }),
        );
        activity_service::record(&txn, &activity).await?;
        Ok(report)
    })
    .await;
    let report = ctx.settle(txn, outcome).await?;
    tracing::info!(visit_report_id = %id, reviewer = %ctx.actor, "Visit report rejected");
    Ok(report)
}

/// Добавление фото. Фото принимаются в любом статусе.
pub async fn upload_photo(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: VisitReportId,
    req: VisitPhotoRequest,
) -> Result<VisitReport, ServiceError> {
    let url = req.url.trim().to_string();
    if url.is_empty() {
        return Err(ServiceError::field("url", FIELD_REQUIRED, "photo url is required"));
    }
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if !repository::append_photo(&txn, id, &url, ctx.now()).await? {
            return Err(ServiceError::not_found::<VisitReport>(id));
        }
        let report = load(&txn, id).await?;
        Ok(report)
    })
    .await;
    let report = ctx.settle(txn, outcome).await?;
    tracing::debug!(visit_report_id = %id, photos = report.photos.len(), "Visit photo added");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contracts::domain::common::timestamp_now;
    use uuid::Uuid;

    fn report(status: VisitStatus) -> VisitReport {
        let mut r = VisitReport::new_for_insert(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        );
        r.status = status;
        r
    }

    fn code(result: Result<(), ServiceError>) -> &'static str {
        result.err().map(|e| e.code()).unwrap_or("OK")
    }

    #[test]
    fn test_check_in_preconditions() {
        assert_eq!(code(can_check_in(&report(VisitStatus::Draft))), "OK");
        let mut r = report(VisitStatus::Submitted);
        r.check_in_time = Some(timestamp_now());
        assert_eq!(code(can_check_in(&r)), INVALID_OPERATION);
        assert_eq!(code(can_check_in(&report(VisitStatus::Approved))), INVALID_OPERATION);
    }

    #[test]
    fn test_check_out_requires_check_in() {
        let mut r = report(VisitStatus::Draft);
        assert_eq!(code(can_check_out(&r)), INVALID_OPERATION);
        r.check_in_time = Some(timestamp_now());
        assert_eq!(code(can_check_out(&r)), "OK");
        r.check_out_time = Some(timestamp_now());
        assert_eq!(code(can_check_out(&r)), INVALID_OPERATION);
    }

    #[test]
    fn test_review_requires_submitted() {
        assert_eq!(code(can_review(&report(VisitStatus::Submitted), "approve")), "OK");
        for status in [VisitStatus::Draft, VisitStatus::Approved, VisitStatus::Rejected] {
            assert_eq!(code(can_review(&report(status), "approve")), INVALID_STATUS);
        }
    }

    #[test]
    fn test_update_only_moves_between_draft_and_submitted() {
        let draft = report(VisitStatus::Draft);
        assert_eq!(code(can_update(&draft, Some(VisitStatus::Submitted))), "OK");
        assert_eq!(code(can_update(&draft, Some(VisitStatus::Approved))), INVALID_STATUS);
        assert_eq!(code(can_update(&report(VisitStatus::Rejected), None)), INVALID_STATUS);
    }

    #[test]
    fn test_location_bounds_are_validation_errors() {
        let bad = GeoLocation {
            latitude: 120.0,
            longitude: 0.0,
            address: None,
        };
        let err = check_location("location", &bad).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
