mod common;

use backend::domain::{a003_account, a004_contact, a008_visit_report, a009_activity};
use contracts::domain::a003_account::aggregate::{Account, AccountDto};
use contracts::domain::a004_contact::aggregate::ContactDto;
use contracts::domain::a008_visit_report::aggregate::{
    RejectVisitRequest, VisitPhotoRequest, VisitReport, VisitReportDto, VisitReportListQuery,
    VisitReportId, VisitReportPatch, VisitStatus,
};
use contracts::domain::a009_activity::aggregate::{ActivityListQuery, ActivityType};
use contracts::domain::common::GeoLocation;
use contracts::shared::api::PageRequest;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use common::{catalog, ctx, ctx_for, setup, setup_pooled};

fn at(latitude: f64, longitude: f64) -> GeoLocation {
    GeoLocation {
        latitude,
        longitude,
        address: Some("Jl. Sudirman 1, Jakarta".into()),
    }
}

async fn pharmacy(db: &DatabaseConnection) -> Account {
    let cat = catalog(db).await;
    a003_account::service::create(
        db,
        &ctx(),
        AccountDto {
            name: "Apotek Kimia Farma".into(),
            category_id: Some(cat.category.base.id),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

async fn draft(db: &DatabaseConnection, rep: Uuid) -> VisitReport {
    let account = pharmacy(db).await;
    draft_for(db, &account, rep).await
}

async fn draft_for(db: &DatabaseConnection, account: &Account, rep: Uuid) -> VisitReport {
    a008_visit_report::service::create(
        db,
        &ctx_for(rep),
        VisitReportDto {
            account_id: Some(account.base.id),
            visit_date: Some("2026-05-04".into()),
            purpose: Some("Detailing new antihypertensive".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let db = setup().await;
    let rep = Uuid::new_v4();
    let manager = Uuid::new_v4();
    let report = draft(&db, rep).await;
    assert_eq!(report.status, VisitStatus::Draft);
    assert_eq!(report.sales_rep_id, rep);

    let checked_in = a008_visit_report::service::check_in(&db, &ctx_for(rep), report.base.id, at(-6.2, 106.8))
        .await
        .unwrap();
    assert_eq!(checked_in.status, VisitStatus::Submitted);
    assert!(checked_in.check_in_time.is_some());
    assert_eq!(checked_in.check_in_location.as_ref().map(|l| l.latitude), Some(-6.2));

    let checked_out = a008_visit_report::service::check_out(&db, &ctx_for(rep), report.base.id, at(-6.21, 106.81))
        .await
        .unwrap();
    assert!(checked_out.check_out_time >= checked_out.check_in_time);
    assert_eq!(checked_out.status, VisitStatus::Submitted);

    let approved = a008_visit_report::service::approve(&db, &ctx_for(manager), report.base.id)
        .await
        .unwrap();
    assert_eq!(approved.status, VisitStatus::Approved);
    assert_eq!(approved.approved_by, Some(manager));
    assert!(approved.approved_at.is_some());
    assert_eq!(approved.rejection_reason, None);

    let err = a008_visit_report::service::update(
        &db,
        &ctx_for(rep),
        report.base.id,
        VisitReportPatch {
            notes: Some("late edit".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATUS");

    let history = a009_activity::service::list(
        &db,
        &ActivityListQuery {
            account_id: approved.account_id,
            activity_type: Some(ActivityType::Visit),
            ..Default::default()
        },
        PageRequest::default(),
    )
    .await
    .unwrap();
    // created, checked in, checked out, approved
    assert_eq!(history.total, 4);
}

#[tokio::test]
async fn test_check_out_requires_check_in() {
    let db = setup().await;
    let report = draft(&db, Uuid::new_v4()).await;

    let err = a008_visit_report::service::check_out(&db, &ctx(), report.base.id, at(-6.2, 106.8))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERATION");

    a008_visit_report::service::check_in(&db, &ctx(), report.base.id, at(-6.2, 106.8))
        .await
        .unwrap();
    let err = a008_visit_report::service::check_in(&db, &ctx(), report.base.id, at(-6.2, 106.8))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERATION");
}

#[tokio::test]
async fn test_check_in_rejects_out_of_range_location() {
    let db = setup().await;
    let report = draft(&db, Uuid::new_v4()).await;

    let err = a008_visit_report::service::check_in(&db, &ctx(), report.base.id, at(95.0, 106.8))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    let stored = a008_visit_report::service::get(&db, report.base.id).await.unwrap();
    assert!(stored.check_in_time.is_none());
}

#[tokio::test]
async fn test_review_requires_submitted_report() {
    let db = setup().await;
    let report = draft(&db, Uuid::new_v4()).await;

    let err = a008_visit_report::service::approve(&db, &ctx(), report.base.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATUS");

    let err = a008_visit_report::service::approve(&db, &ctx(), VisitReportId::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let db = setup().await;
    let report = draft(&db, Uuid::new_v4()).await;
    a008_visit_report::service::update(
        &db,
        &ctx(),
        report.base.id,
        VisitReportPatch {
            status: Some(VisitStatus::Submitted),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = a008_visit_report::service::reject(
        &db,
        &ctx(),
        report.base.id,
        RejectVisitRequest { reason: "   ".into() },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let rejected = a008_visit_report::service::reject(
        &db,
        &ctx(),
        report.base.id,
        RejectVisitRequest {
            reason: "No check-in recorded".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(rejected.status, VisitStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("No check-in recorded"));

    let err = a008_visit_report::service::check_in(&db, &ctx(), report.base.id, at(-6.2, 106.8))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERATION");
}

#[tokio::test]
async fn test_submitted_report_can_revert_to_draft() {
    let db = setup().await;
    let report = draft(&db, Uuid::new_v4()).await;
    let submit = |status| VisitReportPatch {
        status: Some(status),
        ..Default::default()
    };

    let submitted = a008_visit_report::service::update(&db, &ctx(), report.base.id, submit(VisitStatus::Submitted))
        .await
        .unwrap();
    assert_eq!(submitted.status, VisitStatus::Submitted);
    let reverted = a008_visit_report::service::update(&db, &ctx(), report.base.id, submit(VisitStatus::Draft))
        .await
        .unwrap();
    assert_eq!(reverted.status, VisitStatus::Draft);

    let err = a008_visit_report::service::update(&db, &ctx(), report.base.id, submit(VisitStatus::Approved))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATUS");
}

#[tokio::test]
async fn test_photos_accumulate_in_any_status() {
    let db = setup().await;
    let report = draft(&db, Uuid::new_v4()).await;

    a008_visit_report::service::upload_photo(
        &db,
        &ctx(),
        report.base.id,
        VisitPhotoRequest {
            url: "https://cdn.example.id/visits/1.jpg".into(),
        },
    )
    .await
    .unwrap();
    a008_visit_report::service::check_in(&db, &ctx(), report.base.id, at(-6.2, 106.8))
        .await
        .unwrap();
    a008_visit_report::service::approve(&db, &ctx(), report.base.id)
        .await
        .unwrap();
    let with_photos = a008_visit_report::service::upload_photo(
        &db,
        &ctx(),
        report.base.id,
        VisitPhotoRequest {
            url: "https://cdn.example.id/visits/2.jpg".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(
        with_photos.photos,
        vec![
            "https://cdn.example.id/visits/1.jpg".to_string(),
            "https://cdn.example.id/visits/2.jpg".to_string(),
        ]
    );
    assert_eq!(with_photos.status, VisitStatus::Approved);
}

#[tokio::test]
async fn test_contact_fills_account_and_must_match() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let mut accounts = Vec::new();
    for name in ["RS Siloam", "RS Mitra Keluarga"] {
        accounts.push(
            a003_account::service::create(
                &db,
                &ctx(),
                AccountDto {
                    name: name.into(),
                    category_id: Some(cat.category.base.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap(),
        );
    }
    let contact = a004_contact::service::create(
        &db,
        &ctx(),
        ContactDto {
            account_id: Some(accounts[0].base.id),
            first_name: "Sari".into(),
            role_id: Some(cat.role.base.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let report = a008_visit_report::service::create(
        &db,
        &ctx(),
        VisitReportDto {
            contact_id: Some(contact.base.id),
            visit_date: Some("2026-05-05".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(report.account_id, Some(accounts[0].base.id));

    let err = a008_visit_report::service::create(
        &db,
        &ctx(),
        VisitReportDto {
            account_id: Some(accounts[1].base.id),
            contact_id: Some(contact.base.id),
            visit_date: Some("2026-05-05".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let listed = a008_visit_report::service::list(
        &db,
        &VisitReportListQuery {
            account_id: Some(accounts[0].base.id),
            ..Default::default()
        },
        PageRequest::default(),
    )
    .await
    .unwrap();
    assert_eq!(listed.total, 1);
}

#[tokio::test]
async fn test_visit_date_is_required() {
    let db = setup().await;
    let err = a008_visit_report::service::create(&db, &ctx(), VisitReportDto::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_have_one_winner() {
    let (_dir, db) = setup_pooled(8).await;
    let account = pharmacy(&db).await;

    for round in 0..5 {
        let report = draft_for(&db, &account, Uuid::new_v4()).await;
        a008_visit_report::service::check_in(&db, &ctx(), report.base.id, at(-6.2, 106.8))
            .await
            .unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db = db.clone();
                let id = report.base.id;
                tokio::spawn(async move { a008_visit_report::service::approve(&db, &ctx(), id).await })
            })
            .collect();
        let mut approvers = Vec::new();
        let mut codes = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(r) => approvers.push(r.approved_by),
                Err(err) => codes.push(err.code()),
            }
        }

        assert_eq!(approvers.len(), 1, "round {round}");
        assert_eq!(codes, vec!["INVALID_STATUS"], "round {round}");
        let stored = a008_visit_report::service::get(&db, report.base.id).await.unwrap();
        assert_eq!(stored.status, VisitStatus::Approved);
        assert_eq!(stored.approved_by, approvers[0]);
    }
}
