mod common;

use backend::domain::{a003_account, a006_pipeline_stage, a007_deal, a009_activity};
use backend::shared::error::ServiceError;
use contracts::domain::a003_account::aggregate::{Account, AccountDto};
use contracts::domain::a006_pipeline_stage::aggregate::{
    PipelineStageDto, PipelineStagePatch, ReorderStagesRequest, StageOrder,
};
use contracts::domain::a007_deal::aggregate::{Deal, DealDto, DealPatch, DealStatus};
use contracts::domain::a009_activity::aggregate::{ActivityListQuery, ActivityType};
use contracts::shared::api::PageRequest;
use sea_orm::DatabaseConnection;

use common::{catalog, ctx, setup, stage, Catalog};

async fn account(db: &DatabaseConnection, cat: &Catalog) -> Account {
    a003_account::service::create(
        db,
        &ctx(),
        AccountDto {
            name: "RS Harapan Kita".into(),
            category_id: Some(cat.category.base.id),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

async fn open_deal(db: &DatabaseConnection, cat: &Catalog) -> Deal {
    let account = account(db, cat).await;
    a007_deal::service::create(
        db,
        &ctx(),
        DealDto {
            title: "Cardiology formulary listing".into(),
            account_id: Some(account.base.id),
            stage_id: Some(cat.prospecting.base.id),
            value: Some(120_000),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_deal_status_follows_stage() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let deal = open_deal(&db, &cat).await;
    assert_eq!(deal.status, DealStatus::Open);
    assert_eq!(deal.actual_close_date, None);

    let actor = ctx();
    let won = a007_deal::service::move_deal(&db, &actor, deal.base.id, cat.won.base.id)
        .await
        .unwrap();
    assert_eq!(won.status, DealStatus::Won);
    assert_eq!(won.stage_id, cat.won.base.id);
    assert_eq!(won.actual_close_date, Some(actor.today()));

    let reopened = a007_deal::service::move_deal(&db, &ctx(), deal.base.id, cat.negotiation.base.id)
        .await
        .unwrap();
    assert_eq!(reopened.status, DealStatus::Open);
    assert_eq!(reopened.actual_close_date, None);

    let lost = a007_deal::service::move_deal(&db, &ctx(), deal.base.id, cat.lost.base.id)
        .await
        .unwrap();
    assert_eq!(lost.status, DealStatus::Lost);

    let stored = a007_deal::service::get(&db, deal.base.id).await.unwrap();
    assert_eq!(stored.status, DealStatus::Lost);
    assert_eq!(stored.stage_id, cat.lost.base.id);

    let moves = a009_activity::service::list(
        &db,
        &ActivityListQuery {
            deal_id: Some(deal.base.id),
            activity_type: Some(ActivityType::Deal),
            ..Default::default()
        },
        PageRequest::default(),
    )
    .await
    .unwrap();
    // deal:created plus three moves
    assert_eq!(moves.total, 4);
}

#[tokio::test]
async fn test_move_there_and_back_restores_the_deal() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let account = account(&db, &cat).await;
    let deal = a007_deal::service::create(
        &db,
        &ctx(),
        DealDto {
            title: "Oncology tender 2026".into(),
            account_id: Some(account.base.id),
            stage_id: Some(cat.proposal.base.id),
            value: Some(500_000),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let actor = ctx();
    let won = a007_deal::service::move_deal(&db, &actor, deal.base.id, cat.won.base.id)
        .await
        .unwrap();
    assert_eq!(won.status, DealStatus::Won);
    assert_eq!(won.actual_close_date, Some(actor.today()));

    let back = a007_deal::service::move_deal(&db, &actor, deal.base.id, cat.proposal.base.id)
        .await
        .unwrap();
    assert_eq!(back.stage_id, deal.stage_id);
    assert_eq!(back.status, deal.status);
    assert_eq!(back.status, DealStatus::Open);
    assert_eq!(back.actual_close_date, None);

    let stored = a007_deal::service::get(&db, deal.base.id).await.unwrap();
    assert_eq!(stored.stage_id, cat.proposal.base.id);
    assert_eq!(stored.actual_close_date, None);

    let moves = a009_activity::service::list(
        &db,
        &ActivityListQuery {
            deal_id: Some(deal.base.id),
            activity_type: Some(ActivityType::Deal),
            ..Default::default()
        },
        PageRequest::default(),
    )
    .await
    .unwrap();
    let to_status: Vec<_> = moves
        .items
        .iter()
        .filter(|a| a.metadata["event"] == "deal:moved")
        .map(|a| a.metadata["to_status"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(to_status.len(), 2);
    assert!(to_status.contains(&"won".to_string()));
    assert!(to_status.contains(&"open".to_string()));
}

#[tokio::test]
async fn test_move_to_current_stage_is_noop() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let deal = open_deal(&db, &cat).await;

    let same = a007_deal::service::move_deal(&db, &ctx(), deal.base.id, cat.prospecting.base.id)
        .await
        .unwrap();
    assert_eq!(same.base.metadata.version, deal.base.metadata.version);
}

#[tokio::test]
async fn test_move_rejects_unknown_and_inactive_stage() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let deal = open_deal(&db, &cat).await;

    let err = a007_deal::service::move_deal(
        &db,
        &ctx(),
        deal.base.id,
        contracts::domain::a006_pipeline_stage::aggregate::PipelineStageId::new_v4(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let parked = a006_pipeline_stage::service::create(
        &db,
        &ctx(),
        PipelineStageDto {
            code: "parked".into(),
            name: "Parked".into(),
            order: Some(9),
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let err = a007_deal::service::move_deal(&db, &ctx(), deal.base.id, parked.base.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STAGE");
}

#[tokio::test]
async fn test_status_cannot_be_patched_directly() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let deal = open_deal(&db, &cat).await;

    let err = a007_deal::service::update(
        &db,
        &ctx(),
        deal.base.id,
        DealPatch {
            status: Some(DealStatus::Won),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATUS");

    let updated = a007_deal::service::update(
        &db,
        &ctx(),
        deal.base.id,
        DealPatch {
            status: Some(DealStatus::Open),
            probability: Some(60),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.probability, 60);
    assert_eq!(updated.status, DealStatus::Open);
}

#[tokio::test]
async fn test_reorder_is_idempotent() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let request = ReorderStagesRequest {
        stages: vec![
            StageOrder { id: cat.won.base.id, order: 1 },
            StageOrder { id: cat.lost.base.id, order: 2 },
            StageOrder { id: cat.prospecting.base.id, order: 3 },
            StageOrder { id: cat.proposal.base.id, order: 4 },
            StageOrder { id: cat.negotiation.base.id, order: 5 },
        ],
    };

    let first = a006_pipeline_stage::service::reorder(&db, &ctx(), request.clone())
        .await
        .unwrap();
    let second = a006_pipeline_stage::service::reorder(&db, &ctx(), request)
        .await
        .unwrap();

    let codes = |stages: &[contracts::domain::a006_pipeline_stage::aggregate::PipelineStage]| {
        stages
            .iter()
            .map(|s| (s.base.code.clone(), s.order))
            .collect::<Vec<_>>()
    };
    assert_eq!(codes(&first), codes(&second));
    assert_eq!(first[0].base.code, "closed_won");
    assert_eq!(first[4].base.code, "negotiation");

    let listed = a006_pipeline_stage::service::list(&db, None).await.unwrap();
    assert_eq!(codes(&listed), codes(&first));
}

#[tokio::test]
async fn test_partial_reorder_is_rejected() {
    let db = setup().await;
    let cat = catalog(&db).await;

    let err = a006_pipeline_stage::service::reorder(
        &db,
        &ctx(),
        ReorderStagesRequest {
            stages: vec![
                StageOrder { id: cat.won.base.id, order: 1 },
                StageOrder { id: cat.lost.base.id, order: 2 },
            ],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "PARTIAL_REORDER");

    let listed = a006_pipeline_stage::service::list(&db, None).await.unwrap();
    assert_eq!(listed[0].base.code, "prospecting");
}

#[tokio::test]
async fn test_stage_in_use_cannot_be_deleted_or_flipped() {
    let db = setup().await;
    let cat = catalog(&db).await;
    let deal = open_deal(&db, &cat).await;

    let err = a006_pipeline_stage::service::delete(&db, &ctx(), cat.prospecting.base.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STAGE_IN_USE");

    let err = a006_pipeline_stage::service::update(
        &db,
        &ctx(),
        cat.prospecting.base.id,
        PipelineStagePatch {
            is_lost: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "STAGE_IN_USE");

    a007_deal::service::delete(&db, &ctx(), deal.base.id).await.unwrap();
    a006_pipeline_stage::service::delete(&db, &ctx(), cat.prospecting.base.id)
        .await
        .unwrap();
    let listed = a006_pipeline_stage::service::list(&db, None).await.unwrap();
    assert_eq!(listed.len(), 4);
}

#[tokio::test]
async fn test_only_one_won_stage() {
    let db = setup().await;
    catalog(&db).await;

    let err = a006_pipeline_stage::service::create(
        &db,
        &ctx(),
        PipelineStageDto {
            code: "closed_won_2".into(),
            name: "Won again".into(),
            order: Some(6),
            is_won: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    match err {
        ServiceError::Validation(errors) => {
            assert_eq!(errors[0].field, "is_won");
            assert_eq!(errors[0].code, "DUPLICATE_WON_STAGE");
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = a006_pipeline_stage::service::create(
        &db,
        &ctx(),
        PipelineStageDto {
            code: "prospecting".into(),
            name: "Prospecting again".into(),
            order: Some(7),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_CODE");

    // stage codes of deleted stages may be reused
    let spare = stage(&db, "spare", 8, false, false).await;
    a006_pipeline_stage::service::delete(&db, &ctx(), spare.base.id)
        .await
        .unwrap();
    stage(&db, "spare", 8, false, false).await;
}
