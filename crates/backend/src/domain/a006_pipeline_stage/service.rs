//! Справочник этапов воронки: упорядоченный набор этапов, по которым движутся сделки.

use contracts::domain::a006_pipeline_stage::aggregate::{
    PipelineStage, PipelineStageDto, PipelineStageId, PipelineStagePatch, ReorderStagesRequest,
};
use contracts::shared::api::FieldError;
use contracts::shared::error_codes::{
    DUPLICATE_CODE, DUPLICATE_WON_STAGE, FIELD_DUPLICATE, FIELD_OUT_OF_RANGE, FIELD_REQUIRED,
    PARTIAL_REORDER, STAGE_IN_USE,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::collections::HashSet;

use super::repository;
use crate::domain::a007_deal::repository as deal_repository;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

pub async fn list(
    db: &DatabaseConnection,
    is_active: Option<bool>,
) -> Result<Vec<PipelineStage>, ServiceError> {
    Ok(repository::list(db, is_active).await?)
}

pub async fn get(db: &DatabaseConnection, id: PipelineStageId) -> Result<PipelineStage, ServiceError> {
    repository::get_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found::<PipelineStage>(id))
}

/// Уникальность кода и правило единственного выигрышного этапа, проверяемые
/// по действующему справочнику без самого `stage`
async fn check_catalog_rules<C: ConnectionTrait>(
    conn: &C,
    stage: &PipelineStage,
    except: Option<PipelineStageId>,
) -> Result<(), ServiceError> {
    if repository::code_taken(conn, &stage.base.code, except).await? {
        return Err(ServiceError::invalid_state(
            DUPLICATE_CODE,
            format!("Stage code '{}' is already in use", stage.base.code),
        ));
    }
    if stage.is_won && repository::won_stage_taken(conn, except).await? {
        return Err(ServiceError::field(
            "is_won",
            DUPLICATE_WON_STAGE,
            "another stage is already flagged as won",
        ));
    }
    Ok(())
}

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: PipelineStageDto,
) -> Result<PipelineStage, ServiceError> {
    let stage = PipelineStage::new_for_insert(dto);
    ServiceError::check(stage.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        check_catalog_rules(&txn, &stage, None).await?;
        repository::insert(&txn, &stage).await.map_err(|e| {
            ServiceError::duplicate_or_db(e, format!("Stage code '{}' is already in use", stage.base.code))
        })?;
        Ok(stage)
    })
    .await;
    let stage = ctx.settle(txn, outcome).await?;
    tracing::info!(stage_id = %stage.base.id, code = %stage.base.code, "Pipeline stage created");
    Ok(stage)
}

/// Обновление этапа. Терминальные признаки нельзя менять, пока на этапе
/// есть действующие сделки: их статус повторяет эти признаки.
pub async fn update(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: PipelineStageId,
    patch: PipelineStagePatch,
) -> Result<PipelineStage, ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let mut stage = repository::get_by_id(&txn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found::<PipelineStage>(id))?;
        let expected_version = stage.base.metadata.version;
        let old_status = stage.deal_status();

        stage.apply_patch(patch);
        ServiceError::check(stage.validate())?;
        check_catalog_rules(&txn, &stage, Some(id)).await?;

        if stage.deal_status() != old_status && deal_repository::count_in_stage(&txn, id).await? > 0 {
            return Err(ServiceError::invalid_state(
                STAGE_IN_USE,
                "terminal flags cannot change while deals reference the stage",
            ));
        }

        stage.base.touch();
        stage.base.metadata.increment_version();
        if !repository::save(&txn, &stage, expected_version).await.map_err(|e| {
            ServiceError::duplicate_or_db(e, format!("Stage code '{}' is already in use", stage.base.code))
        })? {
            return Err(ServiceError::Conflict);
        }
        Ok(stage)
    })
    .await;
    let stage = ctx.settle(txn, outcome).await?;
    tracing::info!(stage_id = %id, "Pipeline stage updated");
    Ok(stage)
}

/// Проверка формы запроса на переупорядочивание: без повторов id и отрицательных порядков
fn validate_reorder(req: &ReorderStagesRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.stages.is_empty() {
        errors.push(FieldError::new("stages", FIELD_REQUIRED, "stages must not be empty"));
    }
    let mut seen = HashSet::new();
    for (i, entry) in req.stages.iter().enumerate() {
        if !seen.insert(entry.id) {
            errors.push(FieldError::new(
                format!("stages[{}].id", i),
                FIELD_DUPLICATE,
                format!("stage {} is listed more than once", entry.id),
            ));
        }
        if entry.order < 0 {
            errors.push(FieldError::new(
                format!("stages[{}].order", i),
                FIELD_OUT_OF_RANGE,
                "order must be non-negative",
            ));
        }
    }
    errors
}

/// Переписать порядок всех действующих этапов в одной транзакции.
///
/// Запрос должен назвать каждый действующий этап ровно один раз.
pub async fn reorder(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    req: ReorderStagesRequest,
) -> Result<Vec<PipelineStage>, ServiceError> {
    ServiceError::check(validate_reorder(&req))?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        let live: HashSet<PipelineStageId> = repository::list(&txn, None)
            .await?
            .into_iter()
            .map(|s| s.base.id)
            .collect();

        if let Some(unknown) = req.stages.iter().find(|e| !live.contains(&e.id)) {
            return Err(ServiceError::not_found::<PipelineStage>(unknown.id));
        }
        let submitted: HashSet<PipelineStageId> = req.stages.iter().map(|e| e.id).collect();
        let missing = live.difference(&submitted).count();
        if missing > 0 {
            return Err(ServiceError::invalid_state(
                PARTIAL_REORDER,
                format!("{} live stage(s) missing from the reorder request", missing),
            ));
        }

        let now = ctx.now();
        for entry in &req.stages {
            repository::set_order(&txn, entry.id, entry.order, now).await?;
        }
        let stages = repository::list(&txn, None).await?;
        Ok(stages)
    })
    .await;
    let stages = ctx.settle(txn, outcome).await?;
    tracing::info!(stages = stages.len(), "Pipeline stages reordered");
    Ok(stages)
}

/// Мягкое удаление этапа, на который не ссылается ни одна действующая сделка
pub async fn delete(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    id: PipelineStageId,
) -> Result<(), ServiceError> {
    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if repository::get_by_id(&txn, id).await?.is_none() {
            return Err(ServiceError::not_found::<PipelineStage>(id));
        }
        let in_use = deal_repository::count_in_stage(&txn, id).await?;
        if in_use > 0 {
            return Err(ServiceError::invalid_state(
                STAGE_IN_USE,
                format!("{} deal(s) still reference this stage", in_use),
            ));
        }
        repository::soft_delete(&txn, id, ctx.now()).await?;
        Ok(())
    })
    .await;
    ctx.settle(txn, outcome).await?;
    tracing::info!(stage_id = %id, "Pipeline stage deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a006_pipeline_stage::aggregate::StageOrder;

    #[test]
    fn test_reorder_rejects_duplicates_and_negative_orders() {
        let id = PipelineStageId::new_v4();
        let req = ReorderStagesRequest {
            stages: vec![
                StageOrder { id, order: 1 },
                StageOrder { id, order: -2 },
            ],
        };
        let errors = validate_reorder(&req);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["stages[1].id", "stages[1].order"]);
    }

    #[test]
    fn test_reorder_rejects_empty_request() {
        let errors = validate_reorder(&ReorderStagesRequest::default());
        assert_eq!(errors[0].code, FIELD_REQUIRED);
    }
}
