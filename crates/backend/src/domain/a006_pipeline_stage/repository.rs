use chrono::{DateTime, Utc};
use contracts::domain::a006_pipeline_stage::aggregate::{PipelineStage, PipelineStageId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{PaginatorTrait, QueryOrder, Select, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a006_pipeline_stage")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub name: String,
    pub order: i32,
    pub color: Option<String>,
    pub is_active: bool,
    pub is_won: bool,
    pub is_lost: bool,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PipelineStage {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(PipelineStage {
            base: BaseAggregate::with_metadata(
                PipelineStageId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            name: m.name,
            order: m.order,
            color: m.color,
            is_active: m.is_active,
            is_won: m.is_won,
            is_lost: m.is_lost,
            description: m.description,
        })
    }
}

fn to_active(stage: &PipelineStage) -> ActiveModel {
    let meta = &stage.base.metadata;
    ActiveModel {
        id: Set(stage.base.id.to_string()),
        code: Set(stage.base.code.clone()),
        name: Set(stage.name.clone()),
        order: Set(stage.order),
        color: Set(stage.color.clone()),
        is_active: Set(stage.is_active),
        is_won: Set(stage.is_won),
        is_lost: Set(stage.is_lost),
        description: Set(stage.description.clone()),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    }
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

/// Действующие этапы в порядке справочника (`order`, затем `code`)
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    is_active: Option<bool>,
) -> Result<Vec<PipelineStage>, DbErr> {
    let mut query = live();
    if let Some(active) = is_active {
        query = query.filter(Column::IsActive.eq(active));
    }
    query
        .order_by_asc(Column::Order)
        .order_by_asc(Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(PipelineStage::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: PipelineStageId,
) -> Result<Option<PipelineStage>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(PipelineStage::try_from)
        .transpose()
}

/// Занят ли `code` другим действующим этапом, кроме `except`
pub async fn code_taken<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    except: Option<PipelineStageId>,
) -> Result<bool, DbErr> {
    let mut query = live().filter(Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(Column::Id.ne(id.to_string()));
    }
    Ok(query.count(conn).await? > 0)
}

/// Есть ли другой действующий этап, кроме `except`, с признаком выигрыша
pub async fn won_stage_taken<C: ConnectionTrait>(
    conn: &C,
    except: Option<PipelineStageId>,
) -> Result<bool, DbErr> {
    let mut query = live().filter(Column::IsWon.eq(true));
    if let Some(id) = except {
        query = query.filter(Column::Id.ne(id.to_string()));
    }
    Ok(query.count(conn).await? > 0)
}

pub async fn insert<C: ConnectionTrait>(conn: &C, stage: &PipelineStage) -> Result<(), DbErr> {
    Entity::insert(to_active(stage)).exec(conn).await?;
    Ok(())
}

/// Записать этап, если версия в базе всё ещё `expected_version`.
/// Возвращает false, если другой писатель успел раньше.
pub async fn save<C: ConnectionTrait>(
    conn: &C,
    stage: &PipelineStage,
    expected_version: i32,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .set(to_active(stage))
        .filter(Column::Id.eq(stage.base.id.to_string()))
        .filter(Column::Version.eq(expected_version))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn set_order<C: ConnectionTrait>(
    conn: &C,
    id: PipelineStageId,
    order: i32,
    now: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let result = Entity::update_many()
        .col_expr(Column::Order, Expr::value(order))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    id: PipelineStageId,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}
