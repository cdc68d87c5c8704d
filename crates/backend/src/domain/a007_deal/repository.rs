use chrono::{DateTime, Utc};
use contracts::domain::a003_account::aggregate::AccountId;
use contracts::domain::a004_contact::aggregate::ContactId;
use contracts::domain::a005_lead::aggregate::LeadId;
use contracts::domain::a006_pipeline_stage::aggregate::PipelineStageId;
use contracts::domain::a007_deal::aggregate::{Deal, DealId, DealListQuery, DealStatus};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use contracts::shared::api::{Page, PageRequest};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{PaginatorTrait, QueryOrder, Select, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a007_deal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub account_id: String,
    pub contact_id: Option<String>,
    pub stage_id: String,
    pub value: i64,
    pub probability: i32,
    pub expected_close_date: Option<Date>,
    pub actual_close_date: Option<Date>,
    pub assigned_to: Option<String>,
    pub status: String,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub lead_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Deal {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(Deal {
            base: BaseAggregate::with_metadata(
                DealId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            title: m.title,
            description: m.description,
            account_id: AccountId::new(convert::uuid("account_id", &m.account_id)?),
            contact_id: convert::opt_uuid("contact_id", m.contact_id.as_deref())?.map(ContactId::new),
            stage_id: PipelineStageId::new(convert::uuid("stage_id", &m.stage_id)?),
            value: m.value,
            probability: m.probability,
            expected_close_date: m.expected_close_date,
            actual_close_date: m.actual_close_date,
            assigned_to: convert::opt_uuid("assigned_to", m.assigned_to.as_deref())?,
            status: convert::enumeration("status", &m.status, DealStatus::from_str)?,
            source: m.source,
            notes: m.notes,
            lead_id: convert::opt_uuid("lead_id", m.lead_id.as_deref())?.map(LeadId::new),
            created_by: convert::opt_uuid("created_by", m.created_by.as_deref())?,
        })
    }
}

fn to_active(deal: &Deal) -> ActiveModel {
    let meta = &deal.base.metadata;
    ActiveModel {
        id: Set(deal.base.id.to_string()),
        code: Set(deal.base.code.clone()),
        title: Set(deal.title.clone()),
        description: Set(deal.description.clone()),
        account_id: Set(deal.account_id.to_string()),
        contact_id: Set(deal.contact_id.map(|v| v.to_string())),
        stage_id: Set(deal.stage_id.to_string()),
        value: Set(deal.value),
        probability: Set(deal.probability),
        expected_close_date: Set(deal.expected_close_date),
        actual_close_date: Set(deal.actual_close_date),
        assigned_to: Set(deal.assigned_to.map(|v| v.to_string())),
        status: Set(deal.status.as_str().to_string()),
        source: Set(deal.source.clone()),
        notes: Set(deal.notes.clone()),
        lead_id: Set(deal.lead_id.map(|v| v.to_string())),
        created_by: Set(deal.created_by.map(|v| v.to_string())),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    }
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: DealId) -> Result<Option<Deal>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(Deal::try_from)
        .transpose()
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &DealListQuery,
    page: PageRequest,
) -> Result<Page<Deal>, DbErr> {
    let mut select = live();
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(stage_id) = query.stage_id {
        select = select.filter(Column::StageId.eq(stage_id.to_string()));
    }
    if let Some(account_id) = query.account_id {
        select = select.filter(Column::AccountId.eq(account_id.to_string()));
    }
    if let Some(assigned_to) = query.assigned_to {
        select = select.filter(Column::AssignedTo.eq(assigned_to.to_string()));
    }
    let paginator = select
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .paginate(conn, page.per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(Deal::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total })
}

/// Количество действующих сделок на этапе `stage_id`
pub async fn count_in_stage<C: ConnectionTrait>(
    conn: &C,
    stage_id: PipelineStageId,
) -> Result<u64, DbErr> {
    live()
        .filter(Column::StageId.eq(stage_id.to_string()))
        .count(conn)
        .await
}

pub async fn insert<C: ConnectionTrait>(conn: &C, deal: &Deal) -> Result<(), DbErr> {
    Entity::insert(to_active(deal)).exec(conn).await?;
    Ok(())
}

/// Записать сделку, если версия в базе всё ещё `expected_version`.
/// Возвращает false, если другой писатель успел раньше.
pub async fn save<C: ConnectionTrait>(
    conn: &C,
    deal: &Deal,
    expected_version: i32,
) -> Result<bool, DbErr> {
    let mut active = to_active(deal);
    // источник фиксируется при вставке
    active.lead_id = sea_orm::ActiveValue::NotSet;
    active.created_at = sea_orm::ActiveValue::NotSet;
    let result = Entity::update_many()
        .set(active)
        .filter(Column::Id.eq(deal.base.id.to_string()))
        .filter(Column::Version.eq(expected_version))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    id: DealId,
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
