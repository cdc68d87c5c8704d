use contracts::domain::a003_account::aggregate::AccountId;
use contracts::domain::a004_contact::aggregate::ContactId;
use contracts::domain::a005_lead::aggregate::LeadId;
use contracts::domain::a007_deal::aggregate::DealId;
use contracts::domain::a009_activity::aggregate::{Activity, ActivityId, ActivityListQuery, ActivityType};
use contracts::shared::api::{Page, PageRequest};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{PaginatorTrait, QueryOrder, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a009_activity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub activity_type: String,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub deal_id: Option<String>,
    pub user_id: String,
    pub description: String,
    pub timestamp: DateTimeUtc,
    pub metadata: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Activity {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = serde_json::from_str(&m.metadata)
            .map_err(|e| DbErr::Type(format!("metadata: {}", e)))?;
        Ok(Activity {
            id: ActivityId::new(convert::uuid("id", &m.id)?),
            activity_type: convert::enumeration("activity_type", &m.activity_type, ActivityType::from_str)?,
            account_id: convert::opt_uuid("account_id", m.account_id.as_deref())?.map(AccountId::new),
            contact_id: convert::opt_uuid("contact_id", m.contact_id.as_deref())?.map(ContactId::new),
            lead_id: convert::opt_uuid("lead_id", m.lead_id.as_deref())?.map(LeadId::new),
            deal_id: convert::opt_uuid("deal_id", m.deal_id.as_deref())?.map(DealId::new),
            user_id: convert::uuid("user_id", &m.user_id)?,
            description: m.description,
            timestamp: m.timestamp,
            metadata,
        })
    }
}

pub async fn insert<C: ConnectionTrait>(conn: &C, activity: &Activity) -> Result<(), DbErr> {
    let active = ActiveModel {
        id: Set(activity.id.to_string()),
        activity_type: Set(activity.activity_type.as_str().to_string()),
        account_id: Set(activity.account_id.map(|v| v.to_string())),
        contact_id: Set(activity.contact_id.map(|v| v.to_string())),
        lead_id: Set(activity.lead_id.map(|v| v.to_string())),
        deal_id: Set(activity.deal_id.map(|v| v.to_string())),
        user_id: Set(activity.user_id.to_string()),
        description: Set(activity.description.clone()),
        timestamp: Set(activity.timestamp),
        metadata: Set(activity.metadata.to_string()),
    };
    Entity::insert(active).exec(conn).await?;
    Ok(())
}

/// Сначала новые
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &ActivityListQuery,
    page: PageRequest,
) -> Result<Page<Activity>, DbErr> {
    let mut select = Entity::find();
    if let Some(activity_type) = query.activity_type {
        select = select.filter(Column::ActivityType.eq(activity_type.as_str()));
    }
    if let Some(id) = query.account_id {
        select = select.filter(Column::AccountId.eq(id.to_string()));
    }
    if let Some(id) = query.contact_id {
        select = select.filter(Column::ContactId.eq(id.to_string()));
    }
    if let Some(id) = query.lead_id {
        select = select.filter(Column::LeadId.eq(id.to_string()));
    }
    if let Some(id) = query.deal_id {
        select = select.filter(Column::DealId.eq(id.to_string()));
    }
    let paginator = select
        .order_by_desc(Column::Timestamp)
        .order_by_desc(Column::Id)
        .paginate(conn, page.per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(Activity::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total })
}

/// Перепривязать все активности лида к сделке, полученной из него.
///
/// `lead_id` остаётся как источник; `account_id` заполняется только там, где пусто.
/// Возвращает число перепривязанных активностей.
pub async fn relink_lead<C: ConnectionTrait>(
    conn: &C,
    lead_id: LeadId,
    deal_id: DealId,
    account_id: AccountId,
) -> Result<u64, DbErr> {
    let relinked = Entity::update_many()
        .col_expr(Column::DealId, Expr::value(deal_id.to_string()))
        .filter(Column::LeadId.eq(lead_id.to_string()))
        .exec(conn)
        .await?
        .rows_affected;
    Entity::update_many()
        .col_expr(Column::AccountId, Expr::value(account_id.to_string()))
        .filter(Column::LeadId.eq(lead_id.to_string()))
        .filter(Column::AccountId.is_null())
        .exec(conn)
        .await?;
    Ok(relinked)
}
