use chrono::{DateTime, Utc};
use contracts::domain::a001_category::aggregate::CategoryId;
use contracts::domain::a003_account::aggregate::AccountId;
use contracts::domain::a004_contact::aggregate::ContactId;
use contracts::domain::a005_lead::aggregate::{Lead, LeadId, LeadListQuery, LeadSource, LeadStatus};
use contracts::domain::a007_deal::aggregate::DealId;
use contracts::domain::common::{BaseAggregate, EntityMetadata, PostalAddress};
use contracts::shared::api::{Page, PageRequest};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Select, Set};
use uuid::Uuid;

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a005_lead")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub source: String,
    pub status: String,
    pub score: i32,
    pub notes: Option<String>,
    pub preferred_category_id: Option<String>,
    pub assigned_to: Option<String>,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub converted_at: Option<DateTimeUtc>,
    pub converted_by: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Lead {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(Lead {
            base: BaseAggregate::with_metadata(
                LeadId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            phone: m.phone,
            company_name: m.company_name,
            job_title: m.job_title,
            industry: m.industry,
            website: m.website,
            address: PostalAddress {
                address: m.address,
                city: m.city,
                province: m.province,
                postal_code: m.postal_code,
                country: m.country,
            },
            source: convert::enumeration("source", &m.source, LeadSource::from_str)?,
            status: convert::enumeration("status", &m.status, LeadStatus::from_str)?,
            score: m.score,
            notes: m.notes,
            preferred_category_id: convert::opt_uuid(
                "preferred_category_id",
                m.preferred_category_id.as_deref(),
            )?
            .map(CategoryId::new),
            assigned_to: convert::opt_uuid("assigned_to", m.assigned_to.as_deref())?,
            account_id: convert::opt_uuid("account_id", m.account_id.as_deref())?.map(AccountId::new),
            contact_id: convert::opt_uuid("contact_id", m.contact_id.as_deref())?.map(ContactId::new),
            opportunity_id: convert::opt_uuid("opportunity_id", m.opportunity_id.as_deref())?
                .map(DealId::new),
            converted_at: m.converted_at,
            converted_by: convert::opt_uuid("converted_by", m.converted_by.as_deref())?,
            created_by: convert::opt_uuid("created_by", m.created_by.as_deref())?,
        })
    }
}

fn to_active(lead: &Lead) -> ActiveModel {
    let meta = &lead.base.metadata;
    ActiveModel {
        id: Set(lead.base.id.to_string()),
        code: Set(lead.base.code.clone()),
        first_name: Set(lead.first_name.clone()),
        last_name: Set(lead.last_name.clone()),
        email: Set(lead.email.clone()),
        phone: Set(lead.phone.clone()),
        company_name: Set(lead.company_name.clone()),
        job_title: Set(lead.job_title.clone()),
        industry: Set(lead.industry.clone()),
        website: Set(lead.website.clone()),
        address: Set(lead.address.address.clone()),
        city: Set(lead.address.city.clone()),
        province: Set(lead.address.province.clone()),
        postal_code: Set(lead.address.postal_code.clone()),
        country: Set(lead.address.country.clone()),
        source: Set(lead.source.as_str().to_string()),
        status: Set(lead.status.as_str().to_string()),
        score: Set(lead.score),
        notes: Set(lead.notes.clone()),
        preferred_category_id: Set(lead.preferred_category_id.map(|v| v.to_string())),
        assigned_to: Set(lead.assigned_to.map(|v| v.to_string())),
        account_id: Set(lead.account_id.map(|v| v.to_string())),
        contact_id: Set(lead.contact_id.map(|v| v.to_string())),
        opportunity_id: Set(lead.opportunity_id.map(|v| v.to_string())),
        converted_at: Set(lead.converted_at),
        converted_by: Set(lead.converted_by.map(|v| v.to_string())),
        created_by: Set(lead.created_by.map(|v| v.to_string())),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    }
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

fn not_converted() -> Condition {
    Condition::all()
        .add(Column::Status.ne(LeadStatus::Converted.as_str()))
        .add(Column::OpportunityId.is_null())
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: LeadId) -> Result<Option<Lead>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(Lead::try_from)
        .transpose()
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &LeadListQuery,
    page: PageRequest,
) -> Result<Page<Lead>, DbErr> {
    let mut select = live();
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(source) = query.source {
        select = select.filter(Column::Source.eq(source.as_str()));
    }
    if let Some(assigned_to) = query.assigned_to {
        select = select.filter(Column::AssignedTo.eq(assigned_to.to_string()));
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(Column::FirstName.contains(q))
                .add(Column::LastName.contains(q))
                .add(Column::CompanyName.contains(q))
                .add(Column::Email.contains(q))
                .add(Column::Code.contains(q)),
        );
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
        .map(Lead::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total })
}

pub async fn insert<C: ConnectionTrait>(conn: &C, lead: &Lead) -> Result<(), DbErr> {
    Entity::insert(to_active(lead)).exec(conn).await?;
    Ok(())
}

/// Записать редактируемые поля, если версия в базе всё ещё
/// `expected_version`. Обратные ссылки конвертации здесь не пишутся.
pub async fn save<C: ConnectionTrait>(
    conn: &C,
    lead: &Lead,
    expected_version: i32,
) -> Result<bool, DbErr> {
    let mut active = to_active(lead);
    active.account_id = sea_orm::ActiveValue::NotSet;
    active.contact_id = sea_orm::ActiveValue::NotSet;
    active.opportunity_id = sea_orm::ActiveValue::NotSet;
    active.converted_at = sea_orm::ActiveValue::NotSet;
    active.converted_by = sea_orm::ActiveValue::NotSet;
    active.created_at = sea_orm::ActiveValue::NotSet;
    let result = Entity::update_many()
        .set(active)
        .filter(Column::Id.eq(lead.base.id.to_string()))
        .filter(Column::Version.eq(expected_version))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Мягкое удаление неконвертированного лида
pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    id: LeadId,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(Column::DeletedAt, Expr::value(now))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(not_converted())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Обратные ссылки, записываемые при конвертации лида
pub struct ConversionLinks {
    pub deal_id: DealId,
    pub account_id: AccountId,
    pub contact_id: Option<ContactId>,
    pub converted_by: Uuid,
    pub converted_at: DateTime<Utc>,
}

/// Отметить квалифицированный лид как конвертированный. UPDATE находит лид,
/// только если он всё ещё qualified и без сделки, поэтому из двух гонящихся
/// конвертаций true вернёт не больше одной.
pub async fn finalize_conversion<C: ConnectionTrait>(
    conn: &C,
    id: LeadId,
    links: &ConversionLinks,
) -> Result<bool, DbErr> {
    let mut update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(LeadStatus::Converted.as_str()))
        .col_expr(Column::OpportunityId, Expr::value(links.deal_id.to_string()))
        .col_expr(Column::AccountId, Expr::value(links.account_id.to_string()))
        .col_expr(Column::ConvertedAt, Expr::value(links.converted_at))
        .col_expr(Column::ConvertedBy, Expr::value(links.converted_by.to_string()))
        .col_expr(Column::UpdatedAt, Expr::value(links.converted_at))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1));
    if let Some(contact_id) = links.contact_id {
        update = update.col_expr(Column::ContactId, Expr::value(contact_id.to_string()));
    }
    let result = update
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(Column::Status.eq(LeadStatus::Qualified.as_str()))
        .filter(Column::OpportunityId.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Привязать контрагента (и, при необходимости, контакт) к лиду без контрагента
pub async fn link_account<C: ConnectionTrait>(
    conn: &C,
    id: LeadId,
    account_id: AccountId,
    contact_id: Option<ContactId>,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let mut update = Entity::update_many()
        .col_expr(Column::AccountId, Expr::value(account_id.to_string()))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1));
    if let Some(contact_id) = contact_id {
        update = update.col_expr(Column::ContactId, Expr::value(contact_id.to_string()));
    }
    let result = update
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(Column::AccountId.is_null())
        .filter(not_converted())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}
