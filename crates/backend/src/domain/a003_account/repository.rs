use contracts::domain::a001_category::aggregate::CategoryId;
use contracts::domain::a003_account::aggregate::{Account, AccountId, AccountListQuery, AccountStatus};
use contracts::domain::a005_lead::aggregate::LeadId;
use contracts::domain::common::{BaseAggregate, EntityMetadata, PostalAddress};
use contracts::shared::api::{Page, PageRequest};
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Select, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a003_account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub name: String,
    pub category_id: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub status: String,
    pub assigned_to: Option<String>,
    pub source_lead_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(Account {
            base: BaseAggregate::with_metadata(
                AccountId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            name: m.name,
            category_id: CategoryId::new(convert::uuid("category_id", &m.category_id)?),
            address: PostalAddress {
                address: m.address,
                city: m.city,
                province: m.province,
                postal_code: m.postal_code,
                country: m.country,
            },
            phone: m.phone,
            email: m.email,
            website: m.website,
            status: convert::enumeration("status", &m.status, AccountStatus::from_str)?,
            assigned_to: convert::opt_uuid("assigned_to", m.assigned_to.as_deref())?,
            source_lead_id: convert::opt_uuid("source_lead_id", m.source_lead_id.as_deref())?
                .map(LeadId::new),
            created_by: convert::opt_uuid("created_by", m.created_by.as_deref())?,
        })
    }
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: AccountId,
) -> Result<Option<Account>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &AccountListQuery,
    page: PageRequest,
) -> Result<Page<Account>, DbErr> {
    let mut select = live();
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(Column::CategoryId.eq(category_id.to_string()));
    }
    if let Some(assigned_to) = query.assigned_to {
        select = select.filter(Column::AssignedTo.eq(assigned_to.to_string()));
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(Column::Name.contains(q))
                .add(Column::Code.contains(q))
                .add(Column::City.contains(q)),
        );
    }

    let paginator = select
        .order_by_asc(Column::Name)
        .order_by_asc(Column::Id)
        .paginate(conn, page.per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(Account::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total })
}

pub async fn insert<C: ConnectionTrait>(conn: &C, account: &Account) -> Result<(), DbErr> {
    let meta = &account.base.metadata;
    let active = ActiveModel {
        id: Set(account.base.id.to_string()),
        code: Set(account.base.code.clone()),
        name: Set(account.name.clone()),
        category_id: Set(account.category_id.to_string()),
        address: Set(account.address.address.clone()),
        city: Set(account.address.city.clone()),
        province: Set(account.address.province.clone()),
        postal_code: Set(account.address.postal_code.clone()),
        country: Set(account.address.country.clone()),
        phone: Set(account.phone.clone()),
        email: Set(account.email.clone()),
        website: Set(account.website.clone()),
        status: Set(account.status.as_str().to_string()),
        assigned_to: Set(account.assigned_to.map(|u| u.to_string())),
        source_lead_id: Set(account.source_lead_id.map(|l| l.to_string())),
        created_by: Set(account.created_by.map(|u| u.to_string())),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    };
    Entity::insert(active).exec(conn).await?;
    Ok(())
}
