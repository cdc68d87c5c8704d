use contracts::domain::a002_contact_role::aggregate::ContactRoleId;
use contracts::domain::a003_account::aggregate::AccountId;
use contracts::domain::a004_contact::aggregate::{Contact, ContactId, ContactListQuery};
use contracts::domain::a005_lead::aggregate::LeadId;
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use contracts::shared::api::{Page, PageRequest};
use sea_orm::entity::prelude::*;
use sea_orm::{PaginatorTrait, QueryOrder, Select, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a004_contact")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
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

impl TryFrom<Model> for Contact {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(Contact {
            base: BaseAggregate::with_metadata(
                ContactId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            account_id: AccountId::new(convert::uuid("account_id", &m.account_id)?),
            first_name: m.first_name,
            last_name: m.last_name,
            role_id: ContactRoleId::new(convert::uuid("role_id", &m.role_id)?),
            email: m.email,
            phone: m.phone,
            position: m.position,
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
    id: ContactId,
) -> Result<Option<Contact>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(Contact::try_from)
        .transpose()
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &ContactListQuery,
    page: PageRequest,
) -> Result<Page<Contact>, DbErr> {
    let mut select = live();
    if let Some(account_id) = query.account_id {
        select = select.filter(Column::AccountId.eq(account_id.to_string()));
    }
    let paginator = select
        .order_by_asc(Column::FirstName)
        .order_by_asc(Column::LastName)
        .order_by_asc(Column::Id)
        .paginate(conn, page.per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(Contact::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total })
}

pub async fn insert<C: ConnectionTrait>(conn: &C, contact: &Contact) -> Result<(), DbErr> {
    let meta = &contact.base.metadata;
    let active = ActiveModel {
        id: Set(contact.base.id.to_string()),
        code: Set(contact.base.code.clone()),
        account_id: Set(contact.account_id.to_string()),
        first_name: Set(contact.first_name.clone()),
        last_name: Set(contact.last_name.clone()),
        role_id: Set(contact.role_id.to_string()),
        email: Set(contact.email.clone()),
        phone: Set(contact.phone.clone()),
        position: Set(contact.position.clone()),
        source_lead_id: Set(contact.source_lead_id.map(|l| l.to_string())),
        created_by: Set(contact.created_by.map(|u| u.to_string())),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    };
    Entity::insert(active).exec(conn).await?;
    Ok(())
}
