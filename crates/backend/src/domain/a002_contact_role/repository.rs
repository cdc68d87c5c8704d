use contracts::domain::a002_contact_role::aggregate::{ContactRole, ContactRoleId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use sea_orm::entity::prelude::*;
use sea_orm::{PaginatorTrait, QueryOrder, Select, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a002_contact_role")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub name: String,
    pub order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ContactRole {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(ContactRole {
            base: BaseAggregate::with_metadata(
                ContactRoleId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            name: m.name,
            order: m.order,
        })
    }
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

pub async fn list<C: ConnectionTrait>(conn: &C) -> Result<Vec<ContactRole>, DbErr> {
    live()
        .order_by_asc(Column::Order)
        .order_by_asc(Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(ContactRole::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: ContactRoleId,
) -> Result<Option<ContactRole>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(ContactRole::try_from)
        .transpose()
}

/// Первая роль в порядке справочника, по умолчанию для контактов из лидов
pub async fn first_in_catalog<C: ConnectionTrait>(
    conn: &C,
) -> Result<Option<ContactRole>, DbErr> {
    live()
        .order_by_asc(Column::Order)
        .order_by_asc(Column::Code)
        .one(conn)
        .await?
        .map(ContactRole::try_from)
        .transpose()
}

pub async fn code_exists<C: ConnectionTrait>(conn: &C, code: &str) -> Result<bool, DbErr> {
    Ok(live().filter(Column::Code.eq(code)).count(conn).await? > 0)
}

pub async fn insert<C: ConnectionTrait>(conn: &C, role: &ContactRole) -> Result<(), DbErr> {
    let meta = &role.base.metadata;
    let active = ActiveModel {
        id: Set(role.base.id.to_string()),
        code: Set(role.base.code.clone()),
        name: Set(role.name.clone()),
        order: Set(role.order),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    };
    Entity::insert(active).exec(conn).await?;
    Ok(())
}
