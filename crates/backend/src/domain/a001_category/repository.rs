use contracts::domain::a001_category::aggregate::{Category, CategoryId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use sea_orm::entity::prelude::*;
use sea_orm::{PaginatorTrait, QueryOrder, Select, Set};

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a001_category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub name: String,
    pub order: i32,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(Category {
            base: BaseAggregate::with_metadata(
                CategoryId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            name: m.name,
            order: m.order,
            is_active: m.is_active,
            description: m.description,
        })
    }
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

/// Действующие категории в порядке справочника (`order`, затем `code`)
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    is_active: Option<bool>,
) -> Result<Vec<Category>, DbErr> {
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
        .map(Category::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: CategoryId,
) -> Result<Option<Category>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(Category::try_from)
        .transpose()
}

/// Первая активная категория в порядке справочника, запасной вариант для
/// контрагентов, созданных из лидов
pub async fn first_in_catalog<C: ConnectionTrait>(conn: &C) -> Result<Option<Category>, DbErr> {
    live()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Order)
        .order_by_asc(Column::Code)
        .one(conn)
        .await?
        .map(Category::try_from)
        .transpose()
}

pub async fn code_exists<C: ConnectionTrait>(conn: &C, code: &str) -> Result<bool, DbErr> {
    Ok(live().filter(Column::Code.eq(code)).count(conn).await? > 0)
}

pub async fn insert<C: ConnectionTrait>(conn: &C, category: &Category) -> Result<(), DbErr> {
    let meta = &category.base.metadata;
    let active = ActiveModel {
        id: Set(category.base.id.to_string()),
        code: Set(category.base.code.clone()),
        name: Set(category.name.clone()),
        order: Set(category.order),
        is_active: Set(category.is_active),
        description: Set(category.description.clone()),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    };
    Entity::insert(active).exec(conn).await?;
    Ok(())
}
