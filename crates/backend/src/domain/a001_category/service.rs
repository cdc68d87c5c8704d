use contracts::domain::a001_category::aggregate::{Category, CategoryDto};
use contracts::shared::error_codes::DUPLICATE_CODE;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

pub async fn list(
    db: &DatabaseConnection,
    is_active: Option<bool>,
) -> Result<Vec<Category>, ServiceError> {
    Ok(repository::list(db, is_active).await?)
}

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: CategoryDto,
) -> Result<Category, ServiceError> {
    let category = Category::new_for_insert(dto);
    ServiceError::check(category.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if repository::code_exists(&txn, &category.base.code).await? {
            return Err(ServiceError::invalid_state(
                DUPLICATE_CODE,
                format!("Category code '{}' is already in use", category.base.code),
            ));
        }
        repository::insert(&txn, &category).await.map_err(|e| {
            ServiceError::duplicate_or_db(e, format!("Category code '{}' is already in use", category.base.code))
        })?;
        Ok(category)
    })
    .await;
    let category = ctx.settle(txn, outcome).await?;
    tracing::info!(category_id = %category.base.id, code = %category.base.code, "Category created");
    Ok(category)
}
