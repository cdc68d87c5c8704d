use contracts::domain::a001_category::aggregate::Category;
use contracts::domain::a003_account::aggregate::{Account, AccountDto, AccountId, AccountListQuery};
use contracts::shared::api::{Page, PageRequest};
use contracts::shared::error_codes::FIELD_REQUIRED;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::domain::a001_category::repository as category_repository;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

pub async fn get(db: &DatabaseConnection, id: AccountId) -> Result<Account, ServiceError> {
    repository::get_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found::<Account>(id))
}

pub async fn list(
    db: &DatabaseConnection,
    query: &AccountListQuery,
    page: PageRequest,
) -> Result<Page<Account>, ServiceError> {
    Ok(repository::list(db, query, page).await?)
}

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: AccountDto,
) -> Result<Account, ServiceError> {
    let Some(category_id) = dto.category_id else {
        return Err(ServiceError::field(
            "category_id",
            FIELD_REQUIRED,
            "category_id is required",
        ));
    };
    let mut account = Account::new_for_insert(dto.name.trim().to_string(), category_id);
    account.address = dto.address;
    account.phone = dto.phone;
    account.email = dto.email;
    account.website = dto.website;
    account.status = dto.status.unwrap_or_default();
    account.assigned_to = dto.assigned_to;
    account.created_by = Some(ctx.actor);
    ServiceError::check(account.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if category_repository::get_by_id(&txn, category_id).await?.is_none() {
            return Err(ServiceError::not_found::<Category>(category_id));
        }
        repository::insert(&txn, &account).await?;
        Ok(account)
    })
    .await;
    let account = ctx.settle(txn, outcome).await?;
    tracing::info!(account_id = %account.base.id, "Account created");
    Ok(account)
}
