use contracts::domain::a002_contact_role::aggregate::ContactRole;
use contracts::domain::a003_account::aggregate::Account;
use contracts::domain::a004_contact::aggregate::{Contact, ContactDto, ContactId, ContactListQuery};
use contracts::shared::api::{FieldError, Page, PageRequest};
use contracts::shared::error_codes::FIELD_REQUIRED;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::domain::a002_contact_role::repository as role_repository;
use crate::domain::a003_account::repository as account_repository;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

pub async fn get(db: &DatabaseConnection, id: ContactId) -> Result<Contact, ServiceError> {
    repository::get_by_id(db, id)
        .await?
        .ok_or_else(|| ServiceError::not_found::<Contact>(id))
}

pub async fn list(
    db: &DatabaseConnection,
    query: &ContactListQuery,
    page: PageRequest,
) -> Result<Page<Contact>, ServiceError> {
    Ok(repository::list(db, query, page).await?)
}

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: ContactDto,
) -> Result<Contact, ServiceError> {
    let mut missing = Vec::new();
    if dto.account_id.is_none() {
        missing.push(FieldError::new("account_id", FIELD_REQUIRED, "account_id is required"));
    }
    if dto.role_id.is_none() {
        missing.push(FieldError::new("role_id", FIELD_REQUIRED, "role_id is required"));
    }
    let (Some(account_id), Some(role_id)) = (dto.account_id, dto.role_id) else {
        return Err(ServiceError::Validation(missing));
    };

    let mut contact = Contact::new_for_insert(
        account_id,
        dto.first_name.trim().to_string(),
        dto.last_name.trim().to_string(),
        role_id,
    );
    contact.email = dto.email;
    contact.phone = dto.phone;
    contact.position = dto.position;
    contact.created_by = Some(ctx.actor);
    ServiceError::check(contact.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if account_repository::get_by_id(&txn, account_id).await?.is_none() {
            return Err(ServiceError::not_found::<Account>(account_id));
        }
        if role_repository::get_by_id(&txn, role_id).await?.is_none() {
            return Err(ServiceError::not_found::<ContactRole>(role_id));
        }
        repository::insert(&txn, &contact).await?;
        Ok(contact)
    })
    .await;
    let contact = ctx.settle(txn, outcome).await?;
    tracing::info!(contact_id = %contact.base.id, account_id = %account_id, "Contact created");
    Ok(contact)
}
