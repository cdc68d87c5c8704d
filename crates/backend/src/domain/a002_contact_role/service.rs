use contracts::domain::a002_contact_role::aggregate::{ContactRole, ContactRoleDto};
use contracts::shared::error_codes::DUPLICATE_CODE;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::shared::context::ServiceContext;
use crate::shared::error::ServiceError;

pub async fn list(db: &DatabaseConnection) -> Result<Vec<ContactRole>, ServiceError> {
    Ok(repository::list(db).await?)
}

pub async fn create(
    db: &DatabaseConnection,
    ctx: &ServiceContext,
    dto: ContactRoleDto,
) -> Result<ContactRole, ServiceError> {
    let role = ContactRole::new_for_insert(dto);
    ServiceError::check(role.validate())?;

    let txn = ctx.begin(db).await?;
    let outcome = ctx.run(async {
        if repository::code_exists(&txn, &role.base.code).await? {
            return Err(ServiceError::invalid_state(
                DUPLICATE_CODE,
                format!("Contact role code '{}' is already in use", role.base.code),
            ));
        }
        repository::insert(&txn, &role).await.map_err(|e| {
            ServiceError::duplicate_or_db(e, format!("Contact role code '{}' is already in use", role.base.code))
        })?;
        Ok(role)
    })
    .await;
    let role = ctx.settle(txn, outcome).await?;
    tracing::info!(role_id = %role.base.id, code = %role.base.code, "Contact role created");
    Ok(role)
}
