use crate::domain::a002_contact_role::aggregate::ContactRoleId;
use crate::domain::a003_account::aggregate::AccountId;
use crate::domain::a005_lead::aggregate::LeadId;
use crate::domain::common::{generate_code, AggregateRoot, BaseAggregate, EntityMetadata};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_INVALID_FORMAT, FIELD_REQUIRED};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::aggregate_id!(ContactId);

/// Сотрудник организации
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub base: BaseAggregate<ContactId>,
    pub account_id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub role_id: ContactRoleId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub source_lead_id: Option<LeadId>,
    pub created_by: Option<Uuid>,
}

impl Contact {
    pub fn new_for_insert(
        account_id: AccountId,
        first_name: String,
        last_name: String,
        role_id: ContactRoleId,
    ) -> Self {
        Self {
            base: BaseAggregate::new(ContactId::new_v4(), generate_code("CT")),
            account_id,
            first_name,
            last_name,
            role_id,
            email: None,
            phone: None,
            position: None,
            source_lead_id: None,
            created_by: None,
        }
    }

    /// Отображаемое имя, `first last` без крайних пробелов
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.full_name().is_empty() {
            errors.push(FieldError::new(
                "first_name",
                FIELD_REQUIRED,
                "contact name is required",
            ));
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            if !email.contains('@') {
                errors.push(FieldError::new(
                    "email",
                    FIELD_INVALID_FORMAT,
                    "email must contain '@'",
                ));
            }
        }
        errors
    }
}

impl AggregateRoot for Contact {
    type Id = ContactId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a004"
    }

    fn collection_name() -> &'static str {
        "contact"
    }

    fn element_name() -> &'static str {
        "Contact"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContactDto {
    pub account_id: Option<AccountId>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role_id: Option<ContactRoleId>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContactListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub account_id: Option<AccountId>,
}
