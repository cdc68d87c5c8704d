use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_OUT_OF_RANGE, FIELD_REQUIRED};
use serde::{Deserialize, Serialize};

crate::aggregate_id!(ContactRoleId);

/// Элемент справочника ролей контактов (врач, фармацевт, закупщик, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRole {
    #[serde(flatten)]
    pub base: BaseAggregate<ContactRoleId>,
    pub name: String,
    pub order: i32,
}

impl ContactRole {
    pub fn new_for_insert(dto: ContactRoleDto) -> Self {
        Self {
            base: BaseAggregate::new(ContactRoleId::new_v4(), dto.code.trim().to_string()),
            name: dto.name.trim().to_string(),
            order: dto.order.unwrap_or(0),
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.base.code.is_empty() {
            errors.push(FieldError::new("code", FIELD_REQUIRED, "code is required"));
        }
        if self.name.is_empty() {
            errors.push(FieldError::new("name", FIELD_REQUIRED, "name is required"));
        }
        if self.order < 0 {
            errors.push(FieldError::new(
                "order",
                FIELD_OUT_OF_RANGE,
                "order must be non-negative",
            ));
        }
        errors
    }
}

impl AggregateRoot for ContactRole {
    type Id = ContactRoleId;

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
        "a002"
    }

    fn collection_name() -> &'static str {
        "contact_role"
    }

    fn element_name() -> &'static str {
        "Contact role"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContactRoleDto {
    pub code: String,
    pub name: String,
    pub order: Option<i32>,
}
