use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_OUT_OF_RANGE, FIELD_REQUIRED};
use serde::{Deserialize, Serialize};

crate::aggregate_id!(
    /// ID категории организации (больница, аптека, клиника, ...)
    CategoryId
);

/// Элемент справочника категорий организаций
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    pub base: BaseAggregate<CategoryId>,
    pub name: String,
    pub order: i32,
    pub is_active: bool,
    pub description: Option<String>,
}

impl Category {
    pub fn new_for_insert(dto: CategoryDto) -> Self {
        Self {
            base: BaseAggregate::new(CategoryId::new_v4(), dto.code.trim().to_string()),
            name: dto.name.trim().to_string(),
            order: dto.order.unwrap_or(0),
            is_active: dto.is_active.unwrap_or(true),
            description: dto.description,
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

impl AggregateRoot for Category {
    type Id = CategoryId;

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
        "a001"
    }

    fn collection_name() -> &'static str {
        "category"
    }

    fn element_name() -> &'static str {
        "Category"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryDto {
    pub code: String,
    pub name: String,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryListQuery {
    pub is_active: Option<bool>,
}
