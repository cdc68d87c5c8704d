use crate::domain::a001_category::aggregate::CategoryId;
use crate::domain::a005_lead::aggregate::LeadId;
use crate::domain::common::{
    generate_code, AggregateRoot, BaseAggregate, EntityMetadata, PostalAddress,
};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_INVALID_FORMAT, FIELD_REQUIRED};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::aggregate_id!(
    /// ID медицинской организации
    AccountId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Prospect,
}

impl AccountStatus {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "prospect" => Ok(AccountStatus::Prospect),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Prospect => "prospect",
        }
    }
}

/// Медицинская организация
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub base: BaseAggregate<AccountId>,
    pub name: String,
    pub category_id: CategoryId,
    #[serde(flatten)]
    pub address: PostalAddress,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub status: AccountStatus,
    pub assigned_to: Option<Uuid>,
    /// Лид, из которого создана организация (если есть)
    pub source_lead_id: Option<LeadId>,
    pub created_by: Option<Uuid>,
}

impl Account {
    pub fn new_for_insert(name: String, category_id: CategoryId) -> Self {
        Self {
            base: BaseAggregate::new(AccountId::new_v4(), generate_code("AC")),
            name,
            category_id,
            address: PostalAddress::default(),
            phone: None,
            email: None,
            website: None,
            status: AccountStatus::Active,
            assigned_to: None,
            source_lead_id: None,
            created_by: None,
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", FIELD_REQUIRED, "name is required"));
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

impl AggregateRoot for Account {
    type Id = AccountId;

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
        "a003"
    }

    fn collection_name() -> &'static str {
        "account"
    }

    fn element_name() -> &'static str {
        "Account"
    }
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountDto {
    pub name: String,
    pub category_id: Option<CategoryId>,
    #[serde(flatten)]
    pub address: PostalAddress,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub status: Option<AccountStatus>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<AccountStatus>,
    pub category_id: Option<CategoryId>,
    pub assigned_to: Option<Uuid>,
    pub q: Option<String>,
}
