use crate::domain::a003_account::aggregate::AccountId;
use crate::domain::a004_contact::aggregate::ContactId;
use crate::domain::a005_lead::aggregate::LeadId;
use crate::domain::a007_deal::aggregate::DealId;
use crate::domain::common::timestamp_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::aggregate_id!(ActivityId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Visit,
    Call,
    Email,
    Task,
    Deal,
}

impl ActivityType {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "visit" => Ok(ActivityType::Visit),
            "call" => Ok(ActivityType::Call),
            "email" => Ok(ActivityType::Email),
            "task" => Ok(ActivityType::Task),
            "deal" => Ok(ActivityType::Deal),
            _ => Err(format!("Unknown activity type: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Visit => "visit",
            ActivityType::Call => "call",
            ActivityType::Email => "email",
            ActivityType::Task => "task",
            ActivityType::Deal => "deal",
        }
    }
}

/// Запись журнала только на добавление. Меняются лишь поля связей,
/// каскадом конвертации лида.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub lead_id: Option<LeadId>,
    pub deal_id: Option<DealId>,
    pub user_id: Uuid,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl Activity {
    pub fn new(activity_type: ActivityType, user_id: Uuid, description: impl Into<String>) -> Self {
        Self {
            id: ActivityId::new_v4(),
            activity_type,
            account_id: None,
            contact_id: None,
            lead_id: None,
            deal_id: None,
            user_id,
            description: description.into(),
            timestamp: timestamp_now(),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn has_link(&self) -> bool {
        self.account_id.is_some()
            || self.contact_id.is_some()
            || self.lead_id.is_some()
            || self.deal_id.is_some()
    }
}

/// Ручная запись активности (звонки, письма, задачи)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDto {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub lead_id: Option<LeadId>,
    pub deal_id: Option<DealId>,
    #[serde(default)]
    pub description: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivityListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[serde(rename = "type")]
    pub activity_type: Option<ActivityType>,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub lead_id: Option<LeadId>,
    pub deal_id: Option<DealId>,
}
