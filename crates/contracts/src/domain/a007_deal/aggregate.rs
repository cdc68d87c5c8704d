use crate::domain::a003_account::aggregate::AccountId;
use crate::domain::a004_contact::aggregate::ContactId;
use crate::domain::a005_lead::aggregate::LeadId;
use crate::domain::a006_pipeline_stage::aggregate::PipelineStageId;
use crate::domain::common::{generate_code, AggregateRoot, BaseAggregate, EntityMetadata};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_OUT_OF_RANGE, FIELD_REQUIRED};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::aggregate_id!(
    /// ID сделки
    DealId
);

/// Статус сделки, всегда вычисляется по флагам текущего этапа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    #[default]
    Open,
    Won,
    Lost,
}

impl DealStatus {
    pub fn from_stage_flags(is_won: bool, is_lost: bool) -> Self {
        if is_won {
            DealStatus::Won
        } else if is_lost {
            DealStatus::Lost
        } else {
            DealStatus::Open
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "open" => Ok(DealStatus::Open),
            "won" => Ok(DealStatus::Won),
            "lost" => Ok(DealStatus::Lost),
            _ => Err(format!("Unknown deal status: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Open => "open",
            DealStatus::Won => "won",
            DealStatus::Lost => "lost",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DealStatus::Open)
    }
}

/// Сделка (возможность продажи), привязанная к одной организации
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    #[serde(flatten)]
    pub base: BaseAggregate<DealId>,
    pub title: String,
    pub description: Option<String>,
    pub account_id: AccountId,
    pub contact_id: Option<ContactId>,
    pub stage_id: PipelineStageId,
    /// Сумма в минимальных единицах валюты
    pub value: i64,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub actual_close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub status: DealStatus,
    pub source: Option<String>,
    pub notes: Option<String>,
    /// Исходный лид, задаётся один раз при создании
    pub lead_id: Option<LeadId>,
    pub created_by: Option<Uuid>,
}

impl Deal {
    pub fn new_for_insert(
        title: String,
        account_id: AccountId,
        stage_id: PipelineStageId,
        status: DealStatus,
    ) -> Self {
        Self {
            base: BaseAggregate::new(DealId::new_v4(), generate_code("DL")),
            title,
            description: None,
            account_id,
            contact_id: None,
            stage_id,
            value: 0,
            probability: 0,
            expected_close_date: None,
            actual_close_date: None,
            assigned_to: None,
            status,
            source: None,
            notes: None,
            lead_id: None,
            created_by: None,
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", FIELD_REQUIRED, "title is required"));
        }
        if self.value < 0 {
            errors.push(FieldError::new(
                "value",
                FIELD_OUT_OF_RANGE,
                "value must be non-negative",
            ));
        }
        if !(0..=100).contains(&self.probability) {
            errors.push(FieldError::new(
                "probability",
                FIELD_OUT_OF_RANGE,
                "probability must be between 0 and 100",
            ));
        }
        errors
    }
}

impl AggregateRoot for Deal {
    type Id = DealId;

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
        "a007"
    }

    fn collection_name() -> &'static str {
        "deal"
    }

    fn element_name() -> &'static str {
        "Deal"
    }
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DealDto {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub stage_id: Option<PipelineStageId>,
    pub value: Option<i64>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Данные обновления сделки. Смена этапа идёт через операцию перемещения;
/// `status` принимается, только если совпадает с вычисленным статусом.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DealPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub contact_id: Option<ContactId>,
    pub value: Option<i64>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub status: Option<DealStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MoveDealRequest {
    pub stage_id: Option<PipelineStageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DealListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<DealStatus>,
    pub stage_id: Option<PipelineStageId>,
    pub account_id: Option<AccountId>,
    pub assigned_to: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_won_flag_wins_over_lost() {
        assert_eq!(DealStatus::from_stage_flags(false, false), DealStatus::Open);
        assert_eq!(DealStatus::from_stage_flags(true, false), DealStatus::Won);
        assert_eq!(DealStatus::from_stage_flags(false, true), DealStatus::Lost);
    }

    #[test]
    fn test_deal_validation() {
        let mut deal = Deal::new_for_insert(
            "Cardio supply".into(),
            AccountId::new_v4(),
            PipelineStageId::new_v4(),
            DealStatus::Open,
        );
        assert!(deal.validate().is_empty());
        deal.value = -5;
        deal.probability = 101;
        let fields: Vec<_> = deal.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["value", "probability"]);
    }
}
