use crate::domain::a007_deal::aggregate::DealStatus;
use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_NOT_ALLOWED, FIELD_OUT_OF_RANGE, FIELD_REQUIRED};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

crate::aggregate_id!(
    /// ID этапа воронки
    PipelineStageId
);

/// Именованный этап процесса продаж.
///
/// `base.code` это код этапа, уникальный среди неудалённых этапов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStage {
    #[serde(flatten)]
    pub base: BaseAggregate<PipelineStageId>,
    pub name: String,
    pub order: i32,
    pub color: Option<String>,
    pub is_active: bool,
    pub is_won: bool,
    pub is_lost: bool,
    pub description: Option<String>,
}

impl PipelineStage {
    pub fn new_for_insert(dto: PipelineStageDto) -> Self {
        Self {
            base: BaseAggregate::new(PipelineStageId::new_v4(), dto.code.trim().to_string()),
            name: dto.name.trim().to_string(),
            order: dto.order.unwrap_or(0),
            color: dto.color,
            is_active: dto.is_active.unwrap_or(true),
            is_won: dto.is_won.unwrap_or(false),
            is_lost: dto.is_lost.unwrap_or(false),
            description: dto.description,
        }
    }

    /// Статус, который должна иметь сделка на этом этапе
    pub fn deal_status(&self) -> DealStatus {
        DealStatus::from_stage_flags(self.is_won, self.is_lost)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_won || self.is_lost
    }

    pub fn apply_patch(&mut self, patch: PipelineStagePatch) {
        if let Some(code) = patch.code {
            self.base.code = code.trim().to_string();
        }
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(color) = patch.color {
            self.color = Some(color);
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(is_won) = patch.is_won {
            self.is_won = is_won;
        }
        if let Some(is_lost) = patch.is_lost {
            self.is_lost = is_lost;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
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
        if self.is_won && self.is_lost {
            errors.push(FieldError::new(
                "is_lost",
                FIELD_NOT_ALLOWED,
                "a stage cannot be both won and lost",
            ));
        }
        errors
    }
}

/// Порядок справочника: по `order`, при равенстве по `code`
pub fn catalog_order(a: &PipelineStage, b: &PipelineStage) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.base.code.cmp(&b.base.code))
}

impl AggregateRoot for PipelineStage {
    type Id = PipelineStageId;

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
        "a006"
    }

    fn collection_name() -> &'static str {
        "pipeline_stage"
    }

    fn element_name() -> &'static str {
        "Pipeline stage"
    }
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineStageDto {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub order: Option<i32>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
    pub is_won: Option<bool>,
    pub is_lost: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineStagePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub order: Option<i32>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
    pub is_won: Option<bool>,
    pub is_lost: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StageListQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageOrder {
    pub id: PipelineStageId,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReorderStagesRequest {
    pub stages: Vec<StageOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(code: &str, order: i32) -> PipelineStage {
        PipelineStage::new_for_insert(PipelineStageDto {
            code: code.into(),
            name: code.to_uppercase(),
            order: Some(order),
            ..Default::default()
        })
    }

    #[test]
    fn test_catalog_order_breaks_ties_by_code() {
        let mut stages = vec![stage("proposal", 2), stage("lead", 1), stage("demo", 2)];
        stages.sort_by(catalog_order);
        let codes: Vec<_> = stages.iter().map(|s| s.base.code.as_str()).collect();
        assert_eq!(codes, vec!["lead", "demo", "proposal"]);
    }

    #[test]
    fn test_deal_status_follows_terminal_flags() {
        let mut s = stage("closed", 9);
        assert_eq!(s.deal_status(), DealStatus::Open);
        s.is_won = true;
        assert_eq!(s.deal_status(), DealStatus::Won);
        s.is_won = false;
        s.is_lost = true;
        assert_eq!(s.deal_status(), DealStatus::Lost);
        assert!(s.is_terminal());
    }

    #[test]
    fn test_won_and_lost_together_is_rejected() {
        let mut s = stage("weird", 1);
        s.is_won = true;
        s.is_lost = true;
        let errors = s.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "is_lost");
    }

    #[test]
    fn test_negative_order_is_rejected() {
        let s = stage("neg", -1);
        assert_eq!(s.validate()[0].field, "order");
    }
}
