use crate::domain::a003_account::aggregate::AccountId;
use crate::domain::a004_contact::aggregate::ContactId;
use crate::domain::a005_lead::aggregate::LeadId;
use crate::domain::a007_deal::aggregate::DealId;
use crate::domain::common::{
    generate_code, AggregateRoot, BaseAggregate, EntityMetadata, GeoLocation,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::aggregate_id!(
    /// ID отчёта о визите
    VisitReportId
);

/// `draft → submitted → approved | rejected`, с возвратом `submitted → draft`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl VisitStatus {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "draft" => Ok(VisitStatus::Draft),
            "submitted" => Ok(VisitStatus::Submitted),
            "approved" => Ok(VisitStatus::Approved),
            "rejected" => Ok(VisitStatus::Rejected),
            _ => Err(format!("Unknown visit report status: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Draft => "draft",
            VisitStatus::Submitted => "submitted",
            VisitStatus::Approved => "approved",
            VisitStatus::Rejected => "rejected",
        }
    }

    /// Черновики и отправленные отчёты ещё можно редактировать
    pub fn is_editable(&self) -> bool {
        matches!(self, VisitStatus::Draft | VisitStatus::Submitted)
    }

    /// Переходы, разрешённые через обычное обновление
    pub fn can_update_to(&self, next: VisitStatus) -> bool {
        matches!(
            (self, next),
            (VisitStatus::Draft, VisitStatus::Draft)
                | (VisitStatus::Draft, VisitStatus::Submitted)
                | (VisitStatus::Submitted, VisitStatus::Submitted)
                | (VisitStatus::Submitted, VisitStatus::Draft)
        )
    }
}

/// Отчёт медицинского представителя о визите
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitReport {
    #[serde(flatten)]
    pub base: BaseAggregate<VisitReportId>,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub lead_id: Option<LeadId>,
    pub deal_id: Option<DealId>,
    pub sales_rep_id: Uuid,
    pub visit_date: NaiveDate,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_in_location: Option<GeoLocation>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_location: Option<GeoLocation>,
    pub photos: Vec<String>,
    pub status: VisitStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_by: Option<Uuid>,
}

impl VisitReport {
    pub fn new_for_insert(sales_rep_id: Uuid, visit_date: NaiveDate) -> Self {
        Self {
            base: BaseAggregate::new(VisitReportId::new_v4(), generate_code("VR")),
            account_id: None,
            contact_id: None,
            lead_id: None,
            deal_id: None,
            sales_rep_id,
            visit_date,
            purpose: None,
            notes: None,
            check_in_time: None,
            check_in_location: None,
            check_out_time: None,
            check_out_location: None,
            photos: Vec::new(),
            status: VisitStatus::Draft,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_by: None,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in_time.is_some()
    }

    pub fn is_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }
}

impl AggregateRoot for VisitReport {
    type Id = VisitReportId;

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
        "a008"
    }

    fn collection_name() -> &'static str {
        "visit_report"
    }

    fn element_name() -> &'static str {
        "Visit report"
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// `visit_date` принимает `YYYY-MM-DD` или дату-время RFC 3339
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisitReportDto {
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub lead_id: Option<LeadId>,
    pub deal_id: Option<DealId>,
    pub sales_rep_id: Option<Uuid>,
    pub visit_date: Option<String>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisitReportPatch {
    pub visit_date: Option<String>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub contact_id: Option<ContactId>,
    pub status: Option<VisitStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RejectVisitRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisitPhotoRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisitReportListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<VisitStatus>,
    pub sales_rep_id: Option<Uuid>,
    pub account_id: Option<AccountId>,
    pub lead_id: Option<LeadId>,
    pub deal_id: Option<DealId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_transitions() {
        use VisitStatus::*;
        assert!(Draft.can_update_to(Submitted));
        assert!(Submitted.can_update_to(Draft));
        assert!(!Submitted.can_update_to(Approved));
        assert!(!Draft.can_update_to(Rejected));
        assert!(!Approved.can_update_to(Draft));
        assert!(!Rejected.can_update_to(Submitted));
    }

    #[test]
    fn test_editable_statuses() {
        assert!(VisitStatus::Draft.is_editable());
        assert!(VisitStatus::Submitted.is_editable());
        assert!(!VisitStatus::Approved.is_editable());
        assert!(!VisitStatus::Rejected.is_editable());
    }
}
