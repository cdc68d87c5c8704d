use crate::domain::a001_category::aggregate::CategoryId;
use crate::domain::a003_account::aggregate::{Account, AccountId};
use crate::domain::a004_contact::aggregate::{Contact, ContactId};
use crate::domain::a006_pipeline_stage::aggregate::PipelineStageId;
use crate::domain::a007_deal::aggregate::{Deal, DealId};
use crate::domain::common::{
    generate_code, AggregateRoot, BaseAggregate, EntityMetadata, PostalAddress,
};
use crate::shared::api::FieldError;
use crate::shared::error_codes::{FIELD_INVALID_FORMAT, FIELD_NOT_ALLOWED, FIELD_OUT_OF_RANGE, FIELD_REQUIRED};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::aggregate_id!(
    /// ID лида (потенциального клиента)
    LeadId
);

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Unqualified,
    Nurturing,
    Disqualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "unqualified" => Ok(LeadStatus::Unqualified),
            "nurturing" => Ok(LeadStatus::Nurturing),
            "disqualified" => Ok(LeadStatus::Disqualified),
            "converted" => Ok(LeadStatus::Converted),
            "lost" => Ok(LeadStatus::Lost),
            _ => Err(format!("Unknown lead status: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Unqualified => "unqualified",
            LeadStatus::Nurturing => "nurturing",
            LeadStatus::Disqualified => "disqualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    /// Статусы, после которых лид почти не редактируется
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LeadStatus::Converted | LeadStatus::Lost | LeadStatus::Disqualified
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Website,
    Referral,
    ColdCall,
    Event,
    SocialMedia,
    EmailCampaign,
    Partner,
    #[default]
    Other,
}

impl LeadSource {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "website" => Ok(LeadSource::Website),
            "referral" => Ok(LeadSource::Referral),
            "cold_call" => Ok(LeadSource::ColdCall),
            "event" => Ok(LeadSource::Event),
            "social_media" => Ok(LeadSource::SocialMedia),
            "email_campaign" => Ok(LeadSource::EmailCampaign),
            "partner" => Ok(LeadSource::Partner),
            "other" => Ok(LeadSource::Other),
            _ => Err(format!("Unknown lead source: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Website => "website",
            LeadSource::Referral => "referral",
            LeadSource::ColdCall => "cold_call",
            LeadSource::Event => "event",
            LeadSource::SocialMedia => "social_media",
            LeadSource::EmailCampaign => "email_campaign",
            LeadSource::Partner => "partner",
            LeadSource::Other => "other",
        }
    }
}

// ============================================================================
// Aggregate
// ============================================================================

/// Потенциальный клиент, ещё не квалифицированный как сделка.
///
/// После конвертации лид хранит слабые обратные ссылки на организацию,
/// контакт и сделку; права на их изменение лид больше не получает.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(flatten)]
    pub base: BaseAggregate<LeadId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    #[serde(flatten)]
    pub address: PostalAddress,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub score: i32,
    pub notes: Option<String>,
    /// Категория организации, создаваемой из этого лида
    pub preferred_category_id: Option<CategoryId>,
    pub assigned_to: Option<Uuid>,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
    pub opportunity_id: Option<DealId>,
    pub converted_at: Option<DateTime<Utc>>,
    pub converted_by: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

impl Lead {
    pub fn new_for_insert(dto: LeadDto) -> Self {
        Self {
            base: BaseAggregate::new(LeadId::new_v4(), generate_code("LD")),
            first_name: dto.first_name.trim().to_string(),
            last_name: dto.last_name.trim().to_string(),
            email: dto.email,
            phone: dto.phone,
            company_name: dto.company_name,
            job_title: dto.job_title,
            industry: dto.industry,
            website: dto.website,
            address: dto.address,
            source: dto.source.unwrap_or_default(),
            status: dto.status.unwrap_or_default(),
            score: dto.score.unwrap_or(0),
            notes: dto.notes,
            preferred_category_id: dto.preferred_category_id,
            assigned_to: dto.assigned_to,
            account_id: None,
            contact_id: None,
            opportunity_id: None,
            converted_at: None,
            converted_by: None,
            created_by: None,
        }
    }

    /// `first_name + " " + last_name` без крайних пробелов
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Название компании, если задано и не пустое
    pub fn company(&self) -> Option<&str> {
        self.company_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_converted(&self) -> bool {
        self.status == LeadStatus::Converted || self.opportunity_id.is_some()
    }

    /// Применить частичное обновление; отсутствующие поля сохраняют значение
    pub fn apply_patch(&mut self, patch: LeadPatch) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = patch.$field {
                    self.$field = v;
                }
            };
            ($field:ident, opt) => {
                if let Some(v) = patch.$field {
                    self.$field = Some(v);
                }
            };
        }
        set!(first_name);
        set!(last_name);
        set!(email, opt);
        set!(phone, opt);
        set!(company_name, opt);
        set!(job_title, opt);
        set!(industry, opt);
        set!(website, opt);
        set!(source);
        set!(status);
        set!(score);
        set!(notes, opt);
        set!(preferred_category_id, opt);
        set!(assigned_to, opt);
        if let Some(address) = patch.address {
            self.address = address;
        }
    }

    /// Проверка редактируемых полей
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.first_name.trim().is_empty() && self.company().is_none() {
            errors.push(FieldError::new(
                "first_name",
                FIELD_REQUIRED,
                "first name or company name is required",
            ));
        }
        if !(0..=100).contains(&self.score) {
            errors.push(FieldError::new(
                "score",
                FIELD_OUT_OF_RANGE,
                "score must be between 0 and 100",
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
        if self.status == LeadStatus::Converted && self.opportunity_id.is_none() {
            errors.push(FieldError::new(
                "status",
                FIELD_NOT_ALLOWED,
                "leads become converted only through the convert operation",
            ));
        }
        errors
    }
}

impl AggregateRoot for Lead {
    type Id = LeadId;

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
        "a005"
    }

    fn collection_name() -> &'static str {
        "lead"
    }

    fn element_name() -> &'static str {
        "Lead"
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Данные для создания лида
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadDto {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    #[serde(flatten)]
    pub address: PostalAddress,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    pub score: Option<i32>,
    pub notes: Option<String>,
    pub preferred_category_id: Option<CategoryId>,
    pub assigned_to: Option<Uuid>,
}

/// Данные обновления лида; отсутствующие поля не меняются
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<PostalAddress>,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    pub score: Option<i32>,
    pub notes: Option<String>,
    pub preferred_category_id: Option<CategoryId>,
    pub assigned_to: Option<Uuid>,
}

impl LeadPatch {
    /// Истина, если патч меняет только служебные заметки
    pub fn is_notes_only(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company_name.is_none()
            && self.job_title.is_none()
            && self.industry.is_none()
            && self.website.is_none()
            && self.address.is_none()
            && self.source.is_none()
            && self.status.is_none()
            && self.score.is_none()
            && self.preferred_category_id.is_none()
            && self.assigned_to.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub assigned_to: Option<Uuid>,
    pub q: Option<String>,
}

/// Запрос на конвертацию лида в сделку
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConvertLeadRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub stage_id: Option<PipelineStageId>,
    pub value: Option<i64>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default)]
    pub create_account: bool,
    #[serde(default)]
    pub create_contact: bool,
    pub account_id: Option<AccountId>,
    pub contact_id: Option<ContactId>,
}

impl ConvertLeadRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", FIELD_REQUIRED, "title is required"));
        }
        if self.stage_id.is_none() {
            errors.push(FieldError::new(
                "stage_id",
                FIELD_REQUIRED,
                "stage_id is required",
            ));
        }
        if matches!(self.value, Some(v) if v < 0) {
            errors.push(FieldError::new(
                "value",
                FIELD_OUT_OF_RANGE,
                "value must be non-negative",
            ));
        }
        if matches!(self.probability, Some(p) if !(0..=100).contains(&p)) {
            errors.push(FieldError::new(
                "probability",
                FIELD_OUT_OF_RANGE,
                "probability must be between 0 and 100",
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertLeadResponse {
    pub lead: Lead,
    pub deal: Deal,
    pub account: Account,
    pub contact: Option<Contact>,
    pub relinked_activities: u64,
    pub relinked_visit_reports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateAccountFromLeadRequest {
    #[serde(default)]
    pub create_contact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountFromLeadResponse {
    pub lead: Lead,
    pub account: Account,
    pub contact: Option<Contact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(first: &str, company: Option<&str>) -> Lead {
        Lead::new_for_insert(LeadDto {
            first_name: first.into(),
            company_name: company.map(Into::into),
            ..Default::default()
        })
    }

    #[test]
    fn test_status_round_trip_names() {
        for s in [
            "new",
            "contacted",
            "qualified",
            "unqualified",
            "nurturing",
            "disqualified",
            "converted",
            "lost",
        ] {
            assert_eq!(LeadStatus::from_str(s).unwrap().as_str(), s);
        }
        assert!(LeadStatus::from_str("won").is_err());
        assert_eq!(
            serde_json::to_string(&LeadSource::ColdCall).unwrap(),
            "\"cold_call\""
        );
    }

    #[test]
    fn test_full_name_is_trimmed() {
        let mut l = lead("Siti", None);
        assert_eq!(l.full_name(), "Siti");
        l.last_name = "Rahma".into();
        assert_eq!(l.full_name(), "Siti Rahma");
    }

    #[test]
    fn test_validate_requires_name_or_company() {
        assert!(lead("", Some("Acme Hospital")).validate().is_empty());
        assert!(lead("Budi", None).validate().is_empty());
        let errors = lead("", Some("   ")).validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "first_name");
    }

    #[test]
    fn test_validate_score_and_email() {
        let mut l = lead("Budi", None);
        l.score = 101;
        l.email = Some("budi.example.com".into());
        let fields: Vec<_> = l.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["score", "email"]);
    }

    #[test]
    fn test_notes_only_patch() {
        let patch = LeadPatch {
            notes: Some("called back".into()),
            ..Default::default()
        };
        assert!(patch.is_notes_only());
        let patch = LeadPatch {
            notes: Some("x".into()),
            score: Some(10),
            ..Default::default()
        };
        assert!(!patch.is_notes_only());
    }

    #[test]
    fn test_apply_patch_keeps_absent_fields() {
        let mut l = lead("Budi", None);
        l.email = Some("budi@kliniksehat.id".into());
        l.apply_patch(LeadPatch {
            status: Some(LeadStatus::Qualified),
            company_name: Some("Klinik Sehat".into()),
            ..Default::default()
        });
        assert_eq!(l.first_name, "Budi");
        assert_eq!(l.email.as_deref(), Some("budi@kliniksehat.id"));
        assert_eq!(l.status, LeadStatus::Qualified);
        assert_eq!(l.company(), Some("Klinik Sehat"));
    }

    #[test]
    fn test_convert_request_validation() {
        let req = ConvertLeadRequest {
            value: Some(-1),
            probability: Some(140),
            ..Default::default()
        };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "stage_id", "value", "probability"]);
    }
}
