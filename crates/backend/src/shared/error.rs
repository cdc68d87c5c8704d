use axum::http::StatusCode;
use contracts::domain::common::AggregateRoot;
use contracts::shared::api::FieldError;
use contracts::shared::error_codes as codes;
use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// Domain-level error surfaced by every service.
///
/// Each kind maps to one wire code and one HTTP status; see [`ServiceError::code`]
/// and [`ServiceError::status`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An identifier did not resolve
    #[error("{resource} {id} not found")]
    NotFound {
        code: &'static str,
        resource: &'static str,
        id: String,
    },

    /// A state machine precondition was violated
    #[error("{message}")]
    InvalidState { code: &'static str, message: String },

    /// Request shape or field constraints violated
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// A nested creation inside a composite operation could not be satisfied
    #[error("{message}")]
    SubordinateFailed { code: &'static str, message: String },

    /// Concurrent writers collided at the datastore; safe to retry
    #[error("concurrent update conflict, retry the request")]
    Conflict,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    pub fn not_found<A: AggregateRoot>(id: impl ToString) -> Self {
        Self::NotFound {
            code: codes::NOT_FOUND,
            resource: A::element_name(),
            id: id.to_string(),
        }
    }

    /// Not-found with a resource-specific code (e.g. `LEAD_NOT_FOUND`)
    pub fn not_found_as<A: AggregateRoot>(code: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            code,
            resource: A::element_name(),
            id: id.to_string(),
        }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            code,
            message: message.into(),
        }
    }

    pub fn subordinate(code: &'static str, message: impl Into<String>) -> Self {
        Self::SubordinateFailed {
            code,
            message: message.into(),
        }
    }

    pub fn field(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, code, message)])
    }

    /// `Ok(())` for an empty error list, `Validation` otherwise
    pub fn check(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { code, .. }
            | Self::InvalidState { code, .. }
            | Self::SubordinateFailed { code, .. } => *code,
            Self::Validation(_) => codes::VALIDATION_ERROR,
            Self::Conflict => codes::SERIALIZATION_CONFLICT,
            Self::DeadlineExceeded => codes::DEADLINE_EXCEEDED,
            Self::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidState { code, .. } => match *code {
                codes::LEAD_ALREADY_CONVERTED
                | codes::LEAD_ALREADY_HAS_ACCOUNT
                | codes::INVALID_STATUS
                | codes::STAGE_IN_USE
                | codes::DUPLICATE_CODE => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::SubordinateFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict => StatusCode::CONFLICT,
            Self::DeadlineExceeded | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the identical request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::DeadlineExceeded)
    }

    /// Map a datastore failure of a nested creation to a subordinate error,
    /// keeping serialization conflicts retryable.
    pub fn subordinate_db(code: &'static str, context: &str, err: DbErr) -> Self {
        if is_serialization_conflict(&err) {
            Self::Conflict
        } else {
            tracing::error!(code, "{}: {}", context, err);
            Self::subordinate(code, context.to_string())
        }
    }
}

impl ServiceError {
    /// Map a unique-index violation on a business code to `DUPLICATE_CODE`
    pub fn duplicate_or_db(err: DbErr, message: impl Into<String>) -> Self {
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            Self::invalid_state(codes::DUPLICATE_CODE, message)
        } else {
            err.into()
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if is_serialization_conflict(&err) {
            Self::Conflict
        } else {
            Self::Internal(anyhow::Error::new(err))
        }
    }
}

// SQLITE_BUSY, SQLITE_LOCKED and their extended codes
const CONFLICT_CODES: &[&str] = &["5", "6", "261", "262", "517"];

/// True for SQLite busy/locked failures, i.e. a writer collision
pub fn is_serialization_conflict(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(r) | DbErr::Query(r) | DbErr::Conn(r) => r,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) => db_err
            .code()
            .map(|code| CONFLICT_CODES.contains(&code.as_ref()))
            .unwrap_or(false),
        RuntimeErr::SqlxError(_) => false,
        RuntimeErr::Internal(msg) => {
            msg.contains("database is locked") || msg.contains("database table is locked")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a005_lead::aggregate::Lead;
    use contracts::domain::a007_deal::aggregate::Deal;

    #[test]
    fn test_not_found_carries_resource_name() {
        let err = ServiceError::not_found::<Deal>("42");
        assert_eq!(err.code(), codes::NOT_FOUND);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Deal 42 not found");

        let err = ServiceError::not_found_as::<Lead>(codes::LEAD_NOT_FOUND, "7");
        assert_eq!(err.code(), codes::LEAD_NOT_FOUND);
    }

    #[test]
    fn test_invalid_state_status_mapping() {
        let conflict = ServiceError::invalid_state(codes::LEAD_ALREADY_CONVERTED, "x");
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        let race = ServiceError::invalid_state(codes::INVALID_STATUS, "x");
        assert_eq!(race.status(), StatusCode::CONFLICT);
        let unprocessable = ServiceError::invalid_state(codes::LEAD_CANNOT_CONVERT, "x");
        assert_eq!(unprocessable.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let op = ServiceError::invalid_state(codes::INVALID_OPERATION, "x");
        assert_eq!(op.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_validation_summary() {
        let err = ServiceError::Validation(vec![
            FieldError::new("title", codes::FIELD_REQUIRED, "title is required"),
            FieldError::new("value", codes::FIELD_OUT_OF_RANGE, "value must be non-negative"),
        ]);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "validation failed: title: title is required; value: value must be non-negative"
        );
        assert!(ServiceError::check(Vec::new()).is_ok());
    }

    #[test]
    fn test_conflict_is_retryable_and_domain_errors_are_not() {
        assert!(ServiceError::Conflict.is_retryable());
        assert!(!ServiceError::invalid_state(codes::LEAD_ALREADY_CONVERTED, "x").is_retryable());
    }

    #[test]
    fn test_locked_message_is_conflict() {
        let err = DbErr::Exec(RuntimeErr::Internal("database is locked".into()));
        assert!(is_serialization_conflict(&err));
        assert!(matches!(ServiceError::from(err), ServiceError::Conflict));

        let other = DbErr::Custom("boom".into());
        assert!(!is_serialization_conflict(&other));
    }
}
