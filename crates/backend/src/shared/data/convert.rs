//! Decoding helpers for rows whose ids and enums are stored as text.
//!
//! A value that does not decode means the row was written by something other
//! than this service; it surfaces as `DbErr::Type`.

use sea_orm::DbErr;
use uuid::Uuid;

pub fn uuid(column: &str, raw: &str) -> Result<Uuid, DbErr> {
    Uuid::parse_str(raw).map_err(|e| DbErr::Type(format!("{}: invalid uuid '{}': {}", column, raw, e)))
}

pub fn opt_uuid(column: &str, raw: Option<&str>) -> Result<Option<Uuid>, DbErr> {
    raw.map(|r| uuid(column, r)).transpose()
}

/// Decode a status-like column with the enum's own `from_str`
pub fn enumeration<T>(
    column: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, DbErr> {
    parse(raw).map_err(|e| DbErr::Type(format!("{}: {}", column, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a008_visit_report::aggregate::VisitStatus;

    #[test]
    fn test_uuid_decoding() {
        let id = Uuid::new_v4();
        assert_eq!(uuid("id", &id.to_string()).unwrap(), id);
        assert!(matches!(uuid("id", "nope"), Err(DbErr::Type(_))));
        assert_eq!(opt_uuid("account_id", None).unwrap(), None);
    }

    #[test]
    fn test_enum_decoding() {
        assert_eq!(
            enumeration("status", "submitted", VisitStatus::from_str).unwrap(),
            VisitStatus::Submitted
        );
        assert!(enumeration("status", "archived", VisitStatus::from_str).is_err());
    }
}
