use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Текущее время UTC с точностью до миллисекунд
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Метаданные жизненного цикла экземпляра агрегата
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Признак мягкого удаления
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Счётчик оптимистичной блокировки
    pub version: i32,
}

impl EntityMetadata {
    pub fn new() -> Self {
        let now = timestamp_now();
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = timestamp_now();
    }

    pub fn increment_version(&mut self) {
        self.version += 1;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Default for EntityMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_timestamps_have_millisecond_precision() {
        let ts = timestamp_now();
        assert_eq!(ts.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_new_metadata_is_live() {
        let meta = EntityMetadata::new();
        assert!(!meta.is_deleted());
        assert_eq!(meta.version, 0);
        assert_eq!(meta.created_at, meta.updated_at);
    }
}
