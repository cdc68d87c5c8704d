use super::EntityMetadata;
use serde::{Deserialize, Serialize};

/// Базовая часть каждого агрегата
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseAggregate<Id> {
    /// Уникальный идентификатор записи
    pub id: Id,
    /// Бизнес-код (например "LD-1A2B3C4D", "proposal")
    pub code: String,
    /// Метаданные жизненного цикла
    #[serde(flatten)]
    pub metadata: EntityMetadata,
}

impl<Id> BaseAggregate<Id> {
    /// Новый агрегат со свежими метаданными
    pub fn new(id: Id, code: String) -> Self {
        Self {
            id,
            code,
            metadata: EntityMetadata::new(),
        }
    }

    /// Агрегат с существующими метаданными (загрузка из БД)
    pub fn with_metadata(id: Id, code: String, metadata: EntityMetadata) -> Self {
        Self { id, code, metadata }
    }

    /// Обновить `updated_at`
    pub fn touch(&mut self) {
        self.metadata.touch();
    }
}

/// Сгенерировать короткий бизнес-код с префиксом, например `LD-1A2B3C4D`
pub fn generate_code(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        &uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code("LD");
        assert!(code.starts_with("LD-"));
        assert_eq!(code.len(), 11);
        assert!(code[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
