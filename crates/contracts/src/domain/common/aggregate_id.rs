use serde::{de::DeserializeOwned, Serialize};
use std::hash::Hash;

/// Трейт для типов идентификаторов агрегатов
pub trait AggregateId:
    Clone + Copy + PartialEq + Eq + Hash + Serialize + DeserializeOwned + std::fmt::Debug
{
    /// Представить ID строкой (для хранения и URL)
    fn as_string(&self) -> String;

    /// Разобрать ID из строки
    fn from_string(s: &str) -> Result<Self, String>;
}

impl AggregateId for uuid::Uuid {
    fn as_string(&self) -> String {
        ToString::to_string(self)
    }

    fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s).map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// Объявляет newtype-идентификатор на основе UUID.
///
/// Сериализуется прозрачно как строка UUID.
#[macro_export]
macro_rules! aggregate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            pub fn new(value: uuid::Uuid) -> Self {
                Self(value)
            }

            pub fn new_v4() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn value(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl $crate::domain::common::AggregateId for $name {
            fn as_string(&self) -> String {
                self.0.to_string()
            }

            fn from_string(s: &str) -> Result<Self, String> {
                uuid::Uuid::parse_str(s)
                    .map($name::new)
                    .map_err(|e| format!("Invalid UUID: {}", e))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::AggregateId;

    crate::aggregate_id!(SampleId);

    #[test]
    fn test_id_string_form() {
        let id = SampleId::new_v4();
        let parsed = SampleId::from_string(&id.as_string()).unwrap();
        assert_eq!(parsed, id);
        assert!(SampleId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_id_serializes_as_plain_uuid() {
        let id = SampleId::new(uuid::Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }
}
