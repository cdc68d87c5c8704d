//! Общие типы и трейты для всех агрегатов

pub mod aggregate_id;
pub mod aggregate_root;
pub mod base_aggregate;
pub mod entity_metadata;
pub mod location;

// Re-exports
pub use aggregate_id::AggregateId;
pub use aggregate_root::AggregateRoot;
pub use base_aggregate::{generate_code, BaseAggregate};
pub use entity_metadata::{timestamp_now, EntityMetadata};
pub use location::{GeoLocation, PostalAddress};
