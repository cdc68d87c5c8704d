use super::EntityMetadata;

/// Трейт для корня агрегата
///
/// Определяет обязательные методы и метаданные для всех агрегатов CRM
pub trait AggregateRoot {
    /// Тип идентификатора агрегата
    type Id;

    // ============================================================================
    // Instance methods
    // ============================================================================

    /// Получить ID записи
    fn id(&self) -> Self::Id;

    /// Бизнес-код для пользователя (например "LD-1A2B3C4D")
    fn code(&self) -> &str;

    /// Метаданные жизненного цикла
    fn metadata(&self) -> &EntityMetadata;

    /// Изменяемые метаданные жизненного цикла
    fn metadata_mut(&mut self) -> &mut EntityMetadata;

    // ============================================================================
    // Class metadata
    // ============================================================================

    /// Индекс агрегата в системе (например "a005")
    fn aggregate_index() -> &'static str;

    /// Имя коллекции для таблиц (например "lead")
    fn collection_name() -> &'static str;

    /// Отображаемое имя в единственном числе (например "Lead") для текстов ошибок
    fn element_name() -> &'static str;

    // ============================================================================
    // Default implementations
    // ============================================================================

    /// Полное имя агрегата, оно же имя таблицы (например "a005_lead")
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}
