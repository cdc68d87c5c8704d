use crate::shared::config::{self, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;

pub(crate) fn build_sqlite_url(path: &Path) -> String {
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

/// Open the configured SQLite database, creating the file and its directory
/// if needed, and apply pending migrations.
pub async fn initialize_database(cfg: &Config) -> anyhow::Result<DatabaseConnection> {
    let db_path = config::get_database_path(cfg)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_path.is_absolute() {
        db_path
    } else {
        std::env::current_dir()?.join(db_path)
    };
    tracing::info!("Opening database: {}", absolute_path.display());
    connect_file(&absolute_path, cfg.database.max_connections, cfg.deadline()).await
}

/// Pooled connection to the SQLite file at `path`, created if missing, with
/// migrations applied
pub async fn connect_file(
    path: &Path,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(build_sqlite_url(path));
    options
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;

    super::migration_runner::run_migrations(&conn).await?;
    Ok(conn)
}

/// Fresh in-memory database with migrations applied.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    super::migration_runner::run_migrations(&conn).await?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DbBackend, Statement};

    async fn applied_migrations(conn: &DatabaseConnection) -> i64 {
        let row = conn
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT COUNT(*) AS n FROM _sqlx_migrations WHERE success = 1",
            ))
            .await
            .unwrap()
            .unwrap();
        row.try_get("", "n").unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let conn = connect_in_memory().await.unwrap();
        assert!(applied_migrations(&conn).await > 0);
    }

    #[tokio::test]
    async fn test_file_database_is_created_and_migrated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm.db");

        let conn = connect_file(&path, 4, Duration::from_secs(5)).await.unwrap();
        let applied = applied_migrations(&conn).await;
        assert!(applied > 0);
        assert!(path.exists());
        conn.close().await.unwrap();

        let reopened = connect_file(&path, 4, Duration::from_secs(5)).await.unwrap();
        assert_eq!(applied_migrations(&reopened).await, applied);
    }

    #[test]
    fn test_sqlite_url_forms() {
        assert_eq!(
            build_sqlite_url(Path::new("/var/lib/crm/crm.db")),
            "sqlite:///var/lib/crm/crm.db?mode=rwc"
        );
        assert_eq!(
            build_sqlite_url(Path::new("C:\\crm\\crm.db")),
            "sqlite:///C:/crm/crm.db?mode=rwc"
        );
    }
}
