use sea_orm::DatabaseConnection;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply the embedded schema migrations to the connection's pool
pub async fn run_migrations(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let pool = conn.get_sqlite_connection_pool();
    MIGRATOR.run(pool).await?;
    tracing::info!(
        "Database migrations applied successfully ({} known)",
        MIGRATOR.iter().count()
    );
    Ok(())
}
