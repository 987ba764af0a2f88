use anyhow::{bail, Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn connect_lazy(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(acquire_timeout)
        .connect_lazy(database_url)
        .with_context(|| format!("Failed to create lazy database pool for {database_url}"))
}

pub(crate) fn list_migrations(migrations_root: &Path) -> Result<Vec<PathBuf>> {
    if !migrations_root.exists() {
        bail!(
            "Migrations directory missing at {}",
            migrations_root.display()
        );
    }

    let mut migrations: Vec<PathBuf> = std::fs::read_dir(migrations_root)
        .with_context(|| format!("Failed to read {}", migrations_root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|v| v.to_str()) == Some("sql"))
        .collect();
    migrations.sort();
    Ok(migrations)
}

/// Applies every `*.sql` file under `migrations_root` in lexical order, one
/// transaction per file. Statements are written to be re-runnable.
pub async fn apply_migrations(pool: &PgPool, migrations_root: &Path) -> Result<()> {
    for migration in list_migrations(migrations_root)? {
        let sql = std::fs::read_to_string(&migration)
            .with_context(|| format!("Failed to read migration {}", migration.display()))?;
        if sql.trim().is_empty() {
            continue;
        }

        let mut tx = pool
            .begin()
            .await
            .with_context(|| format!("Failed to start transaction for {}", migration.display()))?;
        sqlx::raw_sql(&sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Migration failed: {}", migration.display()))?;
        tx.commit().await.with_context(|| {
            format!(
                "Failed to commit migration transaction for {}",
                migration.display()
            )
        })?;
        tracing::info!(migration = %migration.display(), "applied migration");
    }

    Ok(())
}
