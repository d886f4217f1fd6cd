/// Schema migrations
///
/// Migration files live in the workspace-level `migrations/` directory and are
/// embedded into the binary at compile time by `sqlx::migrate!`. Both the API
/// server and the worker call [`run_migrations`] on startup; sqlx serializes
/// concurrent runs with an advisory lock.
///
/// # Example
///
/// ```no_run
/// use twix_shared::db::pool::{create_pool, DatabaseConfig};
/// use twix_shared::db::migrations::run_migrations;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/twix")).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Embedded migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Running database migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Latest embedded migration version
pub fn latest_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded() {
        assert!(MIGRATOR.iter().count() >= 1);
        assert!(latest_version().is_some());
    }

    #[test]
    fn test_initial_schema_creates_assignment_table() {
        let initial = MIGRATOR
            .iter()
            .min_by_key(|m| m.version)
            .expect("at least one migration");
        assert!(initial.sql.contains("CREATE TABLE assigned_tasks"));
        assert!(initial.sql.contains("tasks_assigned_requires_group"));
    }
}
