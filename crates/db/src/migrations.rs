use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: usize,
    pub pending: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.pending == 0
    }
}

/// Compares the embedded migration set against the tracking table without
/// applying anything. A database that has never been migrated reports every
/// migration as pending.
pub async fn status(pool: &DbPool) -> Result<MigrationStatus, MigrateError> {
    let tracking_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<i64> = if tracking_table == 0 {
        Vec::new()
    } else {
        sqlx::query_scalar(
            "SELECT version FROM _sqlx_migrations WHERE success = 1 ORDER BY version",
        )
        .fetch_all(pool)
        .await?
    };

    let pending = MIGRATOR
        .iter()
        .filter(|migration| !migration.migration_type.is_down_migration())
        .filter(|migration| !applied.contains(&migration.version))
        .count();

    Ok(MigrationStatus { applied: applied.len(), pending })
}
