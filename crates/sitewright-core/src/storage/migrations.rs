//! Database migrations
//!
//! Versioned SQLite schema, applied automatically on connection.

use sqlx::SqlitePool;

use crate::error::Result;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: plans and runs
const MIGRATION_V1: &str = r#"
    -- One stored plan per project; regenerating replaces it
    CREATE TABLE IF NOT EXISTS plans (
        project_id TEXT PRIMARY KEY NOT NULL,
        plan_json TEXT NOT NULL,
        total_steps INTEGER NOT NULL,
        estimated_duration TEXT NOT NULL,
        estimated_cost TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    -- Execution run history
    CREATE TABLE IF NOT EXISTS runs (
        id TEXT PRIMARY KEY NOT NULL,
        project_id TEXT NOT NULL REFERENCES plans(project_id) ON DELETE CASCADE,
        success INTEGER NOT NULL,
        completed_steps INTEGER NOT NULL,
        failed_steps INTEGER NOT NULL,
        skipped_steps INTEGER NOT NULL,
        total_steps INTEGER NOT NULL,
        total_tokens INTEGER NOT NULL,
        estimated_cost_usd REAL NOT NULL,
        duration_ms INTEGER NOT NULL,
        aborted INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_runs_project_id ON runs(project_id);
    CREATE INDEX IF NOT EXISTS idx_runs_created_at ON runs(created_at);
"#;

/// Migration 2: per-run detail (error log and created files)
const MIGRATION_V2: &str = r#"
    ALTER TABLE runs ADD COLUMN errors_json TEXT NOT NULL DEFAULT '[]';
    ALTER TABLE runs ADD COLUMN files_json TEXT NOT NULL DEFAULT '[]';
"#;

async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(i32,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(v,)| v).unwrap_or(0))
}

async fn record_migration(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::debug!(
        current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: plans and runs");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: per-run detail");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current_version: i32,
    pub target_version: i32,
    pub needs_migration: bool,
}
