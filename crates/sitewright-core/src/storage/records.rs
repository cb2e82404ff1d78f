//! Plan persistence and run history
//!
//! Plans are stored whole as JSON, keyed by project id; a project has at
//! most one current plan and regenerating replaces it. Runs are append-only
//! history rows referencing the plan's project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::executor::{ExecutionResult, StepError};
use crate::plan::Plan;
use crate::storage::Database;

/// Summary row for a stored plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub project_id: String,
    pub total_steps: i64,
    pub estimated_duration: String,
    pub estimated_cost: String,
    pub created_at: DateTime<Utc>,
}

/// One recorded execution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub project_id: String,
    pub success: bool,
    pub completed_steps: i64,
    pub failed_steps: i64,
    pub skipped_steps: i64,
    pub total_steps: i64,
    pub total_tokens: i64,
    pub estimated_cost_usd: f64,
    pub duration_ms: i64,
    pub aborted: bool,
    pub errors: Vec<StepError>,
    pub files_created: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Store a plan, replacing any previous plan for the same project
    pub async fn save_plan(&self, plan: &Plan) -> Result<()> {
        let plan_json = serde_json::to_string(plan)?;

        sqlx::query(
            r#"
            INSERT INTO plans (project_id, plan_json, total_steps, estimated_duration, estimated_cost, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(project_id) DO UPDATE SET
                plan_json = excluded.plan_json,
                total_steps = excluded.total_steps,
                estimated_duration = excluded.estimated_duration,
                estimated_cost = excluded.estimated_cost,
                created_at = excluded.created_at
            "#,
        )
        .bind(&plan.project_id)
        .bind(&plan_json)
        .bind(plan.total_steps as i64)
        .bind(&plan.estimated_duration)
        .bind(&plan.estimated_cost)
        .bind(plan.created_at.to_rfc3339())
        .execute(self.pool())
        .await?;

        tracing::debug!(project_id = %plan.project_id, "Plan saved");
        Ok(())
    }

    /// Load the stored plan for a project
    pub async fn load_plan(&self, project_id: &str) -> Result<Plan> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT plan_json FROM plans WHERE project_id = ?")
                .bind(project_id)
                .fetch_optional(self.pool())
                .await?;

        match row {
            Some((json,)) => Ok(serde_json::from_str(&json)?),
            None => Err(Error::PlanNotFound(project_id.to_string())),
        }
    }

    /// List all stored plans, newest first
    pub async fn list_plans(&self) -> Result<Vec<PlanRecord>> {
        let rows: Vec<(String, i64, String, String, String)> = sqlx::query_as(
            r#"
            SELECT project_id, total_steps, estimated_duration, estimated_cost, created_at
            FROM plans ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(
                |(project_id, total_steps, estimated_duration, estimated_cost, created_at)| {
                    Ok(PlanRecord {
                        project_id,
                        total_steps,
                        estimated_duration,
                        estimated_cost,
                        created_at: parse_timestamp(&created_at)?,
                    })
                },
            )
            .collect()
    }

    /// Append a run to the project's history; returns the new run id
    pub async fn record_run(&self, project_id: &str, result: &ExecutionResult) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let errors_json = serde_json::to_string(&result.errors)?;
        let files_json = serde_json::to_string(&result.files_created)?;

        sqlx::query(
            r#"
            INSERT INTO runs (
                id, project_id, success, completed_steps, failed_steps, skipped_steps,
                total_steps, total_tokens, estimated_cost_usd, duration_ms, aborted,
                errors_json, files_json, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(result.success)
        .bind(result.completed_steps as i64)
        .bind(result.failed_steps as i64)
        .bind(result.skipped_steps as i64)
        .bind(result.total_steps as i64)
        .bind(result.total_tokens as i64)
        .bind(result.estimated_cost_usd)
        .bind(result.duration_ms as i64)
        .bind(result.aborted)
        .bind(&errors_json)
        .bind(&files_json)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        tracing::debug!(project_id, run_id = %id, "Run recorded");
        Ok(id)
    }

    /// Run history for a project, newest first
    pub async fn list_runs(&self, project_id: &str) -> Result<Vec<RunRecord>> {
        type Row = (
            String,
            String,
            bool,
            i64,
            i64,
            i64,
            i64,
            i64,
            f64,
            i64,
            bool,
            String,
            String,
            String,
        );

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT id, project_id, success, completed_steps, failed_steps, skipped_steps,
                   total_steps, total_tokens, estimated_cost_usd, duration_ms, aborted,
                   errors_json, files_json, created_at
            FROM runs WHERE project_id = ? ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let (
                    id,
                    project_id,
                    success,
                    completed_steps,
                    failed_steps,
                    skipped_steps,
                    total_steps,
                    total_tokens,
                    estimated_cost_usd,
                    duration_ms,
                    aborted,
                    errors_json,
                    files_json,
                    created_at,
                ) = row;
                Ok(RunRecord {
                    id,
                    project_id,
                    success,
                    completed_steps,
                    failed_steps,
                    skipped_steps,
                    total_steps,
                    total_tokens,
                    estimated_cost_usd,
                    duration_ms,
                    aborted,
                    errors: serde_json::from_str(&errors_json)?,
                    files_created: serde_json::from_str(&files_json)?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    /// Most recent run for a project, if any
    pub async fn latest_run(&self, project_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.list_runs(project_id).await?.into_iter().next())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("bad timestamp in database: {e}")))
}
