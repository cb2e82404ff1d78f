//! Status command
//!
//! Read-only view of a project's stored plan and run history.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{Database, RunRecord};

/// A project's current plan summary and run history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub project_id: String,
    pub total_steps: usize,
    pub estimated_duration: String,
    pub estimated_cost: String,
    pub runs: Vec<RunRecord>,
}

impl ProjectStatus {
    /// Whether the latest run completed successfully
    pub fn last_run_succeeded(&self) -> Option<bool> {
        self.runs.first().map(|run| run.success)
    }
}

/// Load status for a project; errors if no plan is stored for it
pub async fn project_status(db: &Database, project_id: &str) -> Result<ProjectStatus> {
    let plan = db.load_plan(project_id).await?;
    let runs = db.list_runs(project_id).await?;

    Ok(ProjectStatus {
        project_id: plan.project_id,
        total_steps: plan.total_steps,
        estimated_duration: plan.estimated_duration,
        estimated_cost: plan.estimated_cost,
        runs,
    })
}
