//! Plan command
//!
//! Generates a build plan from a task description and persists it as the
//! project's current plan.

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::plan::{BuildTask, Plan, generate_plan};
use crate::storage::Database;

/// Generate a plan for the task and store it, replacing any previous plan
/// for the same project
pub async fn create_plan(db: &Database, config: &Config, task: &BuildTask) -> Result<Plan> {
    let plan = generate_plan(task, &config.estimates)?;
    db.save_plan(&plan).await?;

    info!(
        project_id = %plan.project_id,
        total_steps = plan.total_steps,
        estimated_duration = %plan.estimated_duration,
        estimated_cost = %plan.estimated_cost,
        "Plan created"
    );
    Ok(plan)
}
