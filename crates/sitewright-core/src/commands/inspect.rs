//! Inspect command
//!
//! Returns the full stored plan so frontends can render every step.

use crate::error::Result;
use crate::plan::Plan;
use crate::storage::Database;

/// Load the full stored plan for a project
pub async fn inspect_plan(db: &Database, project_id: &str) -> Result<Plan> {
    db.load_plan(project_id).await
}
