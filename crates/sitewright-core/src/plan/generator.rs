//! Plan generation entry point
//!
//! Pure function of the task and the catalog profiles it resolves: no I/O,
//! no backend calls. Catalog lookups fail before a single step is built, so
//! a partially-assembled plan can never escape.

use tracing::{debug, info};

use crate::catalog;
use crate::config::EstimateConfig;
use crate::error::Result;

use super::builders::{
    PlanAccumulator, build_content, build_delivery, build_foundation, build_integration,
    build_structure, build_styling,
};
use super::metrics::{estimate_cost, estimate_duration, summarize_phases};
use super::types::{BuildTask, Plan};

/// Decompose a build task into an ordered, phase-partitioned plan
pub fn generate_plan(task: &BuildTask, estimates: &EstimateConfig) -> Result<Plan> {
    // Resolve lookups first; unknown ids must fail before any step exists.
    let niche = catalog::resolve_niche(&task.niche_id)?;
    let design = catalog::resolve_design_system(&task.design_system_id)?;

    debug!(
        project_id = %task.id,
        niche = %niche.id,
        design_system = %design.id,
        pages = task.pages.len(),
        integrations = task.integrations.len(),
        "Generating build plan"
    );

    let mut acc = PlanAccumulator::new();
    let foundation = build_foundation(task, niche, design, &mut acc);
    let pages = build_structure(task, foundation, &mut acc);
    let content = build_content(task, niche, &pages, &mut acc);
    let styling = build_styling(design, &content, &mut acc);
    let integrations = build_integration(task, foundation, &mut acc);
    build_delivery(task, &styling, &integrations, &mut acc);

    let steps = acc.into_steps();
    let phases = summarize_phases(&steps);
    let total_tokens: u64 = steps.iter().map(|s| s.estimated_tokens as u64).sum();

    let plan = Plan {
        project_id: task.id.clone(),
        total_steps: steps.len(),
        phases,
        estimated_duration: estimate_duration(&steps, estimates),
        estimated_cost: estimate_cost(total_tokens, estimates),
        steps,
        created_at: chrono::Utc::now(),
    };

    info!(
        project_id = %plan.project_id,
        total_steps = plan.total_steps,
        phases = plan.phases.len(),
        duration = %plan.estimated_duration,
        cost = %plan.estimated_cost,
        "Plan generated"
    );

    Ok(plan)
}
