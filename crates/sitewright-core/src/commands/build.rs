//! Build command
//!
//! Loads the project's stored plan and either reports what a run would do
//! (dry run) or executes it against a generative backend, recording the run
//! in history.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{ExecutionConfig, ExecutionObserver, ExecutionResult, StepExecutor};
use crate::llm::{GenerativeBackend, HttpBackend, ModelTier};
use crate::plan::{PhaseInfo, Plan};
use crate::storage::Database;

/// Options for one build invocation
#[derive(Clone)]
pub struct BuildOptions {
    /// Directory generated files land in
    pub workspace: PathBuf,
    /// Floor on the model tier for every step
    pub preferred_tier: ModelTier,
    pub observer: Option<Arc<dyn ExecutionObserver>>,
}

impl BuildOptions {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            preferred_tier: ModelTier::Fast,
            observer: None,
        }
    }

    pub fn with_preferred_tier(mut self, tier: ModelTier) -> Self {
        self.preferred_tier = tier;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// What a run would do, without running it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunReport {
    pub project_id: String,
    pub total_steps: usize,
    pub phases: Vec<PhaseInfo>,
    pub parallelizable_steps: usize,
    pub total_estimated_tokens: u64,
    pub estimated_duration: String,
    pub estimated_cost: String,
}

/// Summarize a plan as a dry-run report
pub fn dry_run_report(plan: &Plan) -> DryRunReport {
    DryRunReport {
        project_id: plan.project_id.clone(),
        total_steps: plan.total_steps,
        phases: plan.phases.clone(),
        parallelizable_steps: plan.steps.iter().filter(|s| s.can_parallelize).count(),
        total_estimated_tokens: plan.total_estimated_tokens(),
        estimated_duration: plan.estimated_duration.clone(),
        estimated_cost: plan.estimated_cost.clone(),
    }
}

/// Execute the project's stored plan with the default HTTP backend
pub async fn execute_build(
    db: &Database,
    config: &Config,
    project_id: &str,
    options: BuildOptions,
) -> Result<ExecutionResult> {
    let api_key = config
        .llm
        .resolved_api_key()
        .map_err(|e| Error::ConfigError(e.to_string()))?
        .ok_or_else(|| {
            Error::ConfigError(
                "no API key set; export SITEWRIGHT_API_KEY or OPENROUTER_API_KEY".to_string(),
            )
        })?;
    let backend = HttpBackend::new(config.llm.clone(), api_key)?;
    execute_build_with(db, config, project_id, Arc::new(backend), options).await
}

/// Execute the project's stored plan against the given backend
pub async fn execute_build_with(
    db: &Database,
    config: &Config,
    project_id: &str,
    backend: Arc<dyn GenerativeBackend>,
    options: BuildOptions,
) -> Result<ExecutionResult> {
    let plan = db.load_plan(project_id).await?;

    info!(
        project_id,
        total_steps = plan.total_steps,
        workspace = %options.workspace.display(),
        "Starting build"
    );

    let mut exec_config = ExecutionConfig::new(options.workspace)
        .with_preferred_tier(options.preferred_tier)
        .with_max_global_retries(config.retry.max_global_retries);
    if let Some(observer) = options.observer {
        exec_config = exec_config.with_observer(observer);
    }

    let executor = StepExecutor::new(backend, config);
    let result = executor.execute(&plan, &exec_config).await?;

    let run_id = db.record_run(project_id, &result).await?;
    info!(project_id, run_id = %run_id, success = result.success, "Build recorded");

    Ok(result)
}
