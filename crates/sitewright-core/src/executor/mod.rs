//! Step execution
//!
//! Consumes an immutable [`Plan`](crate::plan::Plan) and runs each step
//! against a generative backend, in array order, with per-step retry,
//! model-tier escalation, progress/error events, and cooperative
//! cancellation. The executor never mutates the plan; all run state lives in
//! the run itself.

pub mod artifacts;
pub mod escalation;
mod run;

pub use artifacts::{ArtifactExtractor, PatternExtractor};
pub use escalation::EscalationPolicy;
pub use run::StepExecutor;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::ModelTier;
use crate::plan::BuildPhase;

/// Per-step lifecycle status carried on progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Progress event emitted as a step changes status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step_id: u32,
    pub step_name: String,
    pub phase: BuildPhase,
    /// `step_id / total_steps * 100`, rounded
    pub percentage: u8,
    pub status: StepStatus,
    /// Truncated output excerpt, present on completion
    pub output: Option<String>,
    pub files_created: Option<Vec<String>>,
    pub tokens_used: Option<u32>,
}

/// One failed attempt; appended to the run's error log whether or not the
/// step is ultimately abandoned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    pub step_id: u32,
    pub step_name: String,
    pub error: String,
    pub retry_count: u32,
    pub can_retry: bool,
    /// Tier the next attempt will run on, when escalation applies
    pub escalated_model: Option<ModelTier>,
}

/// Terminal summary of one run; computed once at the end of `execute()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub total_steps: usize,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
    pub files_created: Vec<String>,
    pub errors: Vec<StepError>,
    pub duration_ms: u64,
    pub aborted: bool,
}

/// Callbacks observing a run; absence must not affect control flow
pub trait ExecutionObserver: Send + Sync {
    fn on_progress(&self, _event: &ProgressEvent) {}
    fn on_error(&self, _error: &StepError) {}
    fn on_complete(&self, _result: &ExecutionResult) {}
}

/// Per-run execution configuration
#[derive(Clone)]
pub struct ExecutionConfig {
    /// Directory the backend's tool-use side effects land in
    pub workspace_path: PathBuf,
    /// Floor on the model tier; phase defaults may still select stronger
    pub preferred_tier: ModelTier,
    /// Run-wide retry ceiling, combined with each step's own `max_retries`
    pub max_global_retries: u32,
    pub observer: Option<Arc<dyn ExecutionObserver>>,
}

impl std::fmt::Debug for ExecutionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionConfig")
            .field("workspace_path", &self.workspace_path)
            .field("preferred_tier", &self.preferred_tier)
            .field("max_global_retries", &self.max_global_retries)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ExecutionConfig {
    pub fn new(workspace_path: impl Into<PathBuf>) -> Self {
        Self {
            workspace_path: workspace_path.into(),
            preferred_tier: ModelTier::Fast,
            max_global_retries: 3,
            observer: None,
        }
    }

    pub fn with_preferred_tier(mut self, tier: ModelTier) -> Self {
        self.preferred_tier = tier;
        self
    }

    pub fn with_max_global_retries(mut self, retries: u32) -> Self {
        self.max_global_retries = retries;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}
