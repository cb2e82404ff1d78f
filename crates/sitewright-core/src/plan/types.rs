//! Build plan data model
//!
//! A [`Plan`] is the immutable output of decomposition: an ordered sequence
//! of [`Step`]s partitioned into phases, plus derived phase and estimate
//! summaries. The executor only ever reads these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of build phases, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// Project scaffold, design tokens, layout shell
    Foundation,
    /// Page skeletons and routing
    Structure,
    /// Niche-specific sections and copy per page
    Content,
    /// Responsive and design-system polish passes
    Styling,
    /// Third-party integrations (forms, analytics, ...)
    Integration,
    /// Site-wide review and export readiness
    Delivery,
}

impl BuildPhase {
    /// Every phase, in pipeline order
    pub const ALL: [BuildPhase; 6] = [
        Self::Foundation,
        Self::Structure,
        Self::Content,
        Self::Styling,
        Self::Integration,
        Self::Delivery,
    ];

    /// Human-readable description of the phase's purpose
    pub fn description(&self) -> &'static str {
        match self {
            Self::Foundation => "Project scaffold, design tokens, and layout shell",
            Self::Structure => "Page skeletons and routing",
            Self::Content => "Niche-specific sections and copy for each page",
            Self::Styling => "Responsive behavior and design-system polish",
            Self::Integration => "Third-party integrations",
            Self::Delivery => "Site-wide review and export readiness",
        }
    }

    /// Whether steps inside this phase may run concurrently with each other.
    /// Phases themselves stay ordered relative to one another.
    pub fn parallelizable(&self) -> bool {
        matches!(self, Self::Content | Self::Styling)
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foundation => write!(f, "foundation"),
            Self::Structure => write!(f, "structure"),
            Self::Content => write!(f, "content"),
            Self::Styling => write!(f, "styling"),
            Self::Integration => write!(f, "integration"),
            Self::Delivery => write!(f, "delivery"),
        }
    }
}

impl std::str::FromStr for BuildPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "foundation" => Ok(Self::Foundation),
            "structure" => Ok(Self::Structure),
            "content" => Ok(Self::Content),
            "styling" => Ok(Self::Styling),
            "integration" => Ok(Self::Integration),
            "delivery" => Ok(Self::Delivery),
            _ => Err(format!("Unknown build phase: {}", s)),
        }
    }
}

/// How the executor reacts once a step exhausts its retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Retry on the same tier; exhaustion stops the run
    Simple,
    /// Retry with tier escalation; exhaustion stops the run
    Escalate,
    /// Retry, then mark the step skipped and continue
    Skip,
}

/// One atomic unit of generative work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique within a plan, contiguous from 1 in generation order
    pub id: u32,
    pub phase: BuildPhase,
    pub name: String,
    pub description: String,
    /// Literal instruction text for the generative backend
    pub prompt: String,
    /// Used only for metrics, never for control flow
    pub estimated_tokens: u32,
    /// Ids of steps that must complete first; always strictly less than `id`
    pub dependencies: Vec<u32>,
    /// Hint that this step is safe to run concurrently with other hinted
    /// steps in the same phase, dependencies permitting
    pub can_parallelize: bool,
    /// Expected artifact paths, relative to the execution workspace
    pub outputs: Vec<String>,
    /// Advisory assertions about the step's output
    pub validation_checks: Vec<String>,
    pub retry_strategy: RetryStrategy,
    /// Step-specific retry ceiling
    pub max_retries: u32,
}

/// Derived summary of one phase's slice of the step sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub phase: BuildPhase,
    pub description: String,
    /// Lowest step id in the phase
    pub first_step: u32,
    /// Highest step id in the phase
    pub last_step: u32,
    pub can_parallelize: bool,
}

/// The complete, immutable output of decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub project_id: String,
    /// Ordered sequence; order encodes the default execution sequence
    pub steps: Vec<Step>,
    /// Always `steps.len()`
    pub total_steps: usize,
    /// One entry per distinct phase, in first-appearance order
    pub phases: Vec<PhaseInfo>,
    /// Human-readable range, computed once at generation time
    pub estimated_duration: String,
    /// Human-readable range, computed once at generation time
    pub estimated_cost: String,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Sum of per-step token estimates
    pub fn total_estimated_tokens(&self) -> u64 {
        self.steps.iter().map(|s| s.estimated_tokens as u64).sum()
    }
}

/// Caller-supplied description of the build to decompose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTask {
    /// Opaque project identifier; becomes `Plan::project_id`
    pub id: String,
    pub business_description: String,
    pub niche_id: String,
    pub design_system_id: String,
    pub features: Vec<String>,
    pub pages: Vec<String>,
    pub integrations: Vec<String>,
}

impl BuildTask {
    pub fn new(
        business_description: impl Into<String>,
        niche_id: impl Into<String>,
        design_system_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            business_description: business_description.into(),
            niche_id: niche_id.into(),
            design_system_id: design_system_id.into(),
            features: Vec::new(),
            pages: vec!["home".to_string()],
            integrations: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_pages(mut self, pages: Vec<String>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    pub fn with_integrations(mut self, integrations: Vec<String>) -> Self {
        self.integrations = integrations;
        self
    }
}
