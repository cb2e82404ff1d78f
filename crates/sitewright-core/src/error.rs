//! Error types for Sitewright

use thiserror::Error;

/// Result type alias using Sitewright's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Sitewright error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (E001-E099)
    #[error("Unknown niche '{0}'. Run `sitewright catalog niches` to see supported niches.")]
    UnknownNiche(String),

    #[error(
        "Unknown design system '{0}'. Run `sitewright catalog design-systems` to see supported design systems."
    )]
    UnknownDesignSystem(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Backend errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Backend error: {0}. Check your API key with `sitewright build --dry-run` first.")]
    BackendError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Execution errors (E200-E299)
    #[error("Executor already consumed. Create a new executor for each run.")]
    ExecutorConsumed,

    #[error("Run cancelled")]
    Cancelled,

    // Storage errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("No plan found for project '{0}'. Run `sitewright plan` first.")]
    PlanNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownNiche(_) => "E001",
            Self::UnknownDesignSystem(_) => "E002",
            Self::ConfigError(_) => "E003",
            Self::NetworkError(_) => "E100",
            Self::BackendError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::ExecutorConsumed => "E200",
            Self::Cancelled => "E201",
            Self::DatabaseError(_) => "E400",
            Self::PlanNotFound(_) => "E401",
            Self::SerializationError(_) => "E402",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) => "E999",
            Self::Io(_) => "E998",
        }
    }

    /// Whether this error class is fatal to plan generation or setup
    /// rather than recoverable by a step retry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownNiche(_) | Self::UnknownDesignSystem(_) | Self::ConfigError(_)
        )
    }
}
