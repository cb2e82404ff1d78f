//! Request/response types for the generative backend

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Model capability tier
///
/// Ordered from cheapest to most capable; the derived `Ord` is what makes
/// escalation monotonicity checkable (`tier.max(other)` never weakens).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap, fast tier for templated work
    Fast,
    /// Balanced default tier
    Standard,
    /// Most capable tier, reserved for escalation and review-heavy phases
    Max,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Standard => write!(f, "standard"),
            Self::Max => write!(f, "max"),
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "standard" => Ok(Self::Standard),
            "max" => Ok(Self::Max),
            _ => Err(format!("Unknown model tier: {}", s)),
        }
    }
}

/// A single request to the generative backend
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Literal instruction text for this step
    pub prompt: String,
    /// Concrete model identifier (already resolved from a tier)
    pub model: String,
    /// Workspace the backend's tool-use side effects land in
    pub workspace: PathBuf,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, workspace: PathBuf) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            workspace,
        }
    }
}

/// Accumulated response from the generative backend
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Full accumulated output text
    pub text: String,
    /// Tokens reported by the backend, 0 when the API omitted usage
    pub tokens_used: u32,
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message sent to the completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Wire request for the chat completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stream: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// Token usage block reported by the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}
