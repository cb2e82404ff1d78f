//! Configuration management with file persistence
//!
//! All hand-tuned estimator and retry constants (batch size, backoff cap,
//! escalation thresholds, estimate floors) live here as overridable defaults
//! rather than hidden constants, so tests and callers can inject their own
//! tables without patching globals.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

use crate::cost::TierPricing;
use crate::llm::ModelTier;
use crate::plan::BuildPhase;

/// Sitewright configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub estimates: EstimateConfig,
    pub retry: RetryConfig,
}

/// Generative backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub models: TierModels,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

/// Concrete model identifier per tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierModels {
    pub fast: String,
    pub standard: String,
    pub max: String,
}

impl TierModels {
    /// Resolve a tier to its configured model identifier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Standard => &self.standard,
            ModelTier::Max => &self.max,
        }
    }
}

/// Plan-level estimate tuning
///
/// Constants chosen empirically; none of them is load-bearing beyond
/// "reasonable default".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateConfig {
    /// Assumed concurrency for parallelizable steps
    pub parallel_batch_size: usize,
    /// Assumed wall-clock minutes per step
    pub minutes_per_step: u64,
    /// Absolute floor on the low duration bound, in minutes
    pub min_minutes: u64,
    /// Widening factors applied to the point duration estimate
    pub duration_low_factor: f64,
    pub duration_high_factor: f64,
    /// Widening factors applied to the point cost estimate
    pub cost_low_factor: f64,
    pub cost_high_factor: f64,
    /// Absolute floor on the low cost bound, in USD
    pub min_cost_usd: f64,
    /// Unit prices per tier
    pub pricing: TierPricing,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            parallel_batch_size: 3,
            minutes_per_step: 4,
            min_minutes: 15,
            duration_low_factor: 0.75,
            duration_high_factor: 1.3,
            cost_low_factor: 0.8,
            cost_high_factor: 1.5,
            min_cost_usd: 1.0,
            pricing: TierPricing::default(),
        }
    }
}

/// Retry and escalation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Run-wide ceiling on retries for any single step
    pub max_global_retries: u32,
    /// Exponential backoff base delay in milliseconds
    pub backoff_base_ms: u64,
    /// Backoff cap in milliseconds
    pub backoff_cap_ms: u64,
    /// Retry count at which the standard tier is forced
    pub escalate_standard_after: u32,
    /// Retry count at which the max tier is forced
    pub escalate_max_after: u32,
    /// Default model tier per phase
    #[serde(with = "phase_tier_map", default = "default_phase_tiers")]
    pub phase_defaults: HashMap<BuildPhase, ModelTier>,
}

/// Serialize the phase-default table with string keys so it stays editable
/// in the TOML config file.
mod phase_tier_map {
    use super::*;
    use serde::{Deserializer, Serializer, de::Error as _};
    use std::collections::BTreeMap;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(
        map: &HashMap<BuildPhase, ModelTier>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let by_name: BTreeMap<String, ModelTier> =
            map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        serde::Serialize::serialize(&by_name, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<BuildPhase, ModelTier>, D::Error> {
        let by_name: BTreeMap<String, ModelTier> =
            serde::Deserialize::deserialize(deserializer)?;
        by_name
            .into_iter()
            .map(|(k, v)| BuildPhase::from_str(&k).map(|p| (p, v)).map_err(D::Error::custom))
            .collect()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_global_retries: 3,
            backoff_base_ms: 1000,
            backoff_cap_ms: 10_000,
            escalate_standard_after: 3,
            escalate_max_after: 5,
            phase_defaults: default_phase_tiers(),
        }
    }
}

/// Default phase-to-tier table: structurally sensitive phases get a stronger
/// tier, templated phases the cheap one.
pub fn default_phase_tiers() -> HashMap<BuildPhase, ModelTier> {
    HashMap::from([
        (BuildPhase::Foundation, ModelTier::Standard),
        (BuildPhase::Structure, ModelTier::Standard),
        (BuildPhase::Content, ModelTier::Fast),
        (BuildPhase::Styling, ModelTier::Fast),
        (BuildPhase::Integration, ModelTier::Standard),
        (BuildPhase::Delivery, ModelTier::Max),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                models: TierModels {
                    fast: "anthropic/claude-3-5-haiku-latest".to_string(),
                    standard: "anthropic/claude-sonnet-4-20250514".to_string(),
                    max: "anthropic/claude-opus-4-1-20250805".to_string(),
                },
                temperature: 0.7,
                max_tokens: 8192,
                timeout_secs: 180,
            },
            estimates: EstimateConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("SITEWRIGHT_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok())
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Config::default().llm
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("SITEWRIGHT_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("sitewright")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("temperature must be between 0.0 and 2.0"));
        }
        if self.estimates.parallel_batch_size == 0 {
            return Err(anyhow!("parallel_batch_size must be at least 1"));
        }
        if self.estimates.duration_low_factor > self.estimates.duration_high_factor {
            return Err(anyhow!("duration_low_factor must not exceed duration_high_factor"));
        }
        if self.retry.backoff_base_ms == 0 {
            return Err(anyhow!("backoff_base_ms must be positive"));
        }
        if self.retry.escalate_standard_after > self.retry.escalate_max_after {
            return Err(anyhow!(
                "escalate_standard_after must not exceed escalate_max_after"
            ));
        }
        Ok(())
    }
}
