//! Cost accounting per model tier
//!
//! This module provides:
//! - Token usage records per backend call
//! - Per-tier pricing used both for plan estimates and run summaries
//! - A per-run ledger aggregating usage by tier

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::llm::ModelTier;

/// Token usage for a single backend call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input/prompt tokens
    pub input_tokens: u32,
    /// Number of output/completion tokens
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Create a new token usage record
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Split a total token count using the assumed 1:2 input:output ratio.
    ///
    /// Plan estimates only know totals, not the split the backend will
    /// actually report.
    pub fn from_total(total: u32) -> Self {
        let input = total / 3;
        Self {
            input_tokens: input,
            output_tokens: total - input,
        }
    }

    /// Total tokens (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Pricing information for one model tier (per million tokens)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per million input tokens in USD
    pub input_price_per_million: f64,
    /// Cost per million output tokens in USD
    pub output_price_per_million: f64,
}

impl ModelPricing {
    pub fn new(input_price: f64, output_price: f64) -> Self {
        Self {
            input_price_per_million: input_price,
            output_price_per_million: output_price,
        }
    }

    /// Calculate cost in USD for given token usage
    pub fn cost_usd(&self, tokens: TokenUsage) -> f64 {
        let input = (tokens.input_tokens as f64 / 1_000_000.0) * self.input_price_per_million;
        let output = (tokens.output_tokens as f64 / 1_000_000.0) * self.output_price_per_million;
        input + output
    }
}

/// Unit prices for each model tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierPricing {
    pub fast: ModelPricing,
    pub standard: ModelPricing,
    pub max: ModelPricing,
}

impl Default for TierPricing {
    fn default() -> Self {
        Self {
            fast: ModelPricing::new(0.25, 1.25),
            standard: ModelPricing::new(3.0, 15.0),
            max: ModelPricing::new(15.0, 75.0),
        }
    }
}

impl TierPricing {
    /// Pricing for a specific tier
    pub fn for_tier(&self, tier: ModelTier) -> ModelPricing {
        match tier {
            ModelTier::Fast => self.fast,
            ModelTier::Standard => self.standard,
            ModelTier::Max => self.max,
        }
    }
}

/// Per-run cost ledger, owned by a single execution
///
/// Aggregates token usage by the tier each step attempt actually ran on.
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    by_tier: HashMap<ModelTier, TokenUsage>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage for one backend call
    pub fn record(&mut self, tier: ModelTier, usage: TokenUsage) {
        let entry = self.by_tier.entry(tier).or_default();
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
    }

    /// Total tokens across all tiers
    pub fn total_tokens(&self) -> u64 {
        self.by_tier.values().map(|u| u.total() as u64).sum()
    }

    /// Total cost in USD under the given pricing
    pub fn total_cost_usd(&self, pricing: &TierPricing) -> f64 {
        self.by_tier
            .iter()
            .map(|(tier, usage)| pricing.for_tier(*tier).cost_usd(*usage))
            .sum()
    }
}
