//! Plan-level metrics
//!
//! These observe the final, fully-assembled step sequence, which is why they
//! run after every phase builder rather than inside any of them. Estimates
//! are deliberately coarse: they exist to set expectations, not to schedule.

use crate::config::EstimateConfig;
use crate::cost::TokenUsage;

use super::types::{PhaseInfo, Step};

/// Derive the per-phase summary, in first-appearance order
pub fn summarize_phases(steps: &[Step]) -> Vec<PhaseInfo> {
    let mut phases: Vec<PhaseInfo> = Vec::new();

    for step in steps {
        match phases.iter_mut().find(|p| p.phase == step.phase) {
            Some(info) => {
                info.first_step = info.first_step.min(step.id);
                info.last_step = info.last_step.max(step.id);
            }
            None => phases.push(PhaseInfo {
                phase: step.phase,
                description: step.phase.description().to_string(),
                first_step: step.id,
                last_step: step.id,
                can_parallelize: step.phase.parallelizable(),
            }),
        }
    }

    phases
}

/// Estimate wall-clock duration as a human-readable minute range
///
/// Parallelizable steps are assumed batchable at the configured batch size;
/// sequential steps contribute full per-step time. The range is widened and
/// floored so tiny plans never produce a degenerate near-zero estimate.
pub fn estimate_duration(steps: &[Step], config: &EstimateConfig) -> String {
    let parallel = steps.iter().filter(|s| s.can_parallelize).count();
    let sequential = steps.len() - parallel;

    let batches = parallel.div_ceil(config.parallel_batch_size);
    let minutes = ((sequential + batches) as u64) * config.minutes_per_step;

    let low = ((minutes as f64 * config.duration_low_factor).floor() as u64).max(config.min_minutes);
    let high = ((minutes as f64 * config.duration_high_factor).ceil() as u64)
        .max(low + config.minutes_per_step);

    format!("{}-{} minutes", low, high)
}

/// Estimate cost as a human-readable USD range
///
/// Assumes the configured 1:2 input:output token split and standard-tier
/// unit prices, widened and floored like the duration estimate.
pub fn estimate_cost(total_tokens: u64, config: &EstimateConfig) -> String {
    let usage = TokenUsage::from_total(total_tokens.min(u32::MAX as u64) as u32);
    let base = config.pricing.standard.cost_usd(usage);

    let low = (base * config.cost_low_factor).max(config.min_cost_usd);
    let high = (base * config.cost_high_factor).max(low);

    format!("${:.2}-${:.2}", low, high)
}
