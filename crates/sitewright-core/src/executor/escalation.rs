//! Model-tier escalation policy
//!
//! Pure function of phase and retry count. The policy always returns the
//! strongest of {current tier, phase default, threshold-implied tier}, which
//! makes escalation monotonic within a step's retry sequence by construction.

use std::collections::HashMap;

use crate::config::RetryConfig;
use crate::llm::ModelTier;
use crate::plan::BuildPhase;

/// Injected tier-selection table and thresholds
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    phase_defaults: HashMap<BuildPhase, ModelTier>,
    standard_after: u32,
    max_after: u32,
}

impl EscalationPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            phase_defaults: config.phase_defaults.clone(),
            standard_after: config.escalate_standard_after,
            max_after: config.escalate_max_after,
        }
    }

    /// Tier a phase runs on by default
    pub fn phase_default(&self, phase: BuildPhase) -> ModelTier {
        self.phase_defaults
            .get(&phase)
            .copied()
            .unwrap_or(ModelTier::Standard)
    }

    /// Tier for a step's first attempt; the caller's preference acts as a floor
    pub fn initial_tier(&self, phase: BuildPhase, preferred: ModelTier) -> ModelTier {
        self.phase_default(phase).max(preferred)
    }

    /// Tier for the attempt after `retry_count` failures.
    ///
    /// Never weaker than `current`, so a step's tier sequence is monotonic.
    pub fn escalated_tier(
        &self,
        phase: BuildPhase,
        retry_count: u32,
        current: ModelTier,
    ) -> ModelTier {
        let threshold_tier = if retry_count >= self.max_after {
            ModelTier::Max
        } else if retry_count >= self.standard_after {
            ModelTier::Standard
        } else {
            ModelTier::Fast
        };

        current.max(self.phase_default(phase)).max(threshold_tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EscalationPolicy {
        EscalationPolicy::new(&RetryConfig::default())
    }

    #[test]
    fn test_initial_tier_respects_phase_default() {
        let policy = policy();
        assert_eq!(
            policy.initial_tier(BuildPhase::Content, ModelTier::Fast),
            ModelTier::Fast
        );
        assert_eq!(
            policy.initial_tier(BuildPhase::Delivery, ModelTier::Fast),
            ModelTier::Max
        );
    }

    #[test]
    fn test_preferred_tier_is_a_floor() {
        let policy = policy();
        assert_eq!(
            policy.initial_tier(BuildPhase::Content, ModelTier::Max),
            ModelTier::Max
        );
    }

    #[test]
    fn test_thresholds_force_stronger_tiers() {
        let policy = policy();
        assert_eq!(
            policy.escalated_tier(BuildPhase::Content, 2, ModelTier::Fast),
            ModelTier::Fast
        );
        assert_eq!(
            policy.escalated_tier(BuildPhase::Content, 3, ModelTier::Fast),
            ModelTier::Standard
        );
        assert_eq!(
            policy.escalated_tier(BuildPhase::Content, 5, ModelTier::Fast),
            ModelTier::Max
        );
    }

    #[test]
    fn test_escalation_never_steps_down() {
        let policy = policy();
        let mut tier = ModelTier::Fast;
        for retry in 1..10 {
            let next = policy.escalated_tier(BuildPhase::Content, retry, tier);
            assert!(next >= tier, "tier weakened at retry {retry}");
            tier = next;
        }
        assert_eq!(tier, ModelTier::Max);
    }

    #[test]
    fn test_phase_default_wins_over_weak_threshold() {
        let policy = policy();
        // Delivery defaults to Max; a low retry count must not weaken it.
        assert_eq!(
            policy.escalated_tier(BuildPhase::Delivery, 1, ModelTier::Max),
            ModelTier::Max
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let config = RetryConfig {
            escalate_standard_after: 1,
            escalate_max_after: 2,
            ..RetryConfig::default()
        };
        let policy = EscalationPolicy::new(&config);
        assert_eq!(
            policy.escalated_tier(BuildPhase::Content, 1, ModelTier::Fast),
            ModelTier::Standard
        );
        assert_eq!(
            policy.escalated_tier(BuildPhase::Content, 2, ModelTier::Standard),
            ModelTier::Max
        );
    }
}
