//! The execution run loop
//!
//! One [`StepExecutor`] performs exactly one run of one plan. Steps execute
//! in array order; failures retry with unconditional exponential backoff and
//! tier escalation until the step's own ceiling or the run-wide ceiling is
//! exhausted. Step-level errors never propagate out of `execute()` — they
//! end up in the result's error log. Cancellation is cooperative and wins
//! over any in-flight step.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, RetryConfig, TierModels};
use crate::cost::{CostLedger, TierPricing, TokenUsage};
use crate::error::{Error, Result};
use crate::llm::{GenerativeBackend, ModelTier, QueryRequest};
use crate::plan::{Plan, RetryStrategy, Step};

use super::artifacts::{ArtifactExtractor, PatternExtractor};
use super::escalation::EscalationPolicy;
use super::{ExecutionConfig, ExecutionResult, ProgressEvent, StepError, StepStatus};

/// Longest output excerpt carried on a progress event
const OUTPUT_EXCERPT_CHARS: usize = 400;

/// Runs a plan against a generative backend
///
/// Single logical run per instance; re-invoking `execute()` is an error.
pub struct StepExecutor {
    backend: Arc<dyn GenerativeBackend>,
    models: TierModels,
    retry: RetryConfig,
    pricing: TierPricing,
    extractor: Box<dyn ArtifactExtractor>,
    cancel: CancellationToken,
    consumed: AtomicBool,
}

impl StepExecutor {
    pub fn new(backend: Arc<dyn GenerativeBackend>, config: &Config) -> Self {
        Self {
            backend,
            models: config.llm.models.clone(),
            retry: config.retry.clone(),
            pricing: config.estimates.pricing,
            extractor: Box::new(PatternExtractor),
            cancel: CancellationToken::new(),
            consumed: AtomicBool::new(false),
        }
    }

    /// Replace the artifact extractor (e.g. with a structured tool-call log)
    pub fn with_extractor(mut self, extractor: Box<dyn ArtifactExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Handle for cooperative cancellation of this run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every step of the plan, in array order
    pub async fn execute(&self, plan: &Plan, config: &ExecutionConfig) -> Result<ExecutionResult> {
        if self.consumed.swap(true, Ordering::SeqCst) {
            return Err(Error::ExecutorConsumed);
        }

        info!(
            project_id = %plan.project_id,
            total_steps = plan.total_steps,
            workspace = %config.workspace_path.display(),
            "Starting execution run"
        );

        let start = Instant::now();
        let policy = EscalationPolicy::new(&self.retry);
        let max_global_retries = config.max_global_retries.max(self.retry.max_global_retries);

        let mut run = RunState::default();

        'steps: for step in &plan.steps {
            if self.cancel.is_cancelled() {
                run.aborted = true;
                break;
            }

            self.emit_progress(config, progress(step, plan, StepStatus::Executing));

            let mut retry_count = 0u32;
            let mut tier = policy.initial_tier(step.phase, config.preferred_tier);

            loop {
                debug!(step_id = step.id, %tier, retry_count, "Attempting step");
                let request = QueryRequest::new(
                    step.prompt.clone(),
                    self.models.model_for(tier),
                    config.workspace_path.clone(),
                );

                match self.backend.run_query(request, &self.cancel).await {
                    Ok(response) => {
                        let files = self.extractor.extract(&response.text);
                        for file in &files {
                            if !run.files_created.contains(file) {
                                run.files_created.push(file.clone());
                            }
                        }

                        let tokens = if response.tokens_used > 0 {
                            response.tokens_used
                        } else {
                            step.estimated_tokens
                        };
                        run.ledger.record(tier, TokenUsage::from_total(tokens));
                        run.completed += 1;

                        let mut event = progress(step, plan, StepStatus::Completed);
                        event.output = Some(excerpt(&response.text));
                        event.files_created = Some(files);
                        event.tokens_used = Some(tokens);
                        self.emit_progress(config, event);
                        break;
                    }
                    Err(Error::Cancelled) => {
                        run.aborted = true;
                        break 'steps;
                    }
                    Err(error) => {
                        retry_count += 1;
                        let ceiling = step.max_retries.max(max_global_retries);
                        let can_retry = retry_count < ceiling;

                        let next_tier = match step.retry_strategy {
                            RetryStrategy::Simple => tier,
                            RetryStrategy::Escalate | RetryStrategy::Skip => {
                                policy.escalated_tier(step.phase, retry_count, tier)
                            }
                        };

                        let step_error = StepError {
                            step_id: step.id,
                            step_name: step.name.clone(),
                            error: error.to_string(),
                            retry_count,
                            can_retry,
                            escalated_model: (step.retry_strategy != RetryStrategy::Simple)
                                .then_some(next_tier),
                        };
                        warn!(
                            step_id = step.id,
                            retry_count,
                            can_retry,
                            error = %step_error.error,
                            "Step attempt failed"
                        );
                        self.emit_error(config, &step_error);
                        run.errors.push(step_error);

                        if !can_retry {
                            match step.retry_strategy {
                                RetryStrategy::Skip => {
                                    run.skipped += 1;
                                    self.emit_progress(
                                        config,
                                        progress(step, plan, StepStatus::Skipped),
                                    );
                                    break;
                                }
                                RetryStrategy::Simple | RetryStrategy::Escalate => {
                                    run.failed += 1;
                                    self.emit_progress(
                                        config,
                                        progress(step, plan, StepStatus::Failed),
                                    );
                                    break 'steps;
                                }
                            }
                        }

                        // Unconditional backoff before every retry; escalation
                        // and backoff are independent, composed policies.
                        let delay = backoff_delay(retry_count, &self.retry);
                        tokio::select! {
                            _ = self.cancel.cancelled() => {
                                run.aborted = true;
                                break 'steps;
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }

                        tier = next_tier;
                    }
                }
            }
        }

        let result = run.into_result(plan, &self.pricing, start.elapsed());

        info!(
            project_id = %plan.project_id,
            success = result.success,
            completed = result.completed_steps,
            failed = result.failed_steps,
            skipped = result.skipped_steps,
            aborted = result.aborted,
            duration_ms = result.duration_ms,
            "Execution run finished"
        );

        if let Some(observer) = &config.observer {
            observer.on_complete(&result);
        }
        Ok(result)
    }

    fn emit_progress(&self, config: &ExecutionConfig, event: ProgressEvent) {
        if let Some(observer) = &config.observer {
            observer.on_progress(&event);
        }
    }

    fn emit_error(&self, config: &ExecutionConfig, error: &StepError) {
        if let Some(observer) = &config.observer {
            observer.on_error(error);
        }
    }
}

/// Mutable state owned by one run
#[derive(Default)]
struct RunState {
    completed: usize,
    failed: usize,
    skipped: usize,
    errors: Vec<StepError>,
    files_created: Vec<String>,
    ledger: CostLedger,
    aborted: bool,
}

impl RunState {
    fn into_result(self, plan: &Plan, pricing: &TierPricing, elapsed: Duration) -> ExecutionResult {
        ExecutionResult {
            success: !self.aborted && self.failed == 0,
            completed_steps: self.completed,
            failed_steps: self.failed,
            skipped_steps: self.skipped,
            total_steps: plan.total_steps,
            total_tokens: self.ledger.total_tokens(),
            estimated_cost_usd: self.ledger.total_cost_usd(pricing),
            files_created: self.files_created,
            errors: self.errors,
            duration_ms: elapsed.as_millis() as u64,
            aborted: self.aborted,
        }
    }
}

/// Build a progress event skeleton for a step
fn progress(step: &Step, plan: &Plan, status: StepStatus) -> ProgressEvent {
    let percentage = ((step.id as f64 / plan.total_steps.max(1) as f64) * 100.0).round() as u8;
    ProgressEvent {
        step_id: step.id,
        step_name: step.name.clone(),
        phase: step.phase,
        percentage,
        status,
        output: None,
        files_created: None,
        tokens_used: None,
    }
}

/// `min(base * 2^retry_count, cap)` milliseconds
fn backoff_delay(retry_count: u32, config: &RetryConfig) -> Duration {
    let exp = config
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(retry_count));
    Duration::from_millis(exp.min(config.backoff_cap_ms))
}

/// First `OUTPUT_EXCERPT_CHARS` characters of the output
fn excerpt(text: &str) -> String {
    match text.char_indices().nth(OUTPUT_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::QueryResponse;
    use crate::plan::{BuildPhase, RetryStrategy};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted backend: fails a step's prompt a fixed number of times, then
    /// succeeds. Records every call it sees.
    struct ScriptedBackend {
        /// prompt marker -> remaining failures
        failures: Mutex<HashMap<String, u32>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                failures: Mutex::new(
                    failures
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn run_query(
            &self,
            request: QueryRequest,
            cancel: &CancellationToken,
        ) -> Result<QueryResponse> {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.calls
                .lock()
                .unwrap()
                .push((request.prompt.clone(), request.model.clone()));

            let mut failures = self.failures.lock().unwrap();
            for (marker, remaining) in failures.iter_mut() {
                if request.prompt.contains(marker.as_str()) && *remaining > 0 {
                    *remaining -= 1;
                    return Err(Error::BackendError("backend unavailable".to_string()));
                }
            }

            Ok(QueryResponse {
                text: format!("done\ncreated out/{}.txt", request.prompt.len()),
                tokens_used: 100,
            })
        }
    }

    /// Backend that cancels the shared token on its nth call
    struct CancellingBackend {
        cancel_on_call: usize,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl GenerativeBackend for CancellingBackend {
        async fn run_query(
            &self,
            _request: QueryRequest,
            cancel: &CancellationToken,
        ) -> Result<QueryResponse> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call >= self.cancel_on_call {
                cancel.cancel();
                return Err(Error::Cancelled);
            }
            Ok(QueryResponse {
                text: String::new(),
                tokens_used: 50,
            })
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        progress: Mutex<Vec<ProgressEvent>>,
        errors: Mutex<Vec<StepError>>,
        completes: Mutex<Vec<ExecutionResult>>,
    }

    impl super::super::ExecutionObserver for RecordingObserver {
        fn on_progress(&self, event: &ProgressEvent) {
            self.progress.lock().unwrap().push(event.clone());
        }
        fn on_error(&self, error: &StepError) {
            self.errors.lock().unwrap().push(error.clone());
        }
        fn on_complete(&self, result: &ExecutionResult) {
            self.completes.lock().unwrap().push(result.clone());
        }
    }

    fn step(
        id: u32,
        phase: BuildPhase,
        name: &str,
        strategy: RetryStrategy,
        max_retries: u32,
    ) -> Step {
        Step {
            id,
            phase,
            name: name.to_string(),
            description: String::new(),
            prompt: format!("prompt for {}", name),
            estimated_tokens: 1000,
            dependencies: if id > 1 { vec![id - 1] } else { vec![] },
            can_parallelize: phase.parallelizable(),
            outputs: vec![],
            validation_checks: vec![],
            retry_strategy: strategy,
            max_retries,
        }
    }

    /// The 3-phase example plan: foundation 2, content 2, delivery 1
    fn example_plan() -> Plan {
        let steps = vec![
            step(1, BuildPhase::Foundation, "scaffold", RetryStrategy::Escalate, 3),
            step(2, BuildPhase::Foundation, "layout", RetryStrategy::Escalate, 3),
            step(3, BuildPhase::Content, "home content", RetryStrategy::Escalate, 3),
            step(4, BuildPhase::Content, "about content", RetryStrategy::Escalate, 3),
            step(5, BuildPhase::Delivery, "review", RetryStrategy::Escalate, 3),
        ];
        Plan {
            project_id: "proj-exec".to_string(),
            total_steps: steps.len(),
            phases: vec![],
            estimated_duration: "15-30 minutes".to_string(),
            estimated_cost: "$1.00-$2.00".to_string(),
            steps,
            created_at: chrono::Utc::now(),
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        // Escalate early so retry scenarios cross tier thresholds quickly.
        config.retry.escalate_standard_after = 1;
        config.retry.escalate_max_after = 2;
        config
    }

    fn exec_config() -> ExecutionConfig {
        ExecutionConfig::new("/tmp/sitewright-test").with_max_global_retries(3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_run_completes_every_step() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let executor = StepExecutor::new(backend.clone(), &test_config());

        let result = executor
            .execute(&example_plan(), &exec_config())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.completed_steps, 5);
        assert_eq!(result.failed_steps, 0);
        assert_eq!(result.skipped_steps, 0);
        assert!(result.errors.is_empty());
        assert!(!result.aborted);
        assert_eq!(backend.calls().len(), 5);
        assert_eq!(result.total_tokens, 500);
        assert!(result.estimated_cost_usd > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_example_scenario_retry_then_succeed_escalated() {
        // Step 3 fails twice, succeeds on the third attempt.
        let backend = Arc::new(ScriptedBackend::new(&[("home content", 2)]));
        let executor = StepExecutor::new(backend.clone(), &test_config());

        let result = executor
            .execute(&example_plan(), &exec_config())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.completed_steps, 5);
        assert_eq!(result.failed_steps, 0);

        let step3_errors: Vec<_> = result.errors.iter().filter(|e| e.step_id == 3).collect();
        assert_eq!(step3_errors.len(), 2);
        assert_eq!(result.errors.len(), 2);

        // Escalation across the two errors is strictly increasing.
        let first = step3_errors[0].escalated_model.unwrap();
        let second = step3_errors[1].escalated_model.unwrap();
        assert!(second > first, "{second} should be stronger than {first}");

        // The successful third attempt ran on the escalated tier.
        let config = test_config();
        let step3_models: Vec<_> = backend
            .calls()
            .iter()
            .filter(|(prompt, _)| prompt.contains("home content"))
            .map(|(_, model)| model.clone())
            .collect();
        assert_eq!(step3_models.len(), 3);
        assert_eq!(step3_models[2], config.llm.models.max);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_stops_the_run() {
        // Step 2 fails forever; ceiling is max(step 3, global 3) = 3.
        let backend = Arc::new(ScriptedBackend::new(&[("layout", 99)]));
        let executor = StepExecutor::new(backend.clone(), &test_config());

        let result = executor
            .execute(&example_plan(), &exec_config())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(!result.aborted);
        assert_eq!(result.completed_steps, 1);
        assert_eq!(result.failed_steps, 1);
        assert_eq!(result.errors.len(), 3);
        assert!(!result.errors.last().unwrap().can_retry);

        // Nothing after the failed step ever started.
        assert!(
            backend
                .calls()
                .iter()
                .all(|(prompt, _)| !prompt.contains("content") && !prompt.contains("review"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling_respected() {
        let backend = Arc::new(ScriptedBackend::new(&[("layout", 99)]));
        let executor = StepExecutor::new(backend, &test_config());

        let plan = example_plan();
        let config = exec_config().with_max_global_retries(2);
        let result = executor.execute(&plan, &config).await.unwrap();

        let ceiling = plan.steps[1].max_retries.max(3) as usize;
        let layout_errors = result.errors.iter().filter(|e| e.step_id == 2).count();
        assert!(layout_errors <= ceiling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_strategy_continues_run() {
        let mut plan = example_plan();
        plan.steps[2].retry_strategy = RetryStrategy::Skip;
        plan.steps[2].max_retries = 2;

        let backend = Arc::new(ScriptedBackend::new(&[("home content", 99)]));
        let executor = StepExecutor::new(backend.clone(), &test_config());

        let config = exec_config().with_max_global_retries(2);
        let result = executor.execute(&plan, &config).await.unwrap();

        assert!(result.success, "a skipped step must not fail the run");
        assert_eq!(result.completed_steps, 4);
        assert_eq!(result.skipped_steps, 1);
        assert_eq!(result.failed_steps, 0);

        // The run moved on to later steps.
        assert!(
            backend
                .calls()
                .iter()
                .any(|(prompt, _)| prompt.contains("review"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_strategy_never_escalates() {
        let mut plan = example_plan();
        plan.steps[0].retry_strategy = RetryStrategy::Simple;

        let backend = Arc::new(ScriptedBackend::new(&[("scaffold", 99)]));
        let executor = StepExecutor::new(backend.clone(), &test_config());

        let result = executor.execute(&plan, &exec_config()).await.unwrap();

        assert!(!result.success);
        assert!(result.errors.iter().all(|e| e.escalated_model.is_none()));

        // Every attempt ran on the same model.
        let models: Vec<_> = backend.calls().iter().map(|(_, m)| m.clone()).collect();
        assert!(models.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_promptness() {
        let backend = Arc::new(CancellingBackend {
            cancel_on_call: 2,
            calls: Mutex::new(0),
        });
        let executor = StepExecutor::new(backend.clone(), &test_config());

        let result = executor
            .execute(&example_plan(), &exec_config())
            .await
            .unwrap();

        assert!(result.aborted);
        assert!(!result.success);
        assert_eq!(result.completed_steps, 1);
        assert_eq!(result.failed_steps, 0);
        // Cancellation is not a step failure: no terminal StepError.
        assert!(result.errors.is_empty());
        // No step beyond the in-flight one ever started.
        assert_eq!(*backend.calls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_aborts_without_retry() {
        // First step keeps failing; cancel while the run sleeps between
        // attempts (backoff after one failure is 2s, the cancel fires at 100ms).
        let backend = Arc::new(ScriptedBackend::new(&[("scaffold", 99)]));
        let executor = StepExecutor::new(backend.clone(), &test_config());
        let token = executor.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let result = executor
            .execute(&example_plan(), &exec_config())
            .await
            .unwrap();

        assert!(result.aborted);
        assert!(!result.success);
        assert_eq!(result.completed_steps, 0);
        // The failed attempt is logged, but cancellation ends the backoff:
        // no second attempt, and no terminal step failure.
        assert_eq!(result.errors.len(), 1);
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(result.failed_steps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_is_single_use() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let executor = StepExecutor::new(backend, &test_config());
        let plan = example_plan();
        let config = exec_config();

        executor.execute(&plan, &config).await.unwrap();
        let second = executor.execute(&plan, &config).await;
        assert!(matches!(second, Err(Error::ExecutorConsumed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_per_step_ordering() {
        let backend = Arc::new(ScriptedBackend::new(&[("home content", 1)]));
        let executor = StepExecutor::new(backend, &test_config());
        let observer = Arc::new(RecordingObserver::default());

        let config = exec_config().with_observer(observer.clone());
        executor.execute(&example_plan(), &config).await.unwrap();

        let progress = observer.progress.lock().unwrap();
        // executing always precedes the same step's terminal event
        for id in 1..=5u32 {
            let for_step: Vec<_> = progress.iter().filter(|e| e.step_id == id).collect();
            assert_eq!(for_step[0].status, StepStatus::Executing);
            assert_eq!(
                for_step.last().unwrap().status,
                StepStatus::Completed,
                "step {id}"
            );
        }
        assert_eq!(progress.last().unwrap().percentage, 100);

        assert_eq!(observer.errors.lock().unwrap().len(), 1);
        assert_eq!(observer.completes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_files_created_are_collected() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let executor = StepExecutor::new(backend, &test_config());

        let result = executor
            .execute(&example_plan(), &exec_config())
            .await
            .unwrap();
        assert!(!result.files_created.is_empty());
        assert!(result.files_created.iter().all(|f| f.starts_with("out/")));
    }

    #[test]
    fn test_backoff_delay_caps() {
        let config = RetryConfig::default();
        assert_eq!(backoff_delay(1, &config), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2, &config), Duration::from_millis(4000));
        assert_eq!(backoff_delay(10, &config), Duration::from_millis(10_000));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(1000);
        let short = excerpt(&long);
        assert!(short.len() < long.len());
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
