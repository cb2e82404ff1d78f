//! Plan generation
//!
//! Converts a high-level build task into an ordered, dependency-aware plan:
//! phase builders produce contiguous step blocks, a shared accumulator
//! assigns ids, and metrics summarize the finished sequence.

mod builders;
pub mod generator;
pub mod metrics;
pub mod types;

pub use generator::generate_plan;
pub use types::{BuildPhase, BuildTask, PhaseInfo, Plan, RetryStrategy, Step};
