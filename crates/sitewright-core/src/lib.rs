//! Sitewright Core Library
//!
//! This crate provides the core functionality for Sitewright, including:
//! - Build plan generation (phase builders, metrics, estimates)
//! - Step execution against a generative backend (retry, escalation, events)
//! - Niche and design-system catalogs
//! - Generative backend adapter (OpenRouter API)
//! - Cost accounting per model tier
//! - Storage (SQLite plan/run persistence)
//! - Commands (plan, build, status, inspect)

pub mod catalog;
pub mod commands;
pub mod config;
pub mod cost;
pub mod error;
pub mod executor;
pub mod llm;
pub mod plan;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::executor::{ExecutionConfig, ExecutionResult, StepExecutor};
    pub use crate::plan::{BuildTask, Plan, generate_plan};
}
