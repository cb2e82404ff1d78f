//! Storage layer - SQLite persistence for plans and run history
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//! - `records`: Plan persistence and run history queries

pub mod database;
pub mod migrations;
pub mod records;

pub use database::{Database, DatabaseConfig, default_database_path};
pub use migrations::{MigrationStatus, migration_status, run_migrations};
pub use records::{PlanRecord, RunRecord};
