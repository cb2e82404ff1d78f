//! Commands module - all operations as library functions
//!
//! The CLI binary is a thin shell over these; every verb it exposes is a
//! function here so other frontends can reuse them.

pub mod build;
pub mod inspect;
pub mod plan;
pub mod status;

pub use build::{BuildOptions, DryRunReport, dry_run_report, execute_build, execute_build_with};
pub use inspect::inspect_plan;
pub use plan::create_plan;
pub use status::{ProjectStatus, project_status};
