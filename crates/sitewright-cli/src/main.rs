//! Sitewright CLI - plan and run AI-driven website builds

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sitewright_core::catalog;
use sitewright_core::commands::{build, inspect, plan as plan_cmd, status};
use sitewright_core::config::Config;
use sitewright_core::executor::{ExecutionObserver, ProgressEvent, StepError, StepStatus};
use sitewright_core::llm::ModelTier;
use sitewright_core::plan::BuildTask;
use sitewright_core::storage::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "sitewright")]
#[command(author, version, about = "Plan and run AI-driven website builds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store a build plan
    Plan {
        /// What the site is for, in plain language
        description: String,
        /// Business niche (see `sitewright catalog niches`)
        #[arg(short, long)]
        niche: String,
        /// Design system (see `sitewright catalog design-systems`)
        #[arg(short = 's', long)]
        design_system: String,
        /// Project id (generated when omitted)
        #[arg(short, long)]
        project: Option<String>,
        /// Pages to build (comma separated, default: home)
        #[arg(long, value_delimiter = ',')]
        pages: Vec<String>,
        /// Features to call out in page content
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,
        /// Third-party integrations to wire up
        #[arg(long, value_delimiter = ',')]
        integrations: Vec<String>,
    },

    /// Execute a stored plan
    Build {
        /// Project id
        project: String,
        /// Directory generated files land in
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Report what would run without calling the backend
        #[arg(long)]
        dry_run: bool,
        /// Minimum model tier (fast, standard, max)
        #[arg(long, default_value = "fast")]
        tier: String,
    },

    /// Show the stored plan summary and run history
    Status {
        /// Project id
        project: String,
    },

    /// Print every step of the stored plan
    Inspect {
        /// Project id
        project: String,
    },

    /// List supported niches and design systems
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List supported niches
    Niches,
    /// List supported design systems
    DesignSystems,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sitewright=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let open_db = || async {
        match &cli.db {
            Some(path) => Database::new(DatabaseConfig::with_path(path)).await,
            None => Database::open_default().await,
        }
    };

    match cli.command {
        Commands::Plan {
            description,
            niche,
            design_system,
            project,
            pages,
            features,
            integrations,
        } => {
            let db = open_db().await?;
            let mut task = BuildTask::new(description, niche, design_system)
                .with_features(features)
                .with_integrations(integrations);
            if let Some(id) = project {
                task = task.with_id(id);
            }
            if !pages.is_empty() {
                task = task.with_pages(pages);
            }
            cmd_plan(&db, task, cli.format, cli.quiet).await
        }

        Commands::Build {
            project,
            workspace,
            dry_run,
            tier,
        } => {
            let db = open_db().await?;
            let tier = ModelTier::from_str(&tier).map_err(|e| anyhow::anyhow!(e))?;
            cmd_build(
                &db, &project, workspace, dry_run, tier, cli.format, cli.quiet,
            )
            .await
        }

        Commands::Status { project } => {
            let db = open_db().await?;
            cmd_status(&db, &project, cli.format, cli.quiet).await
        }

        Commands::Inspect { project } => {
            let db = open_db().await?;
            cmd_inspect(&db, &project, cli.format).await
        }

        Commands::Catalog { action } => cmd_catalog(action, cli.format),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_plan(
    db: &Database,
    task: BuildTask,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let plan = plan_cmd::create_plan(db, &config, &task).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => {
            if !quiet {
                println!("Plan created for project '{}'", plan.project_id);
                println!("  Steps: {}", plan.total_steps);
                for phase in &plan.phases {
                    println!(
                        "    {} (steps {}-{}){}",
                        phase.phase,
                        phase.first_step,
                        phase.last_step,
                        if phase.can_parallelize {
                            " [parallelizable]"
                        } else {
                            ""
                        }
                    );
                }
                println!("  Estimated duration: {}", plan.estimated_duration);
                println!("  Estimated cost: {}", plan.estimated_cost);
                println!("\nRun `sitewright build {} --dry-run` to review.", plan.project_id);
            } else {
                println!("{}", plan.project_id);
            }
        }
    }
    Ok(())
}

/// Prints step lifecycle events as they happen
struct ConsoleObserver {
    quiet: bool,
}

impl ExecutionObserver for ConsoleObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }
        match event.status {
            StepStatus::Executing => {
                println!(
                    "[{:>3}%] step {} {} ... {}",
                    event.percentage, event.step_id, event.phase, event.step_name
                );
            }
            StepStatus::Completed => {
                let tokens = event.tokens_used.unwrap_or(0);
                let files = event.files_created.as_ref().map_or(0, Vec::len);
                println!(
                    "[{:>3}%] step {} done ({} tokens, {} files)",
                    event.percentage, event.step_id, tokens, files
                );
            }
            StepStatus::Skipped => {
                println!("[{:>3}%] step {} skipped", event.percentage, event.step_id);
            }
            StepStatus::Failed => {
                println!("[{:>3}%] step {} FAILED", event.percentage, event.step_id);
            }
            StepStatus::Pending => {}
        }
    }

    fn on_error(&self, error: &StepError) {
        if self.quiet {
            return;
        }
        let escalation = match error.escalated_model {
            Some(tier) if error.can_retry => format!(", retrying on {} tier", tier),
            _ if error.can_retry => ", retrying".to_string(),
            _ => ", giving up".to_string(),
        };
        eprintln!(
            "  step {} attempt {} failed: {}{}",
            error.step_id, error.retry_count, error.error, escalation
        );
    }
}

async fn cmd_build(
    db: &Database,
    project: &str,
    workspace: PathBuf,
    dry_run: bool,
    tier: ModelTier,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    if dry_run {
        let plan = inspect::inspect_plan(db, project).await?;
        let report = build::dry_run_report(&plan);
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => {
                println!("Dry run for project '{}'", report.project_id);
                println!("  Steps: {}", report.total_steps);
                println!("  Parallelizable: {}", report.parallelizable_steps);
                println!("  Estimated tokens: {}", report.total_estimated_tokens);
                println!("  Estimated duration: {}", report.estimated_duration);
                println!("  Estimated cost: {}", report.estimated_cost);
            }
        }
        return Ok(());
    }

    let options = build::BuildOptions::new(workspace)
        .with_preferred_tier(tier)
        .with_observer(Arc::new(ConsoleObserver { quiet }));
    let result = build::execute_build(db, &config, project, options).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            if result.success {
                println!("\nBuild finished.");
            } else if result.aborted {
                println!("\nBuild aborted.");
            } else {
                println!("\nBuild failed.");
            }
            println!(
                "  {}/{} steps completed, {} skipped, {} failed",
                result.completed_steps,
                result.total_steps,
                result.skipped_steps,
                result.failed_steps
            );
            println!("  Tokens: {}", result.total_tokens);
            println!("  Estimated cost: ${:.2}", result.estimated_cost_usd);
            println!("  Files created: {}", result.files_created.len());
        }
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_status(
    db: &Database,
    project: &str,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let status = status::project_status(db, project).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => {
            println!("Project '{}'", status.project_id);
            println!("  Plan: {} steps", status.total_steps);
            println!("  Estimated duration: {}", status.estimated_duration);
            println!("  Estimated cost: {}", status.estimated_cost);
            if status.runs.is_empty() {
                if !quiet {
                    println!("  No runs yet. Start one with `sitewright build {}`.", project);
                }
            } else {
                println!("  Runs:");
                for run in &status.runs {
                    let outcome = if run.aborted {
                        "aborted"
                    } else if run.success {
                        "ok"
                    } else {
                        "failed"
                    };
                    println!(
                        "    {} [{}] {}/{} steps, {} tokens, ${:.2}",
                        run.created_at.format("%Y-%m-%d %H:%M"),
                        outcome,
                        run.completed_steps,
                        run.total_steps,
                        run.total_tokens,
                        run.estimated_cost_usd
                    );
                }
            }
        }
    }
    Ok(())
}

async fn cmd_inspect(db: &Database, project: &str, format: OutputFormat) -> anyhow::Result<()> {
    let plan = inspect::inspect_plan(db, project).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => {
            println!("Plan for project '{}' ({} steps)", plan.project_id, plan.total_steps);
            for step in &plan.steps {
                let deps = if step.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    step.dependencies
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                };
                println!(
                    "  {:>3}. [{}] {} (deps: {}, ~{} tokens{})",
                    step.id,
                    step.phase,
                    step.name,
                    deps,
                    step.estimated_tokens,
                    if step.can_parallelize { ", parallel" } else { "" }
                );
            }
        }
    }
    Ok(())
}

fn cmd_catalog(action: CatalogAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        CatalogAction::Niches => {
            let niches = catalog::niches();
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(niches)?);
            } else {
                println!("Supported niches:");
                for niche in niches {
                    println!("  {:<12} {}", niche.id, niche.name);
                }
            }
        }
        CatalogAction::DesignSystems => {
            let systems = catalog::design_systems();
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(systems)?);
            } else {
                println!("Supported design systems:");
                for system in systems {
                    println!("  {:<16} {}", system.id, system.name);
                }
            }
        }
    }
    Ok(())
}
