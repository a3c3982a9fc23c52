use std::path::Path;

/// Reset SIGPIPE to default behavior so piping (e.g. `maintrack job list | head`) exits
/// cleanly instead of panicking on broken pipe.
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use maintrack::config::loader;
use maintrack::config::types::Settings;
use maintrack::engine::delay::NewDelay;
use maintrack::engine::materializer::MaterializeOverrides;
use maintrack::engine::sequence::MoveDirection;
use maintrack::output::formatter;
use maintrack::state::models::{JobFilter, JobStatus, PartDemandStatus, Priority};
use maintrack::MaintenanceEngine;

/// maintrack - maintenance template materialization and job lifecycle
#[derive(Parser)]
#[command(name = "maintrack", version, about, long_about = None)]
struct Cli {
    /// Path to config directory or maintrack.yaml
    #[arg(short, long, default_value = ".")]
    config: String,

    /// Database file (overrides the config setting)
    #[arg(short, long)]
    database: Option<String>,

    /// User id recorded on every change
    #[arg(short, long, default_value = "cli", global = true)]
    actor: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database
    Init,

    /// Manage the part and tool catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Manage maintenance templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Create a job for an asset from a template
    Materialize {
        /// Template id or task name (latest active revision)
        template: String,
        /// Asset the job is for
        asset: String,
        /// Scheduled date (RFC 3339)
        #[arg(long)]
        scheduled: Option<DateTime<Utc>>,
        #[arg(long)]
        priority: Option<Priority>,
        /// Maintenance plan the job belongs to
        #[arg(long)]
        plan: Option<String>,
        /// Include optional template items and parts
        #[arg(long)]
        include_optional: bool,
        #[arg(long)]
        description: Option<String>,
        /// Print the created job as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and drive jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Drive individual actions
    Action {
        #[command(subcommand)]
        command: ActionCommands,
    },

    /// Record and resolve job delays
    Delay {
        #[command(subcommand)]
        command: DelayCommands,
    },

    /// Adjust part demands
    Demand {
        #[command(subcommand)]
        command: DemandCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Load parts, tools and templates from a YAML file
    Load {
        path: String,
    },
    /// List catalog parts
    Parts,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Load templates (and any catalog entries) from a YAML file
    Load {
        path: String,
    },
    /// List templates
    List {
        /// Include superseded revisions
        #[arg(long)]
        all: bool,
    },
    /// Show a template with its items
    Show {
        template: String,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs
    List {
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        status: Option<JobStatus>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show a job with its actions, part demands and delays
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Start a planned job
    Start { id: String },
    /// Resume a delayed job
    Resume { id: String },
    /// Complete a job whose actions are all finished
    Complete {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel a job
    Cancel {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Show completion and hours
    Progress { id: String },
    /// Summarize part availability and cost
    Parts { id: String },
    /// Show the audit trail
    Comments { id: String },
    /// Append an action to a job
    AddAction {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a job that has no actions or delays
    Delete { id: String },
}

#[derive(Subcommand)]
enum ActionCommands {
    Start {
        id: String,
    },
    Complete {
        id: String,
        #[arg(long)]
        notes: Option<String>,
        /// Billable hours (defaults to time since start)
        #[arg(long)]
        hours: Option<f64>,
    },
    Skip {
        id: String,
        #[arg(long)]
        reason: String,
    },
    Cancel {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Swap an action with its neighbour
    Move {
        id: String,
        /// up or down
        direction: MoveDirection,
    },
    /// Delete an action that has no part demands or tools
    Delete {
        id: String,
    },
    /// Add a part demand to an action
    AddPart {
        id: String,
        part: String,
        quantity: Decimal,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum DelayCommands {
    /// Delay a job
    Add {
        job: String,
        #[arg(long = "type")]
        delay_type: String,
        #[arg(long)]
        reason: String,
        /// Delay start (RFC 3339, defaults to now)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, default_value = "Medium")]
        priority: Priority,
    },
    /// Resolve a delay
    Resolve {
        id: String,
        /// Delay end (RFC 3339, defaults to now)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        hours: Option<f64>,
    },
}

#[derive(Subcommand)]
enum DemandCommands {
    /// Move part of a demand's quantity into a new demand with another status
    Split {
        id: String,
        quantity: Decimal,
        status: PartDemandStatus,
    },
    /// Reduce a demand's quantity (removing it at zero)
    Reduce { id: String, delta: Decimal },
    /// Change a demand's status
    Status {
        id: String,
        status: PartDemandStatus,
    },
    /// Check stock for a demand
    Check { id: String },
    /// Delete a demand
    Delete { id: String },
}

fn main() -> Result<()> {
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine = open_engine(&cli)?;
    let actor = cli.actor.as_str();

    match cli.command {
        Commands::Init => {
            formatter::print_success(&format!(
                "Database ready at {}.",
                engine.settings().database
            ));
            Ok(())
        }
        Commands::Catalog { ref command } => cmd_catalog(&engine, command, actor),
        Commands::Template { ref command } => cmd_template(&engine, command, actor),
        Commands::Materialize {
            ref template,
            ref asset,
            scheduled,
            priority,
            ref plan,
            include_optional,
            ref description,
            json,
        } => {
            let template_id = resolve_template(&engine, template)?;
            let overrides = MaterializeOverrides {
                scheduled_date: scheduled,
                priority,
                maintenance_plan_id: plan.clone(),
                include_optional: include_optional.then_some(true),
                description: description.clone(),
            };
            let job = engine.materialize(&template_id, asset, actor, &overrides)?;
            if json {
                print_json(&job)
            } else {
                formatter::print_success(&format!(
                    "Materialized '{}' for asset {} as job {}.",
                    job.task_name, job.asset_id, job.id
                ));
                Ok(())
            }
        }
        Commands::Job { ref command } => cmd_job(&engine, command, actor),
        Commands::Action { ref command } => cmd_action(&engine, command, actor),
        Commands::Delay { ref command } => cmd_delay(&engine, command, actor),
        Commands::Demand { ref command } => cmd_demand(&engine, command, actor),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn open_engine(cli: &Cli) -> Result<MaintenanceEngine> {
    let mut settings: Settings = loader::load_settings(Path::new(&cli.config))?;
    if let Some(ref database) = cli.database {
        settings.database = database.clone();
    }
    let database = settings.database.clone();
    MaintenanceEngine::open(settings)
        .with_context(|| format!("Failed to open database: {}", database))
}

/// Accept either a template id or a task name. A name picks the newest
/// active revision.
fn resolve_template(engine: &MaintenanceEngine, reference: &str) -> Result<String> {
    let templates = engine.list_templates(false)?;
    if templates.iter().any(|t| t.id == reference) {
        return Ok(reference.to_string());
    }
    templates
        .into_iter()
        .filter(|t| t.is_active && t.task_name == reference)
        .max_by(|a, b| a.created_at.cmp(&b.created_at))
        .map(|t| t.id)
        .with_context(|| format!("No template with id or active task name '{}'", reference))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn load_definition_file(engine: &MaintenanceEngine, path: &str, actor: &str) -> Result<()> {
    let definitions = loader::load_definitions(Path::new(path))?;
    let summary = engine
        .load_definitions(&definitions, actor)
        .with_context(|| format!("Failed to load {}", path))?;
    formatter::print_success(&format!(
        "Loaded {} part(s), {} tool(s), {} template(s).",
        summary.parts, summary.tools, summary.templates
    ));
    Ok(())
}

fn cmd_catalog(engine: &MaintenanceEngine, command: &CatalogCommands, actor: &str) -> Result<()> {
    match command {
        CatalogCommands::Load { path } => load_definition_file(engine, path, actor),
        CatalogCommands::Parts => {
            let parts = engine.list_parts()?;
            if parts.is_empty() {
                println!("{}", "No parts in the catalog.".dimmed());
            }
            for part in parts {
                println!(
                    "  {:<20} {:<30} stock {:<8} cost {:.2}",
                    part.id, part.name, part.stock_level, part.unit_cost
                );
            }
            Ok(())
        }
    }
}

fn cmd_template(
    engine: &MaintenanceEngine,
    command: &TemplateCommands,
    actor: &str,
) -> Result<()> {
    match command {
        TemplateCommands::Load { path } => load_definition_file(engine, path, actor),
        TemplateCommands::List { all } => {
            formatter::print_template_list(&engine.list_templates(!all)?);
            Ok(())
        }
        TemplateCommands::Show { template } => {
            let id = resolve_template(engine, template)?;
            let loaded = engine.load_template(&id)?;
            let chain = engine.revision_chain(&id)?;
            formatter::print_template_detail(&loaded, &chain);
            Ok(())
        }
    }
}

fn cmd_job(engine: &MaintenanceEngine, command: &JobCommands, actor: &str) -> Result<()> {
    match command {
        JobCommands::List {
            asset,
            status,
            template,
            json,
        } => {
            let filter = JobFilter {
                asset_id: asset.clone(),
                status: *status,
                template_action_set_id: template.clone(),
            };
            let jobs = engine.list_jobs(&filter)?;
            if *json {
                return print_json(&jobs);
            }
            formatter::print_job_list(&jobs);
        }
        JobCommands::Show { id, json } => {
            let tree = engine.job_tree(id)?;
            if *json {
                return print_json(&tree);
            }
            formatter::print_job_tree(&tree);
        }
        JobCommands::Start { id } => {
            let job = engine.start_job(id, actor)?;
            formatter::print_success(&format!("Job {} is {}.", job.id, job.status));
        }
        JobCommands::Resume { id } => {
            let job = engine.resume_job(id, actor)?;
            formatter::print_success(&format!("Job {} is {}.", job.id, job.status));
        }
        JobCommands::Complete { id, notes } => {
            let job = engine.complete_job(id, actor, notes.as_deref())?;
            formatter::print_success(&format!("Job {} is {}.", job.id, job.status));
        }
        JobCommands::Cancel { id, reason } => {
            let job = engine.cancel_job(id, actor, reason)?;
            formatter::print_success(&format!("Job {} is {}.", job.id, job.status));
        }
        JobCommands::Progress { id } => {
            let job = engine.get_job(id)?;
            formatter::print_progress(&job, &engine.job_progress(id)?);
        }
        JobCommands::Parts { id } => {
            formatter::print_parts_summary(&engine.parts_summary(id)?);
            for action in engine.list_actions(id)? {
                for demand in engine.list_part_demands(&action.id)? {
                    if demand.status == PartDemandStatus::Cancelled {
                        continue;
                    }
                    formatter::print_availability(&engine.check_availability(&demand.id)?);
                }
            }
        }
        JobCommands::Comments { id } => {
            formatter::print_comments(&engine.comments(id)?);
        }
        JobCommands::AddAction {
            id,
            name,
            description,
        } => {
            let action = engine.add_action(id, name, description.as_deref(), actor)?;
            formatter::print_success(&format!(
                "Added action '{}' at position {} ({}).",
                action.action_name, action.sequence_order, action.id
            ));
        }
        JobCommands::Delete { id } => {
            engine.delete_job(id, actor)?;
            formatter::print_success(&format!("Deleted job {}.", id));
        }
    }
    Ok(())
}

fn cmd_action(engine: &MaintenanceEngine, command: &ActionCommands, actor: &str) -> Result<()> {
    let action = match command {
        ActionCommands::Start { id } => engine.start_action(id, actor)?,
        ActionCommands::Complete { id, notes, hours } => {
            engine.complete_action(id, actor, notes.as_deref(), *hours)?
        }
        ActionCommands::Skip { id, reason } => engine.skip_action(id, actor, reason)?,
        ActionCommands::Cancel { id, reason } => engine.cancel_action(id, actor, reason)?,
        ActionCommands::Move { id, direction } => {
            for action in engine.move_action(id, *direction, actor)? {
                println!(
                    "  {:>3}. {} {}",
                    action.sequence_order,
                    action.action_name,
                    action.id.dimmed()
                );
            }
            return Ok(());
        }
        ActionCommands::Delete { id } => {
            engine.delete_action(id, actor)?;
            formatter::print_success(&format!("Deleted action {}.", id));
            return Ok(());
        }
        ActionCommands::AddPart {
            id,
            part,
            quantity,
            notes,
        } => {
            let demand = engine.add_part_demand(id, part, *quantity, notes.as_deref(), actor)?;
            formatter::print_success(&format!(
                "Added demand {} for {} of part {}.",
                demand.id, demand.quantity_required, demand.part_id
            ));
            return Ok(());
        }
    };
    formatter::print_success(&format!(
        "Action '{}' is {}.",
        action.action_name, action.status
    ));
    Ok(())
}

fn cmd_delay(engine: &MaintenanceEngine, command: &DelayCommands, actor: &str) -> Result<()> {
    match command {
        DelayCommands::Add {
            job,
            delay_type,
            reason,
            start,
            hours,
            notes,
            priority,
        } => {
            let params = NewDelay {
                start: *start,
                billable_hours: *hours,
                notes: notes.clone(),
                priority: *priority,
                ..NewDelay::new(delay_type.as_str(), reason.as_str())
            };
            let delay = engine.add_delay(job, actor, &params)?;
            formatter::print_success(&format!("Recorded delay {} on job {}.", delay.id, job));
        }
        DelayCommands::Resolve { id, end, hours } => {
            let delay = engine.resolve_delay(id, actor, *end, *hours)?;
            let job = engine.get_job(&delay.maintenance_action_set_id)?;
            formatter::print_success(&format!(
                "Resolved delay {}; job {} is {}.",
                delay.id, job.id, job.status
            ));
        }
    }
    Ok(())
}

fn cmd_demand(engine: &MaintenanceEngine, command: &DemandCommands, actor: &str) -> Result<()> {
    match command {
        DemandCommands::Split {
            id,
            quantity,
            status,
        } => {
            let (original, split) = engine.split_part_demand(id, *quantity, *status, actor)?;
            formatter::print_success(&format!(
                "Split {} off {} into {} ({}); {} remain {}.",
                split.quantity_required,
                original.id,
                split.id,
                split.status,
                original.quantity_required,
                original.status
            ));
        }
        DemandCommands::Reduce { id, delta } => match engine.reduce_part_demand(id, *delta, actor)? {
            Some(demand) => formatter::print_success(&format!(
                "Demand {} now requires {}.",
                demand.id, demand.quantity_required
            )),
            None => formatter::print_success(&format!("Demand {} removed.", id)),
        },
        DemandCommands::Status { id, status } => {
            let demand = engine.set_part_demand_status(id, *status, actor)?;
            formatter::print_success(&format!("Demand {} is {}.", demand.id, demand.status));
        }
        DemandCommands::Check { id } => {
            formatter::print_availability(&engine.check_availability(id)?);
        }
        DemandCommands::Delete { id } => {
            engine.delete_part_demand(id, actor)?;
            formatter::print_success(&format!("Deleted demand {}.", id));
        }
    }
    Ok(())
}
