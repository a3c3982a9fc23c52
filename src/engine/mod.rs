//! The maintenance engine: materialization, lifecycle control and part
//! demand adjustment over a SQLite store.
//!
//! [`MaintenanceEngine`] is the entry point. Each of its mutating methods is
//! one unit of work: it opens a transaction, runs the operation and commits
//! only if everything (including the audit comments) succeeded.

pub mod audit;
pub mod delay;
pub mod lifecycle;
pub mod materializer;
pub mod part_demand;
pub mod report;
pub mod sequence;
pub mod templates;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::config::types::{DefinitionFile, Settings, TemplateDefinition};
use crate::config::validator;
use crate::error::{EngineError, Result};
use crate::state::backend::{PartCatalog, Store};
use crate::state::models::{
    Action, Comment, JobFilter, LoadedTemplate, MaintenanceActionSet, MaintenanceDelay, Part,
    PartDemand, PartDemandStatus, TemplateActionSet, Tool,
};
use crate::state::sqlite::SqliteBackend;

use delay::NewDelay;
use materializer::MaterializeOverrides;
use part_demand::{PartAvailability, PartsSummary};
use report::{JobProgress, JobTree};
use sequence::MoveDirection;

/// Counts of what a definition file load wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadSummary {
    pub parts: usize,
    pub tools: usize,
    pub templates: usize,
}

pub struct MaintenanceEngine {
    backend: SqliteBackend,
    settings: Settings,
}

impl MaintenanceEngine {
    /// Wrap an already opened backend. The schema is created if missing.
    pub fn new(backend: SqliteBackend, settings: Settings) -> Result<Self> {
        backend.initialize()?;
        Ok(Self { backend, settings })
    }

    /// Open the database named in `settings`.
    pub fn open(settings: Settings) -> Result<Self> {
        let backend = SqliteBackend::open(&settings.database)?;
        Self::new(backend, settings)
    }

    pub fn open_memory(settings: Settings) -> Result<Self> {
        Self::new(SqliteBackend::open_memory()?, settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ─── Catalog ────────────────────────────────────────────────────────────

    /// Load parts, tools and templates from a definition file in one
    /// transaction. Templates are created in file order, so a revision may
    /// supersede one defined earlier in the same file.
    pub fn load_definitions(
        &self,
        definitions: &DefinitionFile,
        actor_id: &str,
    ) -> Result<LoadSummary> {
        validator::validate(definitions)
            .map_err(|e| EngineError::validation(format!("{:#}", e)))?;

        let summary = self.backend.transaction(|store| {
            for def in &definitions.parts {
                store.upsert_part(&Part {
                    id: def.id.clone(),
                    part_number: def.part_number.clone().unwrap_or_else(|| def.id.clone()),
                    name: def.name.clone(),
                    unit_cost: def.unit_cost,
                    stock_level: def.stock_level,
                })?;
            }
            for def in &definitions.tools {
                store.upsert_tool(&Tool {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    status: def.status.clone(),
                })?;
            }
            for def in &definitions.templates {
                templates::create_template(store, def, actor_id)?;
            }
            Ok(LoadSummary {
                parts: definitions.parts.len(),
                tools: definitions.tools.len(),
                templates: definitions.templates.len(),
            })
        })?;
        info!(
            parts = summary.parts,
            tools = summary.tools,
            templates = summary.templates,
            actor = actor_id,
            "Loaded definitions"
        );
        Ok(summary)
    }

    pub fn upsert_part(&self, part: &Part) -> Result<()> {
        self.backend.transaction(|store| store.upsert_part(part))
    }

    pub fn upsert_tool(&self, tool: &Tool) -> Result<()> {
        self.backend.transaction(|store| store.upsert_tool(tool))
    }

    pub fn get_part(&self, id: &str) -> Result<Option<Part>> {
        self.backend.read(|store| store.get_part(id))
    }

    pub fn list_parts(&self) -> Result<Vec<Part>> {
        self.backend.read(|store| store.list_parts())
    }

    // ─── Templates ──────────────────────────────────────────────────────────

    pub fn create_template(
        &self,
        definition: &TemplateDefinition,
        actor_id: &str,
    ) -> Result<TemplateActionSet> {
        self.backend
            .transaction(|store| templates::create_template(store, definition, actor_id))
    }

    pub fn create_revision(
        &self,
        prior_id: &str,
        definition: &TemplateDefinition,
        actor_id: &str,
    ) -> Result<TemplateActionSet> {
        self.backend.transaction(|store| {
            templates::create_revision(store, prior_id, definition, actor_id)
        })
    }

    pub fn load_template(&self, id: &str) -> Result<LoadedTemplate> {
        self.backend.read(|store| {
            store
                .load_template(id)?
                .ok_or_else(|| EngineError::not_found("template", id))
        })
    }

    pub fn list_templates(&self, active_only: bool) -> Result<Vec<TemplateActionSet>> {
        self.backend
            .read(|store| store.list_template_sets(active_only))
    }

    pub fn revision_chain(&self, id: &str) -> Result<Vec<TemplateActionSet>> {
        self.backend
            .read(|store| templates::revision_chain(store, id))
    }

    pub fn set_template_active(&self, id: &str, active: bool) -> Result<TemplateActionSet> {
        self.backend
            .transaction(|store| templates::set_active(store, id, active))
    }

    // ─── Materialization ────────────────────────────────────────────────────

    /// Materialize a template for an asset. Unset overrides fall back to the
    /// engine settings.
    pub fn materialize(
        &self,
        template_id: &str,
        asset_id: &str,
        actor_id: &str,
        overrides: &MaterializeOverrides,
    ) -> Result<MaintenanceActionSet> {
        let mut overrides = overrides.clone();
        overrides
            .include_optional
            .get_or_insert(self.settings.include_optional_items);
        overrides
            .priority
            .get_or_insert(self.settings.default_priority);

        self.backend.transaction(|store| {
            let template = store
                .load_template(template_id)?
                .ok_or_else(|| EngineError::not_found("template", template_id))?;
            materializer::materialize(store, store, &template, asset_id, actor_id, &overrides)
        })
    }

    // ─── Job Lifecycle ──────────────────────────────────────────────────────

    pub fn start_job(&self, job_id: &str, actor_id: &str) -> Result<MaintenanceActionSet> {
        self.backend
            .transaction(|store| lifecycle::start_job(store, job_id, actor_id))
    }

    pub fn resume_job(&self, job_id: &str, actor_id: &str) -> Result<MaintenanceActionSet> {
        self.backend
            .transaction(|store| lifecycle::resume_job(store, job_id, actor_id))
    }

    pub fn complete_job(
        &self,
        job_id: &str,
        actor_id: &str,
        notes: Option<&str>,
    ) -> Result<MaintenanceActionSet> {
        self.backend
            .transaction(|store| lifecycle::complete_job(store, job_id, actor_id, notes))
    }

    pub fn cancel_job(
        &self,
        job_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<MaintenanceActionSet> {
        self.backend
            .transaction(|store| lifecycle::cancel_job(store, job_id, actor_id, reason))
    }

    pub fn add_delay(
        &self,
        job_id: &str,
        actor_id: &str,
        params: &NewDelay,
    ) -> Result<MaintenanceDelay> {
        self.backend
            .transaction(|store| delay::add_delay(store, job_id, actor_id, params))
    }

    /// Resolve a delay. Whether the job resumes automatically follows the
    /// `resume_on_delay_resolved` setting.
    pub fn resolve_delay(
        &self,
        delay_id: &str,
        actor_id: &str,
        end: Option<DateTime<Utc>>,
        billable_hours: Option<f64>,
    ) -> Result<MaintenanceDelay> {
        let resume = self.settings.resume_on_delay_resolved;
        self.backend.transaction(|store| {
            delay::resolve_delay(store, delay_id, actor_id, end, billable_hours, resume)
        })
    }

    // ─── Action Lifecycle ───────────────────────────────────────────────────

    pub fn start_action(&self, action_id: &str, actor_id: &str) -> Result<Action> {
        self.backend
            .transaction(|store| lifecycle::start_action(store, action_id, actor_id))
    }

    pub fn complete_action(
        &self,
        action_id: &str,
        actor_id: &str,
        notes: Option<&str>,
        billable_hours: Option<f64>,
    ) -> Result<Action> {
        self.backend.transaction(|store| {
            lifecycle::complete_action(store, action_id, actor_id, notes, billable_hours)
        })
    }

    pub fn skip_action(&self, action_id: &str, actor_id: &str, reason: &str) -> Result<Action> {
        self.backend
            .transaction(|store| lifecycle::skip_action(store, action_id, actor_id, reason))
    }

    pub fn cancel_action(&self, action_id: &str, actor_id: &str, reason: &str) -> Result<Action> {
        self.backend
            .transaction(|store| lifecycle::cancel_action(store, action_id, actor_id, reason))
    }

    // ─── Structure ──────────────────────────────────────────────────────────

    pub fn add_action(
        &self,
        job_id: &str,
        action_name: &str,
        description: Option<&str>,
        actor_id: &str,
    ) -> Result<Action> {
        self.backend.transaction(|store| {
            sequence::add_action(store, job_id, action_name, description, actor_id)
        })
    }

    /// Swap an action with its neighbour; returns the two changed actions.
    pub fn move_action(
        &self,
        action_id: &str,
        direction: MoveDirection,
        actor_id: &str,
    ) -> Result<Vec<Action>> {
        self.backend
            .transaction(|store| sequence::move_action(store, action_id, direction, actor_id))
    }

    pub fn delete_action(&self, action_id: &str, actor_id: &str) -> Result<()> {
        self.backend
            .transaction(|store| sequence::delete_action(store, action_id, actor_id))
    }

    pub fn delete_job(&self, job_id: &str, actor_id: &str) -> Result<()> {
        self.backend
            .transaction(|store| sequence::delete_job(store, job_id, actor_id))
    }

    // ─── Part Demands ───────────────────────────────────────────────────────

    pub fn add_part_demand(
        &self,
        action_id: &str,
        part_id: &str,
        quantity: Decimal,
        notes: Option<&str>,
        actor_id: &str,
    ) -> Result<PartDemand> {
        self.backend.transaction(|store| {
            part_demand::add_part_demand(store, store, action_id, part_id, quantity, notes, actor_id)
        })
    }

    /// Split a demand; returns `(original, new)`.
    pub fn split_part_demand(
        &self,
        demand_id: &str,
        new_quantity: Decimal,
        new_status: PartDemandStatus,
        actor_id: &str,
    ) -> Result<(PartDemand, PartDemand)> {
        self.backend.transaction(|store| {
            part_demand::split(store, demand_id, new_quantity, new_status, actor_id)
        })
    }

    /// Reduce a demand; `None` means it dropped to zero and was deleted.
    pub fn reduce_part_demand(
        &self,
        demand_id: &str,
        delta: Decimal,
        actor_id: &str,
    ) -> Result<Option<PartDemand>> {
        self.backend
            .transaction(|store| part_demand::reduce_quantity(store, demand_id, delta, actor_id))
    }

    pub fn set_part_demand_status(
        &self,
        demand_id: &str,
        status: PartDemandStatus,
        actor_id: &str,
    ) -> Result<PartDemand> {
        self.backend
            .transaction(|store| part_demand::change_status(store, demand_id, status, actor_id))
    }

    pub fn delete_part_demand(&self, demand_id: &str, actor_id: &str) -> Result<()> {
        self.backend
            .transaction(|store| part_demand::delete_part_demand(store, demand_id, actor_id))
    }

    pub fn check_availability(&self, demand_id: &str) -> Result<PartAvailability> {
        self.backend.read(|store| {
            let demand = store
                .get_part_demand(demand_id)?
                .ok_or_else(|| EngineError::not_found("part demand", demand_id))?;
            part_demand::check_availability(store, &demand)
        })
    }

    pub fn parts_summary(&self, job_id: &str) -> Result<PartsSummary> {
        self.backend
            .read(|store| part_demand::parts_summary(store, store, job_id))
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn get_job(&self, job_id: &str) -> Result<MaintenanceActionSet> {
        self.backend.read(|store| lifecycle::load_job(store, job_id))
    }

    pub fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<MaintenanceActionSet>> {
        self.backend.read(|store| store.list_jobs(filter))
    }

    pub fn get_action(&self, action_id: &str) -> Result<Action> {
        self.backend
            .read(|store| lifecycle::load_action(store, action_id))
    }

    pub fn list_actions(&self, job_id: &str) -> Result<Vec<Action>> {
        self.backend.read(|store| {
            lifecycle::load_job(store, job_id)?;
            store.list_actions(job_id)
        })
    }

    pub fn get_part_demand(&self, demand_id: &str) -> Result<Option<PartDemand>> {
        self.backend.read(|store| store.get_part_demand(demand_id))
    }

    pub fn list_part_demands(&self, action_id: &str) -> Result<Vec<PartDemand>> {
        self.backend.read(|store| store.list_part_demands(action_id))
    }

    pub fn list_delays(&self, job_id: &str) -> Result<Vec<MaintenanceDelay>> {
        self.backend.read(|store| store.list_delays(job_id))
    }

    pub fn job_tree(&self, job_id: &str) -> Result<JobTree> {
        self.backend
            .read(|store| report::load_job_tree(store, job_id))
    }

    pub fn job_progress(&self, job_id: &str) -> Result<JobProgress> {
        self.backend.read(|store| report::job_progress(store, job_id))
    }

    /// The audit trail of a job, oldest first.
    pub fn comments(&self, job_id: &str) -> Result<Vec<Comment>> {
        self.backend.read(|store| {
            let job = lifecycle::load_job(store, job_id)?;
            store.list_comments(&job.event_id)
        })
    }
}
