use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;

use super::backend::{PartCatalog, Store};
use super::migration;
use super::models::*;
use crate::error::{EngineError, Result};

/// SQLite-backed store. One connection, serialized behind a mutex; every
/// engine operation runs inside [`SqliteBackend::transaction`].
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create the database file.
    pub fn open(db_path: &str) -> Result<Self> {
        let parent = Path::new(db_path).parent();
        if let Some(dir) = parent {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        tracing::debug!(path = db_path, "Opened maintrack database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create tables or migrate an older schema.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| EngineError::Poisoned)?;
        migration::check_and_migrate(&conn)
    }

    /// Run `f` as one unit of work: commit on `Ok`, roll back on `Err`.
    ///
    /// The transaction is IMMEDIATE so the write lock is taken up front and
    /// concurrent writers from other processes queue instead of racing.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteStore<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| EngineError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = {
            let store = SqliteStore::new(&tx);
            f(&store)
        };
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run read-only queries without opening a transaction.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteStore<'_>) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| EngineError::Poisoned)?;
        let store = SqliteStore::new(&conn);
        f(&store)
    }
}

/// A borrowed connection (usually an open transaction) implementing the
/// engine's store and catalog traits.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ─── Catalog maintenance ────────────────────────────────────────────────

    pub fn upsert_part(&self, part: &Part) -> Result<()> {
        self.conn.execute(
            "INSERT INTO parts (id, part_number, name, unit_cost, stock_level)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                part_number = excluded.part_number,
                name = excluded.name,
                unit_cost = excluded.unit_cost,
                stock_level = excluded.stock_level",
            params![
                part.id,
                part.part_number,
                part.name,
                part.unit_cost.to_string(),
                part.stock_level.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn upsert_tool(&self, tool: &Tool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tools (id, name, status) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, status = excluded.status",
            params![tool.id, tool.name, tool.status],
        )?;
        Ok(())
    }

    pub fn list_parts(&self) -> Result<Vec<Part>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, part_number, name, unit_cost, stock_level FROM parts ORDER BY part_number",
        )?;
        let rows = stmt
            .query_map([], part_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_list<T>(
        &self,
        sql: &str,
        param: &str,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![param], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_one<T>(
        &self,
        sql: &str,
        param: &str,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        Ok(self.conn.query_row(sql, params![param], map).optional()?)
    }
}

impl PartCatalog for SqliteStore<'_> {
    fn get_part(&self, id: &str) -> Result<Option<Part>> {
        self.query_one(
            "SELECT id, part_number, name, unit_cost, stock_level FROM parts WHERE id = ?1",
            id,
            part_from_row,
        )
    }

    fn get_tool(&self, id: &str) -> Result<Option<Tool>> {
        self.query_one(
            "SELECT id, name, status FROM tools WHERE id = ?1",
            id,
            |row| {
                Ok(Tool {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    status: row.get(2)?,
                })
            },
        )
    }
}

// ─── Column lists ───────────────────────────────────────────────────────────

const TEMPLATE_SET_COLUMNS: &str = "id, task_name, description, revision, prior_revision_id, \
    is_active, estimated_duration, staff_count, safety_review_required, created_by, created_at";

const TEMPLATE_ITEM_COLUMNS: &str = "id, template_action_set_id, action_name, description, \
    sequence_order, is_required, estimated_duration, minimum_staff_count, instructions, \
    required_skills, safety_notes";

const TEMPLATE_DEMAND_COLUMNS: &str =
    "id, template_action_item_id, part_id, quantity_required, is_optional, sequence_order, notes";

const TEMPLATE_TOOL_COLUMNS: &str =
    "id, template_action_item_id, tool_id, quantity_required, is_required, sequence_order";

const JOB_COLUMNS: &str = "id, template_action_set_id, maintenance_plan_id, asset_id, event_id, \
    task_name, description, estimated_duration, staff_count, safety_review_required, status, \
    priority, scheduled_date, start_date, end_date, completed_by_id, completion_notes, \
    delay_notes, created_by, created_at, updated_by, updated_at";

const ACTION_COLUMNS: &str = "id, maintenance_action_set_id, template_action_item_id, \
    action_name, description, sequence_order, status, estimated_duration, safety_notes, \
    instructions, scheduled_start_time, start_time, end_time, billable_hours, completion_notes, \
    created_by, created_at, updated_by, updated_at";

const ACTION_TOOL_COLUMNS: &str =
    "id, action_id, tool_id, quantity_required, is_required, sequence_order";

const DEMAND_COLUMNS: &str = "id, action_id, part_id, quantity_required, sequence_order, notes, \
    status, created_by, created_at, updated_by, updated_at";

const DELAY_COLUMNS: &str = "id, maintenance_action_set_id, delay_type, delay_reason, \
    delay_start_date, delay_end_date, delay_billable_hours, delay_notes, priority, created_by, \
    created_at";

/// "?1, ?2, ..., ?n"
fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Store for SqliteStore<'_> {
    // ─── Templates ──────────────────────────────────────────────────────────

    fn insert_template_set(&self, set: &TemplateActionSet) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO template_action_sets ({}) VALUES ({})",
                TEMPLATE_SET_COLUMNS,
                placeholders(11)
            ),
            params![
                set.id,
                set.task_name,
                set.description,
                set.revision,
                set.prior_revision_id,
                set.is_active,
                set.estimated_duration,
                set.staff_count,
                set.safety_review_required,
                set.created_by,
                set.created_at,
            ],
        )?;
        Ok(())
    }

    fn update_template_set(&self, set: &TemplateActionSet) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE template_action_sets SET task_name = ?2, description = ?3, revision = ?4,
                prior_revision_id = ?5, is_active = ?6, estimated_duration = ?7,
                staff_count = ?8, safety_review_required = ?9
             WHERE id = ?1",
            params![
                set.id,
                set.task_name,
                set.description,
                set.revision,
                set.prior_revision_id,
                set.is_active,
                set.estimated_duration,
                set.staff_count,
                set.safety_review_required,
            ],
        )?;
        expect_one(rows, "template", &set.id)
    }

    fn get_template_set(&self, id: &str) -> Result<Option<TemplateActionSet>> {
        self.query_one(
            &format!(
                "SELECT {} FROM template_action_sets WHERE id = ?1",
                TEMPLATE_SET_COLUMNS
            ),
            id,
            template_set_from_row,
        )
    }

    fn list_template_sets(&self, active_only: bool) -> Result<Vec<TemplateActionSet>> {
        let mut sql = format!("SELECT {} FROM template_action_sets", TEMPLATE_SET_COLUMNS);
        if active_only {
            sql.push_str(" WHERE is_active = 1");
        }
        sql.push_str(" ORDER BY task_name, created_at, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], template_set_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_template_item(&self, item: &TemplateActionItem) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO template_action_items ({}) VALUES ({})",
                TEMPLATE_ITEM_COLUMNS,
                placeholders(11)
            ),
            params![
                item.id,
                item.template_action_set_id,
                item.action_name,
                item.description,
                item.sequence_order,
                item.is_required,
                item.estimated_duration,
                item.minimum_staff_count,
                item.instructions,
                item.required_skills,
                item.safety_notes,
            ],
        )?;
        Ok(())
    }

    fn list_template_items(&self, set_id: &str) -> Result<Vec<TemplateActionItem>> {
        self.query_list(
            &format!(
                "SELECT {} FROM template_action_items WHERE template_action_set_id = ?1
                 ORDER BY sequence_order, id",
                TEMPLATE_ITEM_COLUMNS
            ),
            set_id,
            template_item_from_row,
        )
    }

    fn insert_template_part_demand(&self, demand: &TemplatePartDemand) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO template_part_demands ({}) VALUES ({})",
                TEMPLATE_DEMAND_COLUMNS,
                placeholders(7)
            ),
            params![
                demand.id,
                demand.template_action_item_id,
                demand.part_id,
                demand.quantity_required.to_string(),
                demand.is_optional,
                demand.sequence_order,
                demand.notes,
            ],
        )?;
        Ok(())
    }

    fn list_template_part_demands(&self, item_id: &str) -> Result<Vec<TemplatePartDemand>> {
        self.query_list(
            &format!(
                "SELECT {} FROM template_part_demands WHERE template_action_item_id = ?1
                 ORDER BY sequence_order, id",
                TEMPLATE_DEMAND_COLUMNS
            ),
            item_id,
            |row| {
                Ok(TemplatePartDemand {
                    id: row.get(0)?,
                    template_action_item_id: row.get(1)?,
                    part_id: row.get(2)?,
                    quantity_required: decimal_at(row, 3)?,
                    is_optional: row.get(4)?,
                    sequence_order: row.get(5)?,
                    notes: row.get(6)?,
                })
            },
        )
    }

    fn insert_template_tool(&self, tool: &TemplateActionTool) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO template_action_tools ({}) VALUES ({})",
                TEMPLATE_TOOL_COLUMNS,
                placeholders(6)
            ),
            params![
                tool.id,
                tool.template_action_item_id,
                tool.tool_id,
                tool.quantity_required,
                tool.is_required,
                tool.sequence_order,
            ],
        )?;
        Ok(())
    }

    fn list_template_tools(&self, item_id: &str) -> Result<Vec<TemplateActionTool>> {
        self.query_list(
            &format!(
                "SELECT {} FROM template_action_tools WHERE template_action_item_id = ?1
                 ORDER BY sequence_order, id",
                TEMPLATE_TOOL_COLUMNS
            ),
            item_id,
            |row| {
                Ok(TemplateActionTool {
                    id: row.get(0)?,
                    template_action_item_id: row.get(1)?,
                    tool_id: row.get(2)?,
                    quantity_required: row.get(3)?,
                    is_required: row.get(4)?,
                    sequence_order: row.get(5)?,
                })
            },
        )
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    fn insert_event(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, event_type, description, asset_id, status, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id,
                event.event_type,
                event.description,
                event.asset_id,
                event.status,
                event.created_by,
                event.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_event(&self, id: &str) -> Result<Option<Event>> {
        self.query_one(
            "SELECT id, event_type, description, asset_id, status, created_by, created_at
             FROM events WHERE id = ?1",
            id,
            |row| {
                Ok(Event {
                    id: row.get(0)?,
                    event_type: row.get(1)?,
                    description: row.get(2)?,
                    asset_id: row.get(3)?,
                    status: row.get(4)?,
                    created_by: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )
    }

    fn set_event_status(&self, id: &str, status: &str) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE events SET status = ?2 WHERE id = ?1",
            params![id, status],
        )?;
        expect_one(rows, "event", id)
    }

    fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.conn.execute(
            "INSERT INTO comments (id, event_id, content, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                comment.event_id,
                comment.content,
                comment.created_by,
                comment.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_comments(&self, event_id: &str) -> Result<Vec<Comment>> {
        self.query_list(
            "SELECT id, event_id, content, created_by, created_at FROM comments
             WHERE event_id = ?1 ORDER BY created_at, rowid",
            event_id,
            |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    content: row.get(2)?,
                    created_by: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
    }

    // ─── Jobs ───────────────────────────────────────────────────────────────

    fn insert_job(&self, job: &MaintenanceActionSet) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO maintenance_action_sets ({}) VALUES ({})",
                JOB_COLUMNS,
                placeholders(22)
            ),
            params![
                job.id,
                job.template_action_set_id,
                job.maintenance_plan_id,
                job.asset_id,
                job.event_id,
                job.task_name,
                job.description,
                job.estimated_duration,
                job.staff_count,
                job.safety_review_required,
                job.status,
                job.priority,
                job.scheduled_date,
                job.start_date,
                job.end_date,
                job.completed_by_id,
                job.completion_notes,
                job.delay_notes,
                job.created_by,
                job.created_at,
                job.updated_by,
                job.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_job(&self, job: &MaintenanceActionSet) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE maintenance_action_sets SET
                maintenance_plan_id = ?2, task_name = ?3, description = ?4,
                estimated_duration = ?5, staff_count = ?6, safety_review_required = ?7,
                status = ?8, priority = ?9, scheduled_date = ?10, start_date = ?11,
                end_date = ?12, completed_by_id = ?13, completion_notes = ?14,
                delay_notes = ?15, updated_by = ?16, updated_at = ?17
             WHERE id = ?1",
            params![
                job.id,
                job.maintenance_plan_id,
                job.task_name,
                job.description,
                job.estimated_duration,
                job.staff_count,
                job.safety_review_required,
                job.status,
                job.priority,
                job.scheduled_date,
                job.start_date,
                job.end_date,
                job.completed_by_id,
                job.completion_notes,
                job.delay_notes,
                job.updated_by,
                job.updated_at,
            ],
        )?;
        expect_one(rows, "job", &job.id)
    }

    fn get_job(&self, id: &str) -> Result<Option<MaintenanceActionSet>> {
        self.query_one(
            &format!(
                "SELECT {} FROM maintenance_action_sets WHERE id = ?1",
                JOB_COLUMNS
            ),
            id,
            job_from_row,
        )
    }

    fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<MaintenanceActionSet>> {
        let mut sql = format!(
            "SELECT {} FROM maintenance_action_sets WHERE 1 = 1",
            JOB_COLUMNS
        );
        let mut param_values: Vec<String> = Vec::new();

        if let Some(ref asset_id) = filter.asset_id {
            param_values.push(asset_id.clone());
            sql.push_str(&format!(" AND asset_id = ?{}", param_values.len()));
        }
        if let Some(status) = filter.status {
            param_values.push(status.to_string());
            sql.push_str(&format!(" AND status = ?{}", param_values.len()));
        }
        if let Some(ref template_id) = filter.template_action_set_id {
            param_values.push(template_id.clone());
            sql.push_str(&format!(
                " AND template_action_set_id = ?{}",
                param_values.len()
            ));
        }

        sql.push_str(" ORDER BY created_at, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = param_values
            .iter()
            .map(|v| v as &dyn rusqlite::ToSql)
            .collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), job_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn delete_job(&self, id: &str) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM maintenance_action_sets WHERE id = ?1",
            params![id],
        )?;
        expect_one(rows, "job", id)
    }

    // ─── Actions ────────────────────────────────────────────────────────────

    fn insert_action(&self, action: &Action) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO actions ({}) VALUES ({})",
                ACTION_COLUMNS,
                placeholders(19)
            ),
            params![
                action.id,
                action.maintenance_action_set_id,
                action.template_action_item_id,
                action.action_name,
                action.description,
                action.sequence_order,
                action.status,
                action.estimated_duration,
                action.safety_notes,
                action.instructions,
                action.scheduled_start_time,
                action.start_time,
                action.end_time,
                action.billable_hours,
                action.completion_notes,
                action.created_by,
                action.created_at,
                action.updated_by,
                action.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_action(&self, action: &Action) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE actions SET
                action_name = ?2, description = ?3, sequence_order = ?4, status = ?5,
                estimated_duration = ?6, safety_notes = ?7, instructions = ?8,
                scheduled_start_time = ?9, start_time = ?10, end_time = ?11,
                billable_hours = ?12, completion_notes = ?13, updated_by = ?14,
                updated_at = ?15
             WHERE id = ?1",
            params![
                action.id,
                action.action_name,
                action.description,
                action.sequence_order,
                action.status,
                action.estimated_duration,
                action.safety_notes,
                action.instructions,
                action.scheduled_start_time,
                action.start_time,
                action.end_time,
                action.billable_hours,
                action.completion_notes,
                action.updated_by,
                action.updated_at,
            ],
        )?;
        expect_one(rows, "action", &action.id)
    }

    fn get_action(&self, id: &str) -> Result<Option<Action>> {
        self.query_one(
            &format!("SELECT {} FROM actions WHERE id = ?1", ACTION_COLUMNS),
            id,
            action_from_row,
        )
    }

    fn list_actions(&self, job_id: &str) -> Result<Vec<Action>> {
        self.query_list(
            &format!(
                "SELECT {} FROM actions WHERE maintenance_action_set_id = ?1
                 ORDER BY sequence_order, id",
                ACTION_COLUMNS
            ),
            job_id,
            action_from_row,
        )
    }

    fn delete_action(&self, id: &str) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM actions WHERE id = ?1", params![id])?;
        expect_one(rows, "action", id)
    }

    fn insert_action_tool(&self, tool: &ActionTool) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO action_tools ({}) VALUES ({})",
                ACTION_TOOL_COLUMNS,
                placeholders(6)
            ),
            params![
                tool.id,
                tool.action_id,
                tool.tool_id,
                tool.quantity_required,
                tool.is_required,
                tool.sequence_order,
            ],
        )?;
        Ok(())
    }

    fn list_action_tools(&self, action_id: &str) -> Result<Vec<ActionTool>> {
        self.query_list(
            &format!(
                "SELECT {} FROM action_tools WHERE action_id = ?1 ORDER BY sequence_order, id",
                ACTION_TOOL_COLUMNS
            ),
            action_id,
            |row| {
                Ok(ActionTool {
                    id: row.get(0)?,
                    action_id: row.get(1)?,
                    tool_id: row.get(2)?,
                    quantity_required: row.get(3)?,
                    is_required: row.get(4)?,
                    sequence_order: row.get(5)?,
                })
            },
        )
    }

    // ─── Part Demands ───────────────────────────────────────────────────────

    fn insert_part_demand(&self, demand: &PartDemand) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO part_demands ({}) VALUES ({})",
                DEMAND_COLUMNS,
                placeholders(11)
            ),
            params![
                demand.id,
                demand.action_id,
                demand.part_id,
                demand.quantity_required.to_string(),
                demand.sequence_order,
                demand.notes,
                demand.status,
                demand.created_by,
                demand.created_at,
                demand.updated_by,
                demand.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_part_demand(&self, demand: &PartDemand) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE part_demands SET
                quantity_required = ?2, sequence_order = ?3, notes = ?4, status = ?5,
                updated_by = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                demand.id,
                demand.quantity_required.to_string(),
                demand.sequence_order,
                demand.notes,
                demand.status,
                demand.updated_by,
                demand.updated_at,
            ],
        )?;
        expect_one(rows, "part demand", &demand.id)
    }

    fn get_part_demand(&self, id: &str) -> Result<Option<PartDemand>> {
        self.query_one(
            &format!("SELECT {} FROM part_demands WHERE id = ?1", DEMAND_COLUMNS),
            id,
            demand_from_row,
        )
    }

    fn list_part_demands(&self, action_id: &str) -> Result<Vec<PartDemand>> {
        self.query_list(
            &format!(
                "SELECT {} FROM part_demands WHERE action_id = ?1 ORDER BY sequence_order, id",
                DEMAND_COLUMNS
            ),
            action_id,
            demand_from_row,
        )
    }

    fn delete_part_demand(&self, id: &str) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM part_demands WHERE id = ?1", params![id])?;
        expect_one(rows, "part demand", id)
    }

    // ─── Delays ─────────────────────────────────────────────────────────────

    fn insert_delay(&self, delay: &MaintenanceDelay) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO maintenance_delays ({}) VALUES ({})",
                DELAY_COLUMNS,
                placeholders(11)
            ),
            params![
                delay.id,
                delay.maintenance_action_set_id,
                delay.delay_type,
                delay.delay_reason,
                delay.delay_start_date,
                delay.delay_end_date,
                delay.delay_billable_hours,
                delay.delay_notes,
                delay.priority,
                delay.created_by,
                delay.created_at,
            ],
        )?;
        Ok(())
    }

    fn update_delay(&self, delay: &MaintenanceDelay) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE maintenance_delays SET
                delay_type = ?2, delay_reason = ?3, delay_start_date = ?4,
                delay_end_date = ?5, delay_billable_hours = ?6, delay_notes = ?7,
                priority = ?8
             WHERE id = ?1",
            params![
                delay.id,
                delay.delay_type,
                delay.delay_reason,
                delay.delay_start_date,
                delay.delay_end_date,
                delay.delay_billable_hours,
                delay.delay_notes,
                delay.priority,
            ],
        )?;
        expect_one(rows, "delay", &delay.id)
    }

    fn get_delay(&self, id: &str) -> Result<Option<MaintenanceDelay>> {
        self.query_one(
            &format!(
                "SELECT {} FROM maintenance_delays WHERE id = ?1",
                DELAY_COLUMNS
            ),
            id,
            delay_from_row,
        )
    }

    fn list_delays(&self, job_id: &str) -> Result<Vec<MaintenanceDelay>> {
        self.query_list(
            &format!(
                "SELECT {} FROM maintenance_delays WHERE maintenance_action_set_id = ?1
                 ORDER BY delay_start_date, rowid",
                DELAY_COLUMNS
            ),
            job_id,
            delay_from_row,
        )
    }
}

// ─── Helper functions ───────────────────────────────────────────────────────

fn expect_one(rows: usize, entity: &'static str, id: &str) -> Result<()> {
    if rows == 0 {
        return Err(EngineError::not_found(entity, id));
    }
    Ok(())
}

/// Decimal columns hold their exact text form.
fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn part_from_row(row: &Row<'_>) -> rusqlite::Result<Part> {
    Ok(Part {
        id: row.get(0)?,
        part_number: row.get(1)?,
        name: row.get(2)?,
        unit_cost: decimal_at(row, 3)?,
        stock_level: decimal_at(row, 4)?,
    })
}

fn template_set_from_row(row: &Row<'_>) -> rusqlite::Result<TemplateActionSet> {
    Ok(TemplateActionSet {
        id: row.get(0)?,
        task_name: row.get(1)?,
        description: row.get(2)?,
        revision: row.get(3)?,
        prior_revision_id: row.get(4)?,
        is_active: row.get(5)?,
        estimated_duration: row.get(6)?,
        staff_count: row.get(7)?,
        safety_review_required: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn template_item_from_row(row: &Row<'_>) -> rusqlite::Result<TemplateActionItem> {
    Ok(TemplateActionItem {
        id: row.get(0)?,
        template_action_set_id: row.get(1)?,
        action_name: row.get(2)?,
        description: row.get(3)?,
        sequence_order: row.get(4)?,
        is_required: row.get(5)?,
        estimated_duration: row.get(6)?,
        minimum_staff_count: row.get(7)?,
        instructions: row.get(8)?,
        required_skills: row.get(9)?,
        safety_notes: row.get(10)?,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceActionSet> {
    Ok(MaintenanceActionSet {
        id: row.get(0)?,
        template_action_set_id: row.get(1)?,
        maintenance_plan_id: row.get(2)?,
        asset_id: row.get(3)?,
        event_id: row.get(4)?,
        task_name: row.get(5)?,
        description: row.get(6)?,
        estimated_duration: row.get(7)?,
        staff_count: row.get(8)?,
        safety_review_required: row.get(9)?,
        status: row.get(10)?,
        priority: row.get(11)?,
        scheduled_date: row.get(12)?,
        start_date: row.get(13)?,
        end_date: row.get(14)?,
        completed_by_id: row.get(15)?,
        completion_notes: row.get(16)?,
        delay_notes: row.get(17)?,
        created_by: row.get(18)?,
        created_at: row.get(19)?,
        updated_by: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        maintenance_action_set_id: row.get(1)?,
        template_action_item_id: row.get(2)?,
        action_name: row.get(3)?,
        description: row.get(4)?,
        sequence_order: row.get(5)?,
        status: row.get(6)?,
        estimated_duration: row.get(7)?,
        safety_notes: row.get(8)?,
        instructions: row.get(9)?,
        scheduled_start_time: row.get(10)?,
        start_time: row.get(11)?,
        end_time: row.get(12)?,
        billable_hours: row.get(13)?,
        completion_notes: row.get(14)?,
        created_by: row.get(15)?,
        created_at: row.get(16)?,
        updated_by: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn demand_from_row(row: &Row<'_>) -> rusqlite::Result<PartDemand> {
    Ok(PartDemand {
        id: row.get(0)?,
        action_id: row.get(1)?,
        part_id: row.get(2)?,
        quantity_required: decimal_at(row, 3)?,
        sequence_order: row.get(4)?,
        notes: row.get(5)?,
        status: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_by: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn delay_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceDelay> {
    Ok(MaintenanceDelay {
        id: row.get(0)?,
        maintenance_action_set_id: row.get(1)?,
        delay_type: row.get(2)?,
        delay_reason: row.get(3)?,
        delay_start_date: row.get(4)?,
        delay_end_date: row.get(5)?,
        delay_billable_hours: row.get(6)?,
        delay_notes: row.get(7)?,
        priority: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::open_memory().unwrap();
        backend.initialize().unwrap();
        backend
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?1, ?2, ?3");
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let backend = backend();
        backend.initialize().unwrap();
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let backend = backend();
        let result: Result<()> = backend.transaction(|store| {
            store.upsert_part(&Part {
                id: "p-1".into(),
                part_number: "PN-1".into(),
                name: "Filter".into(),
                unit_cost: dec!(4.5),
                stock_level: dec!(10),
            })?;
            Err(EngineError::validation("abort"))
        });
        assert!(result.is_err());

        let part = backend.read(|store| store.get_part("p-1")).unwrap();
        assert!(part.is_none());
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let backend = backend();
        let err = backend
            .transaction(|store| store.set_event_status("missing", "Complete"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ReferenceNotFound);
    }
}
