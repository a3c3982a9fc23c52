/// SQL DDL for the maintrack database.
///
/// Templates cascade-delete their children. Job trees do not: a job or
/// action may only be removed once it has no dependent rows.
///
/// Timestamps are stored as TEXT (rusqlite's chrono encoding). Part
/// quantities, stock levels and costs are exact decimals, also stored as TEXT.

pub const SCHEMA_VERSION: i32 = 2;

pub const CREATE_TABLES_SQL: &str = "
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL,
    description TEXT
);

-- Part / tool catalog
CREATE TABLE IF NOT EXISTS parts (
    id TEXT PRIMARY KEY,
    part_number TEXT NOT NULL,
    name TEXT NOT NULL,
    unit_cost TEXT NOT NULL DEFAULT '0',
    stock_level TEXT NOT NULL DEFAULT '0'
);

CREATE TABLE IF NOT EXISTS tools (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Available'
);

-- Template catalog
CREATE TABLE IF NOT EXISTS template_action_sets (
    id TEXT PRIMARY KEY,
    task_name TEXT NOT NULL,
    description TEXT,
    revision TEXT NOT NULL DEFAULT '1',
    prior_revision_id TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    estimated_duration REAL,
    staff_count INTEGER,
    safety_review_required INTEGER NOT NULL DEFAULT 0,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (prior_revision_id) REFERENCES template_action_sets(id)
);

CREATE TABLE IF NOT EXISTS template_action_items (
    id TEXT PRIMARY KEY,
    template_action_set_id TEXT NOT NULL,
    action_name TEXT NOT NULL,
    description TEXT,
    sequence_order INTEGER NOT NULL,
    is_required INTEGER NOT NULL DEFAULT 1,
    estimated_duration REAL,
    minimum_staff_count INTEGER,
    instructions TEXT,
    required_skills TEXT,
    safety_notes TEXT,
    FOREIGN KEY (template_action_set_id) REFERENCES template_action_sets(id) ON DELETE CASCADE
);

-- part_id is not a foreign key; materialization checks it against the catalog.
CREATE TABLE IF NOT EXISTS template_part_demands (
    id TEXT PRIMARY KEY,
    template_action_item_id TEXT NOT NULL,
    part_id TEXT NOT NULL,
    quantity_required TEXT NOT NULL CHECK (CAST(quantity_required AS REAL) > 0),
    is_optional INTEGER NOT NULL DEFAULT 0,
    sequence_order INTEGER NOT NULL,
    notes TEXT,
    FOREIGN KEY (template_action_item_id) REFERENCES template_action_items(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS template_action_tools (
    id TEXT PRIMARY KEY,
    template_action_item_id TEXT NOT NULL,
    tool_id TEXT NOT NULL,
    quantity_required INTEGER NOT NULL DEFAULT 1,
    is_required INTEGER NOT NULL DEFAULT 1,
    sequence_order INTEGER NOT NULL,
    FOREIGN KEY (template_action_item_id) REFERENCES template_action_items(id) ON DELETE CASCADE
);

-- Audit channel
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL,
    description TEXT NOT NULL,
    asset_id TEXT NOT NULL,
    status TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    event_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (event_id) REFERENCES events(id)
);

-- Materialized jobs
CREATE TABLE IF NOT EXISTS maintenance_action_sets (
    id TEXT PRIMARY KEY,
    template_action_set_id TEXT,
    maintenance_plan_id TEXT,
    asset_id TEXT NOT NULL,
    event_id TEXT NOT NULL UNIQUE,
    task_name TEXT NOT NULL,
    description TEXT,
    estimated_duration REAL,
    staff_count INTEGER,
    safety_review_required INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'Planned',
    priority TEXT NOT NULL DEFAULT 'Medium',
    scheduled_date TEXT,
    start_date TEXT,
    end_date TEXT,
    completed_by_id TEXT,
    completion_notes TEXT,
    delay_notes TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (template_action_set_id) REFERENCES template_action_sets(id),
    FOREIGN KEY (event_id) REFERENCES events(id)
);

CREATE TABLE IF NOT EXISTS actions (
    id TEXT PRIMARY KEY,
    maintenance_action_set_id TEXT NOT NULL,
    template_action_item_id TEXT,
    action_name TEXT NOT NULL,
    description TEXT,
    sequence_order INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'Not Started',
    estimated_duration REAL,
    safety_notes TEXT,
    instructions TEXT,
    scheduled_start_time TEXT,
    start_time TEXT,
    end_time TEXT,
    billable_hours REAL,
    completion_notes TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (maintenance_action_set_id) REFERENCES maintenance_action_sets(id)
);

CREATE TABLE IF NOT EXISTS part_demands (
    id TEXT PRIMARY KEY,
    action_id TEXT NOT NULL,
    part_id TEXT NOT NULL,
    quantity_required TEXT NOT NULL CHECK (CAST(quantity_required AS REAL) > 0),
    sequence_order INTEGER NOT NULL,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'Planned',
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (action_id) REFERENCES actions(id)
);

CREATE TABLE IF NOT EXISTS action_tools (
    id TEXT PRIMARY KEY,
    action_id TEXT NOT NULL,
    tool_id TEXT NOT NULL,
    quantity_required INTEGER NOT NULL DEFAULT 1,
    is_required INTEGER NOT NULL DEFAULT 1,
    sequence_order INTEGER NOT NULL,
    FOREIGN KEY (action_id) REFERENCES actions(id)
);

CREATE TABLE IF NOT EXISTS maintenance_delays (
    id TEXT PRIMARY KEY,
    maintenance_action_set_id TEXT NOT NULL,
    delay_type TEXT NOT NULL,
    delay_reason TEXT NOT NULL,
    delay_start_date TEXT NOT NULL,
    delay_end_date TEXT,
    delay_billable_hours REAL,
    delay_notes TEXT,
    priority TEXT NOT NULL DEFAULT 'Medium',
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (maintenance_action_set_id) REFERENCES maintenance_action_sets(id)
);
";

pub const CREATE_INDEXES_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_template_items_set ON template_action_items(template_action_set_id, sequence_order);
CREATE INDEX IF NOT EXISTS idx_template_demands_item ON template_part_demands(template_action_item_id);
CREATE INDEX IF NOT EXISTS idx_template_tools_item ON template_action_tools(template_action_item_id);
CREATE INDEX IF NOT EXISTS idx_comments_event ON comments(event_id);
CREATE INDEX IF NOT EXISTS idx_jobs_asset ON maintenance_action_sets(asset_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON maintenance_action_sets(status);
CREATE INDEX IF NOT EXISTS idx_actions_job ON actions(maintenance_action_set_id, sequence_order);
CREATE INDEX IF NOT EXISTS idx_part_demands_action ON part_demands(action_id, sequence_order);
CREATE INDEX IF NOT EXISTS idx_action_tools_action ON action_tools(action_id);
CREATE INDEX IF NOT EXISTS idx_delays_job ON maintenance_delays(maintenance_action_set_id);
";

/// Version 2: REAL quantity, stock and cost columns become exact decimal TEXT.
/// SQLite cannot change a column's type in place, so each table is rebuilt.
pub const MIGRATE_V2_SQL: &str = "
ALTER TABLE parts RENAME TO parts_v1;
CREATE TABLE parts (
    id TEXT PRIMARY KEY,
    part_number TEXT NOT NULL,
    name TEXT NOT NULL,
    unit_cost TEXT NOT NULL DEFAULT '0',
    stock_level TEXT NOT NULL DEFAULT '0'
);
INSERT INTO parts (id, part_number, name, unit_cost, stock_level)
    SELECT id, part_number, name, CAST(unit_cost AS TEXT), CAST(stock_level AS TEXT) FROM parts_v1;
DROP TABLE parts_v1;

ALTER TABLE template_part_demands RENAME TO template_part_demands_v1;
CREATE TABLE template_part_demands (
    id TEXT PRIMARY KEY,
    template_action_item_id TEXT NOT NULL,
    part_id TEXT NOT NULL,
    quantity_required TEXT NOT NULL CHECK (CAST(quantity_required AS REAL) > 0),
    is_optional INTEGER NOT NULL DEFAULT 0,
    sequence_order INTEGER NOT NULL,
    notes TEXT,
    FOREIGN KEY (template_action_item_id) REFERENCES template_action_items(id) ON DELETE CASCADE
);
INSERT INTO template_part_demands
    SELECT id, template_action_item_id, part_id, CAST(quantity_required AS TEXT),
           is_optional, sequence_order, notes
    FROM template_part_demands_v1;
DROP TABLE template_part_demands_v1;

ALTER TABLE part_demands RENAME TO part_demands_v1;
CREATE TABLE part_demands (
    id TEXT PRIMARY KEY,
    action_id TEXT NOT NULL,
    part_id TEXT NOT NULL,
    quantity_required TEXT NOT NULL CHECK (CAST(quantity_required AS REAL) > 0),
    sequence_order INTEGER NOT NULL,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'Planned',
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (action_id) REFERENCES actions(id)
);
INSERT INTO part_demands
    SELECT id, action_id, part_id, CAST(quantity_required AS TEXT), sequence_order, notes,
           status, created_by, created_at, updated_by, updated_at
    FROM part_demands_v1;
DROP TABLE part_demands_v1;
";
