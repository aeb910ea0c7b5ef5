use crate::error::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS farmers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT,
    kind TEXT NOT NULL,
    price_per_kg INTEGER,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS boxes (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    farmer_id INTEGER REFERENCES farmers(id),
    weight_kg REAL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_boxes_status ON boxes(status);
CREATE INDEX IF NOT EXISTS idx_boxes_farmer ON boxes(farmer_id);

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    farmer_id INTEGER NOT NULL REFERENCES farmers(id),
    processing_date TEXT NOT NULL,
    olive_weight_kg REAL NOT NULL,
    oil_weight_kg REAL NOT NULL,
    price_per_kg INTEGER NOT NULL,
    total_price INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_farmer ON sessions(farmer_id);
CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(processing_date);

CREATE TABLE IF NOT EXISTS session_boxes (
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    box_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    weight_kg REAL NOT NULL,
    PRIMARY KEY (session_id, box_id)
);

CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    farmer_id INTEGER NOT NULL REFERENCES farmers(id),
    amount INTEGER NOT NULL,
    paid_on TEXT NOT NULL,
    method TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_payments_session ON payments(session_id);
CREATE INDEX IF NOT EXISTS idx_payments_farmer ON payments(farmer_id);

CREATE TABLE IF NOT EXISTS collector_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS collectors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES collector_groups(id),
    name TEXT NOT NULL,
    phone TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS collection_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collector_id INTEGER NOT NULL REFERENCES collectors(id),
    collected_on TEXT NOT NULL,
    chakra INTEGER NOT NULL,
    galba INTEGER NOT NULL,
    price_per_chakra INTEGER NOT NULL,
    amount INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_collector ON collection_entries(collector_id, collected_on);

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    role TEXT,
    daily_wage INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance (
    employee_id INTEGER NOT NULL REFERENCES employees(id),
    work_date TEXT NOT NULL,
    status TEXT NOT NULL,
    overtime_hours REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (employee_id, work_date)
);

CREATE TABLE IF NOT EXISTS salary_advances (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id INTEGER NOT NULL REFERENCES employees(id),
    amount INTEGER NOT NULL,
    given_on TEXT NOT NULL,
    note TEXT,
    created_at TEXT NOT NULL
);
"#;

pub(crate) fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
