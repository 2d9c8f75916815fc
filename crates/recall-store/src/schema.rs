//! SQLite-dialect schema for the history store.
//!
//! Idempotent via `IF NOT EXISTS`; run on every connect. The script is split
//! into independent statements and each is executed on its own, so a
//! partially applied earlier run never blocks a rerun.

/// Full schema: directory, machines, the three history partitions, the
/// command cache, and sessions.
///
/// All timestamps are integer seconds since epoch. The history partitions are
/// independent tables; the same logical event may exist as up to three rows
/// with no foreign linkage between the copies.
pub const SCHEMA: &str = r#"

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    name TEXT,
    email TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);

CREATE TABLE IF NOT EXISTS machines (
    machine_id TEXT PRIMARY KEY,
    hostname TEXT NOT NULL,
    ip_address TEXT,
    os_info TEXT,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    total_commands INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS history_global (
    id TEXT PRIMARY KEY,
    command TEXT NOT NULL,
    response TEXT,
    machine_id TEXT,
    user_id TEXT,
    timestamp INTEGER NOT NULL,
    session_id TEXT,
    tokens_used INTEGER,
    execution_time_ms INTEGER,
    tags TEXT
);

CREATE INDEX IF NOT EXISTS idx_history_global_timestamp
    ON history_global(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_history_global_machine
    ON history_global(machine_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS history_user (
    id TEXT PRIMARY KEY,
    command TEXT NOT NULL,
    response TEXT,
    machine_id TEXT,
    user_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    session_id TEXT,
    context TEXT,
    tokens_used INTEGER
);

CREATE INDEX IF NOT EXISTS idx_history_user_user
    ON history_user(user_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS history_machine (
    id TEXT PRIMARY KEY,
    command TEXT NOT NULL,
    response TEXT,
    machine_id TEXT NOT NULL,
    user_id TEXT,
    timestamp INTEGER NOT NULL,
    session_id TEXT,
    error_code INTEGER
);

CREATE INDEX IF NOT EXISTS idx_history_machine_machine
    ON history_machine(machine_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS command_cache (
    command_hash TEXT NOT NULL,
    machine_id TEXT NOT NULL,
    command TEXT NOT NULL,
    output TEXT,
    last_executed INTEGER NOT NULL,
    execution_count INTEGER NOT NULL DEFAULT 1,
    avg_execution_time_ms REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (command_hash, machine_id)
);

CREATE INDEX IF NOT EXISTS idx_command_cache_machine
    ON command_cache(machine_id, last_executed DESC);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    machine_id TEXT,
    user_id TEXT,
    started_at INTEGER NOT NULL,
    ended_at INTEGER,
    command_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sessions_machine
    ON sessions(machine_id, started_at DESC);

"#;

/// Split the schema script into individually executable statements.
pub fn statements() -> impl Iterator<Item = &'static str> {
    SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
}
