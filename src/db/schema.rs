//! Database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS location_requests (
    id TEXT PRIMARY KEY,
    call_id TEXT NOT NULL,
    caller TEXT,
    location TEXT NOT NULL,
    requested_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_name ON items(name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS intel (
    id TEXT PRIMARY KEY,
    call_id TEXT,
    caller TEXT,
    text TEXT NOT NULL,
    verified BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_intel_verified ON intel(verified, created_at DESC);

CREATE TABLE IF NOT EXISTS alarms (
    id TEXT PRIMARY KEY,
    call_id TEXT NOT NULL,
    caller TEXT,
    fire_at TEXT NOT NULL,
    time_text TEXT NOT NULL,
    time_parsed BOOLEAN NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alarms_fire_at ON alarms(fire_at);

CREATE TABLE IF NOT EXISTS call_logs (
    id TEXT PRIMARY KEY,
    call_id TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    caller TEXT,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    end_reason TEXT NOT NULL,
    transcript TEXT NOT NULL
);
";
