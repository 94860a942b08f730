//! Database module for the hotline
//!
//! SQLite persistence for the records callers leave behind: extraction
//! requests, intel, alarms and call logs, plus the item catalog the loot
//! locator searches.

mod schema;

pub use schema::SCHEMA;

use crate::records::{
    AlarmRequest, CallLog, IntelEntry, IntelSubmission, Item, LocationRequest, Order,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Inserts ====================

    pub fn insert_location_request(&self, request: &LocationRequest) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO location_requests (id, call_id, caller, location, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_id(),
                request.call_id,
                request.caller,
                request.location,
                request.requested_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Store caller-submitted intel; it stays unverified until an operator reviews it
    pub fn insert_intel_submission(&self, submission: &IntelSubmission) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO intel (id, call_id, caller, text, verified, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                new_id(),
                submission.call_id,
                submission.caller,
                submission.text,
                submission.submitted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_alarm(&self, alarm: &AlarmRequest) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO alarms (id, call_id, caller, fire_at, time_text, time_parsed, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new_id(),
                alarm.call_id,
                alarm.caller,
                alarm.fire_at.to_rfc3339(),
                alarm.time_text,
                alarm.time_parsed,
                alarm.message,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_call_log(&self, log: &CallLog) -> DbResult<()> {
        let transcript = serde_json::to_string(&log.transcript)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO call_logs (id, call_id, conversation_id, caller, started_at, ended_at, end_reason, transcript)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new_id(),
                log.call_id,
                log.conversation_id,
                log.caller,
                log.started_at.to_rfc3339(),
                log.ended_at.to_rfc3339(),
                log.end_reason,
                transcript,
            ],
        )?;
        Ok(())
    }

    /// Add an item to the loot catalog
    #[allow(dead_code)] // Catalog is seeded by operators and tests
    pub fn insert_item(&self, name: &str, location: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO items (id, name, location) VALUES (?1, ?2, ?3)",
            params![new_id(), name, location],
        )?;
        Ok(())
    }

    /// Insert already-verified intel
    #[allow(dead_code)] // Operator tooling and tests
    pub fn insert_verified_intel(&self, text: &str, created_at: DateTime<Utc>) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO intel (id, text, verified, created_at) VALUES (?1, ?2, 1, ?3)",
            params![new_id(), text, created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    // ==================== Queries ====================

    /// Items whose name contains `term`, ignoring case
    pub fn find_items(&self, term: &str, limit: usize) -> DbResult<Vec<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, location FROM items
             WHERE instr(lower(name), lower(?1)) > 0
             ORDER BY name COLLATE NOCASE ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![term.trim(), sql_limit(limit)], |row| {
            Ok(Item {
                name: row.get(0)?,
                location: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Intel entries, optionally filtered by verification status
    pub fn list_intel(
        &self,
        verified: Option<bool>,
        limit: usize,
        order: Order,
    ) -> DbResult<Vec<IntelEntry>> {
        let order_by = match order {
            Order::NewestFirst => "created_at DESC",
            Order::NameAsc => "text COLLATE NOCASE ASC",
        };
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT text, verified, created_at FROM intel
             WHERE (?1 IS NULL OR verified = ?1)
             ORDER BY {order_by}
             LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![verified, sql_limit(limit)], |row| {
            Ok(IntelEntry {
                text: row.get(0)?,
                verified: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Number of rows in a table
    #[allow(dead_code)] // Used in tests
    pub fn count(&self, table: crate::records::Table) -> DbResult<i64> {
        let conn = self.conn()?;
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(DbError::from)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Speaker, Table, TranscriptLine};
    use chrono::Duration;

    #[test]
    fn test_find_items_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_item("ARC Alloy", "Spaceport").unwrap();
        db.insert_item("Battery", "Buried City").unwrap();

        let items = db.find_items("arc", 5).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].location, "Spaceport");

        assert!(db.find_items("plutonium", 5).unwrap().is_empty());
    }

    #[test]
    fn test_intel_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.insert_verified_intel("old news", now - Duration::hours(2)).unwrap();
        db.insert_verified_intel("fresh news", now).unwrap();

        let intel = db.list_intel(Some(true), 50, Order::NewestFirst).unwrap();
        assert_eq!(intel[0].text, "fresh news");
        assert_eq!(intel[1].text, "old news");
        assert!(intel.iter().all(|i| i.verified));
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hotline.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_alarm(&AlarmRequest {
                call_id: "call-1".to_string(),
                caller: Some("+15550100".to_string()),
                fire_at: Utc::now(),
                time_text: "seven am".to_string(),
                time_parsed: false,
                message: "wake up raider".to_string(),
            })
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count(Table::Alarms).unwrap(), 1);
    }

    #[test]
    fn test_call_log_transcript_stored() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.insert_call_log(&CallLog {
            call_id: "call-1".to_string(),
            conversation_id: "conv-1".to_string(),
            caller: None,
            started_at: now,
            ended_at: now,
            end_reason: "closed".to_string(),
            transcript: vec![TranscriptLine {
                speaker: Speaker::Caller,
                text: "loot".to_string(),
                at: now,
            }],
        })
        .unwrap();
        assert_eq!(db.count(Table::CallLogs).unwrap(), 1);
    }
}
