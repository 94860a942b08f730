//! Record store collaborator
//!
//! The dialogue engine reaches persistent data only through this narrow
//! surface: insert one record, or select records matching a filter. Every
//! failure is a `StoreError` the hotlines absorb into an apology.

use crate::db::{Database, DbError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Tables and queries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    LocationRequests,
    Items,
    Intel,
    Alarms,
    CallLogs,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::LocationRequests => "location_requests",
            Table::Items => "items",
            Table::Intel => "intel",
            Table::Alarms => "alarms",
            Table::CallLogs => "call_logs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Case-insensitive substring match on the record's name
    NameContains(String),
    Verified(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NameAsc,
    NewestFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: Table,
    pub filter: Filter,
    pub limit: usize,
    pub order: Order,
}

impl Query {
    pub fn items_named(term: impl Into<String>, limit: usize) -> Self {
        Self {
            table: Table::Items,
            filter: Filter::NameContains(term.into()),
            limit,
            order: Order::NameAsc,
        }
    }

    pub fn verified_intel(limit: usize) -> Self {
        Self {
            table: Table::Intel,
            filter: Filter::Verified(true),
            limit,
            order: Order::NewestFirst,
        }
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub call_id: String,
    pub caller: Option<String>,
    pub location: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelSubmission {
    pub call_id: String,
    pub caller: Option<String>,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRequest {
    pub call_id: String,
    pub caller: Option<String>,
    pub fire_at: DateTime<Utc>,
    /// What the caller actually said for the time
    pub time_text: String,
    /// False when `fire_at` is the one-hour fallback
    pub time_parsed: bool,
    pub message: String,
}

/// Who said what during a streamed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Caller,
    Hotline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLog {
    pub call_id: String,
    pub conversation_id: String,
    pub caller: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub end_reason: String,
    pub transcript: Vec<TranscriptLine>,
}

/// A record to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRecord {
    LocationRequest(LocationRequest),
    /// Caller-submitted intel; always stored unverified
    Intel(IntelSubmission),
    Alarm(AlarmRequest),
    CallLog(CallLog),
}

impl NewRecord {
    pub fn table(&self) -> Table {
        match self {
            NewRecord::LocationRequest(_) => Table::LocationRequests,
            NewRecord::Intel(_) => Table::Intel,
            NewRecord::Alarm(_) => Table::Alarms,
            NewRecord::CallLog(_) => Table::CallLogs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelEntry {
    pub text: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// A selected record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Item(Item),
    Intel(IntelEntry),
}

// ============================================================================
// Store trait
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Unsupported query on {table}: {detail}")]
    Unsupported { table: Table, detail: String },
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: NewRecord) -> Result<(), StoreError>;

    async fn select(&self, query: &Query) -> Result<Vec<Record>, StoreError>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn insert(&self, record: NewRecord) -> Result<(), StoreError> {
        (**self).insert(record).await
    }

    async fn select(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        (**self).select(query).await
    }
}

// ============================================================================
// Production adapter
// ============================================================================

#[async_trait]
impl RecordStore for Database {
    async fn insert(&self, record: NewRecord) -> Result<(), StoreError> {
        match record {
            NewRecord::LocationRequest(r) => self.insert_location_request(&r)?,
            NewRecord::Intel(r) => self.insert_intel_submission(&r)?,
            NewRecord::Alarm(r) => self.insert_alarm(&r)?,
            NewRecord::CallLog(r) => self.insert_call_log(&r)?,
        }
        Ok(())
    }

    async fn select(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        match (query.table, &query.filter) {
            (Table::Items, Filter::NameContains(term)) => Ok(self
                .find_items(term, query.limit)?
                .into_iter()
                .map(Record::Item)
                .collect()),
            (Table::Items, Filter::All) => Ok(self
                .find_items("", query.limit)?
                .into_iter()
                .map(Record::Item)
                .collect()),
            (Table::Intel, Filter::Verified(verified)) => Ok(self
                .list_intel(Some(*verified), query.limit, query.order)?
                .into_iter()
                .map(Record::Intel)
                .collect()),
            (Table::Intel, Filter::All) => Ok(self
                .list_intel(None, query.limit, query.order)?
                .into_iter()
                .map(Record::Intel)
                .collect()),
            (table, filter) => Err(StoreError::Unsupported {
                table,
                detail: format!("{filter:?}"),
            }),
        }
    }
}

// ============================================================================
// Logging wrapper
// ============================================================================

/// Logs every store call with its table, duration, and outcome
pub struct LoggingRecordStore {
    inner: Arc<dyn RecordStore>,
}

impl LoggingRecordStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RecordStore for LoggingRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<(), StoreError> {
        let table = record.table();
        let start = std::time::Instant::now();
        let result = self.inner.insert(record).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(
                table = %table,
                duration_ms = %duration.as_millis(),
                "Record inserted"
            ),
            Err(e) => tracing::error!(
                table = %table,
                duration_ms = %duration.as_millis(),
                error = %e,
                "Record insert failed"
            ),
        }
        result
    }

    async fn select(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        let start = std::time::Instant::now();
        let result = self.inner.select(query).await;
        let duration = start.elapsed();

        match &result {
            Ok(records) => tracing::debug!(
                table = %query.table,
                duration_ms = %duration.as_millis(),
                count = records.len(),
                "Records selected"
            ),
            Err(e) => tracing::error!(
                table = %query.table,
                duration_ms = %duration.as_millis(),
                error = %e,
                "Record select failed"
            ),
        }
        result
    }
}
