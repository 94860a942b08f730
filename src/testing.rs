//! Mock implementations for testing
//!
//! These mocks let hotline machines and the router run without a database.

use crate::hotline::HotlineContext;
use crate::records::{IntelEntry, NewRecord, Query, Record, RecordStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock Record Store
// ============================================================================

/// Record store that returns queued results and remembers every call
#[derive(Default)]
pub struct MockRecordStore {
    results: Mutex<VecDeque<Result<Vec<Record>, StoreError>>>,
    fail_all: bool,
    inserted: Mutex<Vec<NewRecord>>,
    queries: Mutex<Vec<Query>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails unless a result was queued
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Queue the result of the next `select`
    pub fn queue_select(&self, result: Result<Vec<Record>, StoreError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn inserted(&self) -> Vec<NewRecord> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    fn failure() -> StoreError {
        StoreError::Backend("mock store offline".to_string())
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<(), StoreError> {
        if self.fail_all {
            return Err(Self::failure());
        }
        self.inserted.lock().unwrap().push(record);
        Ok(())
    }

    async fn select(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        self.queries.lock().unwrap().push(query.clone());
        match self.results.lock().unwrap().pop_front() {
            Some(result) => result,
            None if self.fail_all => Err(Self::failure()),
            None => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Fixed clock used by every machine test: 2025-03-14 10:00 UTC
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()
}

pub fn test_context(store: &MockRecordStore) -> HotlineContext<'_> {
    HotlineContext {
        records: store,
        now: test_now(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

/// A verified intel record
pub fn intel(text: &str) -> Record {
    Record::Intel(IntelEntry {
        text: text.to_string(),
        verified: true,
        created_at: test_now(),
    })
}
