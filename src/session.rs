//! Live session registry for streaming calls
//!
//! Holds one [`Memory`] per open connection, keyed by the provider's call id.
//! Entries leave the store on explicit close or when the idle sweep finds
//! them stale; either way their transcript is handed to the record store as
//! a call log.

use crate::memory::Memory;
use crate::records::{CallLog, NewRecord, RecordStore, Speaker, TranscriptLine};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session store at capacity ({0} live sessions)")]
    AtCapacity(usize),
    #[error("Unknown session: {0}")]
    NotFound(String),
    #[error("Session already live: {0}")]
    AlreadyLive(String),
}

/// Why a session left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Hotline finished speaking and stopped listening
    Completed,
    /// Connection dropped or the provider closed it
    Disconnected,
    IdleTimeout,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::Disconnected => "disconnected",
            EndReason::IdleTimeout => "idle-timeout",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub memory: Memory,
    pub conversation_id: String,
    pub caller: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub transcript: Vec<TranscriptLine>,
}

impl SessionEntry {
    fn last_activity(&self) -> DateTime<Utc> {
        self.memory.last_activity.unwrap_or(self.opened_at)
    }

    pub fn into_call_log(self, call_id: &str, ended_at: DateTime<Utc>, reason: EndReason) -> CallLog {
        CallLog {
            call_id: call_id.to_string(),
            conversation_id: self.conversation_id,
            caller: self.caller,
            started_at: self.opened_at,
            ended_at,
            end_reason: reason.as_str().to_string(),
            transcript: self.transcript,
        }
    }
}

/// Registry of live streaming sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            idle_timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn has_room(&self) -> bool {
        self.len().await < self.max_sessions
    }

    /// Start a session with empty memory. A call id that is already live is
    /// refused; the connection holding it must `remove` it first.
    pub async fn open(
        &self,
        call_id: &str,
        conversation_id: &str,
        caller: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(call_id) {
            return Err(SessionError::AlreadyLive(call_id.to_string()));
        }
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::AtCapacity(sessions.len()));
        }

        sessions.insert(
            call_id.to_string(),
            SessionEntry {
                memory: Memory::default().touched(now),
                conversation_id: conversation_id.to_string(),
                caller,
                opened_at: now,
                transcript: Vec::new(),
            },
        );
        tracing::info!(call_id, live = sessions.len(), "Session opened");
        Ok(())
    }

    pub async fn memory(&self, call_id: &str) -> Result<Memory, SessionError> {
        self.sessions
            .read()
            .await
            .get(call_id)
            .map(|entry| entry.memory.clone())
            .ok_or_else(|| SessionError::NotFound(call_id.to_string()))
    }

    /// Store the memory a turn produced and append the exchange to the
    /// transcript.
    pub async fn commit_turn(
        &self,
        call_id: &str,
        heard: &str,
        spoken: Option<&str>,
        memory: Memory,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(call_id)
            .ok_or_else(|| SessionError::NotFound(call_id.to_string()))?;

        if !heard.trim().is_empty() {
            entry.transcript.push(TranscriptLine {
                speaker: Speaker::Caller,
                text: heard.to_string(),
                at: now,
            });
        }
        if let Some(spoken) = spoken {
            entry.transcript.push(TranscriptLine {
                speaker: Speaker::Hotline,
                text: spoken.to_string(),
                at: now,
            });
        }
        entry.memory = memory.touched(now);
        Ok(())
    }

    pub async fn remove(&self, call_id: &str) -> Option<SessionEntry> {
        let removed = self.sessions.write().await.remove(call_id);
        if removed.is_some() {
            tracing::info!(call_id, "Session closed");
        }
        removed
    }

    /// Remove every session idle longer than the timeout
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<(String, SessionEntry)> {
        let mut sessions = self.sessions.write().await;
        let stale: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| now - entry.last_activity() > self.idle_timeout)
            .map(|(call_id, _)| call_id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|call_id| sessions.remove(&call_id).map(|entry| (call_id, entry)))
            .collect()
    }
}

/// Hand a finished session to the record store. Failures are logged only.
pub async fn archive(
    records: &dyn RecordStore,
    call_id: &str,
    entry: SessionEntry,
    ended_at: DateTime<Utc>,
    reason: EndReason,
) {
    let log = entry.into_call_log(call_id, ended_at, reason);
    if let Err(e) = records.insert(NewRecord::CallLog(log)).await {
        tracing::error!(call_id, error = %e, "Failed to archive call log");
    }
}

/// Periodically evict idle sessions until `cancel` fires
pub fn spawn_sweeper(
    sessions: Arc<SessionStore>,
    records: Arc<dyn RecordStore>,
    every: std::time::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let evicted = sessions.sweep(now).await;
                    if !evicted.is_empty() {
                        tracing::info!(count = evicted.len(), "Evicted idle sessions");
                    }
                    for (call_id, entry) in evicted {
                        archive(records.as_ref(), &call_id, entry, now, EndReason::IdleTimeout).await;
                    }
                }
            }
        }
        tracing::info!("Session sweeper stopped");
    })
}
