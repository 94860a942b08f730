//! Per-call conversation memory
//!
//! A `Memory` is the whole state of one caller's conversation. It travels
//! round-trip inside every stateless request and lives in the session store
//! for streamed calls. Each turn consumes one `Memory` and yields a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Topic
// ============================================================================

/// Which hotline owns a memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Menu,
    Extraction,
    Loot,
    Novelty,
    Gossip,
    IntelSubmit,
    IntelListen,
    Alarm,
    /// A topic name this build does not know; routed to the menu
    #[serde(other)]
    Unknown,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Menu => "menu",
            Topic::Extraction => "extraction",
            Topic::Loot => "loot",
            Topic::Novelty => "novelty",
            Topic::Gossip => "gossip",
            Topic::IntelSubmit => "intel-submit",
            Topic::IntelListen => "intel-listen",
            Topic::Alarm => "alarm",
            Topic::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Scratch - machine-specific working data
// ============================================================================

/// Working data owned by the current hotline.
///
/// Only the machine named by `Memory::topic` reads its own variant; any other
/// variant is treated as "nothing captured yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Scratch {
    #[default]
    Empty,
    Extraction {
        location: String,
    },
    Loot {
        term: String,
        #[serde(default)]
        misses: u32,
    },
    Novelty {
        #[serde(default)]
        lines_played: u32,
    },
    Intel {
        submission: String,
    },
    Alarm {
        time_text: String,
    },
}

// ============================================================================
// Memory envelope
// ============================================================================

/// Conversation state for a single call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
    /// State name inside the owning machine; unset means its initial state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_spoken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_empty_scratch")]
    pub scratch: Scratch,
    /// Fields written by the telephony provider that we carry untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if signature
fn is_empty_scratch(scratch: &Scratch) -> bool {
    matches!(scratch, Scratch::Empty)
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Memory is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Memory {
    /// Topic that should handle the next turn. Unknown topics go to the menu.
    pub fn effective_topic(&self) -> Topic {
        match self.topic {
            None | Some(Topic::Unknown) => Topic::Menu,
            Some(topic) => topic,
        }
    }

    pub fn state_name(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Same memory with a new state name
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    #[must_use]
    pub fn with_scratch(mut self, scratch: Scratch) -> Self {
        self.scratch = scratch;
        self
    }

    /// Hand the memory to another hotline, starting at its initial state.
    #[must_use]
    pub fn switch_to(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self.state = None;
        self.scratch = Scratch::Empty;
        self
    }

    #[must_use]
    pub fn with_last_spoken(mut self, text: impl Into<String>) -> Self {
        self.last_spoken = Some(text.into());
        self
    }

    #[must_use]
    pub fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.last_activity = Some(now);
        self
    }

    #[cfg(test)]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    #[cfg(test)]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json_str(text: &str) -> Result<Self, MemoryError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse caller-carried memory, substituting an empty memory when the
    /// text is missing or unreadable.
    pub fn from_json_lossy(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::default();
        };
        match Self::from_json_str(text) {
            Ok(memory) => memory,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable memory");
                Self::default()
            }
        }
    }
}
