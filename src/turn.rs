//! Turns in and responses out

use crate::memory::Memory;
use serde::{Deserialize, Serialize};

/// Spoken when something unexpected breaks mid-turn
pub const TECHNICAL_DIFFICULTY: &str =
    "Sorry raider, the hotline is having technical difficulties. Please call back later.";

/// How the caller produced this turn's input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    #[default]
    Speech,
    Digits,
    SessionStart,
}

impl InputKind {
    /// Lenient parse for provider-supplied tags
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "digits" | "dtmf" => InputKind::Digits,
            "session-start" | "start" => InputKind::SessionStart,
            _ => InputKind::Speech,
        }
    }
}

/// One caller-input exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Raw input text; empty means "advance without new speech"
    pub input: String,
    pub kind: InputKind,
    pub session_id: String,
    /// Caller's phone number when the provider shares it
    pub caller: Option<String>,
}

impl Turn {
    pub fn new(session_id: impl Into<String>, kind: InputKind, input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            kind,
            session_id: session_id.into(),
            caller: None,
        }
    }

    pub fn speech(session_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self::new(session_id, InputKind::Speech, input)
    }

    pub fn session_start(session_id: impl Into<String>) -> Self {
        Self::new(session_id, InputKind::SessionStart, "")
    }

    #[must_use]
    pub fn with_caller(mut self, caller: Option<String>) -> Self {
        self.caller = caller;
        self
    }

    /// Same session, no new speech
    #[must_use]
    pub fn continuation(&self) -> Self {
        Self {
            input: String::new(),
            kind: InputKind::Speech,
            session_id: self.session_id.clone(),
            caller: self.caller.clone(),
        }
    }
}

/// Transfer directive; carried through untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: String,
}

/// Single action returned to the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub say: Option<String>,
    pub listen: bool,
    pub remember: Memory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
}

/// Ordered actions for one turn (one in practice)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub actions: Vec<Action>,
}

impl Response {
    pub fn single(say: Option<String>, listen: bool, memory: Memory) -> Self {
        Self {
            actions: vec![Action {
                say,
                listen,
                remember: memory,
                transfer: None,
            }],
        }
    }

    /// Fixed reply for failures caught at the transport boundary
    pub fn technical_difficulty(memory: Memory) -> Self {
        Self::single(Some(TECHNICAL_DIFFICULTY.to_string()), false, memory)
    }

    pub fn primary(&self) -> Option<&Action> {
        self.actions.first()
    }

    pub fn spoken(&self) -> Option<&str> {
        self.primary().and_then(|a| a.say.as_deref())
    }

    pub fn listen(&self) -> bool {
        self.primary().is_some_and(|a| a.listen)
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.primary().map(|a| &a.remember)
    }

    pub fn into_memory(self) -> Option<Memory> {
        self.actions.into_iter().next().map(|a| a.remember)
    }
}
