//! Streaming adapter: one [`StreamSession`] per open connection, with memory
//! held in the session store between turns.

use super::guarded;
use crate::records::RecordStore;
use crate::router::ConversationRouter;
use crate::session::{archive, EndReason, SessionError, SessionStore};
use crate::turn::{InputKind, Turn, TECHNICAL_DIFFICULTY};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Spoken when the store refuses a new call
pub const LINES_BUSY: &str = "All hotline operators are busy, raider. Please call back later.";

/// Spoken when a live connection's session was swept for inactivity
pub const CALL_TIMED_OUT: &str =
    "Sorry raider, this call timed out from inactivity. Please call back.";

/// Provider-to-hotline messages
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Inbound {
    SessionStart {
        #[serde(rename = "callId")]
        call_id: String,
        #[serde(rename = "conversationId", default)]
        conversation_id: Option<String>,
        #[serde(default)]
        caller: Option<String>,
    },
    Turn {
        text: String,
    },
    Digits {
        digit: String,
    },
    Interrupt {},
    ProviderError {
        #[serde(default)]
        description: Option<String>,
    },
}

/// Hotline-to-provider messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outbound {
    Speak {
        text: String,
        /// Last utterance of the call; an `end` follows
        #[serde(rename = "isFinal")]
        is_final: bool,
    },
    /// Hang up; sent after the final utterance has had time to play
    End {},
}

/// State of one streaming connection
pub struct StreamSession {
    router: ConversationRouter,
    sessions: Arc<SessionStore>,
    records: Arc<dyn RecordStore>,
    call_id: Option<String>,
    caller: Option<String>,
    finished: bool,
}

impl StreamSession {
    pub fn new(
        router: ConversationRouter,
        sessions: Arc<SessionStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            router,
            sessions,
            records,
            call_id: None,
            caller: None,
            finished: false,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    /// True once the hotline has stopped listening
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Handle one raw text frame and return what to send back, in order
    pub async fn on_message(&mut self, raw: &str) -> Vec<Outbound> {
        match serde_json::from_str::<Inbound>(raw) {
            Ok(message) => self.on_inbound(message).await,
            Err(e) => {
                tracing::warn!(call_id = ?self.call_id, error = %e, "Unreadable stream message");
                Vec::new()
            }
        }
    }

    pub async fn on_inbound(&mut self, message: Inbound) -> Vec<Outbound> {
        if self.finished {
            tracing::debug!(call_id = ?self.call_id, "Ignoring message after call end");
            return Vec::new();
        }

        match message {
            Inbound::SessionStart {
                call_id,
                conversation_id,
                caller,
            } => self.start(call_id, conversation_id, caller).await,
            Inbound::Turn { text } => self.respond(InputKind::Speech, text).await,
            Inbound::Digits { digit } => self.respond(InputKind::Digits, digit).await,
            Inbound::Interrupt {} => {
                // Barge-in only cuts playback, which the provider already did
                tracing::debug!(call_id = ?self.call_id, "Caller interrupted");
                Vec::new()
            }
            Inbound::ProviderError { description } => {
                tracing::warn!(
                    call_id = ?self.call_id,
                    description = description.as_deref().unwrap_or("none"),
                    "Provider reported an error"
                );
                Vec::new()
            }
        }
    }

    async fn start(
        &mut self,
        call_id: String,
        conversation_id: Option<String>,
        caller: Option<String>,
    ) -> Vec<Outbound> {
        if let Some(previous) = self.call_id.clone() {
            if previous == call_id {
                tracing::warn!(call_id = %call_id, "Session restarted; discarding previous memory");
                self.sessions.remove(&call_id).await;
                self.call_id = None;
            } else {
                tracing::warn!(previous = %previous, call_id = %call_id, "Second session-start on one connection");
                self.close().await;
            }
        }

        let conversation_id = conversation_id.unwrap_or_else(|| call_id.clone());
        match self
            .sessions
            .open(&call_id, &conversation_id, caller.clone(), Utc::now())
            .await
        {
            Ok(()) => {}
            Err(SessionError::AtCapacity(live)) => {
                tracing::warn!(call_id = %call_id, live, "Rejecting call at capacity");
                return self.hang_up(LINES_BUSY);
            }
            Err(e) => {
                // Another connection owns this call id; leave its session alone
                tracing::error!(call_id = %call_id, error = %e, "Failed to open session");
                return self.hang_up(TECHNICAL_DIFFICULTY);
            }
        }

        let turn = Turn::session_start(call_id.as_str()).with_caller(caller.clone());
        self.call_id = Some(call_id);
        self.caller = caller;
        self.run(turn).await
    }

    async fn respond(&mut self, kind: InputKind, input: String) -> Vec<Outbound> {
        let Some(call_id) = self.call_id.as_deref() else {
            tracing::warn!(kind = ?kind, "Turn before session-start; ignoring");
            return Vec::new();
        };
        let turn = Turn::new(call_id, kind, input).with_caller(self.caller.clone());
        self.run(turn).await
    }

    async fn run(&mut self, turn: Turn) -> Vec<Outbound> {
        let call_id = turn.session_id.clone();
        let memory = match self.sessions.memory(&call_id).await {
            Ok(memory) => memory,
            Err(e) => {
                // Evicted by the idle sweep while the connection stayed open
                tracing::warn!(call_id = %call_id, error = %e, "Session gone; ending call");
                return self.hang_up(CALL_TIMED_OUT);
            }
        };

        let now = Utc::now();
        let response = guarded(
            &call_id,
            self.router.route_at(&turn, memory.clone(), now),
            memory,
        )
        .await;

        let spoken = response.spoken().map(str::to_string);
        let listen = response.listen();
        let memory = response.into_memory().unwrap_or_default();
        if let Err(e) = self
            .sessions
            .commit_turn(&call_id, &turn.input, spoken.as_deref(), memory, now)
            .await
        {
            tracing::warn!(call_id = %call_id, error = %e, "Could not store turn result");
        }

        let mut out = Vec::new();
        if let Some(text) = spoken {
            out.push(Outbound::Speak {
                text,
                is_final: !listen,
            });
        }
        if !listen {
            self.finished = true;
            out.push(Outbound::End {});
        }
        out
    }

    /// Speak one last line and end the call
    fn hang_up(&mut self, text: &str) -> Vec<Outbound> {
        self.finished = true;
        vec![
            Outbound::Speak {
                text: text.to_string(),
                is_final: true,
            },
            Outbound::End {},
        ]
    }

    /// Release the session and archive its transcript. Safe to call twice.
    pub async fn close(&mut self) {
        let Some(call_id) = self.call_id.take() else {
            return;
        };
        let reason = if self.finished {
            EndReason::Completed
        } else {
            EndReason::Disconnected
        };
        if let Some(entry) = self.sessions.remove(&call_id).await {
            archive(self.records.as_ref(), &call_id, entry, Utc::now(), reason).await;
        }
    }
}
