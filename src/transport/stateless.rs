//! Stateless adapter: memory arrives with the request and leaves with the
//! response; nothing is kept server-side.

use super::guarded;
use crate::memory::Memory;
use crate::router::ConversationRouter;
use crate::turn::{InputKind, Response, Turn};
use serde::Deserialize;

/// One provider turn, as posted to the stateless endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub input_kind: Option<String>,
    /// Serialized memory from the previous response; may be empty or junk
    #[serde(default)]
    pub memory: Option<String>,
    /// Provider hint, not used for routing
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub caller: Option<String>,
}

pub async fn handle_turn(router: &ConversationRouter, request: TurnRequest) -> Response {
    let session_id = match request.conversation_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            tracing::warn!(session_id = %id, "Turn without conversation id; assigned one");
            id
        }
    };
    let kind = request
        .input_kind
        .as_deref()
        .map_or(InputKind::Speech, InputKind::parse);

    // A new call never inherits state from a previous one
    let memory = if kind == InputKind::SessionStart {
        Memory::default()
    } else {
        Memory::from_json_lossy(request.memory.as_deref())
    };
    if let Some(task) = &request.current_task {
        tracing::debug!(session_id = %session_id, task = %task, "Ignoring provider task hint");
    }

    let turn = Turn::new(session_id, kind, request.input.unwrap_or_default())
        .with_caller(request.caller.filter(|c| !c.trim().is_empty()));
    let fallback = memory.clone();
    guarded(&turn.session_id, router.route(&turn, memory), fallback).await
}
