//! WebSocket adapter for streaming calls

use super::handlers::AppError;
use super::AppState;
use crate::transport::{Outbound, StreamSession};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};

/// Upgrade to a streaming call, or refuse outright when every line is taken
pub(super) async fn voice_stream(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.sessions.has_room().await {
        tracing::warn!(capacity = state.sessions.capacity(), "Refusing stream upgrade at capacity");
        return AppError::Busy.into_response();
    }
    ws.on_upgrade(move |socket| run_stream(socket, state))
}

async fn run_stream(mut socket: WebSocket, state: AppState) {
    let mut session = StreamSession::new(
        state.router.clone(),
        state.sessions.clone(),
        state.records.clone(),
    );
    let end_delay = state.config.end_delay();

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(call_id = ?session.call_id(), error = %e, "Stream read failed");
                break;
            }
        };

        let mut delivered = true;
        for outbound in session.on_message(&text).await {
            if matches!(outbound, Outbound::End {}) {
                // Let the final utterance play before hanging up
                tokio::time::sleep(end_delay).await;
            }
            if !send(&mut socket, &outbound).await {
                delivered = false;
                break;
            }
        }

        if !delivered {
            break;
        }
        if session.is_finished() {
            let _ = socket.send(Message::Close(None)).await;
            break;
        }
    }

    session.close().await;
}

async fn send(socket: &mut WebSocket, outbound: &Outbound) -> bool {
    let payload = match serde_json::to_string(outbound) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode stream message");
            return false;
        }
    };
    match socket.send(Message::Text(payload)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Stream peer went away");
            false
        }
    }
}
