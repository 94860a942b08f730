//! Transport adapters
//!
//! Two ways to drive the router: a stateless request/response exchange where
//! memory travels with every request, and a streaming session where memory
//! stays in the [`SessionStore`](crate::session::SessionStore) between turns.
//! Both are protocol-agnostic; the HTTP and WebSocket plumbing lives in `api`.
//!
//! Anything that escapes the router is caught here and turned into the fixed
//! technical-difficulty reply, so one broken call never takes down another.

mod stateful;
mod stateless;

pub use stateful::{Outbound, StreamSession};
pub use stateless::{handle_turn, TurnRequest};

use crate::memory::Memory;
use crate::turn::Response;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Await a routing future, replacing a panic with the technical-difficulty
/// reply built from `fallback`.
async fn guarded<F>(session_id: &str, routing: F, fallback: Memory) -> Response
where
    F: Future<Output = Response>,
{
    match AssertUnwindSafe(routing).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(
                session_id,
                panic = %panic_message(panic.as_ref()),
                "Turn failed; apologizing to caller"
            );
            Response::technical_difficulty(fallback)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
