//! Conversation router
//!
//! Resolves the universal interrupts (hang-up, repeat) and then hands the
//! turn to the hotline that owns the memory. Machines may ask to be invoked
//! again with empty input; this loop runs those continuations, up to a fixed
//! depth per turn.
//!
//! The router does no I/O of its own and never catches machine failures;
//! that is the transport's job.

#[cfg(test)]
mod proptests;

use crate::hotline::{self, HotlineContext, Step, FAREWELL};
use crate::intent;
use crate::memory::{Memory, Topic};
use crate::records::RecordStore;
use crate::turn::{Response, Turn};
use chrono::{DateTime, FixedOffset, Utc};
use std::future::Future;
use std::sync::Arc;

/// Continuations allowed after the first dispatch of a turn
pub const MAX_CONTINUATIONS: usize = 4;

#[derive(Clone)]
pub struct ConversationRouter {
    records: Arc<dyn RecordStore>,
    utc_offset: FixedOffset,
}

impl ConversationRouter {
    pub fn new(records: Arc<dyn RecordStore>, utc_offset: FixedOffset) -> Self {
        Self {
            records,
            utc_offset,
        }
    }

    pub async fn route(&self, turn: &Turn, memory: Memory) -> Response {
        self.route_at(turn, memory, Utc::now()).await
    }

    /// Route with an explicit clock
    pub async fn route_at(&self, turn: &Turn, memory: Memory, now: DateTime<Utc>) -> Response {
        let input = intent::normalize(&turn.input);
        tracing::debug!(session_id = %turn.session_id, kind = ?turn.kind, input = %input, "Routing turn");

        if intent::is_end_call(&input) {
            tracing::info!(
                session_id = %turn.session_id,
                topic = %memory.effective_topic(),
                "Caller ended the call"
            );
            let memory = memory.with_last_spoken(FAREWELL);
            return Response::single(Some(FAREWELL.to_string()), false, memory);
        }

        if intent::is_repeat(&input) {
            if let Some(last) = memory.last_spoken.clone() {
                return Response::single(Some(last), false, memory);
            }
        }

        let ctx = HotlineContext {
            records: self.records.as_ref(),
            now,
            utc_offset: self.utc_offset,
        };
        let ctx = &ctx;
        drive(turn, memory, |topic, current, memory| async move {
            hotline::dispatch(topic, &current, memory, ctx).await
        })
        .await
    }
}

/// Run `step` until it replies, feeding continuations back in with empty
/// input. Gives up after [`MAX_CONTINUATIONS`] continuations.
async fn drive<F, Fut>(turn: &Turn, memory: Memory, mut step: F) -> Response
where
    F: FnMut(Topic, Turn, Memory) -> Fut,
    Fut: Future<Output = Step>,
{
    let mut current = turn.clone();
    let mut memory = memory;

    for depth in 0..=MAX_CONTINUATIONS {
        let topic = memory.effective_topic();
        tracing::debug!(
            session_id = %turn.session_id,
            topic = %topic,
            state = memory.state_name().unwrap_or("initial"),
            depth,
            "Dispatching"
        );
        match step(topic, current, memory).await {
            Step::Reply(reply) => return reply.into_response(),
            Step::Continue(next) => {
                memory = next;
                current = turn.continuation();
            }
        }
    }

    tracing::error!(
        session_id = %turn.session_id,
        topic = %memory.effective_topic(),
        state = memory.state_name().unwrap_or("initial"),
        "Continuation chain too deep"
    );
    Response::technical_difficulty(memory)
}
