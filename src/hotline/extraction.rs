//! Extraction desk: take the caller's location and dispatch a team

use super::{pivot_target, HotlineContext, Step};
use crate::intent;
use crate::memory::{Memory, Scratch, Topic};
use crate::records::{LocationRequest, NewRecord};
use crate::turn::Turn;

const GREETING: &str = "Extraction desk. Tell me your location, raider.";
const REPROMPT: &str = "I need your location to send a team. Where are you?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionState {
    Greeting,
    Location,
    Complete,
}

impl ExtractionState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("location") => ExtractionState::Location,
            Some("complete") => ExtractionState::Complete,
            _ => ExtractionState::Greeting,
        }
    }
}

pub async fn handle(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match ExtractionState::parse(memory.state_name()) {
        ExtractionState::Greeting => Step::ask(GREETING, memory.with_state("location")),
        ExtractionState::Location => capture_location(turn, memory, ctx).await,
        ExtractionState::Complete => {
            let input = intent::normalize(&turn.input);
            if let Some(topic) = pivot_target(&input, Topic::Extraction) {
                return Step::switch(topic, memory);
            }
            if intent::wants_more(&input) {
                return Step::goto("greeting", memory);
            }
            let say = match &memory.scratch {
                Scratch::Extraction { location } => format!(
                    "Your extraction to {location} is already on the way. \
                     Say menu for other services, or goodbye to hang up."
                ),
                _ => "Your extraction is already on the way. \
                      Say menu for other services, or goodbye to hang up."
                    .to_string(),
            };
            Step::ask(say, memory)
        }
    }
}

async fn capture_location(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    let location = turn.input.trim();
    if location.is_empty() {
        return Step::ask(REPROMPT, memory);
    }

    let request = LocationRequest {
        call_id: turn.session_id.clone(),
        caller: turn.caller.clone(),
        location: location.to_string(),
        requested_at: ctx.now,
    };
    // The team is dispatched either way; a lost record only hurts reporting
    if let Err(e) = ctx.records.insert(NewRecord::LocationRequest(request)).await {
        tracing::error!(
            session_id = %turn.session_id,
            error = %e,
            "Failed to record extraction request"
        );
    }

    Step::finish(
        format!("Copy that. An extraction team is heading to {location}. Hold tight, raider."),
        memory
            .with_state("complete")
            .with_scratch(Scratch::Extraction {
                location: location.to_string(),
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotline::Reply;
    use crate::testing::{test_context, MockRecordStore};

    fn reply(step: Step) -> Reply {
        match step {
            Step::Reply(reply) => reply,
            Step::Continue(_) => panic!("Expected reply"),
        }
    }

    fn at(state: &str) -> Memory {
        Memory::default().switch_to(Topic::Extraction).with_state(state)
    }

    #[tokio::test]
    async fn test_greeting_asks_for_location() {
        let store = MockRecordStore::new();
        let reply = reply(handle(&Turn::speech("c1", ""), at("greeting"), &test_context(&store)).await);
        assert_eq!(reply.say, GREETING);
        assert_eq!(reply.memory.state.as_deref(), Some("location"));
        assert!(reply.listen);
    }

    #[tokio::test]
    async fn test_location_captured_verbatim() {
        let store = MockRecordStore::new();
        let turn = Turn::speech("c1", "  Near the Blue Gate checkpoint ");
        let reply = reply(handle(&turn, at("location"), &test_context(&store)).await);

        assert!(!reply.listen);
        assert!(reply.say.contains("Near the Blue Gate checkpoint"));
        assert_eq!(reply.memory.state.as_deref(), Some("complete"));

        let inserts = store.inserted();
        assert_eq!(inserts.len(), 1);
        let NewRecord::LocationRequest(request) = &inserts[0] else {
            panic!("Expected location request");
        };
        assert_eq!(request.location, "Near the Blue Gate checkpoint");
        assert_eq!(request.call_id, "c1");
    }

    #[tokio::test]
    async fn test_store_failure_still_confirms() {
        let store = MockRecordStore::new().failing();
        let turn = Turn::speech("c1", "the dam");
        let reply = reply(handle(&turn, at("location"), &test_context(&store)).await);
        assert!(reply.say.contains("the dam"));
        assert!(!reply.listen);
    }

    #[tokio::test]
    async fn test_empty_location_reprompts() {
        let store = MockRecordStore::new();
        let reply = reply(handle(&Turn::speech("c1", "  "), at("location"), &test_context(&store)).await);
        assert_eq!(reply.say, REPROMPT);
        assert_eq!(reply.memory.state.as_deref(), Some("location"));
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_complete_pivots_to_loot() {
        let store = MockRecordStore::new();
        let step = handle(&Turn::speech("c1", "find loot"), at("complete"), &test_context(&store)).await;
        let Step::Continue(next) = step else {
            panic!("Expected continuation");
        };
        assert_eq!(next.topic, Some(Topic::Loot));
        assert!(next.state.is_none());
    }
}
