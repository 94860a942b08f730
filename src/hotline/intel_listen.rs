//! Intel briefing: read back verified intel

use super::intel::{self, FEED_DOWN, NOTHING_VERIFIED};
use super::{pivot_target, HotlineContext, Step, FAREWELL};
use crate::intent;
use crate::memory::{Memory, Topic};
use crate::turn::Turn;

const FOLLOW_UP: &str = "Say more for another briefing, submit to share intel, or menu to go back.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenState {
    Greeting,
    Reading,
    Complete,
}

impl ListenState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("reading") => ListenState::Reading,
            Some("complete") => ListenState::Complete,
            _ => ListenState::Greeting,
        }
    }
}

pub async fn handle(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match ListenState::parse(memory.state_name()) {
        // Nothing to ask first; go straight to the reading
        ListenState::Greeting => Step::goto("reading", memory),
        ListenState::Reading => match intel::latest_briefing(ctx).await {
            Ok(Some(briefing)) => {
                Step::ask(format!("{briefing} {FOLLOW_UP}"), memory.with_state("complete"))
            }
            Ok(None) => Step::ask(
                format!("{NOTHING_VERIFIED} Say submit to share some, or menu to go back."),
                memory.with_state("complete"),
            ),
            Err(e) => {
                tracing::error!(session_id = %turn.session_id, error = %e, "Intel reading failed");
                Step::finish(FEED_DOWN, memory.with_state("complete"))
            }
        },
        ListenState::Complete => {
            let input = intent::normalize(&turn.input);
            if let Some(topic) = pivot_target(&input, Topic::IntelListen) {
                return Step::switch(topic, memory);
            }
            if intent::wants_submit(&input) {
                Step::switch(Topic::IntelSubmit, memory)
            } else if intent::wants_more(&input) || intent::wants_latest(&input) {
                Step::goto("reading", memory)
            } else if intent::declines(&input) {
                Step::finish(FAREWELL, memory)
            } else {
                Step::ask(FOLLOW_UP, memory)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotline::Reply;
    use crate::testing::{intel, test_context, MockRecordStore};

    fn reply(step: Step) -> Reply {
        match step {
            Step::Reply(reply) => reply,
            Step::Continue(_) => panic!("Expected reply"),
        }
    }

    fn at(state: &str) -> Memory {
        Memory::default().switch_to(Topic::IntelListen).with_state(state)
    }

    #[tokio::test]
    async fn test_greeting_continues_to_reading() {
        let store = MockRecordStore::new();
        let step = handle(&Turn::speech("c1", ""), at("greeting"), &test_context(&store)).await;
        assert_eq!(step, Step::Continue(at("reading")));
        assert!(store.queries().is_empty());
    }

    #[tokio::test]
    async fn test_reading_lands_in_complete() {
        let store = MockRecordStore::new();
        store.queue_select(Ok(vec![intel("Harvester spotted at Spaceport")]));
        let reply = reply(handle(&Turn::speech("c1", ""), at("reading"), &test_context(&store)).await);
        assert!(reply.say.contains("Harvester spotted at Spaceport"));
        assert!(reply.listen);
        assert_eq!(reply.memory.state.as_deref(), Some("complete"));
    }

    #[tokio::test]
    async fn test_nothing_verified() {
        let store = MockRecordStore::new();
        store.queue_select(Ok(vec![]));
        let reply = reply(handle(&Turn::speech("c1", ""), at("reading"), &test_context(&store)).await);
        assert!(reply.say.starts_with(NOTHING_VERIFIED));
        assert!(reply.listen);
    }

    #[tokio::test]
    async fn test_complete_jumps_to_submit() {
        let store = MockRecordStore::new();
        let step = handle(&Turn::speech("c1", "submit"), at("complete"), &test_context(&store)).await;
        assert_eq!(step, Step::Continue(at("complete").switch_to(Topic::IntelSubmit)));
    }

    #[tokio::test]
    async fn test_complete_more_rereads() {
        let store = MockRecordStore::new();
        let step = handle(&Turn::speech("c1", "more please"), at("complete"), &test_context(&store)).await;
        assert_eq!(step, Step::Continue(at("reading")));
    }
}
