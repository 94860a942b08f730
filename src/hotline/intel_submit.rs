//! Intel drop: record what the caller has seen for later verification

use super::intel::{self, DROP_DOWN};
use super::{pivot_target, HotlineContext, Step, FAREWELL};
use crate::intent;
use crate::memory::{Memory, Scratch, Topic};
use crate::turn::Turn;

const GREETING: &str = "Intel drop. Tell me what you've seen out there.";
const REPROMPT: &str = "Go ahead, tell me your intel.";
const FOLLOW_UP: &str =
    "Say latest to hear verified intel, another to submit more, or menu to go back.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitState {
    Greeting,
    Capture,
    Complete,
}

impl SubmitState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("capture") => SubmitState::Capture,
            Some("complete") => SubmitState::Complete,
            _ => SubmitState::Greeting,
        }
    }
}

pub async fn handle(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match SubmitState::parse(memory.state_name()) {
        SubmitState::Greeting => Step::ask(GREETING, memory.with_state("capture")),
        SubmitState::Capture => capture(turn, memory, ctx).await,
        SubmitState::Complete => {
            let input = intent::normalize(&turn.input);
            if let Some(topic) = pivot_target(&input, Topic::IntelSubmit) {
                return Step::switch(topic, memory);
            }
            if intent::wants_latest(&input) {
                Step::switch(Topic::IntelListen, memory)
            } else if intent::wants_submit(&input) || intent::wants_more(&input) {
                Step::ask(REPROMPT, memory.with_state("capture"))
            } else if intent::declines(&input) {
                Step::finish(FAREWELL, memory)
            } else {
                Step::ask(FOLLOW_UP, memory)
            }
        }
    }
}

async fn capture(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    let text = turn.input.trim();
    if text.is_empty() {
        return Step::ask(REPROMPT, memory);
    }
    match intel::submit(ctx, turn, text).await {
        Ok(()) => Step::ask(
            format!("Thanks, raider. Your intel is logged for review. {FOLLOW_UP}"),
            memory.with_state("complete").with_scratch(Scratch::Intel {
                submission: text.to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!(session_id = %turn.session_id, error = %e, "Intel submission failed");
            Step::finish(DROP_DOWN, memory.with_state("complete"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotline::Reply;
    use crate::records::NewRecord;
    use crate::testing::{test_context, MockRecordStore};

    fn reply(step: Step) -> Reply {
        match step {
            Step::Reply(reply) => reply,
            Step::Continue(_) => panic!("Expected reply"),
        }
    }

    fn at(state: &str) -> Memory {
        Memory::default().switch_to(Topic::IntelSubmit).with_state(state)
    }

    #[tokio::test]
    async fn test_capture_stores_verbatim() {
        let store = MockRecordStore::new();
        let turn = Turn::speech("c1", " Bastion patrol by the Buried City ")
            .with_caller(Some("+15550100".to_string()));
        let reply = reply(handle(&turn, at("capture"), &test_context(&store)).await);

        assert!(reply.listen);
        assert_eq!(reply.memory.state.as_deref(), Some("complete"));
        assert_eq!(
            reply.memory.scratch,
            Scratch::Intel {
                submission: "Bastion patrol by the Buried City".to_string()
            }
        );

        let inserts = store.inserted();
        let [NewRecord::Intel(submission)] = inserts.as_slice() else {
            panic!("Expected one intel submission");
        };
        assert_eq!(submission.text, "Bastion patrol by the Buried City");
        assert_eq!(submission.caller.as_deref(), Some("+15550100"));
    }

    #[tokio::test]
    async fn test_complete_jumps_to_listen() {
        let store = MockRecordStore::new();
        let step = handle(&Turn::speech("c1", "latest"), at("complete"), &test_context(&store)).await;
        assert_eq!(step, Step::Continue(at("complete").switch_to(Topic::IntelListen)));
    }

    #[tokio::test]
    async fn test_complete_another_submission() {
        let store = MockRecordStore::new();
        let reply = reply(handle(&Turn::speech("c1", "another"), at("complete"), &test_context(&store)).await);
        assert_eq!(reply.say, REPROMPT);
        assert_eq!(reply.memory.state.as_deref(), Some("capture"));
    }

    #[tokio::test]
    async fn test_store_failure_apologizes() {
        let store = MockRecordStore::new().failing();
        let reply = reply(handle(&Turn::speech("c1", "Convoy"), at("capture"), &test_context(&store)).await);
        assert_eq!(reply.say, DROP_DOWN);
        assert!(!reply.listen);
    }
}
