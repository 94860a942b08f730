//! Rumor mill: hear the latest verified intel or leave some of your own

use super::intel::{self, DROP_DOWN, FEED_DOWN, NOTHING_VERIFIED};
use super::{pivot_target, HotlineContext, Step, FAREWELL};
use crate::intent;
use crate::memory::{Memory, Scratch, Topic};
use crate::turn::Turn;

const GREETING: &str = "Welcome to the rumor mill. \
Say latest to hear what raiders are saying, or submit to share your own intel.";
const OPTIONS: &str = "Say latest to hear intel, submit to share some, or menu to go back.";
const AFTER_READING: &str =
    "Say more to keep listening, submit to share intel, or exit to hang up.";
const CAPTURE_PROMPT: &str = "Go ahead, what have you heard?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GossipState {
    Greeting,
    Menu,
    Reading,
    Capture,
    Complete,
}

impl GossipState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("menu") => GossipState::Menu,
            Some("reading") => GossipState::Reading,
            Some("capture") => GossipState::Capture,
            Some("complete") => GossipState::Complete,
            _ => GossipState::Greeting,
        }
    }
}

pub async fn handle(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match GossipState::parse(memory.state_name()) {
        GossipState::Greeting => Step::ask(GREETING, memory.with_state("menu")),
        GossipState::Menu => choose(turn, memory, false),
        GossipState::Reading => read(memory, ctx).await,
        GossipState::Capture => capture(turn, memory, ctx).await,
        GossipState::Complete => choose(turn, memory, true),
    }
}

/// Shared by the menu and complete states; only `complete` lets the caller
/// leave by declining.
fn choose(turn: &Turn, memory: Memory, finished_once: bool) -> Step {
    let input = intent::normalize(&turn.input);

    // The rumor mill covers both intel directions itself
    match pivot_target(&input, Topic::Gossip) {
        Some(Topic::IntelListen) => return Step::goto("reading", memory),
        Some(Topic::IntelSubmit) => return Step::ask(CAPTURE_PROMPT, memory.with_state("capture")),
        Some(topic) => return Step::switch(topic, memory),
        None => {}
    }

    if intent::wants_submit(&input) {
        Step::ask(CAPTURE_PROMPT, memory.with_state("capture"))
    } else if intent::wants_latest(&input) || intent::wants_more(&input) {
        Step::goto("reading", memory)
    } else if finished_once && intent::declines(&input) {
        Step::finish(FAREWELL, memory)
    } else {
        Step::ask(OPTIONS, memory)
    }
}

async fn read(memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match intel::latest_briefing(ctx).await {
        Ok(Some(briefing)) => {
            Step::ask(format!("{briefing} {AFTER_READING}"), memory.with_state("complete"))
        }
        Ok(None) => Step::ask(
            format!("{NOTHING_VERIFIED} Say submit to share some, or menu to go back."),
            memory.with_state("complete"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Gossip reading failed");
            Step::finish(FEED_DOWN, memory.with_state("complete"))
        }
    }
}

async fn capture(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    let text = turn.input.trim();
    if text.is_empty() {
        return Step::ask(CAPTURE_PROMPT, memory);
    }
    match intel::submit(ctx, turn, text).await {
        Ok(()) => Step::ask(
            format!("Got it. Your intel is in for review. {OPTIONS}"),
            memory.with_state("complete").with_scratch(Scratch::Intel {
                submission: text.to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!(session_id = %turn.session_id, error = %e, "Gossip submission failed");
            Step::finish(DROP_DOWN, memory.with_state("complete"))
        }
    }
}
