//! Hotline state machines
//!
//! One machine per topic. A machine takes the current turn and the memory it
//! owns and returns a [`Step`]: either a reply for the caller, or a request
//! to be invoked again right away with empty input (used to jump straight to
//! a computed state, or to hand the call to another hotline). The router owns
//! that loop; machines never call each other.

mod alarm;
mod alarm_time;
mod extraction;
mod gossip;
mod intel;
mod intel_listen;
mod intel_submit;
mod loot;
mod menu;
mod novelty;

use crate::intent;
use crate::memory::{Memory, Topic};
use crate::records::RecordStore;
use crate::turn::{Response, Turn};
use chrono::{DateTime, FixedOffset, Utc};

/// Spoken when the caller hangs up or declines further help
pub const FAREWELL: &str = "Stay safe out there, raider. Goodbye.";

/// Everything a machine may touch besides its memory
pub struct HotlineContext<'a> {
    pub records: &'a dyn RecordStore,
    pub now: DateTime<Utc>,
    /// Caller wall-clock offset for spoken times
    pub utc_offset: FixedOffset,
}

/// What the caller hears this turn
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub say: String,
    pub listen: bool,
    pub memory: Memory,
}

impl Reply {
    pub fn into_response(self) -> Response {
        Response::single(Some(self.say), self.listen, self.memory)
    }
}

/// Result of one machine invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Reply(Reply),
    /// Invoke the owner of this memory again now, with empty input
    Continue(Memory),
}

impl Step {
    /// Speak and keep listening
    pub fn ask(say: impl Into<String>, memory: Memory) -> Self {
        Self::speak(say.into(), true, memory)
    }

    /// Speak and stop listening
    pub fn finish(say: impl Into<String>, memory: Memory) -> Self {
        Self::speak(say.into(), false, memory)
    }

    fn speak(say: String, listen: bool, memory: Memory) -> Self {
        let memory = memory.with_last_spoken(say.clone());
        Step::Reply(Reply {
            say,
            listen,
            memory,
        })
    }

    /// Re-enter the current hotline at `state`
    pub fn goto(state: &str, memory: Memory) -> Self {
        Step::Continue(memory.with_state(state))
    }

    /// Hand the call to another hotline, starting at its greeting
    pub fn switch(topic: Topic, memory: Memory) -> Self {
        Step::Continue(memory.switch_to(topic))
    }
}

/// Where a caller in `current` wants to go instead, if anywhere.
///
/// Continuation states call this before their own keyword handling so that a
/// caller can always pivot to another hotline or back to the menu.
pub(crate) fn pivot_target(input: &str, current: Topic) -> Option<Topic> {
    match intent::detect_topic_switch(input) {
        Some(topic) if topic != current => Some(topic),
        Some(_) => None,
        None => intent::wants_menu(input).then_some(Topic::Menu),
    }
}

/// Run the machine that owns `topic`
pub async fn dispatch(
    topic: Topic,
    turn: &Turn,
    memory: Memory,
    ctx: &HotlineContext<'_>,
) -> Step {
    match topic {
        Topic::Menu | Topic::Unknown => menu::handle(turn, memory),
        Topic::Extraction => extraction::handle(turn, memory, ctx).await,
        Topic::Loot => loot::handle(turn, memory, ctx).await,
        Topic::Novelty => novelty::handle(turn, memory),
        Topic::Gossip => gossip::handle(turn, memory, ctx).await,
        Topic::IntelSubmit => intel_submit::handle(turn, memory, ctx).await,
        Topic::IntelListen => intel_listen::handle(turn, memory, ctx).await,
        Topic::Alarm => alarm::handle(turn, memory, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_records_last_spoken() {
        let Step::Reply(reply) = Step::ask("Where are you?", Memory::default()) else {
            panic!("Expected reply");
        };
        assert!(reply.listen);
        assert_eq!(reply.memory.last_spoken.as_deref(), Some("Where are you?"));
    }

    #[test]
    fn test_pivot_ignores_current_topic() {
        assert_eq!(pivot_target("more loot", Topic::Loot), None);
        assert_eq!(pivot_target("extract", Topic::Loot), Some(Topic::Extraction));
        assert_eq!(pivot_target("main menu", Topic::Loot), Some(Topic::Menu));
        assert_eq!(pivot_target("yes", Topic::Loot), None);
    }

    #[test]
    fn test_switch_clears_state() {
        let memory = Memory::default().switch_to(Topic::Loot).with_state("complete");
        let Step::Continue(next) = Step::switch(Topic::Extraction, memory) else {
            panic!("Expected continuation");
        };
        assert_eq!(next.topic, Some(Topic::Extraction));
        assert!(next.state.is_none());
    }
}
