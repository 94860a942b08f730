//! Scrappy the chicken: one random line per turn until the caller leaves

use super::{pivot_target, Step, FAREWELL};
use crate::intent;
use crate::memory::{Memory, Scratch, Topic};
use crate::turn::Turn;
use rand::seq::SliceRandom;

const OPENING: &str = "You've reached Scrappy the chicken.";
const PROMPT: &str = "Say more for another, or bye to hang up.";

pub const NOVELTY_LINES: &[&str] = &[
    "Bawk! I found a rusty gear and I'm not sharing it.",
    "Cluck cluck. The ARC drones can't catch what they can't see. I'm very small.",
    "I once pecked a Bastion. It did not notice. I did.",
    "Bawk. Scrap is just treasure that hasn't met me yet.",
    "Speranza? More like Sper-BAWK-za.",
    "Cluck. If you see an egg in the loot pile, that one's mine.",
    "I don't extract. I strut.",
    "Bawk bawk. Have you tried turning the Raider off and on again?",
    "Every rooftop is a good rooftop if you're a chicken.",
    "Cluck. I'm not scared of the surface. The surface is scared of me.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoveltyState {
    /// Opening line not delivered yet
    Playing,
    Continue,
}

impl NoveltyState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("continue") => NoveltyState::Continue,
            _ => NoveltyState::Playing,
        }
    }
}

fn random_line() -> &'static str {
    NOVELTY_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(OPENING)
}

fn played(memory: &Memory) -> u32 {
    match memory.scratch {
        Scratch::Novelty { lines_played } => lines_played,
        _ => 0,
    }
}

pub fn handle(turn: &Turn, memory: Memory) -> Step {
    match NoveltyState::parse(memory.state_name()) {
        NoveltyState::Playing => Step::ask(
            format!("{OPENING} {} {PROMPT}", random_line()),
            memory
                .with_state("continue")
                .with_scratch(Scratch::Novelty { lines_played: 1 }),
        ),
        NoveltyState::Continue => {
            let input = intent::normalize(&turn.input);
            // Some transports deliver input here without the router's
            // end-call check in front of it
            if intent::is_end_call(&input) || intent::declines(&input) {
                return Step::finish(format!("Bawk! {FAREWELL}"), memory);
            }
            if let Some(topic) = pivot_target(&input, Topic::Novelty) {
                return Step::switch(topic, memory);
            }
            let lines_played = played(&memory) + 1;
            Step::ask(
                format!("{} {PROMPT}", random_line()),
                memory.with_scratch(Scratch::Novelty { lines_played }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotline::Reply;

    fn reply(step: Step) -> Reply {
        match step {
            Step::Reply(reply) => reply,
            Step::Continue(_) => panic!("Expected reply"),
        }
    }

    fn contains_pool_line(say: &str) -> bool {
        NOVELTY_LINES.iter().any(|line| say.contains(line))
    }

    #[test]
    fn test_opening_delivered_once() {
        let memory = Memory::default().switch_to(Topic::Novelty);
        let first = reply(handle(&Turn::speech("c1", ""), memory));
        assert!(first.say.starts_with(OPENING));
        assert!(contains_pool_line(&first.say));
        assert_eq!(first.memory.state.as_deref(), Some("continue"));

        let second = reply(handle(&Turn::speech("c1", "more"), first.memory));
        assert!(!second.say.contains(OPENING));
        assert!(contains_pool_line(&second.say));
        assert!(second.listen);
        assert_eq!(second.memory.scratch, Scratch::Novelty { lines_played: 2 });
    }

    #[test]
    fn test_inline_exit_check() {
        let memory = Memory::default()
            .switch_to(Topic::Novelty)
            .with_state("continue");
        let reply = reply(handle(&Turn::speech("c1", "bye"), memory));
        assert!(!reply.listen);
        assert!(reply.say.contains(FAREWELL));
    }

    #[test]
    fn test_pivot_from_continue() {
        let memory = Memory::default()
            .switch_to(Topic::Novelty)
            .with_state("continue");
        let step = handle(&Turn::speech("c1", "any intel"), memory);
        let Step::Continue(next) = step else {
            panic!("Expected continuation");
        };
        assert_eq!(next.topic, Some(Topic::IntelListen));
    }
}
