//! Top-level menu: greet, then route the caller to a hotline

use super::Step;
use crate::intent;
use crate::memory::{Memory, Topic};
use crate::turn::Turn;

pub const GREETING: &str = "Welcome to the Raider Hotline. \
Say extraction or press 1 to call in an extraction. \
Say loot or press 2 to find loot. \
Say Scrappy or press 3 to hear from Scrappy the chicken. \
Say intel or press 4 for the latest gossip. \
Say alarm or press 5 to set a wake-up call.";

pub const REMINDER: &str = "Sorry, I didn't catch that. \
Say extraction, loot, Scrappy, intel, or alarm. Or press 1 through 5.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuState {
    Greeting,
    Menu,
}

impl MenuState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("menu") => MenuState::Menu,
            _ => MenuState::Greeting,
        }
    }
}

/// Short confirmation spoken when the caller picks a hotline
pub fn confirmation(topic: Topic) -> &'static str {
    match topic {
        Topic::Extraction => "Connecting you to the extraction desk.",
        Topic::Loot => "Connecting you to the loot locator.",
        Topic::Novelty => "Connecting you to Scrappy the chicken.",
        Topic::Gossip => "Connecting you to the rumor mill.",
        Topic::IntelSubmit => "Connecting you to the intel drop.",
        Topic::IntelListen => "Connecting you to the intel feed.",
        Topic::Alarm => "Connecting you to the wake-up service.",
        Topic::Menu | Topic::Unknown => REMINDER,
    }
}

pub fn handle(turn: &Turn, memory: Memory) -> Step {
    match MenuState::parse(memory.state_name()) {
        MenuState::Greeting => Step::ask(GREETING, memory.with_state("menu")),
        MenuState::Menu => {
            let input = intent::normalize(&turn.input);
            match intent::menu_choice(&input) {
                Some(topic) => {
                    tracing::debug!(session_id = %turn.session_id, topic = %topic, "Menu selection");
                    Step::ask(confirmation(topic), memory.switch_to(topic))
                }
                None => Step::ask(REMINDER, memory.with_state("menu")),
            }
        }
    }
}
