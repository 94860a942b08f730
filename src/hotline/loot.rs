//! Loot locator: search the item catalog by name

use super::{pivot_target, HotlineContext, Step, FAREWELL};
use crate::intent;
use crate::memory::{Memory, Scratch, Topic};
use crate::records::{Item, Query, Record};
use crate::turn::Turn;

/// Most results read back in one turn
const MAX_RESULTS: usize = 5;

const GREETING: &str = "Loot locator. What are you looking for?";
const REPROMPT: &str = "Tell me the name of the item you're after.";
const SEARCH_AGAIN: &str = "Sure. What else are you looking for?";
const STORE_DOWN: &str =
    "Sorry, raider, the loot database isn't answering right now. Try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LootState {
    Greeting,
    Search,
    Retry,
    Complete,
}

impl LootState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("search") => LootState::Search,
            Some("retry") => LootState::Retry,
            Some("complete") => LootState::Complete,
            _ => LootState::Greeting,
        }
    }
}

pub async fn handle(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match LootState::parse(memory.state_name()) {
        LootState::Greeting => Step::ask(GREETING, memory.with_state("search")),
        LootState::Search => search(turn, memory, ctx).await,
        LootState::Retry => {
            let input = intent::normalize(&turn.input);
            if let Some(topic) = pivot_target(&input, Topic::Loot) {
                return Step::switch(topic, memory);
            }
            search(turn, memory, ctx).await
        }
        LootState::Complete => {
            let input = intent::normalize(&turn.input);
            if let Some(topic) = pivot_target(&input, Topic::Loot) {
                return Step::switch(topic, memory);
            }
            if input.is_empty() {
                return Step::ask(
                    "Want to search for something else? Say an item name, or menu.",
                    memory,
                );
            }
            if intent::declines(&input) {
                return Step::finish(FAREWELL, memory);
            }
            if intent::wants_more(&input) || intent::detect_topic_switch(&input) == Some(Topic::Loot)
            {
                return Step::ask(SEARCH_AGAIN, memory.with_state("search"));
            }
            // Anything else is taken as the next search term
            search(turn, memory, ctx).await
        }
    }
}

async fn search(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    let term = turn.input.trim();
    if term.is_empty() {
        return Step::ask(REPROMPT, memory.with_state("search"));
    }

    let items = match ctx.records.select(&Query::items_named(term, MAX_RESULTS)).await {
        Ok(records) => records
            .into_iter()
            .filter_map(|record| match record {
                Record::Item(item) => Some(item),
                Record::Intel(_) => None,
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            tracing::error!(session_id = %turn.session_id, error = %e, "Loot search failed");
            return Step::finish(STORE_DOWN, memory.with_state("complete"));
        }
    };

    if items.is_empty() {
        let misses = match &memory.scratch {
            Scratch::Loot { misses, .. } => misses + 1,
            _ => 1,
        };
        tracing::debug!(session_id = %turn.session_id, misses, "Loot search found nothing");
        return Step::ask(
            format!("I couldn't find anything called {term}. Try another name."),
            memory.with_state("retry").with_scratch(Scratch::Loot {
                term: term.to_string(),
                misses,
            }),
        );
    }

    Step::ask(
        format!(
            "Here's what I found for {term}. {} Want to search for something else?",
            read_back(&items)
        ),
        memory.with_state("complete").with_scratch(Scratch::Loot {
            term: term.to_string(),
            misses: 0,
        }),
    )
}

fn read_back(items: &[Item]) -> String {
    items
        .iter()
        .take(MAX_RESULTS)
        .map(|item| format!("{} at {}.", item.name, item.location))
        .collect::<Vec<_>>()
        .join(" ")
}
