//! Caller intent classification
//!
//! Every keyword check in the dialogue engine goes through this module: the
//! universal interrupts the router checks before dispatch, the topic-switch
//! detector every hotline re-checks in its continuation states, the menu's
//! digit map, and the small follow-up vocabularies ("more", "menu", "no").
//!
//! All predicates take input already passed through [`normalize`].

use crate::memory::Topic;

/// Words that never end a call when they precede "later"
const LATER_FALSE_POSITIVES: &[&str] = &["get", "until", "till", "til"];

const END_CALL_PHRASES: &[&str] = &["goodbye", "good bye", "see ya", "see you", "hang up"];
const END_CALL_WORDS: &[&str] = &["bye", "byebye"];

/// "what" is deliberately absent: it shows up in ordinary requests.
const REPEAT_PHRASES: &[&str] = &[
    "repeat",
    "say again",
    "say that again",
    "pardon",
    "come again",
    "didn't catch",
    "did not catch",
    "what was that",
];

const EXTRACTION_STEMS: &[&str] = &["extract", "evac", "exfil"];
const LOOT_STEMS: &[&str] = &["loot", "item", "resource", "material"];
/// Common mishearings of "loot"
const LOOT_SOUNDALIKES: &[&str] = &["lute", "lewt", "lood", "lutes"];
const NOVELTY_STEMS: &[&str] = &[
    "scrappy", "scrappie", "scrapie", "scrapy", "skrappy", "chicken", "rooster", "novelty",
];
const INTEL_STEMS: &[&str] = &["intel", "news", "rumor", "rumour", "gossip"];
const SUBMIT_PHRASES: &[&str] = &["share intel", "report intel", "leave a tip", "drop intel"];

const MENU_PHRASES: &[&str] = &["menu", "start over", "go back", "main options"];
const MORE_WORDS: &[&str] = &[
    "more", "another", "again", "continue", "yes", "yeah", "yep", "sure", "next", "ok", "okay",
];
const DECLINE_WORDS: &[&str] = &["no", "nope", "nah", "exit", "done", "quit", "stop", "nothing"];
const LATEST_WORDS: &[&str] = &["latest", "listen", "hear", "news", "read"];
const SUBMIT_WORDS: &[&str] = &["submit", "share", "report", "tip", "add"];
const ALARM_STEMS: &[&str] = &["alarm", "wake"];

const NUMBER_WORDS: &[(&str, u8)] = &[
    ("one", 1),
    ("won", 1),
    ("two", 2),
    ("to", 2),
    ("too", 2),
    ("three", 3),
    ("four", 4),
    ("for", 4),
    ("five", 5),
];

/// Lower-case, trim, strip punctuation (apostrophes kept) and collapse spaces.
pub fn normalize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|w| !w.is_empty())
}

fn has_word(text: &str, candidates: &[&str]) -> bool {
    words(text).any(|w| candidates.contains(&w))
}

fn has_stem(text: &str, stems: &[&str]) -> bool {
    stems.iter().any(|s| text.contains(s))
}

/// Phrase match on word boundaries
fn has_phrase(text: &str, phrases: &[&str]) -> bool {
    let padded = format!(" {text} ");
    phrases.iter().any(|p| padded.contains(&format!(" {p} ")))
}

/// Caller wants to hang up
pub fn is_end_call(input: &str) -> bool {
    if has_phrase(input, END_CALL_PHRASES) || has_word(input, END_CALL_WORDS) {
        return true;
    }
    let tokens: Vec<&str> = words(input).collect();
    tokens.iter().enumerate().any(|(i, w)| {
        *w == "later"
            && !i
                .checked_sub(1)
                .and_then(|prev| tokens.get(prev))
                .is_some_and(|prev| LATER_FALSE_POSITIVES.contains(prev))
    })
}

/// Caller wants the last utterance again
pub fn is_repeat(input: &str) -> bool {
    has_stem(input, REPEAT_PHRASES)
}

fn is_submit_intel(input: &str) -> bool {
    (input.contains("submit") && has_stem(input, INTEL_STEMS)) || has_phrase(input, SUBMIT_PHRASES)
}

/// Hotline the caller is asking for, if any.
///
/// Categories are checked in a fixed order and the first hit wins, so
/// "submit intel" resolves to `IntelSubmit` before the listen check sees
/// the word "intel".
pub fn detect_topic_switch(input: &str) -> Option<Topic> {
    if input.is_empty() {
        return None;
    }
    if has_stem(input, EXTRACTION_STEMS) {
        Some(Topic::Extraction)
    } else if has_stem(input, LOOT_STEMS) || has_word(input, LOOT_SOUNDALIKES) {
        Some(Topic::Loot)
    } else if has_stem(input, NOVELTY_STEMS) {
        Some(Topic::Novelty)
    } else if is_submit_intel(input) {
        Some(Topic::IntelSubmit)
    } else if has_stem(input, INTEL_STEMS) {
        Some(Topic::IntelListen)
    } else {
        None
    }
}

/// Topic behind a top-level menu digit
pub fn menu_digit(digit: u8) -> Option<Topic> {
    match digit {
        1 => Some(Topic::Extraction),
        2 => Some(Topic::Loot),
        3 => Some(Topic::Novelty),
        4 => Some(Topic::Gossip),
        5 => Some(Topic::Alarm),
        _ => None,
    }
}

fn single_digit(input: &str) -> Option<u8> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10).and_then(|d| u8::try_from(d).ok()),
        _ => NUMBER_WORDS
            .iter()
            .find(|(word, _)| *word == input)
            .map(|(_, n)| *n),
    }
}

/// Menu selection: a lone digit (or spoken number) or a topic keyword.
pub fn menu_choice(input: &str) -> Option<Topic> {
    if let Some(digit) = single_digit(input) {
        return menu_digit(digit);
    }
    detect_topic_switch(input).or_else(|| has_stem(input, ALARM_STEMS).then_some(Topic::Alarm))
}

pub fn wants_menu(input: &str) -> bool {
    has_phrase(input, MENU_PHRASES)
}

pub fn wants_more(input: &str) -> bool {
    has_word(input, MORE_WORDS) || has_phrase(input, &["keep going", "go on"])
}

pub fn declines(input: &str) -> bool {
    has_word(input, DECLINE_WORDS) || has_phrase(input, &["that's all", "that's it", "all done"])
}

pub fn wants_latest(input: &str) -> bool {
    has_word(input, LATEST_WORDS)
}

pub fn wants_submit(input: &str) -> bool {
    has_word(input, SUBMIT_WORDS)
}
