//! Property-based tests for the router
//!
//! These tests check the universal interrupts and the memory round trip
//! across arbitrary conversation positions.

use super::*;
use crate::hotline::FAREWELL;
use crate::intent::menu_digit;
use crate::memory::{Scratch, Topic};
use crate::testing::{test_now, MockRecordStore};
use chrono::TimeZone;
use proptest::prelude::*;
use serde_json::{Map, Value};

// ============================================================================
// Test Helpers
// ============================================================================

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn route(input: &str, memory: Memory) -> (Response, Arc<MockRecordStore>) {
    let store = Arc::new(MockRecordStore::new());
    let router = ConversationRouter::new(store.clone(), FixedOffset::east_opt(0).unwrap());
    let response = block_on(router.route_at(&Turn::speech("prop-call", input), memory, test_now()));
    (response, store)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Topics whose replies are deterministic against an empty store
fn arb_deterministic_topic() -> impl Strategy<Value = Topic> {
    prop_oneof![
        Just(Topic::Menu),
        Just(Topic::Extraction),
        Just(Topic::Loot),
        Just(Topic::Gossip),
        Just(Topic::IntelSubmit),
        Just(Topic::IntelListen),
        Just(Topic::Alarm),
    ]
}

fn arb_topic() -> impl Strategy<Value = Topic> {
    prop_oneof![arb_deterministic_topic(), Just(Topic::Novelty)]
}

fn arb_state() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        prop_oneof![
            Just("greeting"),
            Just("menu"),
            Just("location"),
            Just("search"),
            Just("retry"),
            Just("reading"),
            Just("capture"),
            Just("time"),
            Just("message"),
            Just("continue"),
            Just("complete"),
        ]
        .prop_map(|s| Some(s.to_string())),
    ]
}

fn arb_scratch() -> impl Strategy<Value = Scratch> {
    prop_oneof![
        Just(Scratch::Empty),
        "[a-z ]{1,20}".prop_map(|location| Scratch::Extraction { location }),
        ("[a-z]{1,10}", 0u32..5).prop_map(|(term, misses)| Scratch::Loot { term, misses }),
        (1u32..20).prop_map(|lines_played| Scratch::Novelty { lines_played }),
        "[a-z ]{1,20}".prop_map(|time_text| Scratch::Alarm { time_text }),
    ]
}

fn arb_extra() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("provider_[a-z]{1,6}", "[a-z0-9]{0,8}", 0..3).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    })
}

fn arb_memory_with(topic: impl Strategy<Value = Topic>) -> impl Strategy<Value = Memory> {
    (
        topic,
        arb_state(),
        proptest::option::of("[A-Z][a-z ]{0,30}"),
        proptest::option::of(0i64..2_000_000_000),
        arb_scratch(),
        arb_extra(),
    )
        .prop_map(|(topic, state, last_spoken, activity, scratch, extra)| Memory {
            topic: Some(topic),
            state,
            last_spoken,
            last_activity: activity.and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            scratch,
            extra,
        })
}

fn arb_end_call_phrase() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("goodbye"),
        Just("bye"),
        Just("bye bye"),
        Just("see ya"),
        Just("see you"),
        Just("hang up"),
        Just("later"),
    ]
}

fn arb_repeat_phrase() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("repeat that"),
        Just("say again"),
        Just("say that again"),
        Just("pardon"),
        Just("come again"),
        Just("i didn't catch that"),
        Just("what was that"),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Hang-up ends the call from any position without touching state
    #[test]
    fn prop_end_call_stops_listening(
        memory in arb_memory_with(arb_topic()),
        prefix in "(please |ok |alright )?",
        phrase in arb_end_call_phrase()
    ) {
        let (response, store) = route(&format!("{prefix}{phrase}"), memory.clone());
        prop_assert!(!response.listen());
        prop_assert_eq!(response.spoken(), Some(FAREWELL));
        prop_assert_eq!(response.memory(), Some(&memory.with_last_spoken(FAREWELL)));
        prop_assert!(store.inserted().is_empty());
        prop_assert!(store.queries().is_empty());
    }

    // Repeat replays exactly what was last said and changes nothing
    #[test]
    fn prop_repeat_replays_verbatim(
        memory in arb_memory_with(arb_topic()),
        last in "[A-Z][a-z ]{0,30}",
        phrase in arb_repeat_phrase()
    ) {
        let memory = memory.with_last_spoken(last.clone());
        let (response, store) = route(phrase, memory.clone());
        prop_assert!(!response.listen());
        prop_assert_eq!(response.spoken(), Some(last.as_str()));
        prop_assert_eq!(response.memory(), Some(&memory));
        prop_assert!(store.queries().is_empty());
    }

    // Digits 1-5 at the menu select a hotline and clear its state
    #[test]
    fn prop_menu_digit_selects(digit in 1u8..=5) {
        let memory = Memory::default().switch_to(Topic::Menu).with_state("menu");
        let (response, _) = route(&digit.to_string(), memory);
        let next = response.memory().unwrap();
        prop_assert!(response.listen());
        prop_assert_eq!(next.topic, menu_digit(digit));
        prop_assert!(next.state.is_none());
    }

    // Anything else at the menu re-prompts in place
    #[test]
    fn prop_menu_other_digits_reprompt(digit in prop_oneof![Just(0u8), 6u8..=9]) {
        let memory = Memory::default().with_state("menu");
        let (response, _) = route(&digit.to_string(), memory);
        let next = response.memory().unwrap();
        prop_assert!(response.listen());
        prop_assert_eq!(next.topic, None);
        prop_assert_eq!(next.state.as_deref(), Some("menu"));
    }

    // Encoding and decoding memory never changes how a turn is routed, and
    // routing never drops provider fields or the activity stamp
    #[test]
    fn prop_round_trip_routes_identically(memory in arb_memory_with(arb_deterministic_topic())) {
        let decoded = Memory::from_json_str(&memory.to_json_string()).unwrap();
        prop_assert_eq!(&decoded, &memory);

        let (original, _) = route("", memory.clone());
        let (round_tripped, _) = route("", decoded);
        prop_assert_eq!(&original, &round_tripped);

        let next = round_tripped.memory().unwrap();
        prop_assert_eq!(&next.extra, &memory.extra);
        prop_assert_eq!(next.last_activity, memory.last_activity);
    }

    // A search with no hits always lands in retry, however often it repeats.
    // Vowel-free terms never collide with a keyword.
    #[test]
    fn prop_loot_miss_stays_in_retry(term in "[bcdfghjkmnpqrstvwxz]{3,10}", attempts in 1usize..5) {
        let mut memory = Memory::default().switch_to(Topic::Loot).with_state("search");
        for _ in 0..attempts {
            let (response, _) = route(&term, memory);
            prop_assert!(response.listen());
            memory = response.into_memory().unwrap();
            prop_assert_eq!(memory.state.as_deref(), Some("retry"));
        }
    }
}
