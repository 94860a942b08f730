//! Intel reading and submission shared by the gossip and intel hotlines

use super::HotlineContext;
use crate::records::{IntelEntry, IntelSubmission, NewRecord, Query, Record, StoreError};
use crate::turn::Turn;
use rand::seq::SliceRandom;

/// Verified entries fetched per reading
const FETCH_LIMIT: usize = 50;
/// Entries read aloud per reading
const SAMPLE_SIZE: usize = 3;

pub const FEED_DOWN: &str =
    "Sorry, raider, the intel feed is down right now. Try again later.";
pub const DROP_DOWN: &str =
    "Sorry, raider, I couldn't log your intel right now. Try again later.";
pub const NOTHING_VERIFIED: &str = "There's no verified intel right now.";

/// Spoken briefing of up to three random verified entries, or `None` when
/// nothing is verified yet.
pub async fn latest_briefing(ctx: &HotlineContext<'_>) -> Result<Option<String>, StoreError> {
    let records = ctx.records.select(&Query::verified_intel(FETCH_LIMIT)).await?;
    let entries: Vec<IntelEntry> = records
        .into_iter()
        .filter_map(|record| match record {
            Record::Intel(entry) => Some(entry),
            Record::Item(_) => None,
        })
        .collect();

    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(briefing(&sample(&entries))))
}

fn sample(entries: &[IntelEntry]) -> Vec<&IntelEntry> {
    entries
        .choose_multiple(&mut rand::thread_rng(), SAMPLE_SIZE)
        .collect()
}

fn briefing(entries: &[&IntelEntry]) -> String {
    let lead_ins = ["First up:", "Next:", "And finally:"];
    let body = entries
        .iter()
        .zip(lead_ins)
        .map(|(entry, lead_in)| {
            let text = entry.text.trim().trim_end_matches('.');
            format!("{lead_in} {text}.")
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("Here's the latest intel. {body}")
}

/// Store the caller's words as unverified intel
pub async fn submit(ctx: &HotlineContext<'_>, turn: &Turn, text: &str) -> Result<(), StoreError> {
    ctx.records
        .insert(NewRecord::Intel(IntelSubmission {
            call_id: turn.session_id.clone(),
            caller: turn.caller.clone(),
            text: text.to_string(),
            submitted_at: ctx.now,
        }))
        .await
}
