//! Wake-up calls: take a time and a message, then book the alarm

use super::alarm_time::resolve_alarm_time;
use super::{pivot_target, HotlineContext, Step};
use crate::intent;
use crate::memory::{Memory, Scratch, Topic};
use crate::records::{AlarmRequest, NewRecord};
use crate::turn::Turn;

const GREETING: &str = "Wake-up service. What time should we call you?";
const TIME_REPROMPT: &str = "What time should we call? For example, seven thirty a m.";
const MESSAGE_PROMPT: &str = "Got it. What message should we give you when we call?";
const MESSAGE_REPROMPT: &str = "What should we say when we wake you?";
const STORE_DOWN: &str =
    "Sorry, raider, I couldn't book your wake-up call right now. Try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlarmState {
    Greeting,
    Time,
    Message,
    Complete,
}

impl AlarmState {
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("time") => AlarmState::Time,
            Some("message") => AlarmState::Message,
            Some("complete") => AlarmState::Complete,
            _ => AlarmState::Greeting,
        }
    }
}

pub async fn handle(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    match AlarmState::parse(memory.state_name()) {
        AlarmState::Greeting => Step::ask(GREETING, memory.with_state("time")),
        AlarmState::Time => {
            let time_text = turn.input.trim();
            if time_text.is_empty() {
                return Step::ask(TIME_REPROMPT, memory);
            }
            Step::ask(
                MESSAGE_PROMPT,
                memory.with_state("message").with_scratch(Scratch::Alarm {
                    time_text: time_text.to_string(),
                }),
            )
        }
        AlarmState::Message => book(turn, memory, ctx).await,
        AlarmState::Complete => {
            let input = intent::normalize(&turn.input);
            if let Some(topic) = pivot_target(&input, Topic::Alarm) {
                return Step::switch(topic, memory);
            }
            if intent::wants_more(&input) {
                return Step::goto("greeting", memory);
            }
            Step::ask(
                "Your wake-up call is booked. Say another to set one more, or menu for other services.",
                memory,
            )
        }
    }
}

async fn book(turn: &Turn, memory: Memory, ctx: &HotlineContext<'_>) -> Step {
    let message = turn.input.trim();
    if message.is_empty() {
        return Step::ask(MESSAGE_REPROMPT, memory);
    }
    let time_text = match &memory.scratch {
        Scratch::Alarm { time_text } => time_text.clone(),
        _ => String::new(),
    };

    let alarm = resolve_alarm_time(&time_text, ctx.now, ctx.utc_offset);
    let request = AlarmRequest {
        call_id: turn.session_id.clone(),
        caller: turn.caller.clone(),
        fire_at: alarm.fire_at,
        time_text,
        time_parsed: alarm.parsed,
        message: message.to_string(),
    };
    if let Err(e) = ctx.records.insert(NewRecord::Alarm(request)).await {
        tracing::error!(session_id = %turn.session_id, error = %e, "Failed to book alarm");
        return Step::finish(STORE_DOWN, memory.with_state("complete"));
    }

    tracing::info!(
        session_id = %turn.session_id,
        fire_at = %alarm.fire_at,
        parsed = alarm.parsed,
        "Alarm booked"
    );
    // Always read back the resolved time so a fallback is audible
    Step::finish(
        format!(
            "Your wake-up call is set for {}. Stay safe out there, raider.",
            alarm.spoken(ctx.utc_offset)
        ),
        memory.with_state("complete"),
    )
}
