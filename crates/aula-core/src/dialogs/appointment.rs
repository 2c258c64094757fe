//! Appointment booking: student id, purpose, professor, email, date,
//! confirm, finalize. Re-enterable with a partially pre-filled record;
//! satisfied fields pass through without prompting.

use anyhow::Result;
use aula_schema::OutboundReply;
use chrono::Utc;
use tracing::{info, warn};

use crate::context::TurnContext;
use crate::dialog::{DialogValue, FrameState, StepResult};
use crate::error::EngineError;
use crate::records::{AppointmentRecord, DateResolverState};
use crate::step;
use crate::timex::{self, TimexKind};

const STUDENT_ID_PROMPT: &str = "Please enter your student ID?";
const PURPOSE_PROMPT: &str = "What is the purpose of appointment?";
const PROFESSOR_PROMPT: &str = "Who would you like to have the appointment with?";
const EMAIL_PROMPT: &str = "What email address should the confirmation go to?";
const DEFAULT_PURPOSE: &str = "one-to-one";
const YES_NO_RETRY_TEXT: &str = "Please answer yes or no.";
const DATE_PASSED_TEXT: &str = "That date has already passed. Let's pick another one.";

pub(crate) async fn run_step(
    record: &mut AppointmentRecord,
    step: usize,
    input: Option<DialogValue>,
    ctx: &mut TurnContext,
) -> Result<StepResult> {
    match step {
        0 => Ok(step::collect(
            &record.student_id,
            OutboundReply::prompt(STUDENT_ID_PROMPT),
        )),
        1 => {
            if !step::assign(&mut record.student_id, input.as_ref()) {
                return Ok(reprompt(record));
            }
            let derived = record
                .professor
                .is_some()
                .then(|| DEFAULT_PURPOSE.to_string());
            Ok(step::collect_or_derive(
                &mut record.purpose,
                OutboundReply::prompt(PURPOSE_PROMPT),
                derived,
            ))
        }
        2 => {
            if !step::assign(&mut record.purpose, input.as_ref()) {
                return Ok(reprompt(record));
            }
            Ok(step::collect(
                &record.professor,
                OutboundReply::prompt(PROFESSOR_PROMPT),
            ))
        }
        3 => {
            if !step::assign(&mut record.professor, input.as_ref()) {
                return Ok(reprompt(record));
            }
            Ok(step::collect(
                &record.email,
                OutboundReply::prompt(EMAIL_PROMPT),
            ))
        }
        4 => {
            if !step::assign(&mut record.email, input.as_ref()) {
                return Ok(reprompt(record));
            }
            match &record.date {
                Some(d) if timex::classify(d).is_definite() => {
                    Ok(StepResult::Continue(Some(DialogValue::Timex(d.clone()))))
                }
                // Unset or ambiguous: let the resolver sub-dialog sort it out.
                _ => Ok(StepResult::BeginChild(FrameState::DateResolver(
                    DateResolverState::new(record.date.clone()),
                ))),
            }
        }
        5 => {
            if let Some(resolved) = input.as_ref().and_then(DialogValue::as_text) {
                record.date = Some(resolved.to_string());
            }
            let today = Utc::now().date_naive();
            let when = record
                .date
                .as_deref()
                .map(|d| timex::to_natural_language(d, today))
                .unwrap_or_default();
            Ok(StepResult::Suspend(OutboundReply::prompt_with_choices(
                format!(
                    "Please confirm, Booking {} with {} on: {}. Is this correct?",
                    record.purpose.as_deref().unwrap_or(""),
                    record.professor.as_deref().unwrap_or(""),
                    when
                ),
                ["Yes", "No"],
            )))
        }
        6 => {
            let answer = input.as_ref().and_then(DialogValue::as_text).unwrap_or("");
            match step::parse_confirmation(answer) {
                Some(true) => finalize(record, ctx).await,
                Some(false) => Ok(StepResult::End(None)),
                None => {
                    ctx.send(OutboundReply::info(YES_NO_RETRY_TEXT));
                    Ok(reprompt(record))
                }
            }
        }
        _ => Err(EngineError::StepOutOfRange {
            dialog: "appointment",
            step,
            count: 7,
        }
        .into()),
    }
}

/// Restart the dialog with the record as collected so far. Satisfied fields
/// pass straight through, so the user lands back on the unanswered prompt
/// without any frame revisiting a step index.
fn reprompt(record: &AppointmentRecord) -> StepResult {
    StepResult::Replace(FrameState::Appointment(record.clone()))
}

/// Runs once the user accepts the confirmation prompt. One reference
/// timestamp is captured here and used for both the past-date check and the
/// future-only notification.
async fn finalize(record: &AppointmentRecord, ctx: &mut TurnContext) -> Result<StepResult> {
    let reference = Utc::now().naive_utc();
    let (in_past, in_future) = match record.date.as_deref().map(timex::classify) {
        Some(TimexKind::Date(d)) => (d < reference.date(), d > reference.date()),
        Some(TimexKind::DateTime(dt)) => (dt < reference, dt > reference),
        _ => (false, false),
    };

    if in_past {
        ctx.send(OutboundReply::info(DATE_PASSED_TEXT));
        let mut retry = record.clone();
        retry.date = None;
        return Ok(StepResult::Replace(FrameState::Appointment(retry)));
    }

    if in_future {
        // Fire-and-forget from the dialog's perspective: delivery failures
        // are logged, never surfaced to the user.
        if let Err(err) = ctx.services.notifier.booking_confirmed(record).await {
            warn!("booking notification failed: {err:#}");
        }
    }

    info!(
        professor = record.professor.as_deref().unwrap_or(""),
        date = record.date.as_deref().unwrap_or(""),
        notified = in_future,
        "appointment booked"
    );
    Ok(StepResult::End(Some(DialogValue::Appointment(
        record.clone(),
    ))))
}
