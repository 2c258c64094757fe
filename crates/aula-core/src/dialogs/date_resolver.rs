//! Date disambiguation sub-dialog. Invoked by a task dialog's date step
//! whenever the timex is unset or ambiguous; loops until the expression is
//! definite (or the interruption layer cancels the whole stack).

use anyhow::Result;
use aula_schema::OutboundReply;
use chrono::Utc;

use crate::context::TurnContext;
use crate::dialog::{DialogValue, FrameState, StepResult};
use crate::error::EngineError;
use crate::records::{DateResolverState, ResolverMode};
use crate::timex::{self, TimexKind, UserDateInput};

const ASK_DATE_PROMPT: &str =
    "On what date would you like the appointment? You can say things like \"tomorrow\" or \
     \"2024-05-01\".";
const RETRY_TEXT: &str =
    "I'm sorry, I didn't understand that. A full date including day, month and year works best.";

pub(crate) async fn run_step(
    state: &mut DateResolverState,
    step: usize,
    input: Option<DialogValue>,
    ctx: &mut TurnContext,
) -> Result<StepResult> {
    match step {
        0 => Ok(classify_and_ask(state)),
        1 => Ok(validate(state, input, ctx)),
        _ => Err(EngineError::StepOutOfRange {
            dialog: "date_resolver",
            step,
            count: 2,
        }
        .into()),
    }
}

fn classify_and_ask(state: &mut DateResolverState) -> StepResult {
    let current = state.timex.as_deref().unwrap_or("");
    let kind = timex::classify(current);
    if kind.is_definite() {
        // Nothing to resolve; hand the value straight back.
        return StepResult::End(Some(DialogValue::Timex(current.to_string())));
    }
    match kind {
        TimexKind::DateWithVagueTime { date, .. } => {
            state.mode = ResolverMode::AskTime;
            let today = Utc::now().date_naive();
            StepResult::Suspend(OutboundReply::prompt(format!(
                "What time on {}? Please give an exact time like 09:30.",
                timex::natural_day(date, today)
            )))
        }
        _ => {
            state.mode = ResolverMode::AskDate;
            StepResult::Suspend(OutboundReply::prompt(ASK_DATE_PROMPT))
        }
    }
}

fn validate(
    state: &DateResolverState,
    input: Option<DialogValue>,
    ctx: &mut TurnContext,
) -> StepResult {
    let today = Utc::now().date_naive();
    let answer = input.as_ref().and_then(DialogValue::as_text).unwrap_or("");

    let candidate = timex::parse_user_input(answer, today).and_then(|parsed| match parsed {
        UserDateInput::Date(_) | UserDateInput::DateTime(_) => timex::to_timex_string(&parsed),
        // A bare time only helps if we already know the day.
        UserDateInput::Time(t) => match timex::classify(state.timex.as_deref().unwrap_or("")) {
            TimexKind::DateWithVagueTime { date, .. } | TimexKind::Date(date) => {
                Some(timex::with_time(date, t))
            }
            _ => None,
        },
    });

    match candidate {
        Some(t) if timex::classify(&t).is_definite() => {
            StepResult::End(Some(DialogValue::Timex(t)))
        }
        other => {
            ctx.send(OutboundReply::info(RETRY_TEXT));
            // Keep whatever partial expression we had; a fresh frame re-asks.
            let next = other.or_else(|| state.timex.clone());
            StepResult::Replace(FrameState::DateResolver(DateResolverState::new(next)))
        }
    }
}
