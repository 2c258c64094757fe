//! The top-level dialog: greet, route the utterance to a task dialog or the
//! knowledge base, report the task's result, restart with a follow-up
//! greeting.

use anyhow::Result;
use aula_schema::{IntentKind, OutboundReply, RecognizedIntent};
use chrono::Utc;
use tracing::{info, warn};

use crate::context::TurnContext;
use crate::dialog::{DialogValue, FrameState, StepResult};
use crate::error::EngineError;
use crate::records::{AppointmentRecord, LetterRecord, MainState};
use crate::timex;

const FRESH_GREETING: &str = "What can I help you with today?";
const CONTINUATION_GREETING: &str = "What else can I do for you?";
const OFFICE_HOURS_TEXT: &str =
    "Office hours run Monday to Friday, 9:00 to 17:00. Individual staff hours are listed on the \
     department pages.";
const NO_ANSWER_TEXT: &str = "Sorry, could not find an answer to your question";
const RECOGNIZER_NOT_CONFIGURED_TEXT: &str =
    "NOTE: the intent recognizer is not configured. Add a 'recognizer' section to the config \
     file to enable all capabilities.";

pub(crate) async fn run_step(
    state: &mut MainState,
    step: usize,
    input: Option<DialogValue>,
    ctx: &mut TurnContext,
) -> Result<StepResult> {
    match step {
        0 => intro(state, ctx),
        1 => act(input, ctx).await,
        2 => Ok(finish(input, ctx)),
        _ => Err(EngineError::StepOutOfRange {
            dialog: "main",
            step,
            count: 3,
        }
        .into()),
    }
}

fn intro(state: &MainState, ctx: &mut TurnContext) -> Result<StepResult> {
    if !ctx.services.recognizer.is_configured() {
        // Documented exception to the one-prompt rule: an auxiliary notice
        // before the flow starts.
        ctx.send(OutboundReply::info(RECOGNIZER_NOT_CONFIGURED_TEXT));
        return Ok(StepResult::Continue(None));
    }
    let text = match state.greeting {
        crate::records::Greeting::Fresh => FRESH_GREETING,
        crate::records::Greeting::Continuation => CONTINUATION_GREETING,
    };
    Ok(StepResult::Suspend(OutboundReply::prompt(text)))
}

async fn act(input: Option<DialogValue>, ctx: &mut TurnContext) -> Result<StepResult> {
    if !ctx.services.recognizer.is_configured() {
        // Degraded mode: no classification, run the appointment dialog with
        // an empty record.
        return Ok(StepResult::BeginChild(FrameState::Appointment(
            AppointmentRecord::default(),
        )));
    }

    let utterance = input
        .as_ref()
        .and_then(DialogValue::as_text)
        .unwrap_or("")
        .trim()
        .to_string();

    let (recognized, kb_result) = tokio::join!(
        ctx.services.recognizer.recognize(&utterance),
        ctx.services.knowledge_base.query(&utterance),
    );
    let recognized = recognized.unwrap_or_else(|err| {
        warn!("recognizer call failed, treating as no intent: {err:#}");
        RecognizedIntent::none()
    });
    let answers = kb_result.unwrap_or_else(|err| {
        warn!("knowledge base query failed, treating as no answer: {err:#}");
        Vec::new()
    });

    let kb_confidence = answers.first().map(|a| a.confidence).unwrap_or(0.0);
    let intent = if kb_confidence > recognized.confidence {
        IntentKind::Qna
    } else {
        recognized.intent
    };
    info!(
        intent = intent.as_str(),
        recognizer_confidence = recognized.confidence,
        kb_confidence,
        "routing utterance"
    );

    match intent {
        IntentKind::BookAppointment => Ok(StepResult::BeginChild(FrameState::Appointment(
            AppointmentRecord::from_entities(&recognized.entities),
        ))),
        IntentKind::StudentLetter => Ok(StepResult::BeginChild(FrameState::Letter(
            LetterRecord::from_entities(&recognized.entities),
        ))),
        IntentKind::OfficeHours => {
            ctx.send(OutboundReply::info(OFFICE_HOURS_TEXT));
            Ok(StepResult::Continue(None))
        }
        IntentKind::Qna => {
            match answers.first() {
                Some(top) => ctx.send(OutboundReply {
                    text: top.text.clone(),
                    suggested_replies: top.follow_up_prompts.clone(),
                    expecting_input: false,
                }),
                None => ctx.send(OutboundReply::info(NO_ANSWER_TEXT)),
            }
            Ok(StepResult::Continue(None))
        }
        IntentKind::None => {
            ctx.send(OutboundReply::info(format!(
                "Sorry, I didn't get that. Please try asking in a different way (intent was {})",
                recognized.raw_label
            )));
            Ok(StepResult::Continue(None))
        }
    }
}

fn finish(input: Option<DialogValue>, ctx: &mut TurnContext) -> StepResult {
    match input {
        Some(DialogValue::Appointment(record)) => {
            let today = Utc::now().date_naive();
            let when = record
                .date
                .as_deref()
                .map(|d| timex::to_natural_language(d, today))
                .unwrap_or_default();
            ctx.send(OutboundReply::info(format!(
                "I have you booked {} with {} on {}",
                record.purpose.as_deref().unwrap_or(""),
                record.professor.as_deref().unwrap_or(""),
                when
            )));
        }
        Some(DialogValue::Letter(record)) => {
            ctx.send(OutboundReply::info(format!(
                "I have submitted your request for a {}. It will be emailed to you within five \
                 working days.",
                record.letter_type.as_deref().unwrap_or("letter")
            )));
        }
        // Declined or cancelled task: nothing to report.
        _ => {}
    }
    StepResult::Replace(FrameState::Main(MainState::continuation()))
}
