//! Student letter request: student id, letter type (quick-reply choices),
//! confirm, finalize.

use anyhow::Result;
use aula_schema::OutboundReply;

use crate::context::TurnContext;
use crate::dialog::{DialogValue, FrameState, StepResult};
use crate::error::EngineError;
use crate::records::LetterRecord;
use crate::step;

const STUDENT_ID_PROMPT: &str = "Please enter your student ID?";
const LETTER_TYPE_PROMPT: &str = "What type of letter do you want?";
const LETTER_CHOICES: [&str; 2] = ["Bank Letter", "Student status Letter"];
const YES_NO_RETRY_TEXT: &str = "Please answer yes or no.";

pub(crate) async fn run_step(
    record: &mut LetterRecord,
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
            Ok(step::collect(
                &record.letter_type,
                OutboundReply::prompt_with_choices(LETTER_TYPE_PROMPT, LETTER_CHOICES),
            ))
        }
        2 => {
            if !step::assign(&mut record.letter_type, input.as_ref()) {
                return Ok(reprompt(record));
            }
            Ok(StepResult::Suspend(OutboundReply::prompt_with_choices(
                format!(
                    "Please confirm, You need a {}. Is this correct?",
                    record.letter_type.as_deref().unwrap_or("")
                ),
                ["Yes", "No"],
            )))
        }
        3 => {
            let answer = input.as_ref().and_then(DialogValue::as_text).unwrap_or("");
            match step::parse_confirmation(answer) {
                Some(true) => Ok(StepResult::End(Some(DialogValue::Letter(record.clone())))),
                Some(false) => Ok(StepResult::End(None)),
                None => {
                    ctx.send(OutboundReply::info(YES_NO_RETRY_TEXT));
                    Ok(reprompt(record))
                }
            }
        }
        _ => Err(EngineError::StepOutOfRange {
            dialog: "letter",
            step,
            count: 4,
        }
        .into()),
    }
}

fn reprompt(record: &LetterRecord) -> StepResult {
    StepResult::Replace(FrameState::Letter(record.clone()))
}
