//! Field collector building blocks. Every task-dialog step is some
//! combination of "store the answer to the previous prompt" and "collect my
//! own field": prompt if unset, derive if a rule applies, pass through if
//! already satisfied.

use aula_schema::OutboundReply;

use crate::dialog::{DialogValue, StepResult};

/// Store the incoming step value into `field` if it is still unset.
/// Returns whether the field holds a value afterwards; `false` means the
/// user gave nothing usable and the dialog should re-prompt.
pub fn assign(field: &mut Option<String>, input: Option<&DialogValue>) -> bool {
    if field.is_some() {
        return true;
    }
    if let Some(text) = input.and_then(DialogValue::as_text) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            *field = Some(trimmed.to_string());
            return true;
        }
    }
    false
}

/// Collect one field: suspend with the prompt when unset, otherwise pass the
/// existing value straight downstream. Re-invoking on an already-set field
/// never prompts and never mutates.
pub fn collect(field: &Option<String>, prompt: OutboundReply) -> StepResult {
    match field {
        Some(v) => StepResult::Continue(Some(DialogValue::Text(v.clone()))),
        None => StepResult::Suspend(prompt),
    }
}

/// Like [`collect`], but a derive rule may fill the field without prompting
/// (e.g. default the purpose once the professor is known).
pub fn collect_or_derive(
    field: &mut Option<String>,
    prompt: OutboundReply,
    derived: Option<String>,
) -> StepResult {
    if field.is_none() {
        if let Some(v) = derived {
            *field = Some(v);
        }
    }
    collect(field, prompt)
}

/// Interpret a yes/no answer to a confirmation prompt. `None` means the
/// answer was neither, and the prompt should be re-issued.
pub fn parse_confirmation(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "yeah" | "yep" | "sure" | "ok" | "okay" | "confirm" | "correct" => {
            Some(true)
        }
        "no" | "n" | "nope" | "negative" => Some(false),
        _ => None,
    }
}
