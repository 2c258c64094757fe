//! Global interruption commands, checked before the active step sees any
//! input. Gives the user an escape hatch at arbitrary stack depth.

/// A recognized global command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// Abort the whole nested dialog, not just the innermost frame.
    Cancel,
    /// Show help, then re-issue the pending prompt; dialog state untouched.
    Help,
}

pub const HELP_TEXT: &str =
    "Show Help... You can ask me to book an appointment or request a student letter, \
     or just ask a question. Say \"cancel\" at any point to stop what we're doing.";

pub const CANCEL_TEXT: &str = "Cancelling...";

pub const NOTHING_TO_CANCEL_TEXT: &str = "Nothing to cancel.";

/// Match the whole utterance, case-insensitively, against the global
/// commands. Anything else passes through to the active step untouched.
pub fn check(utterance: &str) -> Option<Interruption> {
    match utterance.trim().to_lowercase().as_str() {
        "cancel" | "quit" => Some(Interruption::Cancel),
        "help" | "?" => Some(Interruption::Help),
        _ => None,
    }
}
