use thiserror::Error;

/// Failures the dialog engine itself can report. External-service and
/// user-input problems never show up here: those degrade to conversational
/// messages per the error-handling design.
#[derive(Error, Debug)]
pub enum EngineError {
    /// `continue_dialog` was called with an empty stack; the caller must
    /// begin a dialog first.
    #[error("no active dialog for conversation {0}")]
    NoActiveDialog(String),

    /// A frame referenced a step past its dialog's step table. Indicates a
    /// bug or corrupted persisted state, never normal operation.
    #[error("step {step} out of range for dialog {dialog} ({count} steps)")]
    StepOutOfRange {
        dialog: &'static str,
        step: usize,
        count: usize,
    },
}
