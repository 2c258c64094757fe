//! The task dialogs, each an ordered step table over its typed record.

pub mod appointment;
pub mod date_resolver;
pub mod letter;
pub mod main_dialog;

use anyhow::Result;

use crate::context::TurnContext;
use crate::dialog::{DialogValue, FrameState, StepResult};

/// Dispatch one step of whichever dialog owns the frame.
pub(crate) async fn run_step(
    state: &mut FrameState,
    step: usize,
    input: Option<DialogValue>,
    ctx: &mut TurnContext,
) -> Result<StepResult> {
    match state {
        FrameState::Main(s) => main_dialog::run_step(s, step, input, ctx).await,
        FrameState::Appointment(r) => appointment::run_step(r, step, input, ctx).await,
        FrameState::Letter(r) => letter::run_step(r, step, input, ctx).await,
        FrameState::DateResolver(s) => date_resolver::run_step(s, step, input, ctx).await,
    }
}
