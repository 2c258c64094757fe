//! The dialog stack: frames, step results, and the persisted shape the
//! engine reconstructs execution from on every turn.

use aula_schema::OutboundReply;
use serde::{Deserialize, Serialize};

use crate::records::{AppointmentRecord, DateResolverState, LetterRecord, MainState};

/// Value handed from one step to the next, or from an ending child dialog to
/// its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DialogValue {
    Text(String),
    Bool(bool),
    Timex(String),
    Appointment(AppointmentRecord),
    Letter(LetterRecord),
}

impl DialogValue {
    /// The textual payload, if this value carries one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Timex(s) => Some(s),
            _ => None,
        }
    }
}

/// Per-dialog state carried by a frame. A closed enum: every dialog kind the
/// engine can run is listed here and resolved at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dialog", content = "state", rename_all = "snake_case")]
pub enum FrameState {
    Main(MainState),
    Appointment(AppointmentRecord),
    Letter(LetterRecord),
    DateResolver(DateResolverState),
}

impl FrameState {
    pub fn dialog_name(&self) -> &'static str {
        match self {
            Self::Main(_) => "main",
            Self::Appointment(_) => "appointment",
            Self::Letter(_) => "letter",
            Self::DateResolver(_) => "date_resolver",
        }
    }

    /// Number of steps in this dialog's step table.
    pub fn step_count(&self) -> usize {
        match self {
            Self::Main(_) => 3,
            Self::Appointment(_) => 7,
            Self::Letter(_) => 4,
            Self::DateResolver(_) => 2,
        }
    }
}

/// What a step tells the engine to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Emit the prompt, pause until the next turn.
    Suspend(OutboundReply),
    /// Run the next step of the same dialog immediately with this value.
    Continue(Option<DialogValue>),
    /// Push a child dialog; its eventual result resumes the step after this
    /// one.
    BeginChild(FrameState),
    /// Pop this frame and start the given dialog fresh in its place.
    Replace(FrameState),
    /// Pop this frame, delivering the result to the frame beneath (or to the
    /// caller if this was the last frame).
    End(Option<DialogValue>),
}

/// One entry on the dialog stack: which dialog, where in its step table, and
/// the prompt to re-issue if the user asks for help while suspended here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogFrame {
    pub state: FrameState,
    pub step: usize,
    #[serde(default)]
    pub pending_prompt: Option<OutboundReply>,
}

impl DialogFrame {
    pub fn new(state: FrameState) -> Self {
        Self {
            state,
            step: 0,
            pending_prompt: None,
        }
    }
}

/// LIFO stack of dialog frames, persisted per conversation between turns.
/// Empty means the conversation is idle awaiting a new top-level intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogStack {
    frames: Vec<DialogFrame>,
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> Option<&DialogFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut DialogFrame> {
        self.frames.last_mut()
    }

    pub fn push(&mut self, frame: DialogFrame) {
        self.frames.push(frame);
    }

    /// Popping an empty stack is a no-op, never a panic.
    pub fn pop(&mut self) -> Option<DialogFrame> {
        self.frames.pop()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn frames(&self) -> &[DialogFrame] {
        &self.frames
    }

    /// No frame may sit at a step index its dialog does not have.
    pub fn is_well_formed(&self) -> bool {
        self.frames.iter().all(|f| f.step < f.state.step_count())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_stack_is_noop() {
        let mut stack = DialogStack::new();
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }

    #[test]
    fn stack_is_lifo() {
        let mut stack = DialogStack::new();
        stack.push(DialogFrame::new(FrameState::Main(MainState::fresh())));
        stack.push(DialogFrame::new(FrameState::Appointment(
            AppointmentRecord::default(),
        )));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top().unwrap().state.dialog_name(), "appointment");
        stack.pop();
        assert_eq!(stack.top().unwrap().state.dialog_name(), "main");
    }

    #[test]
    fn stack_json_roundtrip_preserves_frames() {
        let mut stack = DialogStack::new();
        stack.push(DialogFrame::new(FrameState::Main(MainState::continuation())));
        let mut frame = DialogFrame::new(FrameState::Appointment(AppointmentRecord {
            professor: Some("Dr. Smith".into()),
            ..Default::default()
        }));
        frame.step = 2;
        frame.pending_prompt = Some(OutboundReply::prompt("What is the purpose of appointment?"));
        stack.push(frame);

        let json = stack.to_json().unwrap();
        let restored = DialogStack::from_json(&json).unwrap();
        assert_eq!(restored, stack);
        assert_eq!(restored.top().unwrap().step, 2);
    }

    #[test]
    fn well_formed_rejects_out_of_range_step() {
        let mut stack = DialogStack::new();
        let mut frame = DialogFrame::new(FrameState::DateResolver(DateResolverState::default()));
        assert!(stack.is_well_formed());
        frame.step = 2; // resolver has 2 steps: 0 and 1
        stack.push(frame);
        assert!(!stack.is_well_formed());
    }

    #[test]
    fn dialog_value_as_text() {
        assert_eq!(DialogValue::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(
            DialogValue::Timex("2024-05-01".into()).as_text(),
            Some("2024-05-01")
        );
        assert_eq!(DialogValue::Bool(true).as_text(), None);
    }
}
