//! Typed per-dialog records. Each dialog owns exactly one of these for its
//! lifetime; fields start unset and are filled one at a time in declared
//! order by the field collector steps.

use aula_schema::ExtractedEntities;
use serde::{Deserialize, Serialize};

/// Everything the appointment dialog collects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub professor: Option<String>,
    /// Where the booking confirmation goes.
    #[serde(default)]
    pub email: Option<String>,
    /// Timex string; definite only after the date resolver is done with it.
    #[serde(default)]
    pub date: Option<String>,
}

impl AppointmentRecord {
    /// Pre-fill from whatever slots the recognizer extracted, so the dialog
    /// skips the steps already satisfied.
    pub fn from_entities(entities: &ExtractedEntities) -> Self {
        Self {
            student_id: entities.student_id.clone(),
            purpose: entities.purpose.clone(),
            professor: entities.professor.clone(),
            email: None,
            date: entities.date.clone(),
        }
    }

    /// True once every field a booking needs is filled in.
    pub fn is_complete(&self) -> bool {
        self.student_id.is_some()
            && self.purpose.is_some()
            && self.professor.is_some()
            && self.email.is_some()
            && self.date.is_some()
    }
}

/// Everything the student-letter dialog collects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterRecord {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub letter_type: Option<String>,
}

impl LetterRecord {
    pub fn from_entities(entities: &ExtractedEntities) -> Self {
        Self {
            student_id: entities.student_id.clone(),
            letter_type: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.student_id.is_some() && self.letter_type.is_some()
    }
}

/// Which greeting the main dialog opens with. Persisted in the frame rather
/// than held in any shared mutable field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Greeting {
    #[default]
    Fresh,
    Continuation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainState {
    #[serde(default)]
    pub greeting: Greeting,
}

impl MainState {
    pub fn fresh() -> Self {
        Self {
            greeting: Greeting::Fresh,
        }
    }

    pub fn continuation() -> Self {
        Self {
            greeting: Greeting::Continuation,
        }
    }
}

/// Which question the date resolver is currently asking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    /// No usable date at all.
    #[default]
    AskDate,
    /// Date known, time of day still vague.
    AskTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateResolverState {
    /// Whatever timex we have so far, possibly ambiguous.
    #[serde(default)]
    pub timex: Option<String>,
    #[serde(default)]
    pub mode: ResolverMode,
}

impl DateResolverState {
    pub fn new(timex: Option<String>) -> Self {
        Self {
            timex,
            mode: ResolverMode::default(),
        }
    }
}
