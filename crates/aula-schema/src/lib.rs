use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity a conversation is keyed by in the state store.
/// Built from the channel type and the channel's conversation scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub fn new(channel_type: &str, conversation_scope: &str) -> Self {
        Self(format!("{channel_type}:{conversation_scope}"))
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One incoming user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundTurn {
    pub trace_id: Uuid,
    pub conversation: ConversationKey,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl InboundTurn {
    pub fn new(conversation: ConversationKey, text: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            conversation,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// One outgoing message. At most one reply per turn has
/// `expecting_input = true`; informational sends precede it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub text: String,
    #[serde(default)]
    pub suggested_replies: Vec<String>,
    #[serde(default)]
    pub expecting_input: bool,
}

impl OutboundReply {
    /// A prompt that waits for the user's answer.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            suggested_replies: Vec::new(),
            expecting_input: true,
        }
    }

    /// A prompt with quick-reply choices.
    pub fn prompt_with_choices(
        text: impl Into<String>,
        choices: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            text: text.into(),
            suggested_replies: choices.into_iter().map(Into::into).collect(),
            expecting_input: true,
        }
    }

    /// An informational message that does not wait for input.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            suggested_replies: Vec::new(),
            expecting_input: false,
        }
    }
}

/// Intent labels the external recognizer can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    BookAppointment,
    StudentLetter,
    OfficeHours,
    Qna,
    None,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookAppointment => "book_appointment",
            Self::StudentLetter => "student_letter",
            Self::OfficeHours => "office_hours",
            Self::Qna => "qna",
            Self::None => "none",
        }
    }
}

/// Slot values the recognizer extracted from the utterance.
/// All optional; present fields pre-fill the corresponding dialog record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub professor: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Result of one recognizer call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedIntent {
    pub intent: IntentKind,
    /// Raw label as the service returned it, kept for diagnostics.
    pub raw_label: String,
    pub confidence: f32,
    #[serde(default)]
    pub entities: ExtractedEntities,
}

impl RecognizedIntent {
    pub fn none() -> Self {
        Self {
            intent: IntentKind::None,
            raw_label: "None".to_string(),
            confidence: 0.0,
            entities: ExtractedEntities::default(),
        }
    }
}

/// One ranked knowledge-base answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbAnswer {
    pub text: String,
    pub confidence: f32,
    #[serde(default)]
    pub follow_up_prompts: Vec<String>,
}
