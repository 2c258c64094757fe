//! End-to-end conversation tests: full turns through the engine with stub
//! services, asserting on the replies a user would actually see.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aula_core::records::AppointmentRecord;
use aula_core::services::{
    BookingNotifier, IntentRecognizer, KnowledgeBase, NullKnowledgeBase, NullNotifier,
    NullRecognizer, Services,
};
use aula_core::{Engine, TurnOutput};
use aula_memory::ConversationStore;
use aula_schema::{
    ConversationKey, ExtractedEntities, InboundTurn, IntentKind, KbAnswer, RecognizedIntent,
};

struct StubRecognizer {
    result: RecognizedIntent,
}

#[async_trait]
impl IntentRecognizer for StubRecognizer {
    async fn recognize(&self, _utterance: &str) -> anyhow::Result<RecognizedIntent> {
        Ok(self.result.clone())
    }
}

struct StubKnowledgeBase {
    answers: Vec<KbAnswer>,
}

#[async_trait]
impl KnowledgeBase for StubKnowledgeBase {
    async fn query(&self, _question: &str) -> anyhow::Result<Vec<KbAnswer>> {
        Ok(self.answers.clone())
    }
}

struct FailingKnowledgeBase;

#[async_trait]
impl KnowledgeBase for FailingKnowledgeBase {
    async fn query(&self, _question: &str) -> anyhow::Result<Vec<KbAnswer>> {
        anyhow::bail!("kb endpoint unreachable")
    }
}

#[derive(Default)]
struct RecordingNotifier {
    bookings: Mutex<Vec<AppointmentRecord>>,
}

#[async_trait]
impl BookingNotifier for RecordingNotifier {
    async fn booking_confirmed(&self, record: &AppointmentRecord) -> anyhow::Result<()> {
        self.bookings.lock().unwrap().push(record.clone());
        Ok(())
    }
}

fn intent(kind: IntentKind, label: &str, confidence: f32) -> RecognizedIntent {
    RecognizedIntent {
        intent: kind,
        raw_label: label.to_string(),
        confidence,
        entities: ExtractedEntities::default(),
    }
}

fn booking_intent(entities: ExtractedEntities) -> RecognizedIntent {
    RecognizedIntent {
        intent: IntentKind::BookAppointment,
        raw_label: "book_appointment".to_string(),
        confidence: 0.92,
        entities,
    }
}

fn engine_with(
    recognizer: Arc<dyn IntentRecognizer>,
    knowledge_base: Arc<dyn KnowledgeBase>,
    notifier: Arc<dyn BookingNotifier>,
) -> Engine {
    let store = ConversationStore::open_in_memory().unwrap();
    Engine::new(
        store,
        Services {
            recognizer,
            knowledge_base,
            notifier,
        },
    )
}

fn booking_engine(entities: ExtractedEntities, notifier: Arc<RecordingNotifier>) -> Engine {
    engine_with(
        Arc::new(StubRecognizer {
            result: booking_intent(entities),
        }),
        Arc::new(StubKnowledgeBase { answers: vec![] }),
        notifier,
    )
}

async fn say(engine: &Engine, key: &ConversationKey, text: &str) -> TurnOutput {
    engine
        .process_turn(&InboundTurn::new(key.clone(), text))
        .await
        .unwrap()
}

fn texts(output: &TurnOutput) -> Vec<&str> {
    output.replies.iter().map(|r| r.text.as_str()).collect()
}

fn prompt_count(output: &TurnOutput) -> usize {
    output.replies.iter().filter(|r| r.expecting_input).count()
}

#[tokio::test]
async fn books_appointment_with_prefilled_professor() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            ..Default::default()
        },
        Arc::clone(&notifier),
    );
    let key = ConversationKey::new("test", "booking");

    let out = say(&engine, &key, "hello").await;
    assert_eq!(texts(&out), vec!["What can I help you with today?"]);

    let out = say(&engine, &key, "book an appointment with dr wong").await;
    assert_eq!(texts(&out), vec!["Please enter your student ID?"]);

    // Purpose derives from the known professor, so the next gap is email.
    let out = say(&engine, &key, "12345").await;
    assert_eq!(
        texts(&out),
        vec!["What email address should the confirmation go to?"]
    );

    let out = say(&engine, &key, "sw19@herts.ac.uk").await;
    assert!(out.replies[0].text.starts_with("On what date"));

    let out = say(&engine, &key, "2030-05-01").await;
    assert!(out.replies[0]
        .text
        .starts_with("Please confirm, Booking one-to-one with Dr Wong on:"));
    assert_eq!(out.replies[0].suggested_replies, vec!["Yes", "No"]);

    let out = say(&engine, &key, "yes").await;
    assert!(out.replies[0]
        .text
        .starts_with("I have you booked one-to-one with Dr Wong on"));
    assert_eq!(out.replies[1].text, "What else can I do for you?");

    let bookings = notifier.bookings.lock().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].student_id.as_deref(), Some("12345"));
    assert_eq!(bookings[0].email.as_deref(), Some("sw19@herts.ac.uk"));
    assert_eq!(bookings[0].date.as_deref(), Some("2030-05-01"));
}

#[tokio::test]
async fn declining_confirmation_books_nothing() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            date: Some("2030-05-01".to_string()),
            ..Default::default()
        },
        Arc::clone(&notifier),
    );
    let key = ConversationKey::new("test", "decline");

    say(&engine, &key, "hello").await;
    say(&engine, &key, "book an appointment").await;
    say(&engine, &key, "12345").await;
    let out = say(&engine, &key, "sw19@herts.ac.uk").await;
    assert!(out.replies[0].text.starts_with("Please confirm"));

    let out = say(&engine, &key, "no").await;
    // No booking message; straight back to the follow-up greeting.
    assert_eq!(texts(&out), vec!["What else can I do for you?"]);
    assert!(notifier.bookings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn nonsense_confirmation_reissues_the_prompt() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            date: Some("2030-05-01".to_string()),
            ..Default::default()
        },
        Arc::clone(&notifier),
    );
    let key = ConversationKey::new("test", "retry");

    say(&engine, &key, "hello").await;
    say(&engine, &key, "book an appointment").await;
    say(&engine, &key, "12345").await;
    say(&engine, &key, "sw19@herts.ac.uk").await;

    let out = say(&engine, &key, "maybe").await;
    assert_eq!(out.replies[0].text, "Please answer yes or no.");
    assert!(out.replies[1].text.starts_with("Please confirm"));
    assert_eq!(prompt_count(&out), 1);

    let out = say(&engine, &key, "yes").await;
    assert!(out.replies[0].text.starts_with("I have you booked"));
    assert_eq!(notifier.bookings.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn past_date_is_rejected_at_confirmation() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            date: Some("2020-01-01".to_string()),
            ..Default::default()
        },
        Arc::clone(&notifier),
    );
    let key = ConversationKey::new("test", "past");

    say(&engine, &key, "hello").await;
    say(&engine, &key, "book an appointment").await;
    say(&engine, &key, "12345").await;
    let out = say(&engine, &key, "sw19@herts.ac.uk").await;
    assert!(out.replies[0].text.starts_with("Please confirm"));

    let out = say(&engine, &key, "yes").await;
    assert!(out.replies[0].text.contains("already passed"));
    assert!(out.replies[1].text.starts_with("On what date"));
    assert!(notifier.bookings.lock().unwrap().is_empty());

    // Picking a valid date recovers the rest of the record.
    let out = say(&engine, &key, "2030-05-01").await;
    assert!(out.replies[0].text.starts_with("Please confirm"));
    say(&engine, &key, "yes").await;
    let bookings = notifier.bookings.lock().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].date.as_deref(), Some("2030-05-01"));
}

#[tokio::test]
async fn vague_day_part_asks_for_time_only() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            date: Some("2030-05-01TMO".to_string()),
            ..Default::default()
        },
        Arc::clone(&notifier),
    );
    let key = ConversationKey::new("test", "vague");

    say(&engine, &key, "hello").await;
    say(&engine, &key, "book an appointment tomorrow morning").await;
    say(&engine, &key, "12345").await;
    let out = say(&engine, &key, "sw19@herts.ac.uk").await;
    assert!(out.replies[0].text.starts_with("What time on"));

    let out = say(&engine, &key, "09:30").await;
    assert!(out.replies[0].text.contains("at 09:30"));

    say(&engine, &key, "yes").await;
    let bookings = notifier.bookings.lock().unwrap();
    assert_eq!(bookings[0].date.as_deref(), Some("2030-05-01T09:30"));
}

#[tokio::test]
async fn cancel_clears_the_whole_nested_stack() {
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            ..Default::default()
        },
        Arc::new(RecordingNotifier::default()),
    );
    let key = ConversationKey::new("test", "cancel");

    say(&engine, &key, "hello").await;
    say(&engine, &key, "book an appointment").await;
    say(&engine, &key, "12345").await;
    // Down in the date resolver: main -> appointment -> resolver.
    let out = say(&engine, &key, "sw19@herts.ac.uk").await;
    assert!(out.replies[0].text.starts_with("On what date"));

    let out = say(&engine, &key, "cancel").await;
    assert_eq!(texts(&out), vec!["Cancelling..."]);

    let stack = engine.load_stack(&key.0).await.unwrap();
    assert!(stack.is_empty());

    // The next utterance starts over from a fresh greeting.
    let out = say(&engine, &key, "hi again").await;
    assert_eq!(texts(&out), vec!["What can I help you with today?"]);
}

#[tokio::test]
async fn cancel_with_nothing_active() {
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::None, "none", 0.0),
        }),
        Arc::new(NullKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "idle-cancel");

    let out = say(&engine, &key, "cancel").await;
    assert_eq!(texts(&out), vec!["Nothing to cancel."]);
    assert!(engine.load_stack(&key.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn help_shows_text_and_reissues_pending_prompt() {
    let engine = booking_engine(
        ExtractedEntities {
            professor: Some("Dr Wong".to_string()),
            ..Default::default()
        },
        Arc::new(RecordingNotifier::default()),
    );
    let key = ConversationKey::new("test", "help");

    say(&engine, &key, "hello").await;
    say(&engine, &key, "book an appointment").await;

    let out = say(&engine, &key, "help").await;
    assert!(out.replies[0].text.starts_with("Show Help..."));
    assert_eq!(out.replies[1].text, "Please enter your student ID?");

    // The dialog did not move; the answer still lands in the right field.
    let out = say(&engine, &key, "12345").await;
    assert_eq!(
        texts(&out),
        vec!["What email address should the confirmation go to?"]
    );
}

#[tokio::test]
async fn unconfigured_recognizer_degrades_to_booking() {
    let engine = engine_with(
        Arc::new(NullRecognizer),
        Arc::new(NullKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "degraded");

    let out = say(&engine, &key, "hello").await;
    assert!(out.replies[0].text.starts_with("NOTE: the intent recognizer"));
    assert_eq!(out.replies[1].text, "Please enter your student ID?");
    assert_eq!(prompt_count(&out), 1);
}

#[tokio::test]
async fn kb_answer_outranks_weak_intent() {
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::BookAppointment, "book_appointment", 0.2),
        }),
        Arc::new(StubKnowledgeBase {
            answers: vec![KbAnswer {
                text: "The library is open 24 hours during term time.".to_string(),
                confidence: 0.9,
                follow_up_prompts: vec!["Library location".to_string()],
            }],
        }),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "qna");

    say(&engine, &key, "hello").await;
    let out = say(&engine, &key, "when is the library open").await;
    assert_eq!(
        out.replies[0].text,
        "The library is open 24 hours during term time."
    );
    assert_eq!(out.replies[0].suggested_replies, vec!["Library location"]);
    assert_eq!(out.replies[1].text, "What else can I do for you?");
}

#[tokio::test]
async fn question_without_an_answer_gets_an_apology() {
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::Qna, "qna", 0.8),
        }),
        Arc::new(NullKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "no-answer");

    say(&engine, &key, "hello").await;
    let out = say(&engine, &key, "what colour is the vice-chancellor's car").await;
    assert_eq!(
        out.replies[0].text,
        "Sorry, could not find an answer to your question"
    );
    assert_eq!(out.replies[1].text, "What else can I do for you?");
}

#[tokio::test]
async fn kb_failure_degrades_to_the_apology() {
    // A dead knowledge base must read as "no answer", never as an error.
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::Qna, "qna", 0.8),
        }),
        Arc::new(FailingKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "kb-down");

    say(&engine, &key, "hello").await;
    let out = say(&engine, &key, "when is the library open").await;
    assert_eq!(
        out.replies[0].text,
        "Sorry, could not find an answer to your question"
    );
    assert_eq!(out.replies[1].text, "What else can I do for you?");
}

#[tokio::test]
async fn unknown_intent_reports_the_raw_label() {
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::None, "gibberish", 0.1),
        }),
        Arc::new(NullKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "unknown");

    say(&engine, &key, "hello").await;
    let out = say(&engine, &key, "flurble the wurble").await;
    assert!(out.replies[0].text.contains("(intent was gibberish)"));
    assert_eq!(out.replies[1].text, "What else can I do for you?");
}

#[tokio::test]
async fn letter_request_end_to_end() {
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::StudentLetter, "student_letter", 0.9),
        }),
        Arc::new(NullKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "letter");

    say(&engine, &key, "hello").await;
    let out = say(&engine, &key, "i need a letter for my bank").await;
    assert_eq!(texts(&out), vec!["Please enter your student ID?"]);

    let out = say(&engine, &key, "12345").await;
    assert_eq!(out.replies[0].text, "What type of letter do you want?");
    assert_eq!(
        out.replies[0].suggested_replies,
        vec!["Bank Letter", "Student status Letter"]
    );

    let out = say(&engine, &key, "Bank Letter").await;
    assert_eq!(
        out.replies[0].text,
        "Please confirm, You need a Bank Letter. Is this correct?"
    );

    let out = say(&engine, &key, "yes").await;
    assert!(out.replies[0]
        .text
        .starts_with("I have submitted your request for a Bank Letter."));
    assert_eq!(out.replies[1].text, "What else can I do for you?");
}

#[tokio::test]
async fn office_hours_is_answered_inline() {
    let engine = engine_with(
        Arc::new(StubRecognizer {
            result: intent(IntentKind::OfficeHours, "office_hours", 0.9),
        }),
        Arc::new(NullKnowledgeBase),
        Arc::new(NullNotifier),
    );
    let key = ConversationKey::new("test", "hours");

    say(&engine, &key, "hello").await;
    let out = say(&engine, &key, "when are office hours").await;
    assert!(out.replies[0].text.starts_with("Office hours run"));
    assert_eq!(out.replies[1].text, "What else can I do for you?");
}

#[tokio::test]
async fn state_survives_an_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aula.db");
    let path = path.to_str().unwrap();
    let key = ConversationKey::new("test", "restart");
    let notifier = Arc::new(RecordingNotifier::default());

    let services = || Services {
        recognizer: Arc::new(StubRecognizer {
            result: booking_intent(ExtractedEntities {
                professor: Some("Dr Wong".to_string()),
                ..Default::default()
            }),
        }),
        knowledge_base: Arc::new(StubKnowledgeBase { answers: vec![] }),
        notifier: Arc::clone(&notifier) as Arc<dyn BookingNotifier>,
    };

    {
        let engine = Engine::new(ConversationStore::open(path).unwrap(), services());
        say(&engine, &key, "hello").await;
        let out = say(&engine, &key, "book an appointment").await;
        assert_eq!(texts(&out), vec!["Please enter your student ID?"]);
    }

    // A new engine on the same store resumes mid-dialog.
    let engine = Engine::new(ConversationStore::open(path).unwrap(), services());
    let out = say(&engine, &key, "12345").await;
    assert_eq!(
        texts(&out),
        vec!["What email address should the confirmation go to?"]
    );
}

#[tokio::test]
async fn stack_stays_well_formed_after_every_turn() {
    let engine = booking_engine(
        ExtractedEntities::default(),
        Arc::new(RecordingNotifier::default()),
    );
    let key = ConversationKey::new("test", "well-formed");

    for utterance in [
        "hello",
        "book an appointment",
        "12345",
        "dissertation advice",
        "Dr Wong",
        "sw19@herts.ac.uk",
        "2030-05-01",
        "yes",
    ] {
        say(&engine, &key, utterance).await;
        let stack = engine.load_stack(&key.0).await.unwrap();
        assert!(stack.is_well_formed(), "after turn {utterance:?}");
    }
}

#[tokio::test]
async fn every_turn_emits_at_most_one_prompt() {
    let engine = booking_engine(
        ExtractedEntities::default(),
        Arc::new(RecordingNotifier::default()),
    );
    let key = ConversationKey::new("test", "one-prompt");

    for utterance in [
        "hello",
        "book an appointment",
        "12345",
        "dissertation advice",
        "Dr Wong",
        "sw19@herts.ac.uk",
        "nonsense-date",
        "2030-05-01",
        "maybe",
        "yes",
    ] {
        let out = say(&engine, &key, utterance).await;
        assert!(prompt_count(&out) <= 1, "turn {utterance:?}: {out:?}");
        // The prompt, when there is one, closes the turn.
        if out.replies.len() > 1 {
            let earlier = &out.replies[..out.replies.len() - 1];
            assert!(
                earlier.iter().all(|r| !r.expecting_input),
                "prompt not last in turn {utterance:?}"
            );
        }
    }
}
