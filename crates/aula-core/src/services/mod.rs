//! External collaborators the dialog engine consumes: intent recognition,
//! knowledge-base lookup, and booking notification. The engine only sees
//! these traits; HTTP implementations live in [`http`], and null
//! implementations cover the unconfigured / degraded paths.

pub mod http;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aula_schema::{KbAnswer, RecognizedIntent};
use tracing::debug;

use crate::records::AppointmentRecord;

#[async_trait]
pub trait IntentRecognizer: Send + Sync {
    /// False when the service is not set up; the router then bypasses
    /// classification entirely (degraded mode, not a failure).
    fn is_configured(&self) -> bool {
        true
    }

    async fn recognize(&self, utterance: &str) -> Result<RecognizedIntent>;
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Ranked answers, best first. Empty on no match.
    async fn query(&self, question: &str) -> Result<Vec<KbAnswer>>;
}

#[async_trait]
pub trait BookingNotifier: Send + Sync {
    /// Called only for bookings strictly in the future. Failures are logged
    /// by the caller and never surfaced to the user.
    async fn booking_confirmed(&self, record: &AppointmentRecord) -> Result<()>;
}

/// The full set of collaborators, shared across turns.
#[derive(Clone)]
pub struct Services {
    pub recognizer: Arc<dyn IntentRecognizer>,
    pub knowledge_base: Arc<dyn KnowledgeBase>,
    pub notifier: Arc<dyn BookingNotifier>,
}

/// Recognizer stand-in when no endpoint is configured.
pub struct NullRecognizer;

#[async_trait]
impl IntentRecognizer for NullRecognizer {
    fn is_configured(&self) -> bool {
        false
    }

    async fn recognize(&self, _utterance: &str) -> Result<RecognizedIntent> {
        Ok(RecognizedIntent::none())
    }
}

/// Knowledge base stand-in: never has an answer.
pub struct NullKnowledgeBase;

#[async_trait]
impl KnowledgeBase for NullKnowledgeBase {
    async fn query(&self, _question: &str) -> Result<Vec<KbAnswer>> {
        Ok(Vec::new())
    }
}

/// Notifier stand-in: logs and succeeds.
pub struct NullNotifier;

#[async_trait]
impl BookingNotifier for NullNotifier {
    async fn booking_confirmed(&self, record: &AppointmentRecord) -> Result<()> {
        debug!(
            professor = record.professor.as_deref().unwrap_or(""),
            date = record.date.as_deref().unwrap_or(""),
            "no notifier configured, skipping booking notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_recognizer_is_unconfigured() {
        let r = NullRecognizer;
        assert!(!r.is_configured());
        let result = r.recognize("book appointment").await.unwrap();
        assert_eq!(result.intent, aula_schema::IntentKind::None);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn null_kb_returns_no_answers() {
        let kb = NullKnowledgeBase;
        assert!(kb.query("where is the library").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_notifier_succeeds() {
        let n = NullNotifier;
        let record = AppointmentRecord::default();
        assert!(n.booking_confirmed(&record).await.is_ok());
    }
}
