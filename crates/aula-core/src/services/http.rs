//! reqwest-backed implementations of the external service traits.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aula_schema::{ExtractedEntities, IntentKind, KbAnswer, RecognizedIntent};
use serde::{Deserialize, Serialize};

use super::{BookingNotifier, IntentRecognizer, KnowledgeBase};
use crate::config::HttpServiceConfig;
use crate::records::AppointmentRecord;

fn build_client(cfg: &HttpServiceConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_seconds))
        .build()
        .context("failed to build http client")
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    utterance: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    top_intent: String,
    confidence: f32,
    #[serde(default)]
    entities: ExtractedEntities,
}

/// HTTP intent classifier client.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRecognizer {
    pub fn new(cfg: &HttpServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

fn intent_from_label(label: &str) -> IntentKind {
    match label {
        "book_appointment" => IntentKind::BookAppointment,
        "student_letter" => IntentKind::StudentLetter,
        "office_hours" => IntentKind::OfficeHours,
        "qna" => IntentKind::Qna,
        _ => IntentKind::None,
    }
}

#[async_trait]
impl IntentRecognizer for HttpRecognizer {
    async fn recognize(&self, utterance: &str) -> Result<RecognizedIntent> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .json(&RecognizeRequest { utterance });
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", key);
        }
        let resp: RecognizeResponse = req
            .send()
            .await
            .context("recognizer request failed")?
            .error_for_status()
            .context("recognizer returned an error status")?
            .json()
            .await
            .context("recognizer returned malformed json")?;

        Ok(RecognizedIntent {
            intent: intent_from_label(&resp.top_intent),
            raw_label: resp.top_intent,
            confidence: resp.confidence,
            entities: resp.entities,
        })
    }
}

#[derive(Serialize)]
struct KbRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct KbResponse {
    #[serde(default)]
    answers: Vec<KbAnswer>,
}

/// HTTP knowledge-base client.
pub struct HttpKnowledgeBase {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpKnowledgeBase {
    pub fn new(cfg: &HttpServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn query(&self, question: &str) -> Result<Vec<KbAnswer>> {
        let mut req = self.client.post(&self.endpoint).json(&KbRequest { question });
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", key);
        }
        let resp: KbResponse = req
            .send()
            .await
            .context("knowledge base request failed")?
            .error_for_status()
            .context("knowledge base returned an error status")?
            .json()
            .await
            .context("knowledge base returned malformed json")?;
        Ok(resp.answers)
    }
}

/// HTTP booking-notification client (email service behind an endpoint).
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(cfg: &HttpServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl BookingNotifier for HttpNotifier {
    async fn booking_confirmed(&self, record: &AppointmentRecord) -> Result<()> {
        let mut req = self.client.post(&self.endpoint).json(record);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", key);
        }
        req.send()
            .await
            .context("notifier request failed")?
            .error_for_status()
            .context("notifier returned an error status")?;
        Ok(())
    }
}
