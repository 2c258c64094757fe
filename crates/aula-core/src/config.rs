//! YAML configuration for the assistant. Every external endpoint is
//! optional: a missing recognizer puts the router in degraded mode, a
//! missing knowledge base or notifier degrades to the null implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::http::{HttpKnowledgeBase, HttpNotifier, HttpRecognizer};
use crate::services::{NullKnowledgeBase, NullNotifier, NullRecognizer, Services};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpServiceConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AulaConfig {
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default)]
    pub recognizer: Option<HttpServiceConfig>,
    #[serde(default)]
    pub knowledge_base: Option<HttpServiceConfig>,
    #[serde(default)]
    pub notifier: Option<HttpServiceConfig>,
}

impl Default for AulaConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            recognizer: None,
            knowledge_base: None,
            notifier: None,
        }
    }
}

impl AulaConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }

    /// Build the external-service set this config describes. Unconfigured
    /// services fall back to null implementations.
    pub fn build_services(&self) -> Result<Services> {
        let recognizer: Arc<dyn crate::services::IntentRecognizer> = match &self.recognizer {
            Some(cfg) => Arc::new(HttpRecognizer::new(cfg)?),
            None => {
                info!("no recognizer configured, router will run in degraded mode");
                Arc::new(NullRecognizer)
            }
        };
        let knowledge_base: Arc<dyn crate::services::KnowledgeBase> = match &self.knowledge_base {
            Some(cfg) => Arc::new(HttpKnowledgeBase::new(cfg)?),
            None => Arc::new(NullKnowledgeBase),
        };
        let notifier: Arc<dyn crate::services::BookingNotifier> = match &self.notifier {
            Some(cfg) => Arc::new(HttpNotifier::new(cfg)?),
            None => Arc::new(NullNotifier),
        };
        Ok(Services {
            recognizer,
            knowledge_base,
            notifier,
        })
    }
}

fn default_store_path() -> String {
    "aula.db".to_string()
}

fn default_timeout() -> u64 {
    10
}
