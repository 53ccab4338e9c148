use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Advisory text for one treatment.
///
/// Display-only. Nothing downstream persists it into the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub text: String,

    /// Free-form metadata (model name, latency, ...).
    pub metadata: JsonValue,
}

impl Advisory {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: JsonValue::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("advisory generator is not configured")]
    NotConfigured,

    #[error("invalid advisory input: {0}")]
    InvalidInput(String),

    #[error("advisory generation failed: {0}")]
    GenerationFailed(String),
}
