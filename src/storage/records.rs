//! Records handed to the persistence sink and the secure store.

use crate::collector::types::Key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored in place of a keystroke typed into a sensitive window.
pub const REDACTION_TOKEN: &str = "[REDACTED]";

/// Password field of every credential record. The typed password is never kept.
pub const PASSWORD_PLACEHOLDER: &str = "REDACTED";

/// One continuous period during which a single window held focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySpan {
    pub session_id: Uuid,
    pub app: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Duration in seconds, measured on the monotonic clock
    pub duration_secs: f64,
}

/// A buffered keystroke: the literal key, or the redaction token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum KeystrokeToken {
    Literal(String),
    Redacted,
}

impl KeystrokeToken {
    pub fn literal(key: &Key) -> Self {
        KeystrokeToken::Literal(key.to_string())
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, KeystrokeToken::Redacted)
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeystrokeToken::Literal(text) => text,
            KeystrokeToken::Redacted => REDACTION_TOKEN,
        }
    }
}

impl From<KeystrokeToken> for String {
    fn from(token: KeystrokeToken) -> Self {
        match token {
            KeystrokeToken::Literal(text) => text,
            KeystrokeToken::Redacted => REDACTION_TOKEN.to_string(),
        }
    }
}

impl From<String> for KeystrokeToken {
    fn from(text: String) -> Self {
        if text == REDACTION_TOKEN {
            KeystrokeToken::Redacted
        } else {
            KeystrokeToken::Literal(text)
        }
    }
}

/// What caused a keystroke flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    /// The buffer reached its capacity
    Size,
    /// The periodic flush timer fired
    Timer,
    /// Final flush while the pipeline stops
    Shutdown,
}

/// Keystroke tokens written together in one flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeBatch {
    pub session_id: Uuid,
    pub flushed_at: DateTime<Utc>,
    pub trigger: FlushTrigger,
    pub tokens: Vec<KeystrokeToken>,
}

impl KeystrokeBatch {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A detected idle episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleEvent {
    pub detected_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Credential entry extracted from a sensitive window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub password: String,
    pub app: String,
    pub title: String,
}

impl CredentialRecord {
    pub fn new(username: String, app: String, title: String) -> Self {
        Self {
            timestamp: Utc::now(),
            username,
            password: PASSWORD_PLACEHOLDER.to_string(),
            app,
            title,
        }
    }
}
