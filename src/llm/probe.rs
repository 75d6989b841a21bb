//! Live key checks: one tiny request per key to see whether the provider
//! accepts it.

use std::fmt;

use super::client::LlmClient;
use crate::error::ProviderError;
use crate::util::SecretString;

pub const PROBE_CONTENT: &str = "Test connection";

/// Only the first few keys are probed so a large pool does not trip quotas.
pub const MAX_PROBED_KEYS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Valid(String),
    Invalid,
    /// Quota hit; the key itself is probably fine.
    RateLimited,
    Forbidden,
    BadFormat,
    Error(String),
}

impl ProbeOutcome {
    /// Whether the key should be considered usable.
    pub fn is_usable(&self) -> bool {
        matches!(self, ProbeOutcome::Valid(_) | ProbeOutcome::RateLimited)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Valid(preview) => write!(f, "✓ Valid (Response: {}...)", preview),
            ProbeOutcome::Invalid => write!(f, "✗ Invalid API key"),
            ProbeOutcome::RateLimited => write!(f, "⚠ Rate limited (key may be valid)"),
            ProbeOutcome::Forbidden => write!(f, "✗ Access forbidden"),
            ProbeOutcome::BadFormat => {
                write!(f, "✗ Invalid format (should start with 'AIzaSy' and be 39 chars)")
            }
            ProbeOutcome::Error(msg) => write!(f, "✗ Error - {}", msg),
        }
    }
}

/// Shape check for Google API keys.
pub fn looks_like_gemini_key(key: &str) -> bool {
    key.starts_with("AIzaSy") && key.chars().count() == 39
}

pub async fn probe_key(client: &dyn LlmClient, key: &SecretString) -> ProbeOutcome {
    match client.generate(key, "", PROBE_CONTENT).await {
        Ok(text) => ProbeOutcome::Valid(text.chars().take(50).collect()),
        Err(err) => classify(&err),
    }
}

fn classify(err: &ProviderError) -> ProbeOutcome {
    match err {
        ProviderError::RateLimited { .. } => ProbeOutcome::RateLimited,
        ProviderError::Api { status: 401, .. } => ProbeOutcome::Invalid,
        ProviderError::Api { message, .. } if message.contains("PERMISSION_DENIED") => {
            ProbeOutcome::Invalid
        }
        ProviderError::Api { status: 403, .. } => ProbeOutcome::Forbidden,
        // Gemini reports a bad key as 400 API_KEY_INVALID
        ProviderError::Api { status: 400, message } if message.contains("API_KEY_INVALID") => {
            ProbeOutcome::Invalid
        }
        ProviderError::EmptyResponse | ProviderError::MalformedResponse(_) => {
            ProbeOutcome::Error("Invalid response".to_string())
        }
        other => ProbeOutcome::Error(other.to_string()),
    }
}
