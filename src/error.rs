//! Error types for prompt refinement.

use thiserror::Error;

/// Failures reported by an LLM provider for a single request attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider returned 429 or a quota/rate-limit signal in the body.
    #[error("Rate limited{}: {message}", status_suffix(*status))]
    RateLimited {
        status: Option<u16>,
        message: String,
    },

    /// Response was well-formed but carried no text.
    #[error("Empty response from provider")]
    EmptyResponse,

    /// Response body could not be understood.
    #[error("Invalid response from provider: {0}")]
    MalformedResponse(String),

    /// Any other non-success HTTP status.
    #[error("Provider API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Request never produced an HTTP response.
    #[error("Request failed: {0}")]
    Transport(String),
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

const RATE_LIMIT_MARKERS: &[&str] = &["RESOURCE_EXHAUSTED", "RATE_LIMIT_EXCEEDED"];

impl ProviderError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 || mentions_rate_limit(&body) {
            ProviderError::RateLimited {
                status: Some(status),
                message: body,
            }
        } else {
            ProviderError::Api {
                status,
                message: body,
            }
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ProviderError::EmptyResponse | ProviderError::MalformedResponse(_)
        )
    }
}

/// True when an error message carries a quota or rate-limit marker.
pub fn mentions_rate_limit(message: &str) -> bool {
    RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m))
}

/// Errors surfaced to the caller of a refinement.
#[derive(Error, Debug)]
pub enum RefineError {
    /// Missing or empty credential file, empty credential set, blank entry.
    /// Fatal and never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Prompt text is empty")]
    EmptyPrompt,

    /// Non-retryable outcome on the final attempt.
    #[error("Failed after {attempts} attempts: {source}")]
    Terminal {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("All API keys exhausted after {0} attempts")]
    Exhausted(u32),
}

impl RefineError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, RefineError::Configuration(_))
    }
}
