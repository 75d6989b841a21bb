use async_trait::async_trait;

use crate::error::ProviderError;
use crate::util::SecretString;

/// One text-generation request per call. The key is supplied per call so a
/// single client can serve every credential in the rotation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        api_key: &SecretString,
        system_instruction: &str,
        content: &str,
    ) -> Result<String, ProviderError>;
}

/// Offline client for `--dry-run`: answers in the JSON shape the refinement
/// instruction asks for.
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        _api_key: &SecretString,
        system_instruction: &str,
        content: &str,
    ) -> Result<String, ProviderError> {
        if content.starts_with("Test connection") {
            return Ok("Connection OK".to_string());
        }

        let opener = if system_instruction.contains("Tulis seluruh jawaban dalam Bahasa Indonesia")
        {
            "Tulis seluruh jawaban dalam Bahasa Indonesia."
        } else if system_instruction.contains("Respond entirely in English") {
            "Respond entirely in English."
        } else {
            ""
        };

        let refined = format!(
            "{}\nContext: {}\nExpectation: a clear, complete answer.",
            opener,
            content.trim()
        );
        serde_json::to_string(&serde_json::json!({ "refined_prompt": refined.trim() }))
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}
