use anyhow::Result;

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{GeminiClient, OpenAIClient};
use crate::config::{LlmConfig, Provider};

/// Create an LLM client for the configured provider
pub fn create_client(llm: &LlmConfig, dry_run: bool) -> Result<Box<dyn LlmClient>> {
    if dry_run {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let base_url = llm.get_base_url();
    let max_tokens = llm.get_max_tokens();

    match llm.provider {
        Provider::Gemini => Ok(Box::new(GeminiClient::new(
            llm.model.clone(),
            base_url,
            max_tokens,
            llm.timeout_secs,
        )?)),

        Provider::OpenAI | Provider::OpenAICompatible => Ok(Box::new(OpenAIClient::new(
            llm.model.clone(),
            base_url,
            max_tokens,
            llm.timeout_secs,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::SecretString;

    #[tokio::test]
    async fn test_create_mock_client_for_dry_run() {
        let client = create_client(&LlmConfig::default(), true).unwrap();
        let out = client
            .generate(&SecretString::from("k"), "", "hello")
            .await
            .unwrap();
        assert!(out.contains("refined_prompt"));
    }

    #[test]
    fn test_create_gemini_client() {
        assert!(create_client(&LlmConfig::default(), false).is_ok());
    }

    #[test]
    fn test_create_openai_compatible_client() {
        let llm = LlmConfig {
            provider: Provider::OpenAICompatible,
            model: "llama3".to_string(),
            base_url: Some("http://localhost:11434/v1".to_string()),
            ..LlmConfig::default()
        };
        assert!(create_client(&llm, false).is_ok());
    }
}
