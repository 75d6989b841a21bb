pub mod instruction;
pub mod request;
pub mod response;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::credentials::{Credential, CredentialStore};
use crate::error::RefineError;
use crate::llm::client::LlmClient;

pub use instruction::{build_system_instruction, FreshnessNonce};
pub use request::{DetailLevel, Language, OutputType, RefinementRequest, Scope};
pub use response::{decorate_for_display, extract, extract_refined_prompt, ExtractionStage};

/// Bounded attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
        }
    }
}

pub struct Refiner {
    client: Box<dyn LlmClient>,
    policy: RetryPolicy,
}

impl Refiner {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Refine `request.prompt`, rotating through `store` on rate limits.
    ///
    /// Rate limits and other provider errors move to the next key. A
    /// malformed or empty reply retries with the same key. Credential
    /// problems stop the loop at once.
    pub async fn refine(
        &self,
        store: &mut CredentialStore,
        request: &RefinementRequest,
    ) -> Result<String, RefineError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(RefineError::EmptyPrompt);
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut reuse: Option<(usize, Credential)> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.policy.delay.is_zero() {
                tokio::time::sleep(self.policy.delay).await;
            }

            let (index, key) = match reuse.take() {
                Some(pair) => pair,
                None => {
                    let index = store.cursor();
                    (index, store.next()?)
                }
            };

            info!(
                "Attempt {}/{} using API key #{} ({})",
                attempt,
                max_attempts,
                index + 1,
                key.hint()
            );

            let nonce = FreshnessNonce::generate(prompt);
            let instruction = build_system_instruction(request, &nonce);
            let last = attempt == max_attempts;

            match self.client.generate(&key, &instruction, prompt).await {
                Ok(raw) => {
                    debug!("Raw response: {}", raw);
                    let extracted = extract(&raw);
                    debug!(
                        "Extracted ({:?}): {}",
                        extracted.stage, extracted.value
                    );
                    if !extracted.value.trim().is_empty() {
                        return Ok(extracted.value);
                    }
                    warn!("Provider returned an empty refined prompt");
                    if !last {
                        reuse = Some((index, key));
                    }
                }
                Err(err) if err.is_rate_limit() => {
                    warn!("Rate limited on key #{}: {}", index + 1, err);
                }
                Err(err) if err.is_malformed() => {
                    if last {
                        return Err(RefineError::Terminal {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    warn!("{}; retrying with the same key", err);
                    reuse = Some((index, key));
                }
                Err(err) => {
                    if last {
                        return Err(RefineError::Terminal {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    warn!("Attempt {} failed: {}", attempt, err);
                }
            }
        }

        Err(RefineError::Exhausted(max_attempts))
    }

    /// Run one refinement on its own task. Aborting the handle cancels it.
    pub fn spawn(
        self,
        mut store: CredentialStore,
        request: RefinementRequest,
    ) -> JoinHandle<Result<String, RefineError>> {
        tokio::spawn(async move { self.refine(&mut store, &request).await })
    }
}
