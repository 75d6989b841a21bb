//! Retry and key-rotation behaviour of the refiner against a scripted provider.

use async_trait::async_trait;
use promanis::credentials::CredentialStore;
use promanis::error::{ProviderError, RefineError};
use promanis::llm::client::LlmClient;
use promanis::refine::{RefinementRequest, Refiner, RetryPolicy};
use promanis::util::SecretString;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned results in order and records which key each call used.
/// Once the script runs out the last entry repeats.
struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    seen_keys: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<String, ProviderError>>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                seen_keys: Arc::clone(&seen),
            },
            seen,
        )
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(
        &self,
        api_key: &SecretString,
        _system_instruction: &str,
        _content: &str,
    ) -> Result<String, ProviderError> {
        self.seen_keys
            .lock()
            .unwrap()
            .push(api_key.expose().to_string());
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ProviderError::EmptyResponse)),
        }
    }
}

fn rate_limited() -> Result<String, ProviderError> {
    Err(ProviderError::RateLimited {
        status: Some(429),
        message: "RESOURCE_EXHAUSTED".to_string(),
    })
}

fn ok_json(value: &str) -> Result<String, ProviderError> {
    Ok(format!(r#"{{"refined_prompt": "{}"}}"#, value))
}

fn keys(n: usize) -> CredentialStore {
    CredentialStore::in_memory((0..n).map(|i| SecretString::from(format!("k{}", i))).collect())
}

fn refiner(client: ScriptedClient, max_attempts: u32) -> Refiner {
    paced_refiner(client, max_attempts, Duration::ZERO)
}

fn paced_refiner(client: ScriptedClient, max_attempts: u32, delay: Duration) -> Refiner {
    Refiner::new(Box::new(client)).with_policy(RetryPolicy {
        max_attempts,
        delay,
    })
}

fn seen(keys: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    keys.lock().unwrap().clone()
}

#[tokio::test]
async fn test_always_rate_limited_rotates_and_exhausts() {
    let (client, calls) = ScriptedClient::new(vec![rate_limited()]);
    let mut store = keys(3);

    let err = refiner(client, 5)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    assert!(matches!(err, RefineError::Exhausted(5)));
    assert_eq!(err.to_string(), "All API keys exhausted after 5 attempts");
    assert_eq!(seen(&calls), vec!["k0", "k1", "k2", "k0", "k1"]);
    assert_eq!(store.cursor(), 2);
}

#[tokio::test]
async fn test_empty_store_fails_without_calls() {
    let (client, calls) = ScriptedClient::new(vec![ok_json("never")]);
    let mut store = keys(0);

    let err = refiner(client, 5)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(seen(&calls).is_empty());
}

#[tokio::test]
async fn test_blank_key_is_configuration_error() {
    let (client, calls) = ScriptedClient::new(vec![rate_limited()]);
    let mut store = CredentialStore::in_memory(vec![
        SecretString::from("k0"),
        SecretString::from("   "),
    ]);

    let err = refiner(client, 5)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(seen(&calls), vec!["k0"]);
}

#[tokio::test]
async fn test_success_after_rate_limit_uses_next_key() {
    let (client, calls) = ScriptedClient::new(vec![rate_limited(), ok_json("Better prompt")]);
    let mut store = keys(3);

    let out = refiner(client, 5)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap();

    assert_eq!(out, "Better prompt");
    assert_eq!(seen(&calls), vec!["k0", "k1"]);
    assert_eq!(store.cursor(), 2);
}

#[tokio::test]
async fn test_malformed_response_reuses_key() {
    let (client, calls) = ScriptedClient::new(vec![
        Err(ProviderError::MalformedResponse("not json".to_string())),
        Err(ProviderError::EmptyResponse),
        ok_json("Fixed"),
    ]);
    let mut store = keys(3);

    let out = refiner(client, 5)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap();

    assert_eq!(out, "Fixed");
    assert_eq!(seen(&calls), vec!["k0", "k0", "k0"]);
    assert_eq!(store.cursor(), 1);
}

#[tokio::test]
async fn test_malformed_on_last_attempt_is_terminal() {
    let (client, _calls) = ScriptedClient::new(vec![Err(ProviderError::EmptyResponse)]);
    let mut store = keys(2);

    let err = refiner(client, 3)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    match err {
        RefineError::Terminal { attempts, source } => {
            assert_eq!(attempts, 3);
            assert_eq!(source, ProviderError::EmptyResponse);
        }
        other => panic!("expected Terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_other_error_rotates_then_terminal() {
    let api_error = Err(ProviderError::Api {
        status: 500,
        message: "internal".to_string(),
    });
    let (client, calls) = ScriptedClient::new(vec![api_error]);
    let mut store = keys(2);

    let err = refiner(client, 3)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    assert!(matches!(err, RefineError::Terminal { attempts: 3, .. }));
    assert!(err.to_string().starts_with("Failed after 3 attempts"));
    assert_eq!(seen(&calls), vec!["k0", "k1", "k0"]);
}

#[tokio::test]
async fn test_empty_extraction_retries_then_exhausts() {
    let (client, calls) = ScriptedClient::new(vec![ok_json("")]);
    let mut store = keys(2);

    let err = refiner(client, 2)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    assert!(matches!(err, RefineError::Exhausted(2)));
    assert_eq!(seen(&calls), vec!["k0", "k0"]);
}

#[tokio::test]
async fn test_quoted_fallback_is_returned() {
    let (client, _calls) =
        ScriptedClient::new(vec![Ok("Here you go: \"Write a sonnet\" enjoy".to_string())]);
    let mut store = keys(1);

    let out = refiner(client, 1)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap();

    assert_eq!(out, "Write a sonnet");
}

#[tokio::test]
async fn test_cursor_persists_across_requests() {
    let dir = tempfile::TempDir::new().unwrap();
    let keys_path = dir.path().join("api_keys.txt");
    let state_path = dir.path().join("config.json");
    std::fs::write(&keys_path, "k0\nk1\nk2\n").unwrap();

    let (client, calls) = ScriptedClient::new(vec![rate_limited(), ok_json("done")]);
    let mut store = CredentialStore::load(&keys_path, &state_path).unwrap();
    refiner(client, 5)
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap();
    assert_eq!(seen(&calls), vec!["k0", "k1"]);

    let reloaded = CredentialStore::load(&keys_path, &state_path).unwrap();
    assert_eq!(reloaded.cursor(), 2);
}

#[tokio::test]
async fn test_spawned_task_can_be_aborted() {
    struct Hanging;

    #[async_trait]
    impl LlmClient for Hanging {
        async fn generate(
            &self,
            _api_key: &SecretString,
            _system_instruction: &str,
            _content: &str,
        ) -> Result<String, ProviderError> {
            std::future::pending().await
        }
    }

    let handle = Refiner::new(Box::new(Hanging)).spawn(keys(1), RefinementRequest::new("draft"));
    handle.abort();
    let joined = handle.await;
    assert!(joined.unwrap_err().is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_between_attempts() {
    let (client, calls) = ScriptedClient::new(vec![rate_limited()]);
    let mut store = keys(3);
    let started = tokio::time::Instant::now();

    let err = paced_refiner(client, 5, Duration::from_secs(2))
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap_err();

    assert!(matches!(err, RefineError::Exhausted(5)));
    assert_eq!(seen(&calls).len(), 5);
    // Four pauses of two seconds: none before the first attempt, no backoff.
    assert_eq!(started.elapsed(), Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn test_no_delay_before_first_attempt() {
    let (client, _calls) = ScriptedClient::new(vec![ok_json("quick")]);
    let mut store = keys(1);
    let started = tokio::time::Instant::now();

    let out = paced_refiner(client, 5, Duration::from_secs(2))
        .refine(&mut store, &RefinementRequest::new("draft"))
        .await
        .unwrap();

    assert_eq!(out, "quick");
    assert_eq!(started.elapsed(), Duration::ZERO);
}
