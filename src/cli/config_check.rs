use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::config::{Provider, Settings};
use crate::credentials::CredentialStore;
use crate::llm::probe::looks_like_gemini_key;

struct CheckResult {
    passed: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            passed: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

pub fn run(config_path: Option<String>, data_dir: Option<PathBuf>) -> Result<()> {
    let mut results = CheckResult::new();

    // 1. Load settings
    let settings = match super::load_settings(config_path.clone(), data_dir) {
        Ok(settings) => {
            let source = config_path.as_deref().unwrap_or("default search path");
            results.pass(format!("Config loaded from {}", source));
            settings
        }
        Err(e) => {
            // Reported through print_results, not propagated.
            results.error(format!("Failed to load config: {:#}", e));
            print_results(&results);
            return Ok(());
        }
    };

    check_settings(&settings, &mut results);

    print_results(&results);

    if !results.errors.is_empty() {
        anyhow::bail!("{} config error(s) found", results.errors.len());
    }

    Ok(())
}

fn check_settings(settings: &Settings, results: &mut CheckResult) {
    // 2. Provider
    results.pass(format!(
        "LLM provider: {} (model: {})",
        settings.llm.provider, settings.llm.model
    ));
    if settings.llm.provider == Provider::OpenAICompatible && settings.llm.base_url.is_none() {
        results.warn(format!(
            "openai-compatible provider without base_url, will use default {}",
            settings.llm.get_base_url()
        ));
    }
    if settings.llm.timeout_secs < 10 {
        results.warn(format!(
            "Request timeout {}s is very short for long refinements",
            settings.llm.timeout_secs
        ));
    }

    // 3. Retry policy
    results.pass(format!(
        "Retry: max_attempts={}, delay={}s",
        settings.retry.max_attempts, settings.retry.delay_secs
    ));
    if settings.retry.delay_secs == 0 {
        results.warn("retry.delay_secs = 0 sends retries back to back");
    }

    // 4. Data directory
    let data_dir = settings.paths.data_dir();
    if data_dir.is_dir() {
        results.pass(format!("Data directory: {}", data_dir.display()));
    } else {
        results.warn(format!(
            "Data directory {} does not exist yet",
            data_dir.display()
        ));
    }

    // 5. Keys
    let keys_path = settings.paths.keys_path();
    let state_path = settings.paths.state_path();
    match CredentialStore::load(&keys_path, &state_path) {
        Ok(store) => {
            results.pass(format!(
                "{} API keys in {}",
                store.len(),
                keys_path.display()
            ));
            if settings.llm.provider == Provider::Gemini {
                let odd: Vec<String> = store
                    .credentials()
                    .iter()
                    .enumerate()
                    .filter(|(_, key)| !looks_like_gemini_key(key.expose()))
                    .map(|(i, _)| format!("#{}", i + 1))
                    .collect();
                if !odd.is_empty() {
                    results.warn(format!(
                        "Keys {} do not look like Gemini keys (AIzaSy..., 39 chars)",
                        odd.join(", ")
                    ));
                }
            }
            if (store.len() as u32) > settings.retry.max_attempts {
                results.warn(format!(
                    "{} keys but only {} attempts per request; later keys are reached on later requests",
                    store.len(),
                    settings.retry.max_attempts
                ));
            }
        }
        Err(e) => results.error(e.to_string()),
    }

    // 6. State file
    if state_path.exists() {
        match fs::read_to_string(&state_path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).map_err(Into::into))
        {
            Ok(_) => results.pass(format!("State file: {}", state_path.display())),
            Err(e) => results.warn(format!(
                "State file {} is unreadable and will be reset: {}",
                state_path.display(),
                e
            )),
        }
    } else {
        results.pass("No state file yet, rotation starts at key #1");
    }
}

fn print_results(results: &CheckResult) {
    println!();
    for msg in &results.passed {
        println!("  \u{2713} {}", msg);
    }
    for msg in &results.warnings {
        println!("  ! {}", msg);
    }
    for msg in &results.errors {
        println!("  \u{2717} {}", msg);
    }
    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        results.passed.len(),
        results.warnings.len(),
        results.errors.len()
    );
}
