use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::time::Duration;
use tracing::info;

use crate::config::{Provider, Settings};
use crate::credentials::{save_keys, CredentialStore};
use crate::llm::factory;
use crate::llm::probe::{looks_like_gemini_key, probe_key, ProbeOutcome, MAX_PROBED_KEYS};

const PROBE_SPACING: Duration = Duration::from_millis(500);

fn load_store(settings: &Settings) -> Result<CredentialStore> {
    let store = CredentialStore::load(&settings.paths.keys_path(), &settings.paths.state_path())?;
    Ok(store)
}

pub fn status(settings: &Settings) -> Result<()> {
    let store = load_store(settings)?;
    println!("Keys file: {}", settings.paths.keys_path().display());
    println!("State file: {}", settings.paths.state_path().display());
    println!("{} API keys, next: #{}", store.len(), store.cursor() + 1);
    for (i, key) in store.credentials().iter().enumerate() {
        let marker = if i == store.cursor() { "→" } else { " " };
        println!("  {} #{:<3} {}", marker, i + 1, key.hint());
    }
    Ok(())
}

pub fn reset(settings: &Settings) -> Result<()> {
    let mut store = load_store(settings)?;
    store.reset();
    println!("Key rotation reset to #1 of {}", store.len());
    Ok(())
}

/// Replace the keys file with the contents of `source` (`-` reads stdin).
pub fn set(settings: &Settings, source: &str) -> Result<()> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read keys from stdin")?;
        buf
    } else {
        fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };

    let keys_path = settings.paths.keys_path();
    let count = save_keys(&keys_path, &text)?;
    println!("Saved {} API keys to {}", count, keys_path.display());
    Ok(())
}

/// Send a tiny request with each of the first few keys and report the result.
pub async fn probe(settings: &Settings, dry_run: bool) -> Result<()> {
    let store = load_store(settings)?;
    let client = factory::create_client(&settings.llm, dry_run)?;
    let check_shape = settings.llm.provider == Provider::Gemini && !dry_run;

    let probed = store.len().min(MAX_PROBED_KEYS);
    info!("Testing {} of {} API keys", probed, store.len());

    let mut usable = 0;
    for (i, key) in store.credentials().iter().take(MAX_PROBED_KEYS).enumerate() {
        if i > 0 {
            tokio::time::sleep(PROBE_SPACING).await;
        }
        let outcome = if check_shape && !looks_like_gemini_key(key.expose()) {
            ProbeOutcome::BadFormat
        } else {
            probe_key(client.as_ref(), key).await
        };
        if outcome.is_usable() {
            usable += 1;
        }
        println!("Key #{} ({}): {}", i + 1, key.hint(), outcome);
    }

    println!();
    println!("{} of {} tested keys usable", usable, probed);
    if store.len() > MAX_PROBED_KEYS {
        println!(
            "Only the first {} keys were tested to avoid rate limits",
            MAX_PROBED_KEYS
        );
    }
    Ok(())
}
