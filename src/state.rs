//! Persisted JSON state: rotation cursor and AI-platform shortcuts.
//!
//! The file is shared by the credential store (which rewrites the cursor on
//! every rotation) and the platform editor. Both go through `AppState` so a
//! write from one side never drops the other side's fields.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::util::write_atomic;

/// Built-in shortcuts used when the state file has none.
pub const DEFAULT_AI_PLATFORMS: &[(&str, &str)] = &[
    ("ChatGPT (OpenAI)", "https://chat.openai.com/"),
    ("Gemini (Google)", "https://gemini.google.com/app"),
    ("Claude (Anthropic)", "https://claude.ai/"),
    ("Copilot (Microsoft)", "https://copilot.microsoft.com/"),
    ("Perplexity", "https://www.perplexity.ai/"),
    ("Midjourney", "https://www.midjourney.com/app/"),
    ("DALL-E", "https://labs.openai.com/"),
    ("Suno AI", "https://app.suno.ai/"),
    ("Stable Diffusion", "https://stablediffusionweb.com/"),
    ("Pika Labs", "https://pika.art/"),
    ("Sora (OpenAI)", "https://openai.com/sora"),
    ("Google Bard", "https://bard.google.com/"),
    ("You.com", "https://you.com/"),
    ("Cohere", "https://chat.cohere.com/"),
    ("Mistral", "https://chat.mistral.ai/"),
    ("Llama 3 (Meta)", "https://llama.meta.com/"),
    ("Other / Custom", ""),
];

pub fn default_platforms() -> BTreeMap<String, String> {
    DEFAULT_AI_PLATFORMS
        .iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    #[serde(default, deserialize_with = "lenient_index")]
    pub current_api_key_index: usize,

    #[serde(
        default,
        deserialize_with = "lenient_platforms",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub ai_platforms: BTreeMap<String, String>,

    /// Fields written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// Negative, fractional or non-numeric cursors read as 0.
fn lenient_index<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(0))
}

// Non-string URLs read as "". A non-object table reads as empty.
fn lenient_platforms<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let Some(table) = value.as_object() else {
        return Ok(BTreeMap::new());
    };
    Ok(table
        .iter()
        .map(|(name, url)| (name.clone(), url.as_str().unwrap_or_default().to_string()))
        .collect())
}

impl AppState {
    /// Load state, falling back to defaults when the file is missing or corrupt.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!("No state file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable state file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Strict load: `None` when the file is missing, an error when it is
    /// unreadable.
    pub fn try_load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        write_atomic(path, json.as_bytes())
    }

    /// Stored shortcuts, or the built-in table when none are stored.
    pub fn platforms(&self) -> BTreeMap<String, String> {
        if self.ai_platforms.is_empty() {
            default_platforms()
        } else {
            self.ai_platforms.clone()
        }
    }

    /// Insert or replace a shortcut. Editing starts from the effective table
    /// so the first edit keeps the defaults around it.
    pub fn set_platform(&mut self, name: &str, url: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Platform name must not be empty");
        }
        let mut platforms = self.platforms();
        platforms.insert(name.to_string(), url.trim().to_string());
        self.ai_platforms = platforms;
        Ok(())
    }

    /// Returns false when no shortcut had that name.
    pub fn remove_platform(&mut self, name: &str) -> bool {
        let mut platforms = self.platforms();
        let removed = platforms.remove(name.trim()).is_some();
        if removed {
            self.ai_platforms = platforms;
        }
        removed
    }

    pub fn reset_platforms(&mut self) {
        self.ai_platforms.clear();
    }
}
