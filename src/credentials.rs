//! Credential store: an ordered pool of API keys with a persisted
//! round-robin cursor.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::RefineError;
use crate::state::AppState;
use crate::util::{write_atomic, SecretString};

pub type Credential = SecretString;

/// Parse a keys file: one credential per line, blank and `#` lines skipped.
pub fn parse_credentials(text: &str) -> Vec<Credential> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Credential::from)
        .collect()
}

/// Rewrite the whole keys file. Refuses text without a single usable key.
pub fn save_keys(keys_path: &Path, text: &str) -> Result<usize, RefineError> {
    let count = parse_credentials(text).len();
    if count == 0 {
        return Err(RefineError::Configuration(
            "No valid API keys found. Enter at least one key.".to_string(),
        ));
    }
    let mut contents = text.trim().to_string();
    contents.push('\n');
    write_atomic(keys_path, contents.as_bytes()).map_err(|e| {
        RefineError::Configuration(format!(
            "Failed to write {}: {:#}",
            keys_path.display(),
            e
        ))
    })?;
    info!("Saved {} API keys to {}", count, keys_path.display());
    Ok(count)
}

#[derive(Debug)]
pub struct CredentialStore {
    credentials: Vec<Credential>,
    cursor: usize,
    keys_path: Option<PathBuf>,
    state_path: Option<PathBuf>,
}

impl CredentialStore {
    /// Load keys from `keys_path` and restore the cursor from `state_path`.
    pub fn load(keys_path: &Path, state_path: &Path) -> Result<Self, RefineError> {
        if !keys_path.exists() {
            return Err(RefineError::Configuration(format!(
                "API key file not found: {}",
                keys_path.display()
            )));
        }
        let text = fs::read_to_string(keys_path).map_err(|e| {
            RefineError::Configuration(format!(
                "Failed to read {}: {}",
                keys_path.display(),
                e
            ))
        })?;
        let credentials = parse_credentials(&text);
        if credentials.is_empty() {
            return Err(RefineError::Configuration(format!(
                "{} is empty or contains no valid API keys",
                keys_path.display()
            )));
        }
        info!(
            "Loaded {} API keys from {}",
            credentials.len(),
            keys_path.display()
        );

        let stored = AppState::load(state_path).current_api_key_index;
        let cursor = if stored < credentials.len() {
            stored
        } else {
            debug!(
                "Stored key index {} out of range for {} keys, starting at 0",
                stored,
                credentials.len()
            );
            0
        };

        Ok(Self {
            credentials,
            cursor,
            keys_path: Some(keys_path.to_path_buf()),
            state_path: Some(state_path.to_path_buf()),
        })
    }

    /// A store with no backing files. An empty set is accepted here; `next`
    /// reports it.
    pub fn in_memory(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            cursor: 0,
            keys_path: None,
            state_path: None,
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn keys_path(&self) -> Option<&Path> {
        self.keys_path.as_deref()
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Return the credential at the cursor, advance, and persist the cursor.
    /// A failed write is logged; rotation continues in memory.
    pub fn next(&mut self) -> Result<Credential, RefineError> {
        let (index, credential) = self.advance()?;
        debug!("Using API key index {}", index);
        if let Err(e) = self.persist() {
            warn!("Failed to persist key index: {:#}", e);
        }
        Ok(credential)
    }

    fn advance(&mut self) -> Result<(usize, Credential), RefineError> {
        if self.credentials.is_empty() {
            return Err(RefineError::Configuration(
                "No API keys available".to_string(),
            ));
        }
        if self.cursor >= self.credentials.len() {
            self.cursor = 0;
        }
        let index = self.cursor;
        let credential = &self.credentials[index];
        if credential.is_blank() {
            return Err(RefineError::Configuration(format!(
                "API key at index {} is empty or invalid",
                index
            )));
        }
        let credential = credential.clone();
        self.cursor = (index + 1) % self.credentials.len();
        Ok((index, credential))
    }

    /// Write the cursor into the state file, keeping its other fields.
    /// An unreadable state file is left untouched and reported.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let mut state = AppState::try_load(path)?.unwrap_or_default();
        state.current_api_key_index = self.cursor;
        state.save(path)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        if let Err(e) = self.persist() {
            warn!("Failed to persist key index: {:#}", e);
        }
    }
}
