//! Settings loading: explicit path, working-directory file, defaults.

use anyhow::Result;
use promanis::config::{Provider, Settings};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Restores the working directory on drop.
struct CwdGuard {
    saved: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &TempDir) -> Self {
        let saved = env::current_dir().unwrap();
        env::set_current_dir(dir.path()).unwrap();
        Self { saved }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.saved);
    }
}

#[test]
fn test_settings_have_defaults() -> Result<()> {
    let settings = Settings::default();

    assert_eq!(settings.llm.provider, Provider::Gemini);
    assert!(!settings.llm.model.is_empty());
    assert!(settings.retry.max_attempts >= 1);
    assert!(settings.paths.keys_path().ends_with("api_keys.txt"));

    Ok(())
}

#[test]
fn test_explicit_path_is_used() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[llm]
provider = "openai-compatible"
model = "llama3"
base_url = "http://localhost:11434/v1"

[retry]
max_attempts = 2
delay_secs = 0

[paths]
data_dir = "/tmp/promanis-data"
"#,
    )?;

    let settings = Settings::load_with_path(Some(path.to_string_lossy().to_string()))?;
    assert_eq!(settings.llm.provider, Provider::OpenAICompatible);
    assert_eq!(settings.llm.model, "llama3");
    assert_eq!(settings.retry.max_attempts, 2);
    assert_eq!(
        settings.paths.state_path(),
        PathBuf::from("/tmp/promanis-data/config.json")
    );
    Ok(())
}

#[test]
fn test_explicit_missing_path_fails() {
    let result = Settings::load_with_path(Some("/nonexistent/promanis.toml".to_string()));
    assert!(result.is_err());
}

#[test]
fn test_zero_attempts_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[retry]\nmax_attempts = 0\n")?;

    let result = Settings::load_with_path(Some(path.to_string_lossy().to_string()));
    assert!(result.is_err());
    Ok(())
}

#[test]
#[serial]
fn test_working_directory_file_is_found() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("promanis.toml"),
        "[llm]\nmodel = \"gemini-1.5-pro\"\n",
    )?;
    let _guard = CwdGuard::enter(&dir);

    let settings = Settings::load()?;
    assert_eq!(settings.llm.model, "gemini-1.5-pro");
    assert_eq!(settings.llm.provider, Provider::Gemini);
    Ok(())
}

#[test]
#[serial]
fn test_invalid_working_directory_file_is_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("promanis.toml"), "this is = = not toml")?;
    let _guard = CwdGuard::enter(&dir);

    // Falls through to the user config dir or defaults.
    assert!(Settings::load().is_ok());
    Ok(())
}
