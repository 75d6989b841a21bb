use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Settings;
use crate::credentials::{Credential, CredentialStore};
use crate::llm::factory;
use crate::refine::{
    decorate_for_display, DetailLevel, Language, OutputType, RefinementRequest, Refiner,
    RetryPolicy, Scope,
};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    settings: Settings,
    prompt: Option<String>,
    file: Option<PathBuf>,
    context: Option<String>,
    context_file: Option<PathBuf>,
    language: String,
    scope: String,
    output_type: String,
    detail: String,
    decorate: bool,
    dry_run: bool,
    model_override: Option<String>,
    max_attempts_override: Option<u32>,
) -> Result<()> {
    let mut settings = settings;

    if let Some(ref model) = model_override {
        info!("CLI override: model = {}", model);
        settings.llm.model = model.clone();
    }
    if let Some(attempts) = max_attempts_override {
        info!("CLI override: max_attempts = {}", attempts);
        settings.retry.max_attempts = attempts;
    }
    settings.validate()?;

    let prompt = read_prompt(prompt, file.as_deref())?;
    let context = match (context, context_file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read context file {}", path.display()))?,
        (None, None) => String::new(),
    };

    let request = RefinementRequest::new(prompt)
        .with_context(context)
        .with_language(language.parse::<Language>()?)
        .with_scope(Scope::from_label(&scope))
        .with_output_type(output_type.parse::<OutputType>()?)
        .with_detail(detail.parse::<DetailLevel>()?);

    info!(
        "Refining with {} ({}): language={}, scope={}, type={}, detail={}",
        settings.llm.provider,
        settings.llm.model,
        request.language,
        request.scope,
        request.output_type,
        request.detail
    );
    info!("Dry run: {}", dry_run);

    let store = open_store(&settings, dry_run)?;
    let client = factory::create_client(&settings.llm, dry_run)?;
    let refiner = Refiner::new(client).with_policy(RetryPolicy::from(&settings.retry));

    let mut handle = refiner.spawn(store, request);
    let outcome = tokio::select! {
        joined = &mut handle => joined.context("Refinement task failed")?,
        _ = tokio::signal::ctrl_c() => {
            handle.abort();
            bail!("Interrupted");
        }
    };
    let refined = outcome?;

    if decorate {
        println!("{}", decorate_for_display(&refined));
    } else {
        println!("{}", refined);
    }
    Ok(())
}

/// Prompt from the argument, then `--file`, then piped stdin.
fn read_prompt(prompt: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(prompt) = prompt {
        return Ok(prompt);
    }
    if let Some(path) = file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file {}", path.display()));
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("No prompt given. Pass it as an argument, with --file, or on stdin");
    }
    let mut buf = String::new();
    stdin
        .lock()
        .read_to_string(&mut buf)
        .context("Failed to read prompt from stdin")?;
    Ok(buf)
}

/// Dry runs rotate through an in-memory copy so the persisted cursor and
/// state file stay untouched.
fn open_store(settings: &Settings, dry_run: bool) -> Result<CredentialStore> {
    let keys_path = settings.paths.keys_path();
    let state_path = settings.paths.state_path();
    match CredentialStore::load(&keys_path, &state_path) {
        Ok(store) if dry_run => Ok(CredentialStore::in_memory(store.credentials().to_vec())),
        Ok(store) => Ok(store),
        Err(e) if dry_run => {
            warn!("{}; dry run continues with a placeholder key", e);
            Ok(CredentialStore::in_memory(vec![Credential::from(
                "dry-run-key",
            )]))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.paths.data_dir = Some(dir.path().to_path_buf());
        settings
    }

    #[test]
    fn test_read_prompt_prefers_argument() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.txt");
        fs::write(&path, "from file").unwrap();
        let got = read_prompt(Some("from arg".into()), Some(&path)).unwrap();
        assert_eq!(got, "from arg");
        let got = read_prompt(None, Some(&path)).unwrap();
        assert_eq!(got, "from file");
    }

    #[test]
    fn test_open_store_missing_keys() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        assert!(open_store(&settings, false).is_err());
        let store = open_store(&settings, true).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_run_dry_run() {
        let dir = TempDir::new().unwrap();
        let result = run(
            settings_in(&dir),
            Some("write a limerick".into()),
            None,
            None,
            None,
            "English".into(),
            "Poetry".into(),
            "text".into(),
            "Simple".into(),
            true,
            true,
            None,
            Some(1),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        fs::write(settings.paths.keys_path(), "k0\nk1\nk2\n").unwrap();

        run(
            settings.clone(),
            Some("draft".into()),
            None,
            None,
            None,
            "English".into(),
            "General".into(),
            "text".into(),
            "Detailed".into(),
            false,
            true,
            None,
            Some(1),
        )
        .await
        .unwrap();

        assert!(!settings.paths.state_path().exists());
        let store = CredentialStore::load(&settings.paths.keys_path(), &settings.paths.state_path())
            .unwrap();
        assert_eq!(store.cursor(), 0);
    }

    #[test]
    fn test_dry_run_store_is_detached() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        fs::write(settings.paths.keys_path(), "k0\nk1\n").unwrap();

        let mut store = open_store(&settings, true).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.keys_path().is_none());
        store.next().unwrap();
        assert!(!settings.paths.state_path().exists());
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_language() {
        let dir = TempDir::new().unwrap();
        let result = run(
            settings_in(&dir),
            Some("x".into()),
            None,
            None,
            None,
            "Klingon".into(),
            "General".into(),
            "text".into(),
            "Detailed".into(),
            false,
            true,
            None,
            None,
        )
        .await;
        assert!(result.is_err());
    }
}
