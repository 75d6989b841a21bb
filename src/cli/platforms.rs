use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;

use crate::config::Settings;
use crate::state::AppState;

fn find<'a>(platforms: &'a BTreeMap<String, String>, name: &str) -> Option<(&'a str, &'a str)> {
    let wanted = name.trim();
    platforms
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(wanted))
        .map(|(n, url)| (n.as_str(), url.as_str()))
}

pub fn list(settings: &Settings) -> Result<()> {
    let state = AppState::load(&settings.paths.state_path());
    let platforms = state.platforms();
    let width = platforms.keys().map(|n| n.chars().count()).max().unwrap_or(0);
    for (name, url) in &platforms {
        let url = if url.is_empty() { "-" } else { url.as_str() };
        println!("{:<width$}  {}", name, url, width = width);
    }
    Ok(())
}

pub fn set(settings: &Settings, name: &str, url: &str) -> Result<()> {
    let path = settings.paths.state_path();
    let mut state = AppState::load(&path);
    state.set_platform(name, url)?;
    state.save(&path)?;
    println!("Saved platform '{}'", name.trim());
    Ok(())
}

pub fn remove(settings: &Settings, name: &str) -> Result<()> {
    let path = settings.paths.state_path();
    let mut state = AppState::load(&path);
    let platforms = state.platforms();
    let Some((stored, _)) = find(&platforms, name) else {
        bail!("No platform named '{}'", name.trim());
    };
    state.remove_platform(stored);
    state.save(&path)?;
    println!("Removed platform '{}'", stored);
    Ok(())
}

pub fn reset(settings: &Settings) -> Result<()> {
    let path = settings.paths.state_path();
    let mut state = AppState::load(&path);
    state.reset_platforms();
    state.save(&path)?;
    println!("Platforms reset to defaults");
    Ok(())
}

/// Open the platform's page in the default browser.
pub fn open(settings: &Settings, name: &str) -> Result<()> {
    let state = AppState::load(&settings.paths.state_path());
    let platforms = state.platforms();
    let Some((stored, url)) = find(&platforms, name) else {
        bail!("No platform named '{}'", name.trim());
    };
    if url.is_empty() {
        bail!("Platform '{}' has no URL", stored);
    }
    println!("{}", url);
    open::that(url).with_context(|| format!("Failed to open {}", url))?;
    Ok(())
}
