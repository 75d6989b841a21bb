pub mod config_check;
pub mod keys;
pub mod platforms;
pub mod refine;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Settings;

/// Load settings and apply the global `--data-dir` override.
pub fn load_settings(config_path: Option<String>, data_dir: Option<PathBuf>) -> Result<Settings> {
    let mut settings = Settings::load_with_path(config_path)?;
    if let Some(dir) = data_dir {
        info!("CLI override: data_dir = {}", dir.display());
        settings.paths.data_dir = Some(dir);
    }
    Ok(settings)
}
