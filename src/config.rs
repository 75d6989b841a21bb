use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_COMPATIBLE_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::OpenAICompatible => "openai-compatible",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Gemini => GEMINI_BASE_URL,
            Provider::OpenAI => OPENAI_BASE_URL,
            Provider::OpenAICompatible => OPENAI_COMPATIBLE_BASE_URL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "openai-compatible" | "ollama" => Ok(Provider::OpenAICompatible),
            other => bail!("Unknown LLM provider: {}", other),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional: cap on generated tokens. Provider default when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }
        match self.provider {
            Provider::Gemini => 8192,
            Provider::OpenAI => 4096,
            Provider::OpenAICompatible => 16384,
        }
    }

    pub fn get_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

fn default_provider() -> Provider {
    Provider::Gemini
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the keys and state files.
    /// Defaults to the platform config dir (e.g. ~/.config/promanis).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_keys_file")]
    pub keys_file: PathBuf,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            keys_file: default_keys_file(),
            state_file: default_state_file(),
        }
    }
}

fn default_keys_file() -> PathBuf {
    PathBuf::from("api_keys.txt")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("config.json")
}

impl PathsConfig {
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::config_dir()
            .map(|d| d.join("promanis"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn keys_path(&self) -> PathBuf {
        self.data_dir().join(&self.keys_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir().join(&self.state_file)
    }
}

impl Settings {
    /// Load config from repo root or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // An explicit path must exist and parse
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        if let Ok(settings) = Self::load_from_path("promanis.toml") {
            debug!("Loaded config from ./promanis.toml");
            return Ok(settings);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("promanis").join("config.toml");
            if let Ok(settings) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(settings);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.llm.provider, Provider::Gemini);
        assert_eq!(settings.llm.model, "gemini-2.0-flash");
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.delay(), Duration::from_secs(2));
        assert_eq!(settings.paths.keys_file, PathBuf::from("api_keys.txt"));
        assert_eq!(settings.paths.state_file, PathBuf::from("config.json"));
    }

    #[test]
    fn test_settings_serialization() {
        let toml_str = toml::to_string(&Settings::default()).unwrap();
        assert!(toml_str.contains("provider = \"gemini\""));
        assert!(toml_str.contains("max_attempts = 5"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[llm]
provider = "openai-compatible"
base_url = "http://127.0.0.1:8080/v1"

[retry]
delay_secs = 0
"#,
        )
        .unwrap();
        assert_eq!(settings.llm.provider, Provider::OpenAICompatible);
        assert_eq!(settings.llm.model, "gemini-2.0-flash");
        assert_eq!(settings.llm.get_base_url(), "http://127.0.0.1:8080/v1");
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.delay(), Duration::ZERO);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result: std::result::Result<Settings, _> = toml::from_str("[llm]\nprovider = \"nope\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_max_tokens_provider_defaults() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.get_max_tokens(), 8192);
        llm.provider = Provider::OpenAI;
        assert_eq!(llm.get_max_tokens(), 4096);
        llm.provider = Provider::OpenAICompatible;
        assert_eq!(llm.get_max_tokens(), 16384);
        llm.max_tokens = Some(2000);
        assert_eq!(llm.get_max_tokens(), 2000);
    }

    #[test]
    fn test_base_url_defaults_per_provider() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.get_base_url(), GEMINI_BASE_URL);
        llm.provider = Provider::OpenAI;
        assert_eq!(llm.get_base_url(), OPENAI_BASE_URL);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::OpenAICompatible);
        let err = "claude".parse::<Provider>().unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_paths_resolve_against_data_dir() {
        let paths = PathsConfig {
            data_dir: Some(PathBuf::from("/tmp/promanis-test")),
            ..PathsConfig::default()
        };
        assert_eq!(paths.keys_path(), PathBuf::from("/tmp/promanis-test/api_keys.txt"));
        assert_eq!(paths.state_path(), PathBuf::from("/tmp/promanis-test/config.json"));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = Settings::load_with_path(Some("/nonexistent/promanis.toml".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("promanis.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "[retry]\nmax_attempts = 0").unwrap();
        let err = Settings::load_with_path(Some(path.to_string_lossy().to_string())).unwrap_err();
        assert!(format!("{:#}", err).contains("max_attempts"));
    }
}
