//! Application configuration for the eKYC workflow.
//!
//! User config lives at `~/.ekyc/ekyc.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EkycError, Result};
use crate::types::ADULT_AGE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ekyc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ekyc";

// ---------------------------------------------------------------------------
// Config structs (matching ekyc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub onboarding: OnboardingConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database holding registry, customers and policy.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.ekyc/ekyc.db".into()
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Characters on either side of an identity-number candidate searched
    /// for a `VID` marker.
    #[serde(default = "default_vid_window")]
    pub vid_window: usize,

    /// Additional label words that disqualify a capitalized name phrase.
    #[serde(default)]
    pub extra_noise_words: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            vid_window: default_vid_window(),
            extra_noise_words: Vec::new(),
        }
    }
}

fn default_vid_window() -> usize {
    30
}

/// `[onboarding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    /// Customers younger than this go to human review.
    #[serde(default = "default_adult_age")]
    pub adult_age: u32,

    /// Number of policy excerpts consulted per decision.
    #[serde(default = "default_policy_results")]
    pub policy_results: u32,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            adult_age: default_adult_age(),
            policy_results: default_policy_results(),
        }
    }
}

fn default_adult_age() -> u32 {
    ADULT_AGE
}
fn default_policy_results() -> u32 {
    2
}

/// `[notify]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Operator address that receives failure and review notifications.
    #[serde(default = "default_recipient")]
    pub recipient: String,

    /// Webhook receiving notifications as JSON. Log-only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Webhook request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            recipient: default_recipient(),
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_recipient() -> String {
    "onboarding-review@localhost".into()
}
fn default_timeout_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ekyc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| EkycError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ekyc/ekyc.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EkycError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EkycError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EkycError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| EkycError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EkycError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| EkycError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Check that the notification settings are usable.
pub fn validate_notify(config: &NotifyConfig) -> Result<()> {
    if config.recipient.trim().is_empty() {
        return Err(EkycError::config("notify.recipient must not be empty"));
    }
    if let Some(hook) = &config.webhook_url {
        url::Url::parse(hook)
            .map_err(|e| EkycError::config(format!("invalid notify.webhook_url '{hook}': {e}")))?;
    }
    Ok(())
}
