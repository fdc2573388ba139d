//! Runtime configuration.
//!
//! Values come from an optional JSON file and are then overridden by the
//! environment (after `dotenvy` has loaded `.env`). Everything downstream
//! receives the resolved [`AppConfig`]; nothing reads the environment later.
//!
//! ```json
//! {
//!   "data_dir": "data",
//!   "dispatch": {
//!     "sender": "teacher@school.example",
//!     "webhook_url": "https://hooks.example/mail",
//!     "primary_api_key": "SG.xxx",
//!     "throttle_ms": 500
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_SENDER: &str = "noreply@gradebook.local";
const DEFAULT_THROTTLE_MS: u64 = 500;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Credentials and knobs of the notification dispatcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Where local records and artifacts are written. Filled from
    /// [`AppConfig::data_dir`] when loaded through [`AppConfig::load`].
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub sender: String,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    /// SendGrid key.
    pub primary_api_key: Option<String>,
    /// Brevo key.
    pub secondary_api_key: Option<String>,
    /// Chrome/Chromium binary used for PDF artifacts; auto-detected when unset.
    pub pdf_converter: Option<String>,
    pub throttle_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sender: DEFAULT_SENDER.to_string(),
            webhook_url: None,
            webhook_timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
            primary_api_key: None,
            secondary_api_key: None,
            pdf_converter: None,
            throttle_ms: DEFAULT_THROTTLE_MS,
        }
    }
}

impl DispatchConfig {
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub dispatch: DispatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the JSON file at `path` (if any), then applies
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies overrides looked up through `var`, so tests can pass a map
    /// instead of touching the process environment.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("GRADEBOOK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(sender) = var("DEFAULT_FROM_EMAIL") {
            self.dispatch.sender = sender;
        }
        if let Some(url) = var("EMAIL_WEBHOOK_URL") {
            self.dispatch.webhook_url = Some(url);
        }
        if let Some(key) = var("SENDGRID_API_KEY") {
            self.dispatch.primary_api_key = Some(key);
        }
        if let Some(key) = var("BREVO_API_KEY") {
            self.dispatch.secondary_api_key = Some(key);
        }
        if let Some(converter) = var("PDF_CONVERTER") {
            self.dispatch.pdf_converter = Some(converter);
        }
        if let Some(ms) = var("NOTIFY_THROTTLE_MS") {
            match ms.parse() {
                Ok(ms) => self.dispatch.throttle_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring invalid NOTIFY_THROTTLE_MS"),
            }
        }

        self.dispatch.data_dir = self.data_dir.clone();
        debug!(
            data_dir = %self.data_dir.display(),
            webhook = self.dispatch.webhook_url.is_some(),
            primary = self.dispatch.primary_api_key.is_some(),
            secondary = self.dispatch.secondary_api_key.is_some(),
            "Configuration resolved"
        );
        self
    }

    pub fn book_path(&self) -> PathBuf {
        self.data_dir.join("gradebook.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default().with_overrides(|_| None);
        assert_eq!(config.dispatch.sender, DEFAULT_SENDER);
        assert_eq!(config.dispatch.throttle(), Duration::from_millis(500));
        assert_eq!(config.dispatch.webhook_timeout(), Duration::from_secs(10));
        assert_eq!(config.book_path(), PathBuf::from("data/gradebook.json"));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "school", "dispatch": {"sender": "a@b.c", "throttle_ms": 10}}"#,
        )
        .unwrap();

        let file_only = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(file_only.dispatch.throttle_ms, 10);

        let env: HashMap<&str, &str> = HashMap::from([
            ("GRADEBOOK_DATA_DIR", "elsewhere"),
            ("SENDGRID_API_KEY", "SG.key"),
            ("BREVO_API_KEY", "  "),
            ("NOTIFY_THROTTLE_MS", "oops"),
        ]);
        let config = file_only.with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.dispatch.data_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.dispatch.sender, "a@b.c");
        assert_eq!(config.dispatch.primary_api_key.as_deref(), Some("SG.key"));
        assert_eq!(config.dispatch.secondary_api_key, None);
        assert_eq!(config.dispatch.throttle_ms, 10);
    }
}
