use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const CONSENT_FILE: &str = "gdpr_consent.json";

/// Processing consents recorded by the school.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentSettings {
    pub consent_storage: bool,
    pub consent_email: bool,
    pub consent_stats: bool,
    pub consent_retention: bool,
    pub gdpr_contact_name: String,
    pub gdpr_contact_email: String,
    pub updated_at: Option<String>,
}

impl ConsentSettings {
    /// Missing file means nothing was consented to.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONSENT_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid {}", path.display()))
    }

    /// Stamps `updated_at` and writes the settings.
    pub fn save(&mut self, data_dir: &Path) -> Result<()> {
        self.updated_at = Some(Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string());
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(CONSENT_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), "Consent settings saved");
        Ok(())
    }

    pub fn has_storage_consent(&self) -> bool {
        self.consent_storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        assert!(!ConsentSettings::load(dir.path()).unwrap().has_storage_consent());

        let mut settings = ConsentSettings {
            consent_storage: true,
            gdpr_contact_name: "Office".to_string(),
            ..Default::default()
        };
        settings.save(dir.path()).unwrap();

        let loaded = ConsentSettings::load(dir.path()).unwrap();
        assert!(loaded.has_storage_consent());
        assert!(loaded.updated_at.is_some());
        assert_eq!(loaded, settings);
    }
}
