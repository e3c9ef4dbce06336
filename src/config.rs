use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::upload::UploadTarget;

const DEFAULT_SERVER_URL: &str = "http://localhost:2900/rest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub server_url: String,
    pub worksheet_uuid: String,
    pub after_sort_key: Option<i64>,
    pub auth_token: Option<String>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            worksheet_uuid: String::new(),
            after_sort_key: None,
            auth_token: None,
        }
    }
}

impl UploaderConfig {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "Bundle Uploader", "bundle-uploader")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Reads the config file if present, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BUNDLE_UPLOADER_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(worksheet) = lookup("BUNDLE_UPLOADER_WORKSHEET") {
            self.worksheet_uuid = worksheet;
        }
        if let Some(key) = lookup("BUNDLE_UPLOADER_SORT_KEY") {
            let key = key
                .trim()
                .parse()
                .with_context(|| format!("BUNDLE_UPLOADER_SORT_KEY is not an integer: {}", key))?;
            self.after_sort_key = Some(key);
        }
        if let Some(token) = lookup("BUNDLE_UPLOADER_TOKEN") {
            self.auth_token = Some(token).filter(|t| !t.is_empty());
        }
        Ok(())
    }

    pub fn target(&self) -> UploadTarget {
        UploadTarget {
            worksheet_uuid: self.worksheet_uuid.clone(),
            after_sort_key: self.after_sort_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UploaderConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, UploaderConfig::default());
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"worksheet_uuid": "0xabc", "after_sort_key": 7}"#).unwrap();

        let config = UploaderConfig::load_from(&path).unwrap();
        assert_eq!(config.worksheet_uuid, "0xabc");
        assert_eq!(config.after_sort_key, Some(7));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(UploaderConfig::load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let vars: HashMap<&str, &str> = [
            ("BUNDLE_UPLOADER_SERVER_URL", "https://example.org/rest"),
            ("BUNDLE_UPLOADER_WORKSHEET", "0xdef"),
            ("BUNDLE_UPLOADER_SORT_KEY", " 12 "),
            ("BUNDLE_UPLOADER_TOKEN", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = UploaderConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server_url, "https://example.org/rest");
        assert_eq!(config.target().worksheet_uuid, "0xdef");
        assert_eq!(config.target().after_sort_key, Some(12));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn bad_sort_key_override_is_rejected() {
        let mut config = UploaderConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "BUNDLE_UPLOADER_SORT_KEY").then(|| "first".to_string())
        });
        assert!(result.is_err());
    }
}
