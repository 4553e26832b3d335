// SPDX-License-Identifier: AGPL-3.0-or-later
//! File-backed settings store
//!
//! ```toml
//! [values]
//! admin_username = "admin"
//! primary_ip = "10.0.0.10"
//!
//! [[labeled]]
//! label = "psn_fqdn"
//! value = "psn-1.example.com"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{label_in_family, SettingsProvider};
use crate::error::{BootstrapError, Result};

/// A value tagged with a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSetting {
    /// Label, either a family name or `<family>/<suffix>`
    pub label: String,
    /// Raw value
    #[serde(default)]
    pub value: String,
}

/// Settings store loaded from a TOML document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSettings {
    /// Plain key/value settings
    #[serde(default)]
    pub values: BTreeMap<String, String>,

    /// Labeled settings, kept in document order
    #[serde(default)]
    pub labeled: Vec<LabeledSetting>,
}

impl FileSettings {
    /// Load the settings store from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BootstrapError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse the settings store from TOML content
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Start an in-memory settings store
    pub fn builder() -> FileSettingsBuilder {
        FileSettingsBuilder::default()
    }
}

impl SettingsProvider for FileSettings {
    fn get(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| BootstrapError::ConfigMissing {
                key: key.to_string(),
            })
    }

    fn list_by_label(&self, family: &str) -> Result<Vec<String>> {
        Ok(self
            .labeled
            .iter()
            .filter(|setting| label_in_family(&setting.label, family))
            .map(|setting| setting.value.clone())
            .collect())
    }
}

/// Builder for in-memory settings stores
#[derive(Debug, Default)]
pub struct FileSettingsBuilder {
    settings: FileSettings,
}

impl FileSettingsBuilder {
    /// Add a key/value setting
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.values.insert(key.into(), value.into());
        self
    }

    /// Append a labeled setting
    pub fn labeled(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.labeled.push(LabeledSetting {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    pub fn build(self) -> FileSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
        [values]
        admin_username = "admin"
        admin_password = "secret"
        primary_ip = "10.0.0.10"

        [[labeled]]
        label = "psn_fqdn"
        value = "psn-1.example.com"

        [[labeled]]
        label = "psn_roles"
        value = ""

        [[labeled]]
        label = "psn_fqdn/2"
        value = "psn-2.example.com"
    "#;

    #[test]
    fn test_parse_settings() {
        let settings = FileSettings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.get("admin_username").unwrap(), "admin");
        assert_eq!(settings.labeled.len(), 3);
    }

    #[test]
    fn test_get_missing_key() {
        let settings = FileSettings::from_toml(SAMPLE).unwrap();
        match settings.get("secondary_ip") {
            Err(BootstrapError::ConfigMissing { key }) => assert_eq!(key, "secondary_ip"),
            other => panic!("Expected ConfigMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_list_by_label_keeps_document_order() {
        let settings = FileSettings::from_toml(SAMPLE).unwrap();
        assert_eq!(
            settings.list_by_label("psn_fqdn").unwrap(),
            vec!["psn-1.example.com", "psn-2.example.com"]
        );
        assert_eq!(settings.list_by_label("psn_roles").unwrap(), vec![""]);
        assert!(settings.list_by_label("psn").unwrap().is_empty());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, SAMPLE).unwrap();

        let settings = FileSettings::from_file(&path).unwrap();
        assert_eq!(settings.get("primary_ip").unwrap(), "10.0.0.10");
    }

    #[test]
    fn test_from_missing_file() {
        let result = FileSettings::from_file("/nonexistent/settings.toml");
        assert!(matches!(result, Err(BootstrapError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_builder() {
        let settings = FileSettings::builder()
            .value("primary_fqdn", "pan-1.example.com")
            .labeled("pan_roles", "")
            .labeled("pan_roles", "SecondaryAdmin, SecondaryMonitoring")
            .build();
        assert_eq!(settings.get("primary_fqdn").unwrap(), "pan-1.example.com");
        assert_eq!(settings.list_by_label("pan_roles").unwrap().len(), 2);
    }
}
