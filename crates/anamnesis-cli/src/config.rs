//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use anamnesis_extractor::{ExtractorConfig, SlotCatalog};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Slot catalog to use instead of the built-in clinical one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Session log file, appended to on every run
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Write the session log at all
    #[serde(default = "default_true")]
    pub log_enabled: bool,
}

impl Config {
    /// Get the configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".anamnesis").join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the pipeline settings.
    pub fn validate(&self) -> Result<()> {
        self.extractor.validate().map_err(CliError::Config)
    }

    /// The slot catalog this configuration selects.
    pub fn catalog(&self) -> Result<SlotCatalog> {
        match &self.catalog_path {
            Some(path) => Ok(SlotCatalog::from_file(path)?),
            None => Ok(SlotCatalog::clinical()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            log_file: default_log_file(),
            log_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from("llm_log.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.settings.color);
        assert!(config.settings.log_enabled);
        assert_eq!(config.settings.log_file, PathBuf::from("llm_log.txt"));
        assert!(config.catalog_path.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog().unwrap().len(), 10);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[extractor]\nmodel = \"mistral\"\n\n[settings]\ncolor = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.extractor.model, "mistral");
        assert_eq!(config.extractor.max_in_flight, 20);
        assert!(!config.settings.color);
        assert!(config.settings.log_enabled);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.catalog_path = Some(PathBuf::from("slots.toml"));
        config.extractor = ExtractorConfig::lenient();
        config.settings.log_enabled = false;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[settings\ncolor = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_invalid_extractor_settings_rejected() {
        let mut config = Config::default();
        config.extractor.max_attempts = 0;
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_custom_catalog_is_loaded() {
        let dir = TempDir::new().unwrap();
        let catalog_path = dir.path().join("slots.toml");
        fs::write(
            &catalog_path,
            "[[slots]]\nid = \"vitals\"\ninstruction = \"List the vital signs.\"\n",
        )
        .unwrap();

        let config = Config {
            catalog_path: Some(catalog_path),
            ..Config::default()
        };
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["vitals"]);
    }
}
