use crate::context::{AppLimits, DEFAULT_MAX_RECURSION_DEPTH};
use crate::error::{FieldsError, Result};
use crate::fields::format::{is_valid_pattern, DEFAULT_DATE_FORMAT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";

/// Settings stored in `<notes dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldsConfig {
    /// How many snippet levels may expand before raw text is inserted
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: usize,

    /// strftime pattern for date fields that do not set their own `format`
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_max_recursion_depth() -> usize {
    DEFAULT_MAX_RECURSION_DEPTH
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_recursion_depth(),
            date_format: default_date_format(),
        }
    }
}

impl AppLimits for FieldsConfig {
    fn max_recursion_depth(&self) -> usize {
        self.max_recursion_depth
    }
}

impl FieldsConfig {
    pub const KEYS: &'static [&'static str] = &["max_recursion_depth", "date_format"];

    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(FieldsError::Io)?;
        let config: FieldsConfig =
            serde_json::from_str(&content).map_err(FieldsError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(FieldsError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(FieldsError::Serialization)?;
        fs::write(config_path, content).map_err(FieldsError::Io)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "max_recursion_depth" => Some(self.max_recursion_depth.to_string()),
            "date_format" => Some(self.date_format.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "max_recursion_depth" => {
                self.max_recursion_depth = value.trim().parse().map_err(|_| {
                    FieldsError::Api(format!("max_recursion_depth must be a whole number, got '{}'", value))
                })?;
            }
            "date_format" => {
                if !is_valid_pattern(value) {
                    return Err(FieldsError::InvalidFormat(value.to_string()));
                }
                self.date_format = value.to_string();
            }
            _ => return Err(FieldsError::Api(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = FieldsConfig::default();
        assert_eq!(config.max_recursion_depth, 3);
        assert_eq!(config.date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = FieldsConfig::load(dir.path().join("absent")).unwrap();
        assert_eq!(config, FieldsConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = FieldsConfig::default();
        config.set("max_recursion_depth", "5").unwrap();
        config.save(dir.path()).unwrap();

        let loaded = FieldsConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.max_recursion_depth(), 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"date_format": "%d.%m.%Y"}"#).unwrap();
        let loaded = FieldsConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.date_format, "%d.%m.%Y");
        assert_eq!(loaded.max_recursion_depth, 3);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = FieldsConfig::default();
        assert!(config.set("max_recursion_depth", "deep").is_err());
        assert!(config.set("date_format", "%Q").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert_eq!(config, FieldsConfig::default());
    }
}
