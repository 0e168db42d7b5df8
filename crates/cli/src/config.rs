use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Default path used by `save`/`load` when invoked without an explicit path.
    #[serde(default)]
    pub default_network_path: Option<String>,

    /// Safety cap on the number of ticks `run` will execute before giving up.
    #[serde(default = "default_safety_cap")]
    pub run_safety_cap: usize,

    /// Whether the terminal should emit ANSI colour.
    #[serde(default = "default_colour")]
    pub colour: bool,
}

fn default_safety_cap() -> usize {
    10_000
}

fn default_colour() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_network_path: None,
            run_safety_cap: default_safety_cap(),
            colour: default_colour(),
        }
    }
}

impl CliConfig {
    /// The default config directory: `<user config dir>/rrsim/`.
    pub fn default_config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("rrsim");
        Ok(dir)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from `path`, or the default path if `path` is `None`.
    /// A missing file silently falls back to defaults; it is never created
    /// implicitly.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            debug!(?config_path, "loading config");
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Write `self` as TOML to `path`, creating parent directories as needed.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
        let toml_str = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, toml_str)
            .with_context(|| format!("failed to write config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = CliConfig::default();
        assert_eq!(config.run_safety_cap, 10_000);
        assert!(config.colour);
        assert!(config.default_network_path.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = CliConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = CliConfig::default();
        config.default_network_path = Some("layout.rrnet".to_string());
        config.run_safety_cap = 500;
        config.save(&path).unwrap();

        let loaded = CliConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn toml_round_trip_preserves_defaults() {
        let config = CliConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
