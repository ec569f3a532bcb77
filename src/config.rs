//! Configuration management for Almar

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Locations searched for a configuration file, in order
pub const CONFIG_LOCATIONS: [&str; 3] = ["./almar.yml", "./lokar.yml", "~/.almar.yml"];

#[derive(Debug, Deserialize, Clone)]
pub struct VocabularyConfig {
    /// Vocabulary code written to `$2`
    pub marc_code: String,
    /// Lookup service for authority identifiers
    pub id_service: Option<String>,
    /// Prefix for identifiers written to `$0`
    #[serde(default)]
    pub marc_prefix: String,
}

/// One catalog environment (e.g. sandbox or production)
#[derive(Debug, Deserialize, Clone)]
pub struct EnvConfig {
    pub name: String,
    pub sru_url: String,
    pub api_region: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub smtp_from_name: Option<String>,
    pub smtp_use_tls: bool,
    /// Where run reports are sent
    pub recipient: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub default_env: Option<String>,
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub env: Vec<EnvConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Directory for record snapshots, one subdirectory per job
    pub jobs_dir: Option<PathBuf>,
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// Load configuration from `path`, or the first file found in
    /// [`CONFIG_LOCATIONS`], layered with `ALMAR_*` environment variables
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => find_config_file().ok_or_else(|| {
                AppError::Config(
                    "Could not find \"almar.yml\" configuration file. \
                     See https://github.com/scriptotek/almar for help."
                        .to_string(),
                )
            })?,
        };
        tracing::debug!("Reading configuration from {}", path.display());

        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            // e.g. ALMAR_VOCABULARY__MARC_CODE=noubomn
            .add_source(
                Environment::with_prefix("ALMAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> AppResult<Self> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// The environment named `name`, or the default environment
    pub fn environment(&self, name: Option<&str>) -> AppResult<&EnvConfig> {
        let name = name.or(self.default_env.as_deref()).ok_or_else(|| {
            AppError::Config(
                "No environment specified and no default environment found in configuration file"
                    .to_string(),
            )
        })?;
        self.env.iter().find(|e| e.name == name).ok_or_else(|| {
            AppError::Config(format!(
                "Environment \"{}\" not found in configuration file",
                name
            ))
        })
    }
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_LOCATIONS
        .iter()
        .map(|location| expand_home(location))
        .find(|path| path.exists())
}

fn expand_home(location: &str) -> PathBuf {
    match (location.strip_prefix("~/"), env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(location),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "almar.log".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_env: sandbox
vocabulary:
  marc_code: noubomn
  id_service: https://data.ub.uio.no/microservices/authorize.php
  marc_prefix: (NoOU-ONR)
env:
  - name: sandbox
    sru_url: https://sandbox.alma.exlibrisgroup.com/view/sru/47BIBSYS_UBO
    api_region: eu
    api_key: secret1
  - name: prod
    sru_url: https://bibsys-k.alma.exlibrisgroup.com/view/sru/47BIBSYS_UBO
    api_region: eu
    api_key: secret2
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.vocabulary.marc_code, "noubomn");
        assert_eq!(config.vocabulary.marc_prefix, "(NoOU-ONR)");
        assert_eq!(config.env.len(), 2);
        assert_eq!(config.logging.file, "almar.log");
        assert!(config.email.is_none());
        assert!(config.jobs_dir.is_none());
    }

    #[test]
    fn test_environment_selection() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.environment(None).unwrap().api_key, "secret1");
        assert_eq!(config.environment(Some("prod")).unwrap().api_key, "secret2");
        let err = config.environment(Some("staging")).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_missing_default_env() {
        let config = AppConfig::from_yaml("vocabulary:\n  marc_code: humord\n").unwrap();
        assert!(config.environment(None).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("almar.yml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_env.as_deref(), Some("sandbox"));
    }
}
