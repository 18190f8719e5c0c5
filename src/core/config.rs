//! Configuration for the dreamcatcher CLI and services
//!
//! Settings come from a TOML file, by default
//! `<config dir>/dreamcatcher/config.toml`, then from `DREAMCATCHER_*`
//! environment variables. A missing default file means built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::error::{Error, Result};
use crate::generation::CompletionPolicy;

pub const DEFAULT_TAGS_URL: &str = "https://dreamcatcher-tag-generator.guitaripod.workers.dev/";
pub const DEFAULT_IMAGE_URL: &str = "https://dream-image-generator.guitaripod.workers.dev";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_TAGS_URL: &str = "DREAMCATCHER_TAGS_URL";
pub const ENV_IMAGE_URL: &str = "DREAMCATCHER_IMAGE_URL";
pub const ENV_TIMEOUT_SECS: &str = "DREAMCATCHER_TIMEOUT_SECS";
pub const ENV_OUTPUT_DIR: &str = "DREAMCATCHER_OUTPUT_DIR";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub generation: GenerationConfig,
    pub output: OutputConfig,
}

/// Remote generation service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub tags_url: Url,
    pub image_url: Url,
    /// Per-request timeout enforced by the HTTP transport
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tags_url: Url::parse(DEFAULT_TAGS_URL).expect("default tags URL is valid"),
            image_url: Url::parse(DEFAULT_IMAGE_URL).expect("default image URL is valid"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub completion_policy: CompletionPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("dreams"),
        }
    }
}

impl Config {
    /// Location of the per-user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dreamcatcher").join("config.toml"))
    }

    /// Load configuration from `path`, or the default location when `None`,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|path| path.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `DREAMCATCHER_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TAGS_URL) {
            self.service.tags_url = parse_url(ENV_TAGS_URL, &value)?;
        }
        if let Some(value) = lookup(ENV_IMAGE_URL) {
            self.service.image_url = parse_url(ENV_IMAGE_URL, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.service.timeout_secs = value.trim().parse().map_err(|_| {
                Error::config(format!("{} must be a whole number, got '{}'", ENV_TIMEOUT_SECS, value))
            })?;
        }
        if let Some(value) = lookup(ENV_OUTPUT_DIR) {
            self.output.directory = PathBuf::from(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("service.tags_url", &self.service.tags_url),
            ("service.image_url", &self.service.image_url),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "{} must be an http(s) URL, got {}",
                    name, url
                )));
            }
        }

        if self.service.timeout_secs == 0 {
            return Err(Error::config(
                "service.timeout_secs must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url> {
    Url::parse(value.trim())
        .map_err(|e| Error::config(format!("{} is not a valid URL ({}): {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.tags_url.as_str(), DEFAULT_TAGS_URL);
        assert_eq!(config.service.timeout(), Duration::from_secs(120));
        assert_eq!(
            config.generation.completion_policy,
            CompletionPolicy::TagsRequired
        );
        assert_eq!(config.output.directory, PathBuf::from("dreams"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [service]
            timeout_secs = 30

            [generation]
            completion_policy = "partial_success"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.timeout_secs, 30);
        assert_eq!(config.service.image_url.as_str(), DEFAULT_IMAGE_URL);
        assert_eq!(
            config.generation.completion_policy,
            CompletionPolicy::PartialSuccess
        );
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = Config::from_toml_str(
            r#"
            [generation]
            completion_policy = "whatever"
            "#,
        );
        assert!(matches!(result, Err(Error::TomlDe(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.service.tags_url = Url::parse("ftp://example.com/tags").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service.tags_url"));

        let mut config = Config::default();
        config.service.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_TAGS_URL, "http://localhost:8787/tags"),
            (ENV_TIMEOUT_SECS, " 15 "),
            (ENV_OUTPUT_DIR, "/tmp/dreams"),
        ]);
        let mut config = Config::default();

        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.service.tags_url.as_str(),
            "http://localhost:8787/tags"
        );
        assert_eq!(config.service.image_url.as_str(), DEFAULT_IMAGE_URL);
        assert_eq!(config.service.timeout_secs, 15);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/dreams"));
    }

    #[test]
    fn test_apply_overrides_rejects_garbage() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[service]\nimage_url = \"http://127.0.0.1:9000/image\"\n\n[output]\ndirectory = \"out\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(
            config.service.image_url.as_str(),
            "http://127.0.0.1:9000/image"
        );
        assert_eq!(config.output.directory, PathBuf::from("out"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Config::from_file(Path::new("/definitely/not/here/config.toml"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration file"));
    }

    #[test]
    fn test_to_toml_string_lists_sections() {
        let rendered = Config::default().to_toml_string().unwrap();
        assert!(rendered.contains("[service]"));
        assert!(rendered.contains("completion_policy = \"tags_required\""));
        assert!(rendered.contains("[output]"));
    }
}
