//! Configuration loading and management.
//!
//! Configuration can be loaded from TOML, YAML, or JSON files, discovered from
//! `lectern.toml` in the current directory or any parent, and overridden from
//! the environment.

use crate::preprocess::PreprocessOptions;
use crate::{LecternError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "lectern.toml";

pub const ENV_OCR_ENDPOINT: &str = "LECTERN_OCR_ENDPOINT";
pub const ENV_OCR_TIMEOUT_SECS: &str = "LECTERN_OCR_TIMEOUT_SECS";
pub const ENV_OCR_API_KEY: &str = "OCR_API_KEY";

/// Top-level configuration.
///
/// # Example
///
/// ```rust
/// use lectern::LecternConfig;
///
/// let config = LecternConfig::default();
/// assert_eq!(config.image.max_width, 1000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LecternConfig {
    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub ocr_space: OcrSpaceConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Preprocessing applied to images before OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Images wider than this are scaled down proportionally
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// JPEG quality factor in (0, 1]
    #[serde(default = "default_quality")]
    pub quality: f64,

    #[serde(default)]
    pub grayscale: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            quality: default_quality(),
            grayscale: false,
        }
    }
}

impl ImageConfig {
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            max_width: self.max_width,
            quality: self.quality,
            grayscale: self.grayscale,
        }
    }
}

/// The OCR relay consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gateway_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Upstream OCR.space service used by the relay server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSpaceConfig {
    #[serde(default = "default_ocr_space_endpoint")]
    pub endpoint: String,

    /// Usually supplied through `OCR_API_KEY` rather than a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub overlay: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrSpaceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ocr_space_endpoint(),
            api_key: None,
            language: default_language(),
            overlay: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body limit for uploads and base64 images
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_width() -> u32 {
    1000
}

fn default_quality() -> f64 {
    0.7
}

fn default_gateway_endpoint() -> String {
    "http://localhost:6969/ocr".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_ocr_space_endpoint() -> String {
    "https://api.ocr.space/parse/image".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6969
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl LecternConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| LecternError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| LecternError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| LecternError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, choosing the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => Self::from_toml_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            other => Err(LecternError::validation(format!(
                "Unsupported config file extension '{}' for {} (expected toml, yaml or json)",
                other,
                path.display()
            ))),
        }
    }

    /// Discover `lectern.toml` in the current directory or any parent.
    ///
    /// Returns `None` if no file is found.
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir().map_err(LecternError::Io)?;
        Self::discover_from(current)
    }

    /// Same as [`discover`](Self::discover), starting at `start`.
    pub fn discover_from(start: impl Into<PathBuf>) -> Result<Option<Self>> {
        let mut current = start.into();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "Discovered config file");
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Load from an explicit path, or discover, or fall back to defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::discover()?.unwrap_or_default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `LECTERN_OCR_ENDPOINT`, `LECTERN_OCR_TIMEOUT_SECS` and `OCR_API_KEY`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_OCR_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.gateway.endpoint = endpoint;
        }

        if let Some(raw) = lookup(ENV_OCR_TIMEOUT_SECS) {
            self.gateway.timeout_secs = raw.trim().parse().map_err(|e| {
                LecternError::validation(format!("{} must be a whole number of seconds, got '{}': {}", ENV_OCR_TIMEOUT_SECS, raw, e))
            })?;
        }

        if let Some(key) = lookup(ENV_OCR_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.ocr_space.api_key = Some(key);
        }

        self.validate()
    }

    /// Reject values the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !(self.image.quality > 0.0 && self.image.quality <= 1.0) {
            return Err(LecternError::validation(format!(
                "image.quality must be in (0, 1], got {}",
                self.image.quality
            )));
        }

        if self.image.max_width == 0 {
            return Err(LecternError::validation("image.max_width must be greater than 0"));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(LecternError::validation("gateway.timeout_secs must be greater than 0"));
        }

        if self.ocr_space.timeout_secs == 0 {
            return Err(LecternError::validation("ocr_space.timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    /// Render as TOML. The API key is masked.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.ocr_space.api_key.is_some() {
            shown.ocr_space.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| LecternError::serialization_with_source("Failed to render config as TOML", e))
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| LecternError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = LecternConfig::default();
        assert_eq!(config.image.max_width, 1000);
        assert!((config.image.quality - 0.7).abs() < f64::EPSILON);
        assert!(!config.image.grayscale);
        assert_eq!(config.gateway.endpoint, "http://localhost:6969/ocr");
        assert_eq!(config.gateway.timeout(), Duration::from_secs(30));
        assert_eq!(config.ocr_space.endpoint, "https://api.ocr.space/parse/image");
        assert_eq!(config.ocr_space.language, "eng");
        assert!(config.ocr_space.api_key.is_none());
        assert_eq!(config.server.port, 6969);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lectern.toml");

        fs::write(
            &config_path,
            r#"
[image]
max_width = 800
grayscale = true

[gateway]
endpoint = "http://ocr.internal/ocr"
        "#,
        )
        .unwrap();

        let config = LecternConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(config.image.max_width, 800);
        assert!(config.image.grayscale);
        assert!((config.image.quality - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.gateway.endpoint, "http://ocr.internal/ocr");
        assert_eq!(config.gateway.timeout_secs, 30);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lectern.yaml");

        fs::write(
            &config_path,
            r#"
ocr_space:
  language: ger
  overlay: true
server:
  port: 8080
"#,
        )
        .unwrap();

        let config = LecternConfig::from_file(&config_path).unwrap();
        assert_eq!(config.ocr_space.language, "ger");
        assert!(config.ocr_space.overlay);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lectern.json");

        fs::write(&config_path, r#"{"image": {"quality": 0.5}, "gateway": {"timeout_secs": 5}}"#).unwrap();

        let config = LecternConfig::from_file(&config_path).unwrap();
        assert!((config.image.quality - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.gateway.timeout_secs, 5);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lectern.ini");
        fs::write(&config_path, "").unwrap();

        let err = LecternConfig::from_file(&config_path).unwrap_err();
        assert!(matches!(err, LecternError::Validation { .. }));
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = LecternConfig::from_toml_file("/nonexistent/lectern.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lectern.toml");
        fs::write(&config_path, "[image\nmax_width = ").unwrap();

        let err = LecternConfig::from_toml_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lectern.toml");
        fs::write(&config_path, "[image]\nquality = 1.5\n").unwrap();

        let err = LecternConfig::from_toml_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("image.quality"));

        let mut config = LecternConfig::default();
        config.image.quality = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_width_and_timeout() {
        let mut config = LecternConfig::default();
        config.image.max_width = 0;
        assert!(config.validate().is_err());

        let mut config = LecternConfig::default();
        config.gateway.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lectern.toml"), "[server]\nport = 7000\n").unwrap();

        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = LecternConfig::discover_from(&nested).unwrap();
        assert_eq!(config.unwrap().server.port, 7000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_OCR_ENDPOINT, "http://relay:9000/ocr"),
            (ENV_OCR_TIMEOUT_SECS, " 12 "),
            (ENV_OCR_API_KEY, "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = LecternConfig::default();
        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.gateway.endpoint, "http://relay:9000/ocr");
        assert_eq!(config.gateway.timeout_secs, 12);
        assert_eq!(config.ocr_space.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_override_rejects_bad_timeout() {
        let mut config = LecternConfig::default();
        let err = config
            .apply_overrides_from(|key| (key == ENV_OCR_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_OCR_TIMEOUT_SECS));

        let mut config = LecternConfig::default();
        let err = config
            .apply_overrides_from(|key| (key == ENV_OCR_TIMEOUT_SECS).then(|| "0".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_to_toml_string_masks_api_key() {
        let mut config = LecternConfig::default();
        config.ocr_space.api_key = Some("secret".to_string());

        let rendered = config.to_toml_string().unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[gateway]"));
    }
}
