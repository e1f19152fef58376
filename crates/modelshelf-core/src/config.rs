//! Configuration for the organizer.
//!
//! [`OrganizerConfig`] is passed into the engine at construction time. Every
//! field has a default matching the stock Civitai layout, so a JSON config
//! file only needs to name what it overrides.

use crate::error::{OrganizerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Layout defaults.
pub struct LayoutDefaults;

impl LayoutDefaults {
    pub const MODEL_ROOT: &'static str = "models";
    pub const DATABASE_PATH: &'static str = "database.db";
    pub const LOG_DIR: &'static str = ".";
    pub const MODEL_EXTENSIONS: &'static [&'static str] = &[".safetensors"];
    pub const UNCERTAIN_DIR: &'static str = "loras/null";
    pub const TYPE_DIRECTORIES: &'static [(&'static str, &'static str)] = &[
        ("Checkpoint", "checkpoints"),
        ("TextualInversion", "embeddings"),
        ("LORA", "loras"),
        ("LoCon", "loras"),
        ("DoRA", "loras"),
        ("VAE", "vae"),
    ];
    /// Upstream types sharing a directory with a preferred name.
    pub const REVERSE_EXCLUDED_TYPES: &'static [&'static str] = &["LoCon", "DoRA"];
}

/// Registry defaults.
pub struct RegistryDefaults;

impl RegistryDefaults {
    pub const BASE_URL: &'static str = "https://civitai.com/api/v1";
    pub const BACKOFF_SECONDS: u64 = 60;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const USER_AGENT: &'static str = "modelshelf/0.1";
}

/// Remote registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RegistryConfig {
    /// API base, without a trailing slash.
    pub base_url: String,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Fixed delay between attempts on a transient status.
    pub backoff_seconds: u64,
    pub request_timeout_seconds: u64,
    /// Attempt cap for transient statuses. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: RegistryDefaults::BASE_URL.to_string(),
            api_token: None,
            backoff_seconds: RegistryDefaults::BACKOFF_SECONDS,
            request_timeout_seconds: RegistryDefaults::REQUEST_TIMEOUT_SECONDS,
            max_attempts: None,
        }
    }
}

impl RegistryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Complete organizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OrganizerConfig {
    /// Staging area and root of the type buckets.
    pub model_root: PathBuf,
    pub database_path: PathBuf,
    /// Directory receiving the timestamped run log.
    pub log_dir: PathBuf,
    /// File suffixes considered model weights, including the leading dot.
    pub recognized_extensions: Vec<String>,
    /// Registry type name -> bucket directory under `model_root`.
    pub type_directory_map: BTreeMap<String, String>,
    /// Type names never produced by the directory -> type inverse.
    pub reverse_excluded_types: Vec<String>,
    /// Flat bucket for files the registry does not know, relative to `model_root`.
    pub uncertain_dir: PathBuf,
    pub registry: RegistryConfig,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            model_root: PathBuf::from(LayoutDefaults::MODEL_ROOT),
            database_path: PathBuf::from(LayoutDefaults::DATABASE_PATH),
            log_dir: PathBuf::from(LayoutDefaults::LOG_DIR),
            recognized_extensions: LayoutDefaults::MODEL_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            type_directory_map: LayoutDefaults::TYPE_DIRECTORIES
                .iter()
                .map(|(ty, dir)| (ty.to_string(), dir.to_string()))
                .collect(),
            reverse_excluded_types: LayoutDefaults::REVERSE_EXCLUDED_TYPES
                .iter()
                .map(|ty| ty.to_string())
                .collect(),
            uncertain_dir: PathBuf::from(LayoutDefaults::UNCERTAIN_DIR),
            registry: RegistryConfig::default(),
        }
    }
}

impl OrganizerConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| OrganizerError::io_with_path(e, path))?;
        let config: OrganizerConfig =
            serde_json::from_str(&contents).map_err(|e| OrganizerError::Json {
                message: format!("Failed to parse config {}: {}", path.display(), e),
                source: Some(e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the model root.
    pub fn with_model_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.model_root = root.into();
        self
    }

    /// Set the registry backoff.
    pub fn with_backoff_seconds(mut self, seconds: u64) -> Self {
        self.registry.backoff_seconds = seconds;
        self
    }

    /// Distinct bucket directories named by the type map.
    pub fn type_buckets(&self) -> BTreeSet<&str> {
        self.type_directory_map.values().map(String::as_str).collect()
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.recognized_extensions.is_empty() {
            return Err(config_error("recognized_extensions must not be empty"));
        }
        if let Some(ext) = self
            .recognized_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(config_error(format!(
                "extension {:?} must start with '.'",
                ext
            )));
        }

        if self.type_directory_map.is_empty() {
            return Err(config_error("type_directory_map must not be empty"));
        }
        for (ty, dir) in &self.type_directory_map {
            if !is_single_segment(dir) {
                return Err(config_error(format!(
                    "directory {:?} for type {:?} must be a single path segment",
                    dir, ty
                )));
            }
        }

        let mut components = self.uncertain_dir.components();
        let bucket = match components.next() {
            Some(Component::Normal(first)) => first.to_str(),
            _ => None,
        };
        let rest: Vec<_> = components.collect();
        let in_bucket = bucket.is_some_and(|b| self.type_buckets().contains(b));
        if !in_bucket || rest.len() != 1 || !matches!(rest[0], Component::Normal(_)) {
            return Err(config_error(format!(
                "uncertain_dir {:?} must be <bucket>/<name> inside a type bucket",
                self.uncertain_dir
            )));
        }

        url::Url::parse(&self.registry.base_url).map_err(|e| {
            config_error(format!(
                "registry base_url {:?} is invalid: {}",
                self.registry.base_url, e
            ))
        })?;

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> OrganizerError {
    OrganizerError::Config {
        message: message.into(),
    }
}

fn is_single_segment(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}
