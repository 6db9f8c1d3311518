use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::models::settings::{default_profiles, ResizeProfile};

pub const DEFAULT_MAX_BYTES: u64 = 3 * 1024 * 1024;

/// Formats the `image` build can decode; an accepted type must name one of them.
const DECODABLE_MARKERS: &[&str] = &["jpeg", "png"];

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok();
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let root = PathBuf::from(
            env::var("PHOTO_STORAGE_ROOT").unwrap_or_else(|_| "storage/photos".to_string()),
        );
        let mut storage = StorageConfig::new(root);

        if let Ok(dir) = env::var("PHOTO_STAGING_DIR") {
            storage.staging_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = env::var("PHOTO_MAX_BYTES") {
            storage.max_bytes = raw
                .parse()
                .with_context(|| format!("PHOTO_MAX_BYTES is not a byte count: {raw}"))?;
        }
        if let Ok(raw) = env::var("PHOTO_ALLOWED_EXTENSIONS") {
            storage.allowed_extensions = split_list(&raw);
        }
        if let Ok(raw) = env::var("PHOTO_ACCEPTED_TYPES") {
            storage.accepted_types = split_list(&raw);
        }
        if let Ok(raw) = env::var("PHOTO_PROFILES") {
            storage.profiles =
                serde_json::from_str(&raw).context("PHOTO_PROFILES must be a JSON array of profiles")?;
        }
        if let Ok(raw) = env::var("PHOTO_STAGING_MAX_AGE_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("PHOTO_STAGING_MAX_AGE_SECS is not a number: {raw}"))?;
            storage.staging_max_age = Duration::from_secs(secs);
        }

        storage.validate()?;

        Ok(Self {
            database_url,
            bind_addr,
            storage,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set")
    }
}

/// Everything the photo pipeline needs to know about the filesystem and its filters.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Originals live here; each profile gets a subdirectory.
    pub root: PathBuf,
    pub staging_dir: PathBuf,
    pub max_bytes: u64,
    /// Lower-case extensions without the dot.
    pub allowed_extensions: Vec<String>,
    /// Substrings one of which every declared and sniffed MIME type must contain.
    pub accepted_types: Vec<String>,
    pub profiles: Vec<ResizeProfile>,
    pub staging_max_age: Duration,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            staging_dir: root.join(".staging"),
            root,
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_extensions: vec!["jpg".to_string(), "png".to_string()],
            accepted_types: vec!["jpeg".to_string(), "png".to_string()],
            profiles: default_profiles(),
            staging_max_age: Duration::from_secs(3600),
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<ResizeProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn accepts_type(&self, mime: &str) -> bool {
        let mime = mime.to_ascii_lowercase();
        self.accepted_types.iter().any(|marker| mime.contains(marker.as_str()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroMaxBytes);
        }
        if self.allowed_extensions.is_empty() || self.accepted_types.is_empty() {
            return Err(ConfigError::EmptyFilter);
        }
        if let Some(marker) = self
            .accepted_types
            .iter()
            .find(|marker| !DECODABLE_MARKERS.iter().any(|known| marker.contains(known)))
        {
            return Err(ConfigError::UnsupportedType(marker.clone()));
        }
        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }

        let mut names = HashSet::new();
        let mut directories = HashSet::new();
        for profile in &self.profiles {
            if profile.width == 0 || profile.height == 0 {
                return Err(ConfigError::ZeroDimension(profile.name.clone()));
            }
            if !is_safe_segment(&profile.directory) {
                return Err(ConfigError::BadDirectory(profile.directory.clone()));
            }
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateProfile(profile.name.clone()));
            }
            if !directories.insert(profile.directory.as_str()) {
                return Err(ConfigError::DuplicateProfile(profile.directory.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("maximum upload size must be greater than zero")]
    ZeroMaxBytes,
    #[error("accepted extensions and types must not be empty")]
    EmptyFilter,
    #[error("accepted type `{0}` has no image decoder; use jpeg or png")]
    UnsupportedType(String),
    #[error("at least one resize profile is required")]
    NoProfiles,
    #[error("profile `{0}` has a zero width or height")]
    ZeroDimension(String),
    #[error("profile directory `{0}` must be a single segment of letters, digits, `-` or `_`")]
    BadDirectory(String),
    #[error("profile `{0}` is configured twice")]
    DuplicateProfile(String),
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}
