//! Tool configuration.
//!
//! Loaded from `photo-post.toml` in the project root. Every key is optional:
//! the stock defaults are serialized to a TOML table, the user's file is
//! merged on top, and the result is deserialized and validated. Unknown keys
//! are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! posts_dir = "src/content/posts"    # Where post files are written
//! primary_branch = "main"            # Publishing elsewhere prints a warning
//! remote = "origin"                  # Remote to push to
//! site_url = "http://localhost:4321" # Base for the "View at" hint
//!
//! [storage]
//! backend = "wrangler"               # "wrangler" (R2) or "directory"
//! bucket = "imnotyourson-photos"     # R2 bucket for the wrangler backend
//! directory = ".uploads"             # Target for the directory backend
//! timeout_secs = 60                  # Per-upload timeout
//!
//! [upload]
//! max_attempts = 2                   # First try plus retries
//! ```
//!
//! Run `create-post gen-config` for a commented copy.

use crate::retry::RetryPolicy;
use crate::storage::{DirectoryStore, ObjectStore, WranglerStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "photo-post.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostConfig {
    /// Content directory for posts, relative to the project root.
    pub posts_dir: String,
    /// Branch that publishing is expected to happen from.
    pub primary_branch: String,
    /// Git remote to push to.
    pub remote: String,
    /// Base URL of the running site, for the post link printed at the end.
    pub site_url: String,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            posts_dir: "src/content/posts".to_string(),
            primary_branch: "main".to_string(),
            remote: "origin".to_string(),
            site_url: "http://localhost:4321".to_string(),
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Wrangler,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Relative paths resolve against the project root.
    pub directory: String,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Wrangler,
            bucket: "imnotyourson-photos".to_string(),
            directory: ".uploads".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub max_attempts: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::ONCE.max_attempts,
        }
    }
}

impl PostConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("posts_dir", &self.posts_dir),
            ("primary_branch", &self.primary_branch),
            ("remote", &self.remote),
            ("storage.bucket", &self.storage.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if !(1..=5).contains(&self.upload.max_attempts) {
            return Err(ConfigError::Validation(
                "upload.max_attempts must be 1-5".into(),
            ));
        }
        if self.storage.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "storage.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn posts_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.posts_dir)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.upload.max_attempts)
    }

    /// Build the configured object store.
    pub fn object_store(&self, root: &Path) -> Box<dyn ObjectStore> {
        match self.storage.backend {
            StorageBackend::Wrangler => Box::new(WranglerStore::new(
                &self.storage.bucket,
                root,
                Duration::from_secs(self.storage.timeout_secs),
            )),
            StorageBackend::Directory => {
                Box::new(DirectoryStore::new(root.join(&self.storage.directory)))
            }
        }
    }

    /// Link to a post on the site.
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), slug)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PostConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `photo-post.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config for the project at `root`, falling back to stock defaults.
pub fn load_config(root: &Path) -> Result<PostConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: PostConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `photo-post.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photo-post configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Directory (relative to the project root) where post files are written.
# The site's content collection reads posts from here.
posts_dir = "src/content/posts"

# Branch posts are normally published from. Publishing from any other
# branch is allowed but prints a warning first.
primary_branch = "main"

# Git remote the new post is pushed to.
remote = "origin"

# Base URL printed as "View at: <site_url>/<slug>" after a successful run.
site_url = "http://localhost:4321"

# ---------------------------------------------------------------------------
# Object storage
# ---------------------------------------------------------------------------
[storage]
# "wrangler":  upload to Cloudflare R2 with `npx wrangler r2 object put`.
# "directory": copy objects into a local directory instead.
backend = "wrangler"

# R2 bucket name (wrangler backend).
bucket = "imnotyourson-photos"

# Target directory for the directory backend, relative to the project root.
directory = ".uploads"

# Seconds before a single upload is killed and counted as failed.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Total attempts per image (1 = no retry). A batch stops at the first image
# that fails every attempt.
max_attempts = 2
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, PostConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::ONCE);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
primary_branch = "trunk"

[storage]
backend = "directory"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.primary_branch, "trunk");
        assert_eq!(config.storage.backend, StorageBackend::Directory);
        // untouched
        assert_eq!(config.storage.bucket, "imnotyourson-photos");
        assert_eq!(config.upload.max_attempts, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[storage]\nbuckett = \"x\"\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn out_of_range_attempts_fail_validation() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[upload]\nmax_attempts = 0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn empty_bucket_fails_validation() {
        let mut config = PostConfig::default();
        config.storage.bucket = " ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(m)) if m.contains("bucket")));
    }

    #[test]
    fn stock_config_matches_defaults() {
        let parsed: PostConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, PostConfig::default());
    }

    #[test]
    fn merge_keeps_base_keys() {
        let base: toml::Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn derived_values() {
        let config = PostConfig {
            site_url: "https://photos.example.com/".into(),
            ..PostConfig::default()
        };
        assert_eq!(config.post_url("autumn"), "https://photos.example.com/autumn");
        assert_eq!(
            config.posts_dir(Path::new("/repo")),
            PathBuf::from("/repo/src/content/posts")
        );
        assert_eq!(config.object_store(Path::new("/repo")).describe(), "r2://imnotyourson-photos");
    }
}
