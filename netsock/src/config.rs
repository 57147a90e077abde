//! Configuration for netsock.
//!
//! NETSOCK_ROOT resolution order:
//! 1. Explicit path passed to Config::load_from()
//! 2. NETSOCK_ROOT environment variable
//! 3. Default: the platform config dir for `netsock` (~/.config/netsock)

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, ProcessPathCache, Result};

/// netsock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml.
    #[serde(skip)]
    pub root: PathBuf,

    /// procfs mount to enumerate sockets from.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    /// Output format when none is given: table, json or pids.
    #[serde(default = "default_format")]
    pub default_format: String,

    #[serde(default)]
    pub path_cache: PathCacheConfig,
}

/// Sizing for the process path cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Seconds before a resolved path is looked up again.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for PathCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl PathCacheConfig {
    /// Build a cache sized by this config.
    pub fn build(&self) -> ProcessPathCache {
        ProcessPathCache::new(self.capacity, Duration::from_secs(self.ttl_secs))
    }
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_format() -> String {
    "table".to_string()
}

fn default_cache_capacity() -> usize {
    256
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl Config {
    /// Create a default config rooted at the given directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            proc_root: default_proc_root(),
            default_format: default_format(),
            path_cache: PathCacheConfig::default(),
        }
    }

    /// Load config from NETSOCK_ROOT/config.toml, or defaults.
    pub fn load() -> Result<Self> {
        let root = Self::default_root()?;
        Self::load_from(&root)
    }

    /// The root directory from NETSOCK_ROOT or the platform default.
    pub fn default_root() -> Result<PathBuf> {
        resolve_root()
    }

    /// Load config from a specific root.
    pub fn load_from(root: &Path) -> Result<Self> {
        let config_path = root.join("config.toml");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", config_path.display(), e)))?;
            config.root = root.to_path_buf();
            Ok(config)
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::with_root(root))
        }
    }

    /// Save config to NETSOCK_ROOT/config.toml, creating the directory.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(self.config_path(), contents)?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Default location for `psq snapshot` output.
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join("snapshot.json")
    }
}

/// Resolve NETSOCK_ROOT using the standard resolution order.
fn resolve_root() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("NETSOCK_ROOT") {
        return Ok(PathBuf::from(path));
    }

    if let Some(proj_dirs) = ProjectDirs::from("", "", "netsock") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".config/netsock"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_with_root() {
        let config = Config::with_root("/tmp/test-netsock");
        assert_eq!(config.root, PathBuf::from("/tmp/test-netsock"));
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert_eq!(config.default_format, "table");
        assert_eq!(config.path_cache.capacity, 256);
        assert_eq!(config.path_cache.ttl_secs, 60);
    }

    #[test]
    fn test_config_paths() {
        let config = Config::with_root("/tmp/test-netsock");
        assert_eq!(config.config_path(), PathBuf::from("/tmp/test-netsock/config.toml"));
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/test-netsock/snapshot.json"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(tmp.path()).unwrap();
        assert_eq!(config.root, tmp.path());
        assert_eq!(config.path_cache, PathCacheConfig::default());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested");

        let mut config = Config::with_root(&root);
        config.default_format = "json".to_string();
        config.path_cache.ttl_secs = 5;
        config.save().unwrap();

        let loaded = Config::load_from(&root).unwrap();
        assert_eq!(loaded.default_format, "json");
        assert_eq!(loaded.path_cache.ttl_secs, 5);
        assert_eq!(loaded.path_cache.capacity, 256);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "[path_cache]\ncapacity = 8\n").unwrap();
        let config = Config::load_from(tmp.path()).unwrap();
        assert_eq!(config.path_cache.capacity, 8);
        assert_eq!(config.path_cache.ttl_secs, 60);
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "default_format = [").unwrap();
        assert!(matches!(Config::load_from(tmp.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_cache_built_from_config() {
        let cache = PathCacheConfig { capacity: 3, ttl_secs: 2 }.build();
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.ttl(), Duration::from_secs(2));
    }
}
