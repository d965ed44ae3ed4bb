use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Well-known locations
// =============================================================================

/// Default Node.js distribution site
pub const DEFAULT_INDEX_URL: &str = "https://nodejs.org/dist";

/// Environment variable overriding the runtime cache directory
pub const CACHE_DIR_ENV: &str = "NODE_BUILD_CACHE_DIR";

/// Environment variable holding the tracing filter directives
pub const LOG_FILTER_ENV: &str = "NODE_BUILD_LOG";

/// Default directory holding the frontend sources and `package.json`
pub const DEFAULT_SOURCE_DIR: &str = "./browser";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Runtime acquisition settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Whether a Node.js runtime must be located or provisioned at all
    pub require_node: bool,
    /// Node executable to probe before the cache; `node` on PATH when unset
    pub node_executable: Option<String>,
    /// Restrict installs to LTS releases when the index has any
    pub lts: bool,
    /// Directory containing `package.json`
    pub source_dir: PathBuf,
    /// Runtime cache directory; see [`cache_dir`] for the default
    pub cache_dir: Option<PathBuf>,
    /// Base URL of the release index and archives
    pub index_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            require_node: true,
            node_executable: None,
            lts: true,
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            cache_dir: None,
            index_url: DEFAULT_INDEX_URL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load a JSON config file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured cache directory, or the default location
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(cache_dir)
    }
}

/// Returns the directory holding installed Node.js runtimes.
/// Uses $NODE_BUILD_CACHE_DIR if set, then $XDG_CACHE_HOME/node-build/nodejs,
/// otherwise falls back to ~/.cache/node-build/nodejs,
/// or ./node-build/nodejs if neither is available.
pub fn cache_dir() -> PathBuf {
    cache_dir_with_env(
        std::env::var(CACHE_DIR_ENV).ok(),
        std::env::var("XDG_CACHE_HOME").ok(),
        dirs::home_dir(),
    )
}

fn cache_dir_with_env(
    override_dir: Option<String>,
    xdg_cache_home: Option<String>,
    home_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    let cache_home = xdg_cache_home
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."));

    cache_home.join("node-build").join("nodejs")
}
