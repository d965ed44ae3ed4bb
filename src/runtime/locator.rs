//! Finding a Node.js runtime for a frontend build
//!
//! A runtime already available on the system wins when it satisfies the
//! project's `engines.node` requirement. Otherwise the cache is consulted,
//! and only then is a release downloaded.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::runtime::cache::RuntimeCache;
use crate::runtime::error::LocateError;
use crate::runtime::notifier::Notifier;
use crate::runtime::platform::npm_executable;
use crate::runtime::requirement::VersionRequirement;
use crate::runtime::semver::parse_version;

/// Where a resolved runtime came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSource {
    System,
    Cached,
    Installed,
}

impl fmt::Display for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeSource::System => "system",
            NodeSource::Cached => "cached",
            NodeSource::Installed => "installed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub node: PathBuf,
    pub npm: PathBuf,
    pub source: NodeSource,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    engines: Engines,
}

#[derive(Debug, Default, Deserialize)]
struct Engines {
    node: Option<String>,
}

/// Read `engines.node` from the `package.json` in `source_dir`
pub fn read_engine_requirement(
    source_dir: &Path,
) -> Result<Option<VersionRequirement>, LocateError> {
    let path = source_dir.join("package.json");
    if !path.is_file() {
        return Err(LocateError::PackageJsonNotFound(path));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| LocateError::PackageJson {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let package: PackageJson =
        serde_json::from_str(&content).map_err(|e| LocateError::PackageJson {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    match package.engines.node {
        Some(node) => Ok(Some(VersionRequirement::parse(&node)?)),
        None => Ok(None),
    }
}

/// Version reported by `<executable> --version`, if it runs and succeeds
pub async fn probe_node_version(executable: &str) -> Option<Version> {
    let output = match Command::new(executable).arg("--version").output().await {
        Ok(output) => output,
        Err(e) => {
            debug!("Failed to run {} --version: {}", executable, e);
            return None;
        }
    };

    if !output.status.success() {
        debug!("{} --version exited with {}", executable, output.status);
        return None;
    }

    parse_version(&String::from_utf8_lossy(&output.stdout))
}

pub struct NodeLocator {
    config: RuntimeConfig,
    cache: RuntimeCache,
}

impl NodeLocator {
    pub fn new(config: RuntimeConfig, cache: RuntimeCache) -> Self {
        Self { config, cache }
    }

    pub fn cache(&self) -> &RuntimeCache {
        &self.cache
    }

    /// Resolve a runtime for the configured source directory
    ///
    /// Returns `None` when the configuration does not require Node.js.
    pub async fn locate(
        &self,
        notifier: &dyn Notifier,
    ) -> Result<Option<ResolvedNode>, LocateError> {
        if !self.config.require_node {
            debug!("Node.js not required, skipping lookup");
            return Ok(None);
        }

        let requirement = read_engine_requirement(&self.config.source_dir)?;
        self.require_node(requirement.as_ref(), notifier)
            .await
            .map(Some)
    }

    /// Find or provision a runtime satisfying the requirement
    ///
    /// Order: system executable, cached install, fresh install.
    pub async fn require_node(
        &self,
        requirement: Option<&VersionRequirement>,
        notifier: &dyn Notifier,
    ) -> Result<ResolvedNode, LocateError> {
        let windows = self.cache.platform().is_windows();

        let executable = self.config.node_executable.as_deref().unwrap_or("node");
        if let Some(version) = probe_node_version(executable).await {
            debug!("Found system Node.js {} at {}", version, executable);
            if requirement.is_none_or(|r| r.matches(&version)) {
                let npm = match self.config.node_executable {
                    Some(_) => npm_executable(Path::new(executable), windows),
                    None => PathBuf::from("npm"),
                };
                return Ok(self.resolved(PathBuf::from(executable), npm, NodeSource::System));
            }
        }

        if self.cache.has(requirement)? {
            let node = self.cache.get(requirement)?;
            let npm = npm_executable(&node, windows);
            return Ok(self.resolved(node, npm, NodeSource::Cached));
        }

        let node = self
            .cache
            .install(requirement, self.config.lts, notifier)
            .await?;
        let npm = npm_executable(&node, windows);
        Ok(self.resolved(node, npm, NodeSource::Installed))
    }

    fn resolved(&self, node: PathBuf, npm: PathBuf, source: NodeSource) -> ResolvedNode {
        info!("Using {} Node.js {:?}, npm {:?}", source, node, npm);
        ResolvedNode { node, npm, source }
    }
}
