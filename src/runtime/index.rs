//! Node.js release index client
//!
//! Fetches `index.json` from the Node.js distribution site and downloads
//! release archives from the same base URL. Nothing is memoized here: every
//! call goes to the network, and callers that want to reuse a catalog keep the
//! returned `Vec<Release>` themselves.

#[cfg(test)]
use mockall::automock;

use semver::Version;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::DEFAULT_INDEX_URL;
use crate::runtime::error::IndexError;
use crate::runtime::platform::{ArchiveFormat, PlatformTag};
use crate::runtime::semver::parse_version;

/// One entry of the remote release catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Version as published, including the `v` prefix (e.g. "v20.11.1")
    pub version: String,
    pub is_lts: bool,
    /// Platform-architecture tags with a published binary (e.g. "linux-x64", "win-x64-zip")
    pub available_platforms: Vec<String>,
}

impl Release {
    pub fn new(version: &str, is_lts: bool, available_platforms: &[&str]) -> Self {
        Self {
            version: version.to_string(),
            is_lts,
            available_platforms: available_platforms.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn semver(&self) -> Option<Version> {
        parse_version(&self.version)
    }

    /// Check if the archive we download for the platform is published.
    ///
    /// Entries name the packaging after the tag: "win-x64-zip" or "win-x64.zip"
    /// for the zip, "osx-arm64-tar" for the tarball. Installers such as
    /// "win-x64-msi" or "osx-x64-pkg" do not count.
    pub fn has_platform(&self, platform: &PlatformTag) -> bool {
        let tag = platform.index_tag();
        let suffixes: &[&str] = match platform.archive_format() {
            ArchiveFormat::Zip => &["", ".zip", "-zip"],
            ArchiveFormat::TarGz => &["", "-tar"],
        };

        self.available_platforms.iter().any(|entry| {
            entry
                .strip_prefix(tag.as_str())
                .is_some_and(|rest| suffixes.contains(&rest))
        })
    }
}

/// Wire format of an `index.json` entry
#[derive(Debug, Deserialize)]
struct IndexEntry {
    version: String,
    #[serde(default, deserialize_with = "deserialize_lts")]
    lts: bool,
    #[serde(default)]
    files: Vec<String>,
}

/// `lts` is `false` for current releases and the codename (e.g. "Iron") for LTS lines
fn deserialize_lts<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lts {
        Flag(bool),
        Codename(String),
    }

    Ok(match Lts::deserialize(deserializer)? {
        Lts::Flag(flag) => flag,
        Lts::Codename(name) => !name.is_empty(),
    })
}

impl From<IndexEntry> for Release {
    fn from(entry: IndexEntry) -> Self {
        Self {
            version: entry.version,
            is_lts: entry.lts,
            available_platforms: entry.files,
        }
    }
}

/// Source of releases and release archives
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseIndex: Send + Sync {
    /// Fetches the full release catalog
    ///
    /// # Returns
    /// * `Ok(Vec<Release>)` - Releases in the order the index lists them
    /// * `Err(IndexError)` - Transport or HTTP failure, never retried
    async fn fetch_releases(&self) -> Result<Vec<Release>, IndexError>;

    /// Downloads the archive for a version on a platform
    ///
    /// # Arguments
    /// * `version` - Version as published (e.g. "v20.11.1")
    /// * `platform` - Target platform; decides the archive format
    async fn download_archive(
        &self,
        version: &str,
        platform: &PlatformTag,
    ) -> Result<Vec<u8>, IndexError>;
}

/// Release index backed by nodejs.org (or a mirror with the same layout)
pub struct NodeDistIndex {
    client: reqwest::Client,
    base_url: String,
}

impl NodeDistIndex {
    /// Creates a new NodeDistIndex with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("node-build/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn index_url(&self) -> String {
        format!("{}/index.json", self.base_url)
    }

    /// Deterministic archive location, e.g.
    /// `https://nodejs.org/dist/v20.11.1/node-v20.11.1-linux-x64.tar.gz`
    pub fn archive_url(&self, version: &str, platform: &PlatformTag) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            version,
            platform.archive_name(version)
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, IndexError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("Node.js dist returned status {}: {}", status, url);
            return Err(IndexError::InvalidResponse(format!(
                "Unexpected status {} for {}",
                status, url
            )));
        }

        Ok(response)
    }
}

impl Default for NodeDistIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL)
    }
}

#[async_trait::async_trait]
impl ReleaseIndex for NodeDistIndex {
    async fn fetch_releases(&self) -> Result<Vec<Release>, IndexError> {
        let url = self.index_url();
        debug!("Fetching release index from {}", url);

        let entries: Vec<IndexEntry> = self.get(&url).await?.json().await.map_err(|e| {
            warn!("Failed to parse release index: {}", e);
            IndexError::InvalidResponse(e.to_string())
        })?;

        debug!("Release index lists {} releases", entries.len());
        Ok(entries.into_iter().map(Release::from).collect())
    }

    async fn download_archive(
        &self,
        version: &str,
        platform: &PlatformTag,
    ) -> Result<Vec<u8>, IndexError> {
        let url = self.archive_url(version, platform);
        debug!("Downloading {}", url);

        let bytes = self.get(&url).await?.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(bytes.to_vec())
    }
}
