//! On-disk cache of installed Node.js runtimes
//!
//! Each runtime lives in its own directory directly under the cache directory,
//! named like the release archive it came from (`node-v20.11.1-linux-x64`).
//! The cache never deletes or modifies an existing install; its only mutation
//! is extracting a new one.
//!
//! Two installs of the same version running at once are not guarded against
//! each other, and an interrupted extraction leaves a directory that later
//! scans treat as a valid install.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use semver::Version;
use tracing::{debug, info};

use crate::runtime::archive;
use crate::runtime::error::CacheError;
use crate::runtime::index::{Release, ReleaseIndex};
use crate::runtime::notifier::Notifier;
use crate::runtime::platform::HostPlatform;
use crate::runtime::requirement::VersionRequirement;
use crate::runtime::semver::find_highest;

/// A runtime found in the cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRuntime {
    pub version: Version,
    pub dir: PathBuf,
}

pub struct RuntimeCache {
    cache_dir: PathBuf,
    index: Arc<dyn ReleaseIndex>,
    platform: HostPlatform,
    install_dir_re: Regex,
}

impl RuntimeCache {
    /// Open the cache, creating the directory if needed
    pub fn new(cache_dir: &Path, index: Arc<dyn ReleaseIndex>) -> Result<Self, CacheError> {
        fs::create_dir_all(cache_dir)?;
        debug!("Runtime cache at {:?}", cache_dir);

        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            index,
            platform: HostPlatform::current(),
            // node-v<semver>, optionally followed by -<os>-<arch>
            install_dir_re: Regex::new(
                r"^node-v(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+?)??)(?:-(?:linux|darwin|win|aix|sunos)-[0-9A-Za-z_]+)?$",
            )
            .unwrap(),
        })
    }

    /// Use a different host platform, for tests and cross-provisioning
    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn platform(&self) -> &HostPlatform {
        &self.platform
    }

    /// Version encoded in an install directory name, if it is one
    fn parse_install_dir_name(&self, name: &str) -> Option<Version> {
        let captures = self.install_dir_re.captures(name)?;
        Version::parse(&captures[1]).ok()
    }

    /// Scan the cache directory for installed runtimes, highest version first
    ///
    /// Files and directories whose names are not install names are skipped.
    pub fn installed(&self) -> Result<Vec<InstalledRuntime>, CacheError> {
        let mut runtimes = Vec::new();

        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();

            let version = match name.to_str().and_then(|n| self.parse_install_dir_name(n)) {
                Some(version) if path.is_dir() => version,
                _ => {
                    debug!("Skipping non-runtime cache entry {:?}", name);
                    continue;
                }
            };

            runtimes.push(InstalledRuntime { version, dir: path });
        }

        runtimes.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(runtimes)
    }

    /// Check if an installed runtime satisfies the requirement; never touches the network
    pub fn has(&self, requirement: Option<&VersionRequirement>) -> Result<bool, CacheError> {
        Ok(self
            .installed()?
            .iter()
            .any(|runtime| satisfies(requirement, &runtime.version)))
    }

    /// Executable of the highest installed runtime satisfying the requirement
    ///
    /// Fails with [`CacheError::NotInstalled`] when nothing matches; call
    /// [`RuntimeCache::has`] or [`RuntimeCache::install`] first.
    pub fn get(&self, requirement: Option<&VersionRequirement>) -> Result<PathBuf, CacheError> {
        let installed = self.installed()?;
        let matching = installed
            .iter()
            .filter(|runtime| satisfies(requirement, &runtime.version));

        let runtime = find_highest(matching, |runtime| &runtime.version).ok_or_else(|| {
            CacheError::NotInstalled {
                requirement: describe(requirement),
            }
        })?;

        debug!("Using cached Node.js {} at {:?}", runtime.version, runtime.dir);
        Ok(self.platform.node_executable(&runtime.dir))
    }

    /// Resolve a release from the online index, download and extract it
    ///
    /// Always goes to the network, even when a matching runtime is installed.
    pub async fn install(
        &self,
        requirement: Option<&VersionRequirement>,
        prefer_lts: bool,
        notifier: &dyn Notifier,
    ) -> Result<PathBuf, CacheError> {
        notifier.notify("Looking up Node.js version in online index.");
        let releases = self.index.fetch_releases().await?;

        let release = resolve_release(&releases, requirement, prefer_lts).ok_or_else(|| {
            CacheError::NoMatchingRelease {
                requirement: describe(requirement),
                lts: prefer_lts,
            }
        })?;
        notifier.notify(&format!("Resolved Node.js version: {}", release.version));

        let install_dir = self.download_and_extract(release).await?;
        let executable = self.platform.node_executable(&install_dir);

        notifier.notify(&format!(
            "Node.js {} is ready at {}",
            release.version,
            executable.display()
        ));
        Ok(executable)
    }

    async fn download_and_extract(&self, release: &Release) -> Result<PathBuf, CacheError> {
        let platform = self.platform.platform_tag()?;

        if !release.has_platform(&platform) {
            return Err(CacheError::NoBinaryAvailable {
                version: release.version.clone(),
                platform: platform.index_tag(),
            });
        }

        let bytes = self
            .index
            .download_archive(&release.version, &platform)
            .await?;

        let archive_name = platform.archive_name(&release.version);
        archive::extract(
            &archive_name,
            platform.archive_format(),
            &bytes,
            &self.cache_dir,
        )?;

        let install_dir = self
            .cache_dir
            .join(platform.install_dir_name(&release.version));
        if !install_dir.is_dir() {
            return Err(CacheError::MissingInstallDir(install_dir));
        }

        info!("Installed Node.js {} into {:?}", release.version, install_dir);
        Ok(install_dir)
    }
}

/// Pick the release to install
///
/// With `prefer_lts`, only LTS releases are considered as long as the catalog
/// has any; a non-LTS release is never substituted when no LTS release
/// satisfies the requirement. The highest remaining version wins.
pub fn resolve_release<'a>(
    releases: &'a [Release],
    requirement: Option<&VersionRequirement>,
    prefer_lts: bool,
) -> Option<&'a Release> {
    let lts_only = prefer_lts && releases.iter().any(|r| r.is_lts);

    let candidates = releases
        .iter()
        .filter(|release| !lts_only || release.is_lts)
        .filter_map(|release| release.semver().map(|version| (release, version)))
        .filter(|(_, version)| satisfies(requirement, version));

    find_highest(candidates, |(_, version)| version).map(|(release, _)| release)
}

fn satisfies(requirement: Option<&VersionRequirement>, version: &Version) -> bool {
    requirement.is_none_or(|requirement| requirement.matches(version))
}

fn describe(requirement: Option<&VersionRequirement>) -> String {
    requirement.map_or_else(|| "*".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::archive::testing::{tar_gz_with, zip_with};
    use crate::runtime::error::IndexError;
    use crate::runtime::index::MockReleaseIndex;
    use crate::runtime::notifier::SilentNotifier;
    use crate::runtime::notifier::testing::RecordingNotifier;
    use rstest::rstest;
    use tempfile::TempDir;

    fn requirement(spec: &str) -> VersionRequirement {
        VersionRequirement::parse(spec).unwrap()
    }

    fn create_test_cache(index: MockReleaseIndex) -> (TempDir, RuntimeCache) {
        let temp_dir = TempDir::new().unwrap();
        let cache = RuntimeCache::new(temp_dir.path(), Arc::new(index))
            .unwrap()
            .with_platform(HostPlatform::new("linux", "x86_64"));
        (temp_dir, cache)
    }

    fn offline_cache() -> (TempDir, RuntimeCache) {
        create_test_cache(MockReleaseIndex::new())
    }

    fn sample_releases() -> Vec<Release> {
        vec![
            Release::new("v18.0.0", true, &["linux-x64", "osx-x64-tar", "win-x64-zip"]),
            Release::new("v16.0.0", false, &["linux-x64", "osx-x64-tar", "win-x64-zip"]),
            Release::new("v20.0.0", true, &["linux-x64", "osx-x64-tar", "win-x64-zip"]),
        ]
    }

    fn mkdir(cache: &RuntimeCache, name: &str) -> PathBuf {
        let dir = cache.cache_dir().join(name);
        fs::create_dir(&dir).unwrap();
        dir
    }

    #[test]
    fn new_creates_cache_directory() {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("nested/cache");

        let cache = RuntimeCache::new(&cache_dir, Arc::new(MockReleaseIndex::new())).unwrap();

        assert!(cache.cache_dir().is_dir());
    }

    #[test]
    fn has_without_requirement_is_true_when_any_runtime_installed() {
        let (_temp_dir, cache) = offline_cache();
        mkdir(&cache, "node-v18.0.0");

        assert!(cache.has(None).unwrap());
    }

    #[test]
    fn has_without_requirement_is_false_for_empty_cache() {
        let (_temp_dir, cache) = offline_cache();

        assert!(!cache.has(None).unwrap());
    }

    #[rstest]
    #[case("node-v18.0.0", ">=18.0.0", true)]
    #[case("node-v16.0.0", ">=18.0.0", false)]
    #[case("node-v18.5.0", ">=18.0.0 <19.0.0", true)]
    #[case("node-v18.5.0-linux-x64", "^18", true)]
    #[case("node-v22.0.0-rc.1-linux-x64", ">=18", false)]
    fn has_checks_installed_versions(
        #[case] dir_name: &str,
        #[case] spec: &str,
        #[case] expected: bool,
    ) {
        let (_temp_dir, cache) = offline_cache();
        mkdir(&cache, dir_name);

        assert_eq!(cache.has(Some(&requirement(spec))).unwrap(), expected);
    }

    #[test]
    fn has_returns_false_when_no_versions_available() {
        let (_temp_dir, cache) = offline_cache();

        assert!(!cache.has(Some(&requirement(">=18.0.0"))).unwrap());
    }

    #[test]
    fn get_returns_highest_matching_version() {
        let (_temp_dir, cache) = offline_cache();
        mkdir(&cache, "node-v18.0.0");
        let highest = mkdir(&cache, "node-v18.5.0");
        mkdir(&cache, "node-v20.1.0");

        let result = cache.get(Some(&requirement(">=18.0.0 <20.0.0"))).unwrap();

        assert_eq!(result, highest.join("bin").join("node"));
    }

    #[test]
    fn get_without_requirement_returns_highest_install() {
        let (_temp_dir, cache) = offline_cache();
        mkdir(&cache, "node-v18.0.0-linux-x64");
        let highest = mkdir(&cache, "node-v20.1.0-linux-x64");

        let result = cache.get(None).unwrap();

        assert_eq!(result, highest.join("bin").join("node"));
    }

    #[test]
    fn get_uses_windows_executable_layout() {
        let (_temp_dir, cache) = offline_cache();
        let cache = cache.with_platform(HostPlatform::new("windows", "x86_64"));
        let dir = mkdir(&cache, "node-v18.0.0-win-x64");

        let result = cache.get(None).unwrap();

        assert_eq!(result, dir.join("node.exe"));
    }

    #[test]
    fn get_fails_when_no_versions_available() {
        let (_temp_dir, cache) = offline_cache();

        let result = cache.get(Some(&requirement(">=18.0.0")));

        assert!(matches!(result, Err(CacheError::NotInstalled { requirement }) if requirement == ">=18.0.0"));
    }

    #[test]
    fn get_fails_when_no_version_matches() {
        let (_temp_dir, cache) = offline_cache();
        mkdir(&cache, "node-v16.0.0");

        let result = cache.get(Some(&requirement(">=18.0.0")));

        assert!(matches!(result, Err(CacheError::NotInstalled { .. })));
    }

    #[test]
    fn installed_skips_stray_entries() {
        let (_temp_dir, cache) = offline_cache();
        let node_18 = mkdir(&cache, "node-v18.0.0");
        let node_16 = mkdir(&cache, "node-v16.5.0");
        mkdir(&cache, "node-vnext");
        mkdir(&cache, "downloads");
        fs::write(cache.cache_dir().join("other-file"), "").unwrap();
        fs::write(cache.cache_dir().join("node-v18.0.0.tar.gz"), "").unwrap();
        fs::write(cache.cache_dir().join("node-v19.0.0"), "").unwrap();

        let installed = cache.installed().unwrap();

        assert_eq!(
            installed,
            vec![
                InstalledRuntime {
                    version: Version::new(18, 0, 0),
                    dir: node_18,
                },
                InstalledRuntime {
                    version: Version::new(16, 5, 0),
                    dir: node_16,
                },
            ]
        );
    }

    #[test]
    fn stray_entries_do_not_satisfy_requirements() {
        let (_temp_dir, cache) = offline_cache();
        fs::write(cache.cache_dir().join("node-v20.0.0"), "").unwrap();
        mkdir(&cache, "node-20.0.0");

        assert!(!cache.has(None).unwrap());
        assert!(matches!(cache.get(None), Err(CacheError::NotInstalled { .. })));
    }

    #[rstest]
    #[case("node-v18.0.0", Some("18.0.0"))]
    #[case("node-v18.0.0-linux-x64", Some("18.0.0"))]
    #[case("node-v20.11.1-darwin-arm64", Some("20.11.1"))]
    #[case("node-v18.0.0-win-x64", Some("18.0.0"))]
    #[case("node-v22.0.0-rc.1", Some("22.0.0-rc.1"))]
    #[case("node-v22.0.0-rc.1-linux-x64", Some("22.0.0-rc.1"))]
    #[case("node-v18.0.0.tar.gz", None)]
    #[case("node-18.0.0", None)]
    #[case("node-v18", None)]
    #[case("other-file", None)]
    fn parse_install_dir_name_extracts_version(
        #[case] name: &str,
        #[case] expected: Option<&str>,
    ) {
        let (_temp_dir, cache) = offline_cache();

        assert_eq!(
            cache.parse_install_dir_name(name).map(|v| v.to_string()),
            expected.map(str::to_string)
        );
    }

    #[rstest]
    #[case(None, true, "v20.0.0")]
    #[case(None, false, "v20.0.0")]
    #[case(Some(">=18.0.0 <20.0.0"), true, "v18.0.0")]
    #[case(Some("<18"), false, "v16.0.0")]
    fn resolve_release_picks_highest_candidate(
        #[case] spec: Option<&str>,
        #[case] prefer_lts: bool,
        #[case] expected: &str,
    ) {
        let releases = sample_releases();
        let requirement = spec.map(requirement);

        let release = resolve_release(&releases, requirement.as_ref(), prefer_lts).unwrap();

        assert_eq!(release.version, expected);
    }

    #[test]
    fn resolve_release_does_not_fall_back_to_non_lts() {
        let releases = sample_releases();

        let release = resolve_release(&releases, Some(&requirement("<18")), true);

        assert_eq!(release, None);
    }

    #[test]
    fn resolve_release_uses_all_releases_when_none_is_lts() {
        let releases = vec![
            Release::new("v21.0.0", false, &["linux-x64"]),
            Release::new("v19.0.0", false, &["linux-x64"]),
        ];

        let release = resolve_release(&releases, None, true).unwrap();

        assert_eq!(release.version, "v21.0.0");
    }

    #[test]
    fn resolve_release_skips_unparseable_versions() {
        let releases = vec![
            Release::new("nightly", true, &["linux-x64"]),
            Release::new("v18.0.0", true, &["linux-x64"]),
        ];

        let release = resolve_release(&releases, None, true).unwrap();

        assert_eq!(release.version, "v18.0.0");
    }

    #[tokio::test]
    async fn install_downloads_extracts_and_returns_executable() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .times(1)
            .returning(|| Ok(sample_releases()));
        index
            .expect_download_archive()
            .withf(|version, platform| version == "v18.0.0" && platform.index_tag() == "linux-x64")
            .times(1)
            .returning(|_, _| {
                Ok(tar_gz_with(&[("node-v18.0.0-linux-x64/bin/node", "#!/bin/sh\n")]))
            });
        let (_temp_dir, cache) = create_test_cache(index);
        let notifier = RecordingNotifier::default();

        let result = cache
            .install(Some(&requirement(">=18.0.0 <20.0.0")), true, &notifier)
            .await
            .unwrap();

        let expected = cache
            .cache_dir()
            .join("node-v18.0.0-linux-x64")
            .join("bin")
            .join("node");
        assert_eq!(result, expected);
        assert!(result.is_file());
        assert!(cache.has(Some(&requirement("18"))).unwrap());
        assert_eq!(cache.get(None).unwrap(), expected);

        let messages = notifier.messages();
        assert_eq!(messages[0], "Looking up Node.js version in online index.");
        assert_eq!(messages[1], "Resolved Node.js version: v18.0.0");
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn install_extracts_zip_on_windows() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(vec![Release::new("v18.0.0", true, &["linux-x64", "win-x64.zip"])]));
        index
            .expect_download_archive()
            .times(1)
            .returning(|_, _| Ok(zip_with(&[("node-v18.0.0-win-x64/node.exe", "MZ")])));
        let (_temp_dir, cache) = create_test_cache(index);
        let cache = cache.with_platform(HostPlatform::new("windows", "x86_64"));

        let result = cache.install(None, true, &SilentNotifier).await.unwrap();

        assert_eq!(
            result,
            cache.cache_dir().join("node-v18.0.0-win-x64").join("node.exe")
        );
        assert!(result.is_file());
    }

    #[tokio::test]
    async fn install_fails_on_unsupported_architecture_without_downloading() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(sample_releases()));
        index.expect_download_archive().times(0);
        let (_temp_dir, cache) = create_test_cache(index);
        let cache = cache.with_platform(HostPlatform::new("linux", "unsupported_arch"));

        let result = cache.install(None, true, &SilentNotifier).await;

        assert!(matches!(result, Err(CacheError::UnsupportedArchitecture(arch)) if arch == "unsupported_arch"));
    }

    #[tokio::test]
    async fn install_fails_when_no_binary_available_without_downloading() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(vec![Release::new("v18.0.0", true, &["osx-x64-tar", "win-x64-zip"])]));
        index.expect_download_archive().times(0);
        let (_temp_dir, cache) = create_test_cache(index);

        let result = cache.install(None, true, &SilentNotifier).await;

        assert!(matches!(
            result,
            Err(CacheError::NoBinaryAvailable { version, platform })
                if version == "v18.0.0" && platform == "linux-x64"
        ));
        assert!(cache.installed().unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_skips_download_when_only_installers_are_published() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(vec![Release::new("v4.0.0", true, &["win-x64-exe", "win-x64-msi"])]));
        index.expect_download_archive().times(0);
        let (_temp_dir, cache) = create_test_cache(index);
        let cache = cache.with_platform(HostPlatform::new("windows", "x86_64"));

        let result = cache.install(None, true, &SilentNotifier).await;

        assert!(matches!(
            result,
            Err(CacheError::NoBinaryAvailable { version, platform })
                if version == "v4.0.0" && platform == "win-x64"
        ));
    }

    #[tokio::test]
    async fn install_fails_when_no_release_matches() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(sample_releases()));
        index.expect_download_archive().times(0);
        let (_temp_dir, cache) = create_test_cache(index);

        let result = cache
            .install(Some(&requirement(">=99")), true, &SilentNotifier)
            .await;

        assert!(matches!(result, Err(CacheError::NoMatchingRelease { lts: true, .. })));
    }

    #[tokio::test]
    async fn install_propagates_index_failure() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Err(IndexError::InvalidResponse("Network error".to_string())));
        index.expect_download_archive().times(0);
        let (_temp_dir, cache) = create_test_cache(index);

        let result = cache.install(None, true, &SilentNotifier).await;

        assert!(matches!(result, Err(CacheError::Index(IndexError::InvalidResponse(_)))));
    }

    #[tokio::test]
    async fn install_propagates_download_failure() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(sample_releases()));
        index
            .expect_download_archive()
            .returning(|_, _| Err(IndexError::InvalidResponse("Unexpected status 500".to_string())));
        let (_temp_dir, cache) = create_test_cache(index);

        let result = cache.install(None, true, &SilentNotifier).await;

        assert!(matches!(result, Err(CacheError::Index(_))));
        assert!(cache.installed().unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_fails_when_archive_has_unexpected_layout() {
        let mut index = MockReleaseIndex::new();
        index
            .expect_fetch_releases()
            .returning(|| Ok(sample_releases()));
        index
            .expect_download_archive()
            .returning(|_, _| Ok(tar_gz_with(&[("something-else/bin/node", "")])));
        let (_temp_dir, cache) = create_test_cache(index);

        let result = cache.install(None, true, &SilentNotifier).await;

        assert!(matches!(result, Err(CacheError::MissingInstallDir(_))));
    }
}
