//! Host platform detection and the naming schemes of the Node.js distribution
//!
//! The release index and the download directory name platforms differently:
//! macOS is `osx` in `index.json` but `darwin` in archive names. Both are
//! derived here from the Rust names in `std::env::consts`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::runtime::error::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Maps an operating system name to a supported OS
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linux" => Some(Os::Linux),
            "macos" | "darwin" => Some(Os::MacOs),
            "windows" | "win32" => Some(Os::Windows),
            _ => None,
        }
    }

    /// Name used in `index.json` `files` entries
    pub fn index_name(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "osx",
            Os::Windows => "win",
        }
    }

    /// Name used in archive and extracted directory names
    pub fn dist_name(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "darwin",
            Os::Windows => "win",
        }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Os::Windows => ArchiveFormat::Zip,
            Os::Linux | Os::MacOs => ArchiveFormat::TarGz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Maps a CPU architecture name to the release index encoding
pub fn index_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" | "amd64" | "x64" => Some("x64"),
        "aarch64" | "arm64" => Some("arm64"),
        "x86" | "i386" | "i686" => Some("x86"),
        "s390x" => Some("s390x"),
        _ => None,
    }
}

/// Raw operating system and architecture names of a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// The platform this process runs on
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn is_windows(&self) -> bool {
        Os::from_name(&self.os) == Some(Os::Windows)
    }

    /// Resolve the platform tag used to select a release binary
    ///
    /// Architecture is checked first so an unknown CPU is always reported as such.
    pub fn platform_tag(&self) -> Result<PlatformTag, CacheError> {
        let arch = index_arch(&self.arch)
            .ok_or_else(|| CacheError::UnsupportedArchitecture(self.arch.clone()))?;
        let os = Os::from_name(&self.os).ok_or_else(|| CacheError::UnsupportedOs(self.os.clone()))?;

        Ok(PlatformTag { os, arch })
    }

    /// Location of the node executable inside an installed runtime
    pub fn node_executable(&self, install_dir: &Path) -> PathBuf {
        node_executable(install_dir, self.is_windows())
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::current()
    }
}

/// A supported OS and architecture pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTag {
    pub os: Os,
    pub arch: &'static str,
}

impl PlatformTag {
    /// Tag as listed in `index.json` (e.g. "osx-arm64")
    pub fn index_tag(&self) -> String {
        format!("{}-{}", self.os.index_name(), self.arch)
    }

    /// Suffix of archive and directory names (e.g. "darwin-arm64")
    pub fn dist_tag(&self) -> String {
        format!("{}-{}", self.os.dist_name(), self.arch)
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        self.os.archive_format()
    }

    /// Directory created by extracting the archive, e.g. "node-v20.11.1-linux-x64"
    pub fn install_dir_name(&self, version: &str) -> String {
        format!("node-{}-{}", version, self.dist_tag())
    }

    /// e.g. "node-v20.11.1-linux-x64.tar.gz"
    pub fn archive_name(&self, version: &str) -> String {
        format!(
            "{}.{}",
            self.install_dir_name(version),
            self.archive_format().extension()
        )
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.index_tag())
    }
}

/// `node.exe` at the top of the directory on Windows, `bin/node` elsewhere
pub fn node_executable(install_dir: &Path, windows: bool) -> PathBuf {
    if windows {
        install_dir.join("node.exe")
    } else {
        install_dir.join("bin").join("node")
    }
}

/// npm lives next to node: `npm.cmd` on Windows, `npm` elsewhere
pub fn npm_executable(node: &Path, windows: bool) -> PathBuf {
    let npm = if windows { "npm.cmd" } else { "npm" };
    node.parent()
        .map(|dir| dir.join(npm))
        .unwrap_or_else(|| PathBuf::from(npm))
}
