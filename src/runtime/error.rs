use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum RequirementError {
    #[error("Invalid version requirement '{requirement}': {reason}")]
    Invalid { requirement: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("No installed Node.js matches '{requirement}'")]
    NotInstalled { requirement: String },

    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("No release matches '{requirement}' (lts only: {lts})")]
    NoMatchingRelease { requirement: String, lts: bool },

    #[error("No binary available for Node.js {version} on {platform}")]
    NoBinaryAvailable { version: String, platform: String },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract {archive}: {reason}")]
    Extract { archive: String, reason: String },

    #[error("Extraction did not create expected directory {0:?}")]
    MissingInstallDir(PathBuf),
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("package.json not found at {0:?}")]
    PackageJsonNotFound(PathBuf),

    #[error("Failed to read {path:?}: {reason}")]
    PackageJson { path: PathBuf, reason: String },

    #[error(transparent)]
    Requirement(#[from] RequirementError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
