//! Node.js runtime acquisition layer
//!
//! Resolves a version requirement against the remote release index, installs
//! the matching release into a local cache, and answers "is a matching runtime
//! installed, and where is its executable" without touching the network.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Locator   │────▶│    Cache    │────▶│    Index    │
//! │ (system/pkg)│     │ (has/get/   │     │ (index.json,│
//! └─────────────┘     │  install)   │     │  archives)  │
//!                     └─────────────┘     └─────────────┘
//!                        │        │
//!                        ▼        ▼
//!               ┌─────────────┐ ┌─────────────┐
//!               │ Requirement │ │   Archive   │
//!               │ (npm ranges)│ │ (tar/zip)   │
//!               └─────────────┘ └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: installed runtimes on disk, release resolution and install
//! - [`index`]: `ReleaseIndex` trait and the nodejs.org client
//! - [`requirement`]: npm-style version range parsing and matching
//! - [`platform`]: host detection and distribution naming
//! - [`archive`]: release archive extraction
//! - [`locator`]: system-then-cache-then-install lookup for a project
//! - [`notifier`]: progress messages for long operations
//! - [`error`]: error types for the layer
//! - [`semver`]: shared semver utilities

pub mod archive;
pub mod cache;
pub mod error;
pub mod index;
pub mod locator;
pub mod notifier;
pub mod platform;
pub mod requirement;
pub mod semver;
