//! Locate or provision a Node.js runtime for frontend builds.
//!
//! - [`config`]: configuration file model and well-known paths
//! - [`logging`]: tracing subscriber setup for the binary
//! - [`runtime`]: release index client, installation cache and runtime locator

pub mod config;
pub mod logging;
pub mod runtime;
