//! Shared utilities for integration tests
#![allow(dead_code)]

mod archive;
mod dist;

pub use archive::release_archive;
pub use dist::{DistServer, create_test_cache, index_entry, linux_x64, windows_x64};
