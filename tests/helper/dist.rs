//! Fake Node.js distribution site

use std::sync::Arc;

use mockito::{Mock, Server, ServerGuard};
use serde_json::{Value, json};
use tempfile::TempDir;

use node_build::runtime::cache::RuntimeCache;
use node_build::runtime::index::NodeDistIndex;
use node_build::runtime::platform::{HostPlatform, PlatformTag};

pub fn linux_x64() -> HostPlatform {
    HostPlatform::new("linux", "x86_64")
}

pub fn windows_x64() -> HostPlatform {
    HostPlatform::new("windows", "x86_64")
}

/// One `index.json` entry; `lts` is a codename like the real index uses
pub fn index_entry(version: &str, lts: Option<&str>, files: &[&str]) -> Value {
    json!({
        "version": version,
        "date": "2024-01-01",
        "lts": lts.map_or(json!(false), |codename| json!(codename)),
        "files": files,
    })
}

/// mockito server laid out like `https://nodejs.org/dist`
pub struct DistServer {
    server: ServerGuard,
}

impl DistServer {
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Serve `index.json`, expecting exactly `hits` requests
    pub async fn mock_index(&mut self, entries: &[Value], hits: usize) -> Mock {
        self.server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Value::Array(entries.to_vec()).to_string())
            .expect(hits)
            .create_async()
            .await
    }

    /// Serve the archive for a version and platform, expecting exactly `hits` requests
    pub async fn mock_archive(
        &mut self,
        version: &str,
        platform: &PlatformTag,
        bytes: Vec<u8>,
        hits: usize,
    ) -> Mock {
        let path = format!("/{}/{}", version, platform.archive_name(version));
        self.server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(bytes)
            .expect(hits)
            .create_async()
            .await
    }

    pub async fn mock_missing_archive(&mut self, version: &str, platform: &PlatformTag) -> Mock {
        let path = format!("/{}/{}", version, platform.archive_name(version));
        self.server
            .mock("GET", path.as_str())
            .with_status(404)
            .create_async()
            .await
    }
}

/// Empty cache in a temp dir, talking to `index_url`
pub fn create_test_cache(index_url: &str, platform: HostPlatform) -> (TempDir, RuntimeCache) {
    let temp_dir = TempDir::new().unwrap();
    let index = Arc::new(NodeDistIndex::new(index_url));
    let cache = RuntimeCache::new(&temp_dir.path().join("nodejs"), index)
        .unwrap()
        .with_platform(platform);
    (temp_dir, cache)
}
