//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// Builder for creating test profile trees
pub struct ProfileTreeBuilder {
    temp_dir: TempDir,
}

impl ProfileTreeBuilder {
    /// Create a new builder with an empty tree
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    /// Get the root of the tree
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a file with raw content at a path relative to the root
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.prepare(relative);
        fs::write(&path, content).expect("Failed to write profile");
        self
    }

    /// Add a gzip-compressed file at a path relative to the root
    pub fn with_gz_file(self, relative: &str, content: &str) -> Self {
        let path = self.prepare(relative);
        let file = fs::File::create(&path).expect("Failed to create profile");
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content.as_bytes()).expect("Failed to write profile");
        encoder.finish().expect("Failed to finish gzip stream");
        self
    }

    /// Add a JSON profile built from a [`HostProfileBuilder`]
    pub fn with_host(self, relative: &str, host: &HostProfileBuilder) -> Self {
        self.with_file(relative, &host.to_json())
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }

    fn prepare(&self, relative: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create profile directory");
        }
        path
    }
}

impl Default for ProfileTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a small but realistic host profile document
pub struct HostProfileBuilder {
    hostname: String,
    personality: String,
    packages: Vec<String>,
    motd: Option<String>,
}

impl HostProfileBuilder {
    /// Create a host profile with default values
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            personality: "web".to_string(),
            packages: vec!["httpd".to_string(), "openssl".to_string()],
            motd: None,
        }
    }

    pub fn with_personality(mut self, personality: &str) -> Self {
        self.personality = personality.to_string();
        self
    }

    pub fn with_packages(mut self, packages: &[&str]) -> Self {
        self.packages = packages.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_motd(mut self, motd: &str) -> Self {
        self.motd = Some(motd.to_string());
        self
    }

    /// Convert to a JSON document
    pub fn to_json(&self) -> String {
        let mut doc = serde_json::json!({
            "system": {
                "network": { "hostname": self.hostname, "interfaces": { "eth0": { "ip": "10.0.0.1" } } },
                "personality": { "name": self.personality },
            },
            "software": { "packages": self.packages },
        });
        if let Some(motd) = &self.motd {
            doc["software"]["components"] = serde_json::json!({ "motd": { "text": motd } });
        }
        serde_json::to_string(&doc).expect("Failed to serialize profile")
    }
}

/// Path of the personality slice used throughout the tests
pub const PERSONALITY: &str = "/system/personality/name";

/// Read a gzip-compressed text file
pub fn read_gz(path: &Path) -> String {
    use std::io::Read;

    let file = fs::File::open(path).expect("Failed to open gzip file");
    let mut text = String::new();
    flate2::read::MultiGzDecoder::new(file)
        .read_to_string(&mut text)
        .expect("Failed to decompress gzip file");
    text
}

/// Two trees with one changed and one added host
pub fn changed_trees() -> (TempDir, TempDir) {
    let left = ProfileTreeBuilder::new()
        .with_host("cluster1/web1.json", &HostProfileBuilder::new("web1"))
        .with_host("cluster1/web2.json", &HostProfileBuilder::new("web2"))
        .with_host("db1.json", &HostProfileBuilder::new("db1").with_personality("db"))
        .build();
    let right = ProfileTreeBuilder::new()
        .with_host(
            "cluster1/web1.json",
            &HostProfileBuilder::new("web1").with_packages(&["httpd", "openssl", "mod_ssl"]),
        )
        .with_host("cluster1/web2.json", &HostProfileBuilder::new("web2"))
        .with_host("db1.json", &HostProfileBuilder::new("db1").with_personality("db"))
        .with_host("db2.json", &HostProfileBuilder::new("db2").with_personality("db-replica"))
        .build();
    (left, right)
}

/// Move every source profile's mtime back to the epoch so canonical
/// files written in the same clock tick still count as newer
pub fn backdate_sources(root: &Path) {
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(".json") || name.ends_with(".json.gz") {
            let file = fs::File::options().write(true).open(entry.path()).unwrap();
            file.set_modified(SystemTime::UNIX_EPOCH).unwrap();
        }
    }
}
