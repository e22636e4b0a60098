//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_manifest(manifests::EMPTY);
//!     fixture.command().arg("--lock").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    pub use super::TestFixture;
}

/// Manifest and lockfile snippets.
#[allow(dead_code)]
pub mod manifests {
    /// A manifest that vendors nothing; locking it needs no network.
    pub const EMPTY: &str = "addons: {}\n";

    /// A manifest pointing at a host that cannot exist.
    pub const UNREACHABLE: &str = r#"
addons:
  queue:
    url: https://invalid.invalid/OCA/queue.git
    ref: "17.0"
"#;

    /// A lockfile that vendors nothing.
    pub const EMPTY_LOCK: &str = "pythonRequirementsPath: requirements.txt\naddons: {}\n";

    pub const INVALID_YAML: &str = "addons: [unclosed";
}

/// A temporary project directory the `vendorize` binary runs in.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `dependencies.yaml`.
    pub fn with_manifest(self, content: &str) -> Self {
        self.with_file("dependencies.yaml", content)
    }

    /// Write `dependencies.lock.yaml`.
    pub fn with_lockfile(self, content: &str) -> Self {
        self.with_file("dependencies.lock.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.path().join("vendor")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.path().join(".tmp_vendor_clones")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `vendorize` command running in this fixture, without retry delays.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vendorize");
        cmd.current_dir(self.path())
            .env_remove("VENDORIZE_MANIFEST")
            .env_remove("VENDORIZE_LOCKFILE")
            .env_remove("VENDORIZE_VENDOR_DIR")
            .env_remove("VENDORIZE_CACHE_DIR")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .args(["--retries", "1", "--retry-delay", "0"]);
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_manifest() {
        let fixture = TestFixture::new().with_manifest(manifests::EMPTY);
        assert!(fixture.path().join("dependencies.yaml").exists());
    }

    #[test]
    fn test_snippets_are_valid_yaml() {
        for snippet in [manifests::EMPTY, manifests::UNREACHABLE, manifests::EMPTY_LOCK] {
            serde_yaml::from_str::<serde_yaml::Value>(snippet).expect("snippet should be valid YAML");
        }
        assert!(serde_yaml::from_str::<serde_yaml::Value>(manifests::INVALID_YAML).is_err());
    }
}
