//! # Run Configuration
//!
//! `VendorConfig` is the single value that tells every component where things
//! live on disk and how hard to retry. Nothing in the library reads a global
//! path; the CLI builds one `VendorConfig` from its flags and passes it down,
//! and tests build one rooted in a temporary directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::defaults;

/// Retry behaviour of the command runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never below 1.
    pub attempts: u32,
    /// Fixed wait between two attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// A single attempt with no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(defaults::RETRY_ATTEMPTS, defaults::RETRY_DELAY)
    }
}

/// Paths and tuning for one vendoring run.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub manifest_path: PathBuf,
    pub lockfile_path: PathBuf,
    pub vendor_dir: PathBuf,
    /// Holds one cached clone per addon; survives between runs.
    pub cache_dir: PathBuf,
    /// Where archives are written and auxiliary build files are read from.
    pub output_dir: PathBuf,
    pub core_dir_name: String,
    pub project_name: String,
    pub aux_files: Vec<String>,
    pub retry: RetryPolicy,
    /// Number of addons fetched concurrently. 1 keeps the run sequential.
    pub jobs: usize,
}

impl VendorConfig {
    /// Lay out every path under `root` using the default names.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            manifest_path: root.join(defaults::MANIFEST_FILE),
            lockfile_path: root.join(defaults::LOCKFILE),
            vendor_dir: root.join(defaults::VENDOR_DIR),
            cache_dir: root.join(defaults::CACHE_DIR),
            output_dir: root.to_path_buf(),
            core_dir_name: defaults::CORE_DIR.to_string(),
            project_name: defaults::PROJECT_NAME.to_string(),
            aux_files: defaults::AUX_FILES.iter().map(|f| f.to_string()).collect(),
            retry: RetryPolicy::default(),
            jobs: 1,
        }
    }

    /// `<vendor>/addons`
    pub fn addons_dir(&self) -> PathBuf {
        self.vendor_dir.join(defaults::ADDONS_DIR)
    }

    /// `<vendor>/<core_dir_name>`
    pub fn core_dir(&self) -> PathBuf {
        self.vendor_dir.join(&self.core_dir_name)
    }

    /// Cache slot of one addon repository.
    pub fn cache_slot(&self, addon: &str) -> PathBuf {
        self.cache_dir.join(addon)
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
