//! # Clean Command Implementation
//!
//! `--clean` removes the vendor directory, `--clean-cache` the clone cache.
//! Removing a directory that does not exist succeeds.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use vendorize::config::VendorConfig;

/// Remove the vendor directory.
pub fn execute(config: &VendorConfig) -> Result<()> {
    remove_dir(&config.vendor_dir, "Vendor")
}

/// Remove the clone cache directory.
pub fn execute_cache(config: &VendorConfig) -> Result<()> {
    remove_dir(&config.cache_dir, "Cache")
}

fn remove_dir(path: &Path, label: &str) -> Result<()> {
    if !path.exists() {
        info!("{} directory does not exist", label);
        return Ok(());
    }
    info!(
        "Removing {} directory: {}",
        label.to_lowercase(),
        path.display()
    );
    fs::remove_dir_all(path).with_context(|| format!("Failed to remove {}", path.display()))
}
