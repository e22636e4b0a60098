//! # Sync Command Implementation
//!
//! `--sync` rebuilds the vendor directory from the existing lockfile without
//! resolving any ref. When the manifest is around, entries that no longer
//! match it are reported so the user knows to re-lock.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};
use vendorize::config::VendorConfig;
use vendorize::git::{GitCli, GitOperations};
use vendorize::lockfile::Lockfile;
use vendorize::manifest::Manifest;
use vendorize::output::{self, OutputConfig};
use vendorize::repository::RepositoryFetcher;
use vendorize::sync::Syncer;

pub fn execute(config: &VendorConfig, clean_cache: bool, out: &OutputConfig) -> Result<()> {
    let lockfile = Lockfile::from_file(&config.lockfile_path)?;
    warn_stale_entries(config, &lockfile);

    let git: Arc<dyn GitOperations> = Arc::new(GitCli::new(config.retry));
    run(config, git, &lockfile, clean_cache, out)
}

/// Sync `lockfile` into the vendor directory and print the summary.
pub fn run(
    config: &VendorConfig,
    git: Arc<dyn GitOperations>,
    lockfile: &Lockfile,
    clean_cache: bool,
    out: &OutputConfig,
) -> Result<()> {
    let fetcher = RepositoryFetcher::new(git);
    let summary = Syncer::new(config, &fetcher)
        .sync(lockfile, clean_cache)
        .context("Vendor sync failed")?;

    print!("{}", output::render_summary(out, &summary));
    Ok(())
}

fn warn_stale_entries(config: &VendorConfig, lockfile: &Lockfile) {
    if !config.manifest_path.exists() {
        return;
    }
    match Manifest::from_file(&config.manifest_path) {
        Ok(manifest) => {
            let stale = lockfile.stale_entries(&manifest);
            for entry in &stale {
                warn!("Lockfile out of date: {}", entry);
            }
            if !stale.is_empty() {
                warn!("Run --lock to update {}", config.lockfile_path.display());
            }
        }
        Err(e) => debug!("Skipping lockfile freshness check: {}", e),
    }
}
