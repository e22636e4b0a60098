//! # Lock Command Implementation
//!
//! `--lock` resolves every ref of the manifest to a commit, atomically writes
//! the lockfile and then syncs the vendor directory from it.

use std::sync::Arc;

use anyhow::{Context, Result};
use vendorize::config::VendorConfig;
use vendorize::git::{GitCli, GitOperations};
use vendorize::lockfile::LockfileBuilder;
use vendorize::manifest::Manifest;
use vendorize::output::{self, OutputConfig};
use vendorize::resolver::RefResolver;

use super::sync;

pub fn execute(config: &VendorConfig, clean_cache: bool, out: &OutputConfig) -> Result<()> {
    let git: Arc<dyn GitOperations> = Arc::new(GitCli::new(config.retry));
    run(config, git, clean_cache, out)
}

pub fn run(
    config: &VendorConfig,
    git: Arc<dyn GitOperations>,
    clean_cache: bool,
    out: &OutputConfig,
) -> Result<()> {
    let manifest = Manifest::from_file(&config.manifest_path)?;

    let resolver = RefResolver::new(git.clone());
    let lockfile = LockfileBuilder::new(&resolver)
        .build(&manifest)
        .context("Failed to resolve manifest refs")?;
    lockfile.write_to(&config.lockfile_path)?;
    println!(
        "{}",
        output::render_written(out, "Lockfile", &config.lockfile_path)
    );

    sync::run(config, git, &lockfile, clean_cache, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sync::tests::UnreachableGit;
    use std::fs;
    use tempfile::TempDir;
    use vendorize::lockfile::Lockfile;

    fn plain() -> OutputConfig {
        OutputConfig::from_env_and_flag("never")
    }

    #[test]
    fn test_lock_requires_manifest() {
        let temp = TempDir::new().unwrap();
        let config = VendorConfig::new(temp.path());

        let err = run(&config, Arc::new(UnreachableGit), false, &plain()).unwrap_err();
        assert!(err.to_string().contains("dependencies.yaml not found"));
        assert!(!config.lockfile_path.exists());
    }

    #[test]
    fn test_unresolvable_ref_writes_no_lockfile() {
        let temp = TempDir::new().unwrap();
        let config = VendorConfig::new(temp.path());
        fs::write(
            &config.manifest_path,
            "addons:\n  queue:\n    url: https://github.com/OCA/queue.git\n    ref: \"17.0\"\n",
        )
        .unwrap();

        let err = run(&config, Arc::new(UnreachableGit), false, &plain()).unwrap_err();

        assert!(format!("{err:#}").contains("Could not resolve ref '17.0'"));
        assert!(!config.lockfile_path.exists());
        assert!(!config.vendor_dir.exists());
    }

    #[test]
    fn test_empty_manifest_locks_without_network() {
        let temp = TempDir::new().unwrap();
        let config = VendorConfig::new(temp.path());
        fs::write(
            &config.manifest_path,
            "odoo: {}\npython_requirements: requirements.txt\naddons: {}\n",
        )
        .unwrap();

        run(&config, Arc::new(UnreachableGit), false, &plain()).unwrap();

        let lockfile = Lockfile::from_file(&config.lockfile_path).unwrap();
        assert!(lockfile.platform_core_repository.is_none());
        assert!(lockfile.addons.is_empty());
        assert!(config.addons_dir().is_dir());
    }
}
