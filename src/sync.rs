//! # Vendor Tree Synchronization
//!
//! Rebuilds the vendor tree from a lockfile:
//!
//! 1. delete and recreate `vendor/` and `vendor/addons/`,
//! 2. clear the clone cache if asked, otherwise make sure it exists,
//! 3. fetch the platform core straight into `vendor/<core>/` without caching,
//! 4. fetch every addon into its cache slot, then copy its modules (declared or
//!    discovered) into `vendor/addons/<addon>/<module>/`.
//!
//! Any fetch failure aborts the sync. A declared module that the fetched tree
//! does not contain is only a warning. The cache is never removed here except
//! on request, so an interrupted or failed sync keeps it for the next run.
//!
//! With `jobs > 1` addon fetches run on a dedicated rayon pool. Each addon has
//! its own cache slot, so fetches never share a directory; copying always
//! happens afterwards, in lockfile order.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::VendorConfig;
use crate::error::{Error, Result};
use crate::lockfile::{LockedAddon, LockedRepository, Lockfile};
use crate::modules;
use crate::repository::{remove_path, FetchRequest, FetchStrategy, RepositoryFetcher};

/// What one addon contributed to the vendor tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonSummary {
    pub name: String,
    pub modules: Vec<String>,
    pub strategy: FetchStrategy,
}

/// Result of a successful sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Location of the vendored platform core, if the lockfile has one.
    pub core: Option<PathBuf>,
    pub addons: Vec<AddonSummary>,
    /// Declared modules that were missing from their addon.
    pub warnings: Vec<String>,
}

impl SyncSummary {
    pub fn total_modules(&self) -> usize {
        self.addons.iter().map(|a| a.modules.len()).sum()
    }
}

/// Populates the vendor tree described by a [`VendorConfig`].
pub struct Syncer<'a> {
    config: &'a VendorConfig,
    fetcher: &'a RepositoryFetcher,
}

impl<'a> Syncer<'a> {
    pub fn new(config: &'a VendorConfig, fetcher: &'a RepositoryFetcher) -> Self {
        Self { config, fetcher }
    }

    pub fn sync(&self, lockfile: &Lockfile, clean_cache: bool) -> Result<SyncSummary> {
        info!("Syncing vendor directory from lockfile...");
        self.reset_vendor_tree()?;
        self.prepare_cache(clean_cache)?;

        let mut summary = SyncSummary::default();
        if let Some(core) = &lockfile.platform_core_repository {
            summary.core = Some(self.sync_core(core)?);
        }

        let strategies = self.fetch_addons(lockfile)?;
        for ((name, addon), strategy) in lockfile.addons.iter().zip(strategies) {
            let modules = self.copy_modules(name, addon, &mut summary.warnings)?;
            summary.addons.push(AddonSummary {
                name: name.clone(),
                modules,
                strategy,
            });
        }

        info!(
            "Vendored {} module(s) from {} addon repositories",
            summary.total_modules(),
            summary.addons.len()
        );
        Ok(summary)
    }

    fn reset_vendor_tree(&self) -> Result<()> {
        remove_path(&self.config.vendor_dir)?;
        let addons_dir = self.config.addons_dir();
        fs::create_dir_all(&addons_dir).map_err(|e| Error::filesystem("create", &addons_dir, e))
    }

    fn prepare_cache(&self, clean_cache: bool) -> Result<()> {
        let cache_dir = &self.config.cache_dir;
        if clean_cache {
            info!("Cleaning cache directory {}", cache_dir.display());
            remove_path(cache_dir)?;
        }
        fs::create_dir_all(cache_dir).map_err(|e| Error::filesystem("create", cache_dir, e))
    }

    fn sync_core(&self, core: &LockedRepository) -> Result<PathBuf> {
        let destination = self.config.core_dir();
        info!("Processing platform core at {}", core.commit);

        let request = FetchRequest {
            url: &core.url,
            commit: &core.commit,
            destination: &destination,
            use_cache: false,
            original_ref: Some(&core.r#ref),
        };
        match self.fetcher.ensure(&request) {
            Ok(strategy) => {
                debug!("Platform core fetched via {}", strategy);
                Ok(destination)
            }
            Err(e) => {
                remove_path(&destination)?;
                Err(e)
            }
        }
    }

    /// Fetch every addon into its cache slot; strategies come back in lockfile order.
    fn fetch_addons(&self, lockfile: &Lockfile) -> Result<Vec<FetchStrategy>> {
        let entries: Vec<(&String, &LockedAddon)> = lockfile.addons.iter().collect();

        if self.config.jobs <= 1 || entries.len() <= 1 {
            return entries
                .into_iter()
                .map(|(name, addon)| self.fetch_addon(name, addon))
                .collect();
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!(
                    "Could not start {} fetch workers ({}); fetching sequentially",
                    self.config.jobs, e
                );
                return entries
                    .into_iter()
                    .map(|(name, addon)| self.fetch_addon(name, addon))
                    .collect();
            }
        };

        let results: Vec<Result<FetchStrategy>> = pool.install(|| {
            entries
                .par_iter()
                .map(|(name, addon)| self.fetch_addon(name, addon))
                .collect()
        });
        // first failure in lockfile order wins
        results.into_iter().collect()
    }

    fn fetch_addon(&self, name: &str, addon: &LockedAddon) -> Result<FetchStrategy> {
        info!("Processing addon: {}", name);
        let slot = self.config.cache_slot(name);
        let strategy = self.fetcher.ensure(&FetchRequest {
            url: &addon.url,
            commit: &addon.commit,
            destination: &slot,
            use_cache: true,
            original_ref: Some(&addon.r#ref),
        })?;
        debug!("Addon {} fetched via {}", name, strategy);
        Ok(strategy)
    }

    fn copy_modules(
        &self,
        name: &str,
        addon: &LockedAddon,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<String>> {
        let source = self.config.cache_slot(name);
        let target = self.config.addons_dir().join(name);

        let wanted = match addon.explicit_modules() {
            Some(list) => list.to_vec(),
            None => {
                let found = modules::discover(&source)?;
                debug!("Discovered {} module(s) in {}", found.len(), name);
                found
            }
        };

        let mut copied = Vec::with_capacity(wanted.len());
        for module in wanted {
            let module_source = source.join(&module);
            if !module_source.is_dir() {
                let missing = Error::ModuleNotFound {
                    addon: name.to_string(),
                    module,
                };
                warn!("{}", missing);
                warnings.push(missing.to_string());
                continue;
            }
            copy_tree(&module_source, &target.join(&module))?;
            copied.push(module);
        }

        info!("Copied {} module(s) from {}", copied.len(), name);
        Ok(copied)
    }
}

/// Copy a directory tree, following symlinks and leaving out `.git`.
fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    let walker = WalkDir::new(source)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|e| Error::filesystem("create", &destination, e))?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::filesystem("create", parent, e))?;
            }
            fs::copy(entry.path(), &destination)
                .map_err(|e| Error::filesystem("copy", entry.path(), e))?;
        }
    }
    Ok(())
}
