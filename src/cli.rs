//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use vendorize::config::{RetryPolicy, VendorConfig};
use vendorize::defaults;
use vendorize::output::OutputConfig;

use crate::commands;

const AFTER_HELP: &str = "\
Typical workflow:
  vendorize --lock            resolve dependencies.yaml and vendor everything
  vendorize --sync            rebuild vendor/ from dependencies.lock.yaml
  vendorize --tarball 17.0.1  pack vendor/ into a source archive

The clone cache is not safe to share between concurrent vendorize processes.";

/// Vendorize - pin Git dependencies to exact commits and vendor their modules
#[derive(Parser, Debug)]
#[command(name = "vendorize")]
#[command(version, about, long_about = None, after_help = AFTER_HELP)]
pub struct Cli {
    /// Resolve refs to commits, write the lockfile, then sync
    #[arg(long, conflicts_with = "sync")]
    lock: bool,

    /// Sync the vendor directory from the existing lockfile
    #[arg(long)]
    sync: bool,

    /// Remove the vendor directory
    #[arg(long)]
    clean: bool,

    /// Remove the clone cache; with --lock or --sync, before syncing
    #[arg(long)]
    clean_cache: bool,

    /// Create a source tarball of the vendor directory
    #[arg(long, value_name = "VERSION")]
    tarball: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Dependency manifest
    #[arg(long, value_name = "FILE", env = "VENDORIZE_MANIFEST", default_value = defaults::MANIFEST_FILE)]
    manifest: PathBuf,

    /// Lockfile to write or read
    #[arg(long, value_name = "FILE", env = "VENDORIZE_LOCKFILE", default_value = defaults::LOCKFILE)]
    lockfile: PathBuf,

    /// Vendor directory to populate
    #[arg(long, value_name = "DIR", env = "VENDORIZE_VENDOR_DIR", default_value = defaults::VENDOR_DIR)]
    vendor_dir: PathBuf,

    /// Directory holding cached addon clones between runs
    #[arg(long, value_name = "DIR", env = "VENDORIZE_CACHE_DIR", default_value = defaults::CACHE_DIR)]
    cache_dir: PathBuf,

    /// Where tarballs are written and auxiliary build files are read from
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Attempts per network git command
    #[arg(long, value_name = "N", default_value_t = defaults::RETRY_ATTEMPTS)]
    retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, value_name = "SECONDS", default_value_t = defaults::RETRY_DELAY.as_secs())]
    retry_delay: u64,

    /// Number of addon repositories fetched concurrently
    #[arg(short, long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,

    /// Project name used for the tarball and its top-level directory
    #[arg(long, value_name = "NAME", default_value = defaults::PROJECT_NAME)]
    project_name: String,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,
}

/// The single operation one invocation performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Clean,
    Lock { clean_cache: bool },
    Sync { clean_cache: bool },
    CleanCache,
    Tarball(String),
}

impl Cli {
    /// Pick the operation; `--clean` wins over everything else.
    pub fn action(&self) -> Option<Action> {
        if self.clean {
            Some(Action::Clean)
        } else if self.lock {
            Some(Action::Lock {
                clean_cache: self.clean_cache,
            })
        } else if self.sync {
            Some(Action::Sync {
                clean_cache: self.clean_cache,
            })
        } else if self.clean_cache {
            Some(Action::CleanCache)
        } else {
            self.tarball.clone().map(Action::Tarball)
        }
    }

    pub fn config(&self) -> VendorConfig {
        let mut config = VendorConfig::new(&self.output_dir);
        config.manifest_path = self.manifest.clone();
        config.lockfile_path = self.lockfile.clone();
        config.vendor_dir = self.vendor_dir.clone();
        config.cache_dir = self.cache_dir.clone();
        config.project_name = self.project_name.clone();
        config.retry = RetryPolicy::new(self.retries, Duration::from_secs(self.retry_delay));
        config.jobs = usize::from(self.jobs);
        config
    }

    /// Install the logger: info by default, debug with `--verbose`.
    pub fn init_logging(&self) {
        let level = if self.verbose { "debug" } else { "info" };
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format_target(false)
            .try_init();
    }

    /// Execute the selected action.
    pub fn execute(self, action: Action) -> Result<()> {
        let config = self.config();
        let output = OutputConfig::from_env_and_flag(&self.color);

        match action {
            Action::Clean => commands::clean::execute(&config),
            Action::CleanCache => commands::clean::execute_cache(&config),
            Action::Lock { clean_cache } => commands::lock::execute(&config, clean_cache, &output),
            Action::Sync { clean_cache } => commands::sync::execute(&config, clean_cache, &output),
            Action::Tarball(version) => commands::tarball::execute(&config, &version, &output),
        }
    }
}
