//! Default values for vendorize configuration.
//!
//! This module provides the well-known file and directory names shared by the
//! library and the CLI, so every path in a run is derived from one place.

use std::time::Duration;

/// Manifest file declaring the repositories to vendor.
pub const MANIFEST_FILE: &str = "dependencies.yaml";

/// Lockfile with every ref resolved to a commit.
pub const LOCKFILE: &str = "dependencies.lock.yaml";

/// Root of the vendor tree.
pub const VENDOR_DIR: &str = "vendor";

/// Addon modules live under `<vendor>/addons/<addon>/<module>`.
pub const ADDONS_DIR: &str = "addons";

/// Directory name of the platform core inside the vendor tree.
pub const CORE_DIR: &str = "odoo";

/// Hidden directory holding one cached clone per addon.
pub const CACHE_DIR: &str = ".tmp_vendor_clones";

/// Passthrough value recorded when the manifest omits `pythonRequirementsPath`.
pub const PYTHON_REQUIREMENTS: &str = "requirements.txt";

/// Prefix of the source archive name.
pub const PROJECT_NAME: &str = "openspp";

/// Build descriptor files copied to the archive root when present.
pub const AUX_FILES: [&str; 4] = ["requirements.txt", "setup.py", "setup.cfg", "pyproject.toml"];

pub const RETRY_ATTEMPTS: u32 = 3;

pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Module manifest file names, current layout first.
pub const MODULE_MANIFESTS: [&str; 2] = ["__manifest__.py", "__openerp__.py"];
