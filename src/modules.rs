//! Module discovery inside a fetched addon repository.

use std::fs;
use std::path::Path;

use crate::defaults::MODULE_MANIFESTS;
use crate::error::{Error, Result};

/// Names of the installable modules directly under `directory`, sorted.
///
/// A module is a non-hidden subdirectory that contains one of the module
/// manifest files.
pub fn discover(directory: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(directory).map_err(|e| Error::filesystem("read", directory, e))?;

    let mut modules = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() && is_module(&path) {
            modules.push(name);
        }
    }
    modules.sort();
    Ok(modules)
}

/// True when `path` carries a module manifest.
pub fn is_module(path: &Path) -> bool {
    MODULE_MANIFESTS
        .iter()
        .any(|manifest| path.join(manifest).is_file())
}
