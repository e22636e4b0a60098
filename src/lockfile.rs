//! # Lockfile
//!
//! `dependencies.lock.yaml` mirrors the manifest with every repository pinned
//! to the commit its ref resolved to. It is the only input of a sync: once
//! written it can be loaded without a manifest and without touching the
//! network, and the recorded `ref` then only serves as a fetch hint.
//!
//! The file is replaced atomically: it is written to a temporary file in the
//! same directory and renamed over the previous lockfile.

use std::fs;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::manifest::{
    default_python_requirements, empty_mapping_as_none, explicit, is_plain_name, null_as_default,
    Manifest,
};
use crate::resolver::RefResolver;

/// The platform core pinned to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRepository {
    pub url: String,
    pub r#ref: String,
    pub commit: String,
}

/// An addon pinned to a commit, with its module selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAddon {
    pub url: String,
    pub r#ref: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
}

impl LockedAddon {
    /// The declared module list, if it is non-empty.
    pub fn explicit_modules(&self) -> Option<&[String]> {
        explicit(&self.modules)
    }
}

/// The parsed `dependencies.lock.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    #[serde(
        default,
        alias = "odoo",
        deserialize_with = "empty_mapping_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_core_repository: Option<LockedRepository>,

    #[serde(default = "default_python_requirements", alias = "python_requirements")]
    pub python_requirements_path: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub addons: IndexMap<String, LockedAddon>,
}

impl Lockfile {
    /// Parse and validate a lockfile document.
    pub fn parse(content: &str) -> Result<Self> {
        let lockfile: Lockfile = serde_yaml::from_str(content)?;
        lockfile.validate()?;
        Ok(lockfile)
    }

    /// Load the lockfile at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::LockfileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| Error::filesystem("read", path, e))?;

        match Self::parse(&content) {
            Err(Error::Yaml(e)) => Err(Error::LockfileParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            other => other,
        }
    }

    /// Atomically replace the file at `path` with this lockfile.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| Error::filesystem("create", dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::filesystem("create", dir, e))?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| Error::filesystem("replace", path, e.error))?;

        info!("Lockfile written to {}", path.display());
        Ok(())
    }

    /// Check that every entry is pinned to a well-formed commit.
    pub fn validate(&self) -> Result<()> {
        if let Some(core) = &self.platform_core_repository {
            check_pin("platformCoreRepository", &core.url, &core.commit)?;
        }
        for (name, addon) in &self.addons {
            if !is_plain_name(name) {
                return Err(Error::LockfileInvalid {
                    message: format!("addon name '{name}' must be a single directory name"),
                });
            }
            check_pin(&format!("addons.{name}"), &addon.url, &addon.commit)?;
            if let Some(module) = addon.modules.iter().flatten().find(|m| !is_plain_name(m)) {
                return Err(Error::LockfileInvalid {
                    message: format!(
                        "module '{module}' of addon '{name}' must be a single directory name"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Entries that no longer match `manifest`, described for a warning.
    ///
    /// Compares url, ref and module selection; commits are not re-resolved.
    pub fn stale_entries(&self, manifest: &Manifest) -> Vec<String> {
        let mut stale = Vec::new();

        match (&manifest.platform_core_repository, &self.platform_core_repository) {
            (Some(wanted), Some(locked)) => {
                if wanted.url != locked.url || wanted.r#ref != locked.r#ref {
                    stale.push("platformCoreRepository: url or ref changed".to_string());
                }
            }
            (Some(_), None) => stale.push("platformCoreRepository: not locked".to_string()),
            (None, Some(_)) => {
                stale.push("platformCoreRepository: no longer in manifest".to_string())
            }
            (None, None) => {}
        }

        for (name, wanted) in &manifest.addons {
            match self.addons.get(name) {
                None => stale.push(format!("{name}: not locked")),
                Some(locked) if wanted.url != locked.url || wanted.r#ref != locked.r#ref => {
                    stale.push(format!("{name}: url or ref changed"))
                }
                Some(locked) if wanted.explicit_modules() != locked.explicit_modules() => {
                    stale.push(format!("{name}: module selection changed"))
                }
                Some(_) => {}
            }
        }

        for name in self.addons.keys() {
            if !manifest.addons.contains_key(name) {
                stale.push(format!("{name}: no longer in manifest"));
            }
        }
        stale
    }

    /// Number of repositories (core plus addons) the lockfile pins.
    pub fn repository_count(&self) -> usize {
        self.addons.len() + usize::from(self.platform_core_repository.is_some())
    }
}

fn check_pin(context: &str, url: &str, commit: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::LockfileInvalid {
            message: format!("{context}.url must not be empty"),
        });
    }
    let well_formed =
        commit.len() == 40 && commit.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !well_formed {
        return Err(Error::LockfileInvalid {
            message: format!("{context}.commit '{commit}' is not a full lowercase commit id"),
        });
    }
    Ok(())
}

/// Pins every ref of a manifest through a [`RefResolver`].
pub struct LockfileBuilder<'a> {
    resolver: &'a RefResolver,
}

impl<'a> LockfileBuilder<'a> {
    pub fn new(resolver: &'a RefResolver) -> Self {
        Self { resolver }
    }

    /// Resolve the core and every addon, keeping manifest order.
    pub fn build(&self, manifest: &Manifest) -> Result<Lockfile> {
        info!("Creating lockfile with resolved commits...");

        let platform_core_repository = match &manifest.platform_core_repository {
            Some(core) => {
                info!("Processing platform core repository");
                Some(LockedRepository {
                    url: core.url.clone(),
                    r#ref: core.r#ref.clone(),
                    commit: self.resolver.resolve(&core.url, &core.r#ref)?,
                })
            }
            None => None,
        };

        let mut addons = IndexMap::with_capacity(manifest.addons.len());
        for (name, addon) in &manifest.addons {
            info!("Processing addon repository: {}", name);
            let commit = self.resolver.resolve(&addon.url, &addon.r#ref)?;
            addons.insert(
                name.clone(),
                LockedAddon {
                    url: addon.url.clone(),
                    r#ref: addon.r#ref.clone(),
                    commit,
                    modules: addon.modules.clone(),
                },
            );
        }

        Ok(Lockfile {
            platform_core_repository,
            python_requirements_path: manifest.python_requirements_path.clone(),
            addons,
        })
    }
}
