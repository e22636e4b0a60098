//! # Dependency Manifest
//!
//! This module defines the data structures of `dependencies.yaml`, the
//! hand-written manifest that declares what to vendor, and the logic for
//! loading it.
//!
//! ```yaml
//! platformCoreRepository:
//!   url: https://github.com/odoo/odoo.git
//!   ref: "17.0"
//! pythonRequirementsPath: requirements.txt
//! addons:
//!   openspp_modules:
//!     url: https://github.com/OpenSPP/openspp-modules.git
//!     ref: "17.0"
//!     modules: [spp_base, spp_programs]
//!   server_tools:
//!     url: https://github.com/OCA/server-tools.git
//!     ref: "17.0"
//! ```
//!
//! Addon order is preserved as written. An addon without `modules` (or with
//! an empty list) has its modules discovered automatically after fetching.
//!
//! The legacy keys `odoo` and `python_requirements` are still accepted, and an
//! empty mapping for the core repository means no core is vendored.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// A repository pinned by a human-readable ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    /// The URL of the Git repository.
    pub url: String,
    /// Branch or tag name, or a full commit id.
    pub r#ref: String,
}

/// An addon repository and the modules to take from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSpec {
    pub url: String,
    pub r#ref: String,
    /// Module directories to copy. `None` or empty means auto-discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
}

impl AddonSpec {
    /// The declared module list, if it is non-empty.
    pub fn explicit_modules(&self) -> Option<&[String]> {
        explicit(&self.modules)
    }
}

/// The parsed `dependencies.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(
        default,
        alias = "odoo",
        deserialize_with = "empty_mapping_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_core_repository: Option<RepositorySpec>,

    /// Opaque path handed through to the lockfile.
    #[serde(default = "default_python_requirements", alias = "python_requirements")]
    pub python_requirements_path: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub addons: IndexMap<String, AddonSpec>,
}

impl Manifest {
    /// Parse and validate a manifest document.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load the manifest at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| Error::filesystem("read", path, e))?;

        match Self::parse(&content) {
            Err(Error::Yaml(e)) => Err(Error::ManifestParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            other => other,
        }
    }

    /// Check that every entry can be fetched and laid out on disk.
    pub fn validate(&self) -> Result<()> {
        if let Some(core) = &self.platform_core_repository {
            require_field("platformCoreRepository", "url", &core.url)?;
            require_field("platformCoreRepository", "ref", &core.r#ref)?;
        }

        for (name, addon) in &self.addons {
            if !is_plain_name(name) {
                return Err(Error::ManifestInvalid {
                    message: format!("addon name '{name}' must be a single directory name"),
                });
            }
            let context = format!("addons.{name}");
            require_field(&context, "url", &addon.url)?;
            require_field(&context, "ref", &addon.r#ref)?;

            let mut seen = HashSet::new();
            for module in addon.modules.iter().flatten() {
                if !is_plain_name(module) {
                    return Err(Error::ManifestInvalid {
                        message: format!(
                            "module '{module}' of addon '{name}' must be a single directory name"
                        ),
                    });
                }
                if !seen.insert(module) {
                    return Err(Error::ManifestInvalid {
                        message: format!("module '{module}' is listed twice in addon '{name}'"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of repositories (core plus addons) the manifest declares.
    pub fn repository_count(&self) -> usize {
        self.addons.len() + usize::from(self.platform_core_repository.is_some())
    }
}

fn require_field(context: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ManifestInvalid {
            message: format!("{context}.{field} must not be empty"),
        });
    }
    Ok(())
}

/// A name usable as one path component: not empty, no separators, not `.`/`..`.
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

pub(crate) fn explicit(modules: &Option<Vec<String>>) -> Option<&[String]> {
    modules.as_deref().filter(|m| !m.is_empty())
}

pub(crate) fn default_python_requirements() -> String {
    defaults::PYTHON_REQUIREMENTS.to_string()
}

/// Treat a missing value, `null` or `{}` as absent.
pub(crate) fn empty_mapping_as_none<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::Mapping(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_yaml::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Treat an explicit `null` like a missing value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
