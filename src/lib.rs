//! # Vendorize Library
//!
//! Pins external Git repositories (a platform core and any number of addon
//! repositories) to exact commits and copies their modules into a local
//! `vendor/` tree, so builds never depend on a remote at install time.
//!
//! ## Quick Example
//!
//! ```
//! use vendorize::manifest::Manifest;
//!
//! let manifest = Manifest::parse(r#"
//! addons:
//!   queue:
//!     url: https://github.com/OCA/queue.git
//!     ref: "17.0"
//!     modules: [queue_job]
//! "#).unwrap();
//!
//! assert_eq!(manifest.addons["queue"].r#ref, "17.0");
//! assert!(manifest.platform_core_repository.is_none());
//! ```
//!
//! ## Workflow
//!
//! 1. **Lock** (`lockfile`, `resolver`): every ref of `dependencies.yaml` is
//!    resolved with `git ls-remote` and written to `dependencies.lock.yaml`.
//! 2. **Sync** (`sync`, `repository`, `modules`): the lockfile is materialized.
//!    Addons are fetched into a persistent clone cache and their modules copied
//!    into `vendor/addons/<addon>/<module>/`; the platform core is fetched
//!    straight into `vendor/<core>/`.
//! 3. **Archive** (`archive`): the vendor tree is packed into a reproducible
//!    source tarball.
//!
//! All git access goes through the `git::GitOperations` trait and all paths
//! come from an explicit `config::VendorConfig`, so every stage can run against
//! a simulated remote and a temporary directory.
//!
//! The clone cache is meant for one process at a time. Running two vendorize
//! processes against the same cache directory is not supported.

pub mod archive;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod lockfile;
pub mod manifest;
pub mod modules;
pub mod output;
pub mod repository;
pub mod resolver;
pub mod sync;

#[cfg(test)]
mod testing;
