//! # Error Handling
//!
//! This module defines the centralized error type for `vendorize`. It uses the
//! `thiserror` library to build one `Error` enum covering every failure mode
//! of the vendoring pipeline, each variant carrying enough context (repository
//! URL, ref or commit, captured git output) to diagnose a failure without a
//! verbose re-run.
//!
//! ## Propagation
//!
//! - Transient git failures are retried by the command runner and only surface
//!   as [`Error::CommandFailed`] once retries are exhausted.
//! - Resolution and fetch failures ([`Error::RefNotResolved`],
//!   [`Error::CommitUnreachable`]) abort the whole run.
//! - [`Error::ModuleNotFound`] is never propagated: the sync orchestrator logs
//!   it and records it in the summary as a warning.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for vendoring operations
#[derive(Error, Debug)]
pub enum Error {
    /// No remote ref matched the manifest ref in any lookup form.
    #[error("Could not resolve ref '{r#ref}' in repository '{url}'")]
    RefNotResolved { url: String, r#ref: String },

    /// An external command kept failing after every retry.
    #[error("Command `{command}` failed after {attempts} attempt(s): {stderr}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    CommandFailed {
        command: String,
        attempts: u32,
        stderr: String,
        /// Optional hint for how to resolve the failure
        hint: Option<String>,
    },

    /// Every fetch strategy failed to produce a checkout of the commit.
    #[error("Commit {commit} is unreachable in {url}: {message}")]
    CommitUnreachable {
        url: String,
        commit: String,
        message: String,
    },

    /// A checkout reported success but `HEAD` points elsewhere.
    #[error("Checked out {actual} but {expected} was requested")]
    CheckoutMismatch { expected: String, actual: String },

    #[error("Manifest file {} not found", path.display())]
    ManifestNotFound { path: PathBuf },

    /// The manifest is not a well-formed document.
    #[error("Failed to parse manifest {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    /// The manifest parsed but describes something that cannot be vendored.
    #[error("Invalid manifest: {message}")]
    ManifestInvalid { message: String },

    #[error("Lockfile {} not found. Run --lock first.", path.display())]
    LockfileNotFound { path: PathBuf },

    #[error("Failed to parse lockfile {}: {message}", path.display())]
    LockfileParse { path: PathBuf, message: String },

    #[error("Invalid lockfile: {message}")]
    LockfileInvalid { message: String },

    #[error("Vendor directory {} does not exist. Run --sync first.", path.display())]
    VendorTreeMissing { path: PathBuf },

    /// An archive version that cannot be used as a file name.
    #[error("Invalid version '{version}': expected a non-empty name without path separators")]
    InvalidVersion { version: String },

    /// A module declared in the manifest is absent from the fetched tree.
    #[error("Module '{module}' not found in {addon}")]
    ModuleNotFound { addon: String, module: String },

    /// A filesystem operation failed on a specific path.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory walk error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A YAML serialization error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap an I/O failure with the path it happened on.
    pub fn filesystem(action: &str, path: &std::path::Path, err: std::io::Error) -> Self {
        Error::Filesystem {
            message: format!("Failed to {} '{}': {}", action, path.display(), err),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
