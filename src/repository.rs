//! # Repository Fetching
//!
//! `RepositoryFetcher::ensure` guarantees that a directory is a working tree
//! checked out at an exact commit. It escalates through an ordered list of
//! [`FetchStrategy`] values, cheapest first, and stops at the first one that
//! produces a verified checkout:
//!
//! | Strategy          | Works in         | Does                                   |
//! |-------------------|------------------|----------------------------------------|
//! | `CachedCheckout`  | existing cache   | checkout the commit                    |
//! | `CachedRefFetch`  | existing cache   | shallow fetch of the ref, checkout     |
//! | `CachedUnshallow` | existing cache   | fetch full history, checkout           |
//! | `BranchClone`     | fresh directory  | depth-1 clone of the ref, checkout     |
//! | `DefaultClone`    | fresh directory  | depth-1 clone of the default branch    |
//! | `CommitFetch`     | that clone       | depth-1 fetch of the commit, checkout  |
//! | `Unshallow`       | that clone       | fetch full history, checkout           |
//!
//! Cache strategies only run when the request allows caching and the
//! destination already holds a repository. If they all fail, the cached
//! directory is discarded before the fresh strategies run, so a broken cache
//! never blocks a fetch. Every checkout is verified against `HEAD`.
//!
//! On total failure the destination is removed and
//! [`Error::CommitUnreachable`] carries the last underlying error.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::resolver::is_commit_sha;

/// One way of getting a commit into a working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    CachedCheckout,
    CachedRefFetch,
    CachedUnshallow,
    BranchClone,
    DefaultClone,
    CommitFetch,
    Unshallow,
}

impl FetchStrategy {
    pub fn name(self) -> &'static str {
        match self {
            FetchStrategy::CachedCheckout => "cached checkout",
            FetchStrategy::CachedRefFetch => "cached ref fetch",
            FetchStrategy::CachedUnshallow => "cached unshallow",
            FetchStrategy::BranchClone => "branch clone",
            FetchStrategy::DefaultClone => "default branch clone",
            FetchStrategy::CommitFetch => "commit fetch",
            FetchStrategy::Unshallow => "unshallow",
        }
    }

    /// True for the strategies that reuse a previously cached clone.
    pub fn uses_cache(self) -> bool {
        matches!(
            self,
            FetchStrategy::CachedCheckout
                | FetchStrategy::CachedRefFetch
                | FetchStrategy::CachedUnshallow
        )
    }

    /// Strategies that operate inside a repository an earlier step created.
    fn needs_repository(self) -> bool {
        !matches!(self, FetchStrategy::BranchClone | FetchStrategy::DefaultClone)
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to fetch and where.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Full commit id the destination must end up at.
    pub commit: &'a str,
    pub destination: &'a Path,
    /// Keep `.git` and reuse an existing clone at `destination`.
    pub use_cache: bool,
    /// The ref the commit was resolved from, used as a fetch hint.
    pub original_ref: Option<&'a str>,
}

impl<'a> FetchRequest<'a> {
    /// The original ref, when it names something other than the commit itself.
    pub fn ref_hint(&self) -> Option<&'a str> {
        self.original_ref
            .filter(|r| !r.is_empty() && !is_commit_sha(r))
    }

    /// The strategies `ensure` will try for this request, in order.
    pub fn plan(&self) -> Vec<FetchStrategy> {
        let hinted = self.ref_hint().is_some();
        let mut plan = Vec::with_capacity(7);

        if self.use_cache && is_repository(self.destination) {
            plan.push(FetchStrategy::CachedCheckout);
            if hinted {
                plan.push(FetchStrategy::CachedRefFetch);
            }
            plan.push(FetchStrategy::CachedUnshallow);
        }
        if hinted {
            plan.push(FetchStrategy::BranchClone);
        }
        plan.extend([
            FetchStrategy::DefaultClone,
            FetchStrategy::CommitFetch,
            FetchStrategy::Unshallow,
        ]);
        plan
    }
}

/// Materializes exact commits of remote repositories on disk.
pub struct RepositoryFetcher {
    git: Arc<dyn GitOperations>,
}

impl RepositoryFetcher {
    pub fn new(git: Arc<dyn GitOperations>) -> Self {
        Self { git }
    }

    /// Make `request.destination` a working tree at `request.commit`.
    ///
    /// Returns the strategy that succeeded. When caching is disabled the
    /// `.git` directory is removed afterwards.
    pub fn ensure(&self, request: &FetchRequest<'_>) -> Result<FetchStrategy> {
        let destination = request.destination;
        let mut last_error: Option<Error> = None;
        let mut in_cache = false;

        for strategy in request.plan() {
            if in_cache && !strategy.uses_cache() {
                warn!(
                    "Cached clone at {} cannot provide {}; re-cloning {}",
                    destination.display(),
                    request.commit,
                    request.url
                );
                remove_path(destination)?;
            }
            in_cache = strategy.uses_cache();

            if strategy.needs_repository() && !is_repository(destination) {
                debug!("Skipping {}: no repository at {}", strategy, destination.display());
                continue;
            }

            debug!("Trying {} of {} for {}", strategy, request.url, request.commit);
            match self.attempt(strategy, request) {
                Ok(()) => {
                    if !request.use_cache {
                        remove_path(&destination.join(".git"))?;
                    }
                    debug!("Checked out {} via {}", request.commit, strategy);
                    return Ok(strategy);
                }
                Err(e) => {
                    debug!("{} failed: {}", strategy, e);
                    last_error = Some(e);
                }
            }
        }

        remove_path(destination)?;
        Err(Error::CommitUnreachable {
            url: request.url.to_string(),
            commit: request.commit.to_string(),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no fetch strategy applied".to_string()),
        })
    }

    fn attempt(&self, strategy: FetchStrategy, request: &FetchRequest<'_>) -> Result<()> {
        let destination = request.destination;
        match strategy {
            FetchStrategy::CachedCheckout => {}
            FetchStrategy::CachedRefFetch => {
                self.git.fetch_shallow(destination, hint(strategy, request)?)?;
            }
            FetchStrategy::CachedUnshallow | FetchStrategy::Unshallow => {
                self.git.unshallow(destination)?;
            }
            FetchStrategy::BranchClone => {
                let branch = hint(strategy, request)?;
                remove_path(destination)?;
                self.git.clone_shallow(request.url, Some(branch), destination)?;
            }
            FetchStrategy::DefaultClone => {
                remove_path(destination)?;
                self.git.clone_shallow(request.url, None, destination)?;
            }
            FetchStrategy::CommitFetch => {
                self.git.fetch_shallow(destination, request.commit)?;
            }
        }
        self.checkout_verified(destination, request.commit)
    }

    fn checkout_verified(&self, repo_dir: &Path, commit: &str) -> Result<()> {
        self.git.checkout(repo_dir, commit)?;
        let head = self.git.head_commit(repo_dir)?;
        if !head.trim().eq_ignore_ascii_case(commit) {
            return Err(Error::CheckoutMismatch {
                expected: commit.to_string(),
                actual: head.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn hint<'a>(strategy: FetchStrategy, request: &FetchRequest<'a>) -> Result<&'a str> {
    request.ref_hint().ok_or_else(|| Error::CommitUnreachable {
        url: request.url.to_string(),
        commit: request.commit.to_string(),
        message: format!("{strategy} requires a ref"),
    })
}

fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Remove a file or directory tree if it exists.
pub(crate) fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)
    } else if path.symlink_metadata().is_ok() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.map_err(|e| Error::filesystem("remove", path, e))
}
