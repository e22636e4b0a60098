//! # Ref Resolution
//!
//! Turns the human-readable ref of a manifest entry (branch or tag name) into
//! the commit it currently points to, using `git ls-remote` against the remote.
//!
//! ## Lookup order
//!
//! A ref that already is a full commit id is returned without touching the
//! network. Otherwise three lookups are tried, stopping at the first one that
//! yields a line of output:
//!
//! 1. the bare name, as the host orders matching refs,
//! 2. `refs/heads/<name>`,
//! 3. `refs/tags/<name>`.
//!
//! When a branch and a tag share a name, the bare lookup decides, so the
//! winner is whatever the host lists first. Each lookup also asks for the
//! peeled form (`^{}`) so an annotated tag resolves to its commit rather than
//! to the tag object.

use std::sync::Arc;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::git::GitOperations;

/// True for a full 40-character hexadecimal commit id, in either case.
pub fn is_commit_sha(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The three forms a ref is looked up under, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefLookup {
    Bare,
    Branch,
    Tag,
}

impl RefLookup {
    pub const ORDER: [RefLookup; 3] = [RefLookup::Bare, RefLookup::Branch, RefLookup::Tag];

    pub fn pattern(self, ref_name: &str) -> String {
        match self {
            RefLookup::Bare => ref_name.to_string(),
            RefLookup::Branch => format!("refs/heads/{ref_name}"),
            RefLookup::Tag => format!("refs/tags/{ref_name}"),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            RefLookup::Bare => "ref",
            RefLookup::Branch => "branch",
            RefLookup::Tag => "tag",
        }
    }
}

/// Resolves refs to commits through a `GitOperations` implementation.
pub struct RefResolver {
    git: Arc<dyn GitOperations>,
}

impl RefResolver {
    pub fn new(git: Arc<dyn GitOperations>) -> Self {
        Self { git }
    }

    /// Resolve `ref_name` in the repository at `url` to a lowercase commit id.
    pub fn resolve(&self, url: &str, ref_name: &str) -> Result<String> {
        if is_commit_sha(ref_name) {
            debug!("Ref '{}' is already a full SHA", ref_name);
            return Ok(ref_name.to_ascii_lowercase());
        }

        info!("Resolving ref '{}' in {}", ref_name, url);

        for lookup in RefLookup::ORDER {
            let pattern = lookup.pattern(ref_name);
            let peeled = format!("{pattern}^{{}}");

            match self.git.ls_remote(url, &[&pattern, &peeled]) {
                Ok(output) => match parse_ls_remote(&output) {
                    Some(sha) => {
                        info!("Resolved {} '{}' to {}", lookup.describe(), ref_name, sha);
                        return Ok(sha);
                    }
                    None => debug!("No remote ref matches '{}'", pattern),
                },
                Err(e) => debug!("Lookup of '{}' failed: {}", pattern, e),
            }
        }

        Err(Error::RefNotResolved {
            url: url.to_string(),
            r#ref: ref_name.to_string(),
        })
    }
}

/// Pick the commit of the first listed ref, preferring its peeled line.
fn parse_ls_remote(output: &str) -> Option<String> {
    let entries: Vec<(&str, &str)> = output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some((parts.next()?, parts.next().unwrap_or("")))
        })
        .collect();

    let (sha, name) = *entries.first()?;
    let peeled_name = format!("{name}^{{}}");
    let sha = entries
        .iter()
        .find(|(_, n)| !name.is_empty() && *n == peeled_name)
        .map(|(s, _)| *s)
        .unwrap_or(sha);

    is_commit_sha(sha).then(|| sha.to_ascii_lowercase())
}
