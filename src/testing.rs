//! Test doubles shared by the unit tests.
//!
//! `FakeGit` simulates remote repositories and their local clones closely
//! enough to drive the fetch state machine: shallow clones only contain the
//! tip they were cloned at, targeted fetches can be refused, and unshallowing
//! makes every commit of the remote available. Working trees are written to
//! the real filesystem so module discovery and copying can run against them.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::git::GitOperations;

pub const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const SHA_C: &str = "cccccccccccccccccccccccccccccccccccccccc";
pub const SHA_D: &str = "dddddddddddddddddddddddddddddddddddddddd";
pub const SHA_E: &str = "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";

/// One simulated remote repository.
#[derive(Debug, Clone)]
pub struct FakeRemote {
    default_branch: String,
    /// `(full ref name, sha)` in the order `ls-remote` prints them.
    refs: Vec<(String, String)>,
    trees: HashMap<String, Vec<(String, String)>>,
    serves_commit_ids: bool,
}

impl FakeRemote {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            refs: Vec::new(),
            trees: HashMap::new(),
            serves_commit_ids: true,
        }
    }

    /// Register a commit and the files of its tree.
    pub fn commit(mut self, sha: &str, files: &[(&str, &str)]) -> Self {
        self.trees.insert(
            sha.to_string(),
            files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        );
        self
    }

    pub fn branch(mut self, name: &str, sha: &str) -> Self {
        self.set_ref(format!("refs/heads/{name}"), sha);
        self
    }

    pub fn tag(mut self, name: &str, sha: &str) -> Self {
        self.set_ref(format!("refs/tags/{name}"), sha);
        self
    }

    pub fn annotated_tag(mut self, name: &str, tag_object: &str, sha: &str) -> Self {
        self.set_ref(format!("refs/tags/{name}"), tag_object);
        self.set_ref(format!("refs/tags/{name}^{{}}"), sha);
        self
    }

    /// Refuse `git fetch origin <sha>` like hosts without
    /// `uploadpack.allowReachableSHA1InWant`.
    pub fn without_commit_fetch(mut self) -> Self {
        self.serves_commit_ids = false;
        self
    }

    fn set_ref(&mut self, name: String, sha: &str) {
        if let Some(entry) = self.refs.iter_mut().find(|(r, _)| *r == name) {
            entry.1 = sha.to_string();
        } else {
            self.refs.push((name, sha.to_string()));
        }
    }

    /// Tip of a branch or tag, dereferencing annotated tags.
    fn tip(&self, name: &str) -> Option<String> {
        let lookup = |full: String| {
            self.refs
                .iter()
                .find(|(r, _)| *r == full)
                .map(|(_, sha)| sha.clone())
        };
        lookup(format!("refs/heads/{name}"))
            .or_else(|| lookup(format!("refs/tags/{name}^{{}}")))
            .or_else(|| lookup(format!("refs/tags/{name}")))
    }
}

#[derive(Debug, Clone)]
struct LocalClone {
    url: String,
    objects: HashSet<String>,
    head: Option<String>,
}

/// In-memory `GitOperations` backed by `FakeRemote`s.
#[derive(Debug, Default)]
pub struct FakeGit {
    remotes: Mutex<HashMap<String, FakeRemote>>,
    clones: Mutex<HashMap<PathBuf, LocalClone>>,
    calls: Mutex<Vec<String>>,
    offline: bool,
    exact_patterns: bool,
    head_override: Option<String>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(self, url: &str, remote: FakeRemote) -> Self {
        self.remotes
            .lock()
            .unwrap()
            .insert(url.to_string(), remote);
        self
    }

    /// Every `ls-remote` fails as if the host were unreachable.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// `ls-remote` patterns must name a ref in full instead of matching its
    /// trailing components.
    pub fn exact_patterns(mut self) -> Self {
        self.exact_patterns = true;
        self
    }

    /// `rev-parse HEAD` always answers `sha`, whatever was checked out.
    pub fn with_head_override(mut self, sha: &str) -> Self {
        self.head_override = Some(sha.to_string());
        self
    }

    /// Replace a remote, e.g. after a branch moved.
    pub fn update_remote(&self, url: &str, remote: FakeRemote) {
        self.remotes
            .lock()
            .unwrap()
            .insert(url.to_string(), remote);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn remote(&self, url: &str) -> Result<FakeRemote> {
        self.remotes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| failure(format!("repository '{url}' not found")))
    }

    fn local(&self, repo_dir: &Path) -> Result<LocalClone> {
        self.clones
            .lock()
            .unwrap()
            .get(repo_dir)
            .cloned()
            .ok_or_else(|| failure("not a git repository".to_string()))
    }

    fn store(&self, repo_dir: &Path, clone: LocalClone) {
        self.clones
            .lock()
            .unwrap()
            .insert(repo_dir.to_path_buf(), clone);
    }

    fn materialize(&self, repo_dir: &Path, remote: &FakeRemote, sha: &str) -> Result<()> {
        for entry in fs::read_dir(repo_dir)? {
            let path = entry?.path();
            if path.file_name().is_some_and(|n| n == ".git") {
                continue;
            }
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        for (relative, content) in remote.trees.get(sha).into_iter().flatten() {
            let path = repo_dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
        }
        Ok(())
    }
}

fn failure(stderr: String) -> Error {
    Error::CommandFailed {
        command: "git (fake)".to_string(),
        attempts: 1,
        stderr,
        hint: None,
    }
}

impl GitOperations for FakeGit {
    fn ls_remote(&self, url: &str, patterns: &[&str]) -> Result<String> {
        self.record(format!("ls-remote {} {}", url, patterns.join(" ")));
        if self.offline {
            return Err(failure("Could not resolve host".to_string()));
        }
        let remote = self.remote(url)?;
        let lines: Vec<String> = remote
            .refs
            .iter()
            .filter(|(name, _)| {
                patterns
                    .iter()
                    .any(|p| {
                        name.as_str() == *p
                            || (!self.exact_patterns && name.ends_with(&format!("/{p}")))
                    })
            })
            .map(|(name, sha)| format!("{sha}\t{name}"))
            .collect();
        Ok(lines.join("\n"))
    }

    fn clone_shallow(&self, url: &str, branch: Option<&str>, target_dir: &Path) -> Result<()> {
        self.record(format!("clone {} {}", url, branch.unwrap_or("<default>")));
        let remote = self.remote(url)?;
        let name = branch.unwrap_or(&remote.default_branch).to_string();
        let tip = remote
            .tip(&name)
            .ok_or_else(|| failure(format!("Remote branch {name} not found in upstream origin")))?;

        if target_dir.exists() {
            return Err(failure(format!(
                "destination path '{}' already exists",
                target_dir.display()
            )));
        }
        fs::create_dir_all(target_dir.join(".git"))?;
        fs::write(target_dir.join(".git").join("shallow"), &tip)?;
        self.materialize(target_dir, &remote, &tip)?;
        self.store(
            target_dir,
            LocalClone {
                url: url.to_string(),
                objects: HashSet::from([tip.clone()]),
                head: Some(tip),
            },
        );
        Ok(())
    }

    fn fetch_shallow(&self, repo_dir: &Path, refspec: &str) -> Result<()> {
        self.record(format!("fetch {refspec}"));
        let mut local = self.local(repo_dir)?;
        let remote = self.remote(&local.url)?;
        let sha = match remote.tip(refspec) {
            Some(sha) => sha,
            None if remote.serves_commit_ids && remote.trees.contains_key(refspec) => {
                refspec.to_string()
            }
            None => return Err(failure(format!("couldn't find remote ref {refspec}"))),
        };
        local.objects.insert(sha);
        self.store(repo_dir, local);
        Ok(())
    }

    fn unshallow(&self, repo_dir: &Path) -> Result<()> {
        self.record("unshallow".to_string());
        let mut local = self.local(repo_dir)?;
        let remote = self.remote(&local.url)?;
        local.objects.extend(remote.trees.keys().cloned());
        local
            .objects
            .extend(remote.refs.iter().map(|(_, sha)| sha.clone()));
        let _ = fs::remove_file(repo_dir.join(".git").join("shallow"));
        self.store(repo_dir, local);
        Ok(())
    }

    fn checkout(&self, repo_dir: &Path, commit: &str) -> Result<()> {
        self.record(format!("checkout {commit}"));
        let mut local = self.local(repo_dir)?;
        if !local.objects.contains(commit) {
            return Err(failure(format!(
                "reference is not a tree: {commit}"
            )));
        }
        let remote = self.remote(&local.url)?;
        self.materialize(repo_dir, &remote, commit)?;
        local.head = Some(commit.to_string());
        self.store(repo_dir, local);
        Ok(())
    }

    fn head_commit(&self, repo_dir: &Path) -> Result<String> {
        self.record("rev-parse".to_string());
        if let Some(sha) = &self.head_override {
            return Ok(sha.clone());
        }
        self.local(repo_dir)?
            .head
            .ok_or_else(|| failure("HEAD is unborn".to_string()))
    }
}
