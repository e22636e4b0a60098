//! # Git Command Layer
//!
//! Everything `vendorize` does to a repository goes through this module. It has
//! two seams:
//!
//! - **`CommandRunner`**: runs an external program, retrying failed attempts
//!   with a fixed delay. `ProcessRunner` is the real implementation.
//! - **`GitOperations`**: the handful of git operations the resolver and the
//!   fetcher need. `GitCli` implements it on top of a `CommandRunner` using the
//!   system `git`, which picks up SSH keys, credential helpers and anything
//!   configured in `~/.gitconfig`.
//!
//! Only network operations (`ls-remote`, `clone`, `fetch`) are retried. Local
//! operations (`checkout`, `rev-parse`) fail the same way every time, so they
//! run once.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::thread;

use log::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{Error, Result};

/// Runs external programs and captures their standard output.
pub trait CommandRunner: Send + Sync {
    /// Run with the runner's retry policy. Returns trimmed stdout.
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String>;

    /// Run exactly one attempt.
    fn run_once(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String>;
}

/// `CommandRunner` backed by `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    retry: RetryPolicy,
}

impl ProcessRunner {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    fn execute(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        policy: RetryPolicy,
    ) -> Result<String> {
        let command_line = render_command(program, args);
        let mut last_stderr = String::new();

        for attempt in 1..=policy.attempts {
            debug!("Running command: {}", command_line);

            let mut command = Command::new(program);
            command.args(args);
            if let Some(dir) = cwd {
                command.current_dir(dir);
            }
            // git must never block on an interactive credential prompt
            command.env("GIT_TERMINAL_PROMPT", "0");

            let output = match command.output() {
                Ok(output) => output,
                Err(e) => {
                    let hint = (e.kind() == std::io::ErrorKind::NotFound)
                        .then(|| format!("Make sure `{}` is installed and on PATH", program));
                    return Err(Error::CommandFailed {
                        command: command_line,
                        attempts: attempt,
                        stderr: e.to_string(),
                        hint,
                    });
                }
            };

            if output.status.success() {
                return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
            }

            last_stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if last_stderr.is_empty() {
                last_stderr = format!("exited with {}", output.status);
            }

            if policy.attempts > 1 {
                warn!(
                    "Command '{}' failed. Attempt {}/{}",
                    command_line, attempt, policy.attempts
                );
            }
            debug!("Stderr: {}", last_stderr);

            if attempt < policy.attempts && !policy.delay.is_zero() {
                thread::sleep(policy.delay);
            }
        }

        Err(Error::CommandFailed {
            command: command_line,
            attempts: policy.attempts,
            hint: failure_hint(&last_stderr),
            stderr: last_stderr,
        })
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        self.execute(program, args, cwd, self.retry)
    }

    fn run_once(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        self.execute(program, args, cwd, RetryPolicy::none())
    }
}

fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Provide a helpful hint for common authentication failures.
fn failure_hint(stderr: &str) -> Option<String> {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        Some(
            "Make sure you have access to the repository. For private repos, ensure an SSH \
             key is loaded in ssh-agent or git credentials / a personal access token are \
             configured"
                .to_string(),
        )
    } else {
        None
    }
}

/// The git operations needed to resolve refs and materialize commits.
///
/// This trait exists so the resolver and the fetch state machine can be driven
/// by a simulated remote in tests.
pub trait GitOperations: Send + Sync {
    /// List remote refs matching any of `patterns`, in `<sha>\t<ref>` lines.
    fn ls_remote(&self, url: &str, patterns: &[&str]) -> Result<String>;

    /// Depth-1 clone of `branch` (branch or tag name), or of the remote's
    /// default branch when `branch` is `None`.
    fn clone_shallow(&self, url: &str, branch: Option<&str>, target_dir: &Path) -> Result<()>;

    /// Depth-1 fetch of a ref name or commit id from `origin`.
    fn fetch_shallow(&self, repo_dir: &Path, refspec: &str) -> Result<()>;

    /// Fetch the complete history of every branch and tag from `origin`.
    fn unshallow(&self, repo_dir: &Path) -> Result<()>;

    /// Detach the working tree at `commit`.
    fn checkout(&self, repo_dir: &Path, commit: &str) -> Result<()>;

    /// Commit currently checked out.
    fn head_commit(&self, repo_dir: &Path) -> Result<String>;
}

/// `GitOperations` implemented with the `git` command line.
pub struct GitCli {
    runner: Box<dyn CommandRunner>,
}

impl GitCli {
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_runner(Box::new(ProcessRunner::new(retry)))
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl GitOperations for GitCli {
    fn ls_remote(&self, url: &str, patterns: &[&str]) -> Result<String> {
        let mut args = vec!["ls-remote", url];
        args.extend_from_slice(patterns);
        self.runner.run("git", &args, None)
    }

    fn clone_shallow(&self, url: &str, branch: Option<&str>, target_dir: &Path) -> Result<()> {
        if let Some(parent) = target_dir.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::filesystem("create", parent, e))?;
        }

        let target = target_dir.to_string_lossy();
        let mut args = vec!["clone", "--quiet", "--depth", "1"];
        if let Some(branch) = branch {
            args.extend_from_slice(&["--branch", branch]);
        }
        args.extend_from_slice(&[url, target.as_ref()]);
        self.runner.run("git", &args, None).map(|_| ())
    }

    fn fetch_shallow(&self, repo_dir: &Path, refspec: &str) -> Result<()> {
        self.runner
            .run(
                "git",
                &["fetch", "--quiet", "--depth", "1", "origin", refspec],
                Some(repo_dir),
            )
            .map(|_| ())
    }

    fn unshallow(&self, repo_dir: &Path) -> Result<()> {
        let mut args = vec!["fetch", "--quiet", "--tags"];
        // --unshallow is rejected by git on a complete repository
        if repo_dir.join(".git").join("shallow").exists() {
            args.push("--unshallow");
        }
        args.extend_from_slice(&["origin", "+refs/heads/*:refs/remotes/origin/*"]);
        self.runner.run("git", &args, Some(repo_dir)).map(|_| ())
    }

    fn checkout(&self, repo_dir: &Path, commit: &str) -> Result<()> {
        self.runner
            .run_once(
                "git",
                &["checkout", "--quiet", "--force", "--detach", commit],
                Some(repo_dir),
            )
            .map(|_| ())
    }

    fn head_commit(&self, repo_dir: &Path) -> Result<String> {
        self.runner
            .run_once("git", &["rev-parse", "HEAD"], Some(repo_dir))
    }
}
