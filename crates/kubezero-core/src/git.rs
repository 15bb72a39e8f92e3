//! Thin adapter over the `git` binary.
//!
//! Only the subcommands the fork workflow needs are exposed. Output is parsed
//! as little as possible: exit codes for yes/no questions, trimmed stdout for
//! names and URLs.

use crate::error::{KubezeroError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

// ---------------------------------------------------------------------------
// Push errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushErrorKind {
    /// The remote refused the update (non-fast-forward, hooks, permissions).
    Rejected,
    /// The branch has no counterpart on the remote yet.
    NoUpstream,
    /// The remote could not be reached.
    NetworkFailure,
}

impl fmt::Display for PushErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PushErrorKind::Rejected => "rejected",
            PushErrorKind::NoUpstream => "no upstream",
            PushErrorKind::NetworkFailure => "network failure",
        };
        f.write_str(s)
    }
}

const NO_UPSTREAM_MARKERS: &[&str] = &["does not exist", "no upstream branch", "has no upstream"];

const NETWORK_MARKERS: &[&str] = &[
    "Could not resolve host",
    "unable to access",
    "Could not read from remote",
    "Connection refused",
    "Connection timed out",
];

/// Classify `git push` stderr. Matching on message text is fragile across
/// git versions, so commands run with `LC_ALL=C` and anything unrecognised
/// is treated as a rejection.
pub fn classify_push_error(stderr: &str) -> PushErrorKind {
    if NO_UPSTREAM_MARKERS.iter().any(|m| stderr.contains(m)) {
        PushErrorKind::NoUpstream
    } else if NETWORK_MARKERS.iter().any(|m| stderr.contains(m)) {
        PushErrorKind::NetworkFailure
    } else {
        PushErrorKind::Rejected
    }
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

pub trait Git {
    /// Whether the working directory has a `.git` entry.
    fn is_repository(&self) -> bool;
    fn init(&self) -> Result<()>;

    /// URL of remote `name`, or `None` when no such remote is configured.
    fn remote_url(&self, name: &str) -> Result<Option<String>>;
    fn remove_remote(&self, name: &str) -> Result<()>;
    fn add_remote(&self, name: &str, url: &str) -> Result<()>;

    /// `git add -A`
    fn add_all(&self) -> Result<()>;
    /// `git add . --force`
    fn add_force(&self) -> Result<()>;
    /// `git status --porcelain` reports anything.
    fn has_changes(&self) -> Result<bool>;
    /// `git diff --cached --quiet` exits non-zero.
    fn has_staged_changes(&self) -> Result<bool>;
    fn commit(&self, message: &str) -> Result<()>;

    /// `git branch --show-current`
    fn show_current_branch(&self) -> Result<String>;
    /// `git symbolic-ref --short HEAD`
    fn symbolic_ref(&self) -> Result<String>;
    /// `git rev-parse --abbrev-ref HEAD`
    fn abbrev_ref(&self) -> Result<String>;

    /// Push `branch` to `remote`. Failures are [`KubezeroError::Push`].
    fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<()>;
}

/// [`Git`] backed by the `git` executable, run inside `repo`.
#[derive(Debug, Clone)]
pub struct GitCommand {
    repo: PathBuf,
}

impl GitCommand {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(command = %args.join(" "), "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| KubezeroError::Git {
                command: args.join(" "),
                message: e.to_string(),
            })
    }

    /// Run and return trimmed stdout; a non-zero exit becomes an error
    /// carrying stderr.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(KubezeroError::Git {
                command: args.join(" "),
                message: failure_message(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

impl Git for GitCommand {
    fn is_repository(&self) -> bool {
        self.repo.join(".git").exists()
    }

    fn init(&self) -> Result<()> {
        self.run(&["init"]).map(drop)
    }

    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        let output = self.output(&["remote", "get-url", name])?;
        if output.status.success() {
            let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Ok(Some(url));
        }
        let message = failure_message(&output);
        if message.contains("No such remote") {
            Ok(None)
        } else {
            Err(KubezeroError::Git {
                command: format!("remote get-url {name}"),
                message,
            })
        }
    }

    fn remove_remote(&self, name: &str) -> Result<()> {
        self.run(&["remote", "remove", name]).map(drop)
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.run(&["remote", "add", name, url]).map(drop)
    }

    fn add_all(&self) -> Result<()> {
        self.run(&["add", "-A"]).map(drop)
    }

    fn add_force(&self) -> Result<()> {
        self.run(&["add", ".", "--force"]).map(drop)
    }

    fn has_changes(&self) -> Result<bool> {
        Ok(!self.run(&["status", "--porcelain"])?.is_empty())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        let output = self.output(&["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(KubezeroError::Git {
                command: "diff --cached --quiet".to_string(),
                message: failure_message(&output),
            }),
        }
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).map(drop)
    }

    fn show_current_branch(&self) -> Result<String> {
        self.run(&["branch", "--show-current"])
    }

    fn symbolic_ref(&self) -> Result<String> {
        self.run(&["symbolic-ref", "--short", "HEAD"])
    }

    fn abbrev_ref(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<()> {
        let mut args = vec!["push"];
        if set_upstream {
            args.push("--set-upstream");
        }
        args.extend([remote, branch]);

        let output = self.output(&args)?;
        if output.status.success() {
            return Ok(());
        }
        let message = failure_message(&output);
        Err(KubezeroError::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
            kind: classify_push_error(&message),
            message,
        })
    }
}
