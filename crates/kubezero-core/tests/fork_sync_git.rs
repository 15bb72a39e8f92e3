//! Fork workflow against real git repositories. Skipped when `git` is not
//! installed.

use kubezero_core::config::Config;
use kubezero_core::fork_sync::{ForkSync, ForkTarget, RemoteChange};
use kubezero_core::git::{Git, GitCommand};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const UPSTREAM: &str = "https://github.com/kubezero/kubezero";

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A working checkout on `main` with one commit, plus an empty bare repo
/// standing in for the fork.
fn setup() -> (TempDir, TempDir) {
    let work = TempDir::new().unwrap();
    let fork = TempDir::new().unwrap();
    git(fork.path(), &["init", "--bare", "--quiet"]);

    let root = work.path();
    git(root, &["init", "--quiet"]);
    git(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(root, &["config", "user.name", "KubeZero Test"]);
    git(root, &["config", "user.email", "test@kubezero.invalid"]);
    git(root, &["config", "commit.gpgsign", "false"]);

    let app = root.join("controller/argo-cd/application.yaml");
    std::fs::create_dir_all(app.parent().unwrap()).unwrap();
    std::fs::write(&app, format!("spec:\n  source:\n    repoURL: {UPSTREAM}\n")).unwrap();
    git(root, &["add", "-A"]);
    git(root, &["commit", "--quiet", "-m", "initial"]);

    (work, fork)
}

fn target(fork: &Path) -> ForkTarget {
    ForkTarget {
        owner: "alice".to_string(),
        remote_url: fork.to_string_lossy().into_owned(),
        reference_url: "https://github.com/alice/kubezero".to_string(),
    }
}

#[test]
fn publishes_registry_to_fork() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let (work, fork) = setup();
    let root = work.path();
    let registry = root.join("registry/aws-management");
    std::fs::create_dir_all(&registry).unwrap();
    std::fs::write(registry.join("gitops.yaml"), format!("repoURL: {UPSTREAM}\n")).unwrap();

    let config = Config::default();
    let repo = GitCommand::new(root);
    let (report, warnings) = ForkSync::new(&repo, root, &config)
        .run(&target(fork.path()))
        .unwrap();

    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(report.remote, RemoteChange::Added);
    assert_eq!(report.branch, "main");
    assert!(!report.branch_defaulted);
    assert!(report.committed);
    assert_eq!(report.rewritten.len(), 2);

    let app = std::fs::read_to_string(root.join("controller/argo-cd/application.yaml")).unwrap();
    assert!(app.contains("https://github.com/alice/kubezero"));
    assert!(!app.contains(UPSTREAM));

    let pushed = git(fork.path(), &["rev-parse", "refs/heads/main"]);
    assert_eq!(pushed, git(root, &["rev-parse", "HEAD"]));
}

#[test]
fn second_run_is_a_no_op_apart_from_push() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let (work, fork) = setup();
    let root = work.path();
    let config = Config::default();
    let repo = GitCommand::new(root);
    let sync = ForkSync::new(&repo, root, &config);

    sync.run(&target(fork.path())).unwrap();
    let head = git(root, &["rev-parse", "HEAD"]);

    let (report, _) = sync.run(&target(fork.path())).unwrap();
    assert_eq!(report.remote, RemoteChange::Unchanged);
    assert!(!report.committed);
    assert!(report.rewritten.is_empty());
    assert_eq!(git(root, &["rev-parse", "HEAD"]), head);

    let remotes = git(root, &["remote"]);
    assert_eq!(remotes.lines().filter(|r| *r == "fork").count(), 1);
}

#[test]
fn stale_remote_url_is_replaced() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let (work, fork) = setup();
    let root = work.path();
    git(root, &["remote", "add", "fork", "https://github.com/bob/kubezero.git"]);

    let config = Config::default();
    let repo = GitCommand::new(root);
    let (report, _) = ForkSync::new(&repo, root, &config)
        .run(&target(fork.path()))
        .unwrap();
    assert_eq!(report.remote, RemoteChange::Replaced);
    assert_eq!(
        repo.remote_url("fork").unwrap().as_deref(),
        Some(fork.path().to_string_lossy().as_ref())
    );
}

#[test]
fn missing_remote_reads_as_none() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let (work, _fork) = setup();
    let repo = GitCommand::new(work.path());
    assert!(repo.is_repository());
    assert_eq!(repo.remote_url("fork").unwrap(), None);
    assert!(!repo.has_staged_changes().unwrap());
    assert_eq!(repo.show_current_branch().unwrap(), "main");
}
