//! Points a local checkout at the user's fork and publishes the prepared
//! registry there.
//!
//! Steps run in a fixed order: make sure a repository exists, reconcile the
//! fork remote, rewrite upstream references, stage, commit if anything is
//! staged, resolve the branch and push. Every step is safe to repeat.
//!
//! The push runs even when there was nothing to commit, so a re-run picks
//! up a push that failed on an earlier attempt.

use crate::config::Config;
use crate::error::{KubezeroError, Result};
use crate::git::{Git, PushErrorKind};
use crate::io;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const COMMIT_MESSAGE: &str = "feat: Configure for local development with populated registry\n\n\
- Added cloud-specific packages to registry/\n\
- Updated repoURL references to use fork\n\
- Ready for local GitOps workflow";

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit for local KubeZero setup";

pub const DEFAULT_BRANCH: &str = "main";

// ---------------------------------------------------------------------------
// ForkTarget
// ---------------------------------------------------------------------------

/// Where the user's fork lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForkTarget {
    pub owner: String,
    /// Clone URL used for the git remote.
    pub remote_url: String,
    /// URL written into manifests in place of the upstream repository.
    pub reference_url: String,
}

impl ForkTarget {
    pub fn new(owner: &str) -> Self {
        let owner = owner.trim();
        Self {
            owner: owner.to_string(),
            remote_url: format!("https://github.com/{owner}/kubezero.git"),
            reference_url: format!("https://github.com/{owner}/kubezero"),
        }
    }
}

pub fn fork_page_url(upstream_repo: &str) -> String {
    format!("{}/fork", upstream_repo.trim_end_matches('/'))
}

/// Open the upstream fork page in a browser.
pub fn open_fork_page(upstream_repo: &str) -> Result<()> {
    let url = fork_page_url(upstream_repo);
    tracing::info!(%url, "opening fork page");
    open::that(&url)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Repository and remote
// ---------------------------------------------------------------------------

/// Initialise a repository with one commit if the checkout has none.
/// Returns whether a repository was created.
pub fn ensure_repository<G: Git>(git: &G) -> Result<bool> {
    if git.is_repository() {
        return Ok(false);
    }
    tracing::info!("no git repository found, initialising one");
    git.init()?;
    git.add_all()?;
    if git.has_staged_changes()? {
        git.commit(INITIAL_COMMIT_MESSAGE)?;
    }
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteChange {
    Unchanged,
    Added,
    Replaced,
}

/// Make remote `name` point at `url`, touching git config only when needed.
pub fn reconcile_remote<G: Git>(git: &G, name: &str, url: &str) -> Result<RemoteChange> {
    match git.remote_url(name)? {
        Some(current) if current == url => {
            tracing::info!(remote = name, %url, "remote already configured");
            Ok(RemoteChange::Unchanged)
        }
        Some(current) => {
            tracing::info!(remote = name, from = %current, to = %url, "updating remote");
            git.remove_remote(name)?;
            git.add_remote(name, url)?;
            Ok(RemoteChange::Replaced)
        }
        None => {
            tracing::info!(remote = name, %url, "adding remote");
            git.add_remote(name, url)?;
            Ok(RemoteChange::Added)
        }
    }
}

// ---------------------------------------------------------------------------
// Reference rewrite
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Rewrite {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Replace `upstream` with `reference` in the fixed manifests and in every
/// GitOps manifest under the registry. Missing manifests are skipped;
/// unreadable or unwritable ones become warnings.
pub fn rewrite_references(
    root: &Path,
    manifests: &[PathBuf],
    registry_dir: &Path,
    upstream: &str,
    reference: &str,
) -> Rewrite {
    let mut candidates: Vec<PathBuf> = manifests
        .iter()
        .map(|m| paths::resolve(root, m))
        .collect();
    let mut registry_files = Vec::new();
    if let Err(e) = collect_gitops_manifests(registry_dir, &mut registry_files) {
        tracing::warn!(error = %e, "could not scan registry");
    }
    registry_files.sort();
    candidates.extend(registry_files);

    let mut rewrite = Rewrite::default();
    for path in candidates {
        if !path.is_file() {
            tracing::debug!(file = %path.display(), "manifest not present, skipping");
            continue;
        }
        match io::rewrite_file(&path, |content| content.replace(upstream, reference)) {
            Ok(true) => {
                tracing::info!(file = %path.display(), "updated repository references");
                rewrite.files.push(path);
            }
            Ok(false) => {}
            Err(e) => {
                let msg = format!("could not update {}: {e}", path.display());
                tracing::warn!("{msg}");
                rewrite.warnings.push(msg);
            }
        }
    }
    rewrite
}

fn collect_gitops_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_gitops_manifests(&path, out)?;
        } else if paths::is_gitops_manifest(&path) {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingStrategy {
    /// `git add -A`
    AddAll,
    /// `git add . --force`, for files hidden by ignore rules.
    ForceAdd,
}

impl StagingStrategy {
    fn describe(self) -> &'static str {
        match self {
            StagingStrategy::AddAll => "git add -A",
            StagingStrategy::ForceAdd => "git add . --force",
        }
    }
}

pub const STAGING_STRATEGIES: [StagingStrategy; 2] =
    [StagingStrategy::AddAll, StagingStrategy::ForceAdd];

#[derive(Debug, Default)]
pub struct Staging {
    pub staged: bool,
    pub diagnostics: Vec<String>,
}

/// Try each strategy in order. The forced add only runs when nothing is
/// staged yet and the tree still reports changes. Failures never abort.
pub fn stage<G: Git>(git: &G) -> Staging {
    let mut staging = Staging::default();
    for strategy in STAGING_STRATEGIES {
        if strategy == StagingStrategy::ForceAdd {
            if staging.staged {
                break;
            }
            match git.has_changes() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    staging.diagnostics.push(format!("git status --porcelain: {e}"));
                    break;
                }
            }
        }

        if let Err(e) = run_strategy(git, strategy) {
            let msg = format!("{}: {e}", strategy.describe());
            tracing::warn!("{msg}");
            staging.diagnostics.push(msg);
        }
        match git.has_staged_changes() {
            Ok(staged) => staging.staged = staged,
            Err(e) => staging.diagnostics.push(format!("git diff --cached: {e}")),
        }
    }
    staging
}

fn run_strategy<G: Git>(git: &G, strategy: StagingStrategy) -> Result<()> {
    match strategy {
        StagingStrategy::AddAll => git.add_all(),
        StagingStrategy::ForceAdd => git.add_force(),
    }
}

// ---------------------------------------------------------------------------
// Branch and push
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchRef {
    pub name: String,
    /// No query succeeded and the default branch name was substituted.
    pub defaulted: bool,
}

/// Ask git for the current branch, falling back through progressively
/// older queries, then to [`DEFAULT_BRANCH`].
pub fn resolve_branch<G: Git>(git: &G) -> BranchRef {
    let queries: [fn(&G) -> Result<String>; 3] =
        [G::show_current_branch, G::symbolic_ref, G::abbrev_ref];
    for query in queries {
        match query(git) {
            Ok(name) if !name.is_empty() && name != "HEAD" => {
                return BranchRef {
                    name,
                    defaulted: false,
                };
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "branch query failed"),
        }
    }
    tracing::warn!("could not determine current branch, using '{DEFAULT_BRANCH}'");
    BranchRef {
        name: DEFAULT_BRANCH.to_string(),
        defaulted: true,
    }
}

/// Push, retrying once with `--set-upstream` when the remote has no such
/// branch yet. Returns whether the retry was needed.
pub fn push_branch<G: Git>(git: &G, remote: &str, branch: &str) -> Result<bool> {
    match git.push(remote, branch, false) {
        Ok(()) => Ok(false),
        Err(KubezeroError::Push {
            kind: PushErrorKind::NoUpstream,
            ..
        }) => {
            tracing::info!(remote, branch, "setting upstream and retrying push");
            git.push(remote, branch, true)?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ForkReport {
    pub owner: String,
    pub remote_url: String,
    pub branch: String,
    pub branch_defaulted: bool,
    pub remote: RemoteChange,
    pub initialized_repository: bool,
    pub rewritten: Vec<PathBuf>,
    pub committed: bool,
    pub set_upstream: bool,
}

pub struct ForkSync<'a, G> {
    git: &'a G,
    root: &'a Path,
    config: &'a Config,
}

impl<'a, G: Git> ForkSync<'a, G> {
    pub fn new(git: &'a G, root: &'a Path, config: &'a Config) -> Self {
        Self { git, root, config }
    }

    /// Run every step. Soft failures are returned alongside the report.
    pub fn run(&self, target: &ForkTarget) -> Result<(ForkReport, Vec<String>)> {
        let gitops = &self.config.gitops;
        let mut warnings = Vec::new();

        let initialized_repository = ensure_repository(self.git)?;
        let remote = reconcile_remote(self.git, &gitops.fork_remote, &target.remote_url)?;

        let registry = paths::resolve(self.root, &self.config.registry_dir);
        let rewrite = rewrite_references(
            self.root,
            &gitops.reference_manifests,
            &registry,
            &gitops.upstream_repo,
            &target.reference_url,
        );
        warnings.extend(rewrite.warnings);

        let staging = stage(self.git);
        warnings.extend(staging.diagnostics);

        let committed = if staging.staged {
            self.git.commit(COMMIT_MESSAGE)?;
            tracing::info!("committed local changes");
            true
        } else {
            tracing::info!("nothing to commit");
            false
        };

        let branch = resolve_branch(self.git);
        if branch.defaulted {
            warnings.push(format!(
                "could not determine current branch, pushed '{}'",
                branch.name
            ));
        }
        let set_upstream = push_branch(self.git, &gitops.fork_remote, &branch.name)?;
        tracing::info!(remote = %gitops.fork_remote, branch = %branch.name, "pushed to fork");

        let report = ForkReport {
            owner: target.owner.clone(),
            remote_url: target.remote_url.clone(),
            branch: branch.name,
            branch_defaulted: branch.defaulted,
            remote,
            initialized_repository,
            rewritten: rewrite.files,
            committed,
            set_upstream,
        };
        Ok((report, warnings))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, VecDeque};

    /// In-memory [`Git`] with scripted answers and a call log.
    #[derive(Default)]
    pub struct FakeGit {
        pub repository: RefCell<bool>,
        pub remotes: RefCell<BTreeMap<String, String>>,
        pub dirty: RefCell<bool>,
        pub staged: RefCell<bool>,
        pub fail_add_all: bool,
        /// Answers to the three branch queries; `None` makes the query fail.
        pub show_current: Option<String>,
        pub symbolic: Option<String>,
        pub abbrev: Option<String>,
        pub push_results: RefCell<VecDeque<Result<()>>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeGit {
        pub fn repo() -> Self {
            Self {
                repository: RefCell::new(true),
                show_current: Some("main".to_string()),
                symbolic: Some("main".to_string()),
                abbrev: Some("main".to_string()),
                ..Default::default()
            }
        }

        /// Detached HEAD: `branch --show-current` prints nothing,
        /// `symbolic-ref` fails and `rev-parse` prints `HEAD`.
        pub fn detached() -> Self {
            Self {
                show_current: Some(String::new()),
                symbolic: None,
                abbrev: Some("HEAD".to_string()),
                ..Self::repo()
            }
        }

        fn log(&self, call: &str) {
            self.calls.borrow_mut().push(call.to_string());
        }

        pub fn called(&self, call: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == call).count()
        }

        fn answer(answer: &Option<String>, command: &str) -> Result<String> {
            answer.clone().ok_or_else(|| KubezeroError::Git {
                command: command.to_string(),
                message: "fatal: ref HEAD is not a symbolic ref".to_string(),
            })
        }
    }

    impl Git for FakeGit {
        fn is_repository(&self) -> bool {
            *self.repository.borrow()
        }

        fn init(&self) -> Result<()> {
            self.log("init");
            *self.repository.borrow_mut() = true;
            *self.dirty.borrow_mut() = true;
            Ok(())
        }

        fn remote_url(&self, name: &str) -> Result<Option<String>> {
            Ok(self.remotes.borrow().get(name).cloned())
        }

        fn remove_remote(&self, name: &str) -> Result<()> {
            self.log("remote remove");
            self.remotes.borrow_mut().remove(name);
            Ok(())
        }

        fn add_remote(&self, name: &str, url: &str) -> Result<()> {
            self.log("remote add");
            self.remotes
                .borrow_mut()
                .insert(name.to_string(), url.to_string());
            Ok(())
        }

        fn add_all(&self) -> Result<()> {
            self.log("add -A");
            if self.fail_add_all {
                return Err(KubezeroError::Git {
                    command: "add -A".into(),
                    message: "fatal: pathspec error".into(),
                });
            }
            let dirty = *self.dirty.borrow();
            *self.staged.borrow_mut() = dirty;
            Ok(())
        }

        fn add_force(&self) -> Result<()> {
            self.log("add --force");
            let dirty = *self.dirty.borrow();
            *self.staged.borrow_mut() = dirty;
            Ok(())
        }

        fn has_changes(&self) -> Result<bool> {
            Ok(*self.dirty.borrow())
        }

        fn has_staged_changes(&self) -> Result<bool> {
            Ok(*self.staged.borrow())
        }

        fn commit(&self, _message: &str) -> Result<()> {
            self.log("commit");
            *self.staged.borrow_mut() = false;
            *self.dirty.borrow_mut() = false;
            Ok(())
        }

        fn show_current_branch(&self) -> Result<String> {
            self.log("branch --show-current");
            Self::answer(&self.show_current, "branch --show-current")
        }

        fn symbolic_ref(&self) -> Result<String> {
            self.log("symbolic-ref");
            Self::answer(&self.symbolic, "symbolic-ref --short HEAD")
        }

        fn abbrev_ref(&self) -> Result<String> {
            self.log("rev-parse");
            Self::answer(&self.abbrev, "rev-parse --abbrev-ref HEAD")
        }

        fn push(&self, _remote: &str, _branch: &str, set_upstream: bool) -> Result<()> {
            self.log(if set_upstream { "push -u" } else { "push" });
            self.push_results.borrow_mut().pop_front().unwrap_or(Ok(()))
        }
    }

    pub fn push_error(kind: PushErrorKind) -> KubezeroError {
        KubezeroError::Push {
            remote: "fork".into(),
            branch: "main".into(),
            kind,
            message: "scripted".into(),
        }
    }
}
