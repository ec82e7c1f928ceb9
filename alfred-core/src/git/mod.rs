//! # Git Operations
//!
//! Typed operations over a single git repository, executed by shelling out
//! to `git -C <repo>`. Branch and stash transitions, worktree management,
//! and upstream handling for the alfred workflow all go through [`GitRepo`].

use std::env;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};

mod changes;

pub use changes::{FileChange, parse_status_porcelain, status_description};

/// A handle to one git repository, addressed by its working directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
  path: PathBuf,
}

impl GitRepo {
  pub fn new<P: AsRef<Path>>(path: P) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
    }
  }

  /// The working directory this handle operates on.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Run a git subcommand in this repository and capture its output.
  fn run(&self, args: &[&str]) -> Result<Output> {
    Command::new("git")
      .arg("-C")
      .arg(&self.path)
      .args(args)
      .output()
      .with_context(|| format!("failed to run git in {}", self.path.display()))
  }

  /// Run a git subcommand, failing with the most useful stderr line on a
  /// non-zero exit.
  fn run_checked(&self, args: &[&str]) -> Result<String> {
    let output = self.run(args)?;
    if !output.status.success() {
      bail!(
        "git {} failed in {}: {}",
        args.first().copied().unwrap_or_default(),
        self.path.display(),
        best_error_line(&String::from_utf8_lossy(&output.stderr))
      );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Whether the path looks like a usable git repository.
  ///
  /// Probes both for a `.git` entry (directory in a clone, file in a
  /// worktree) and for a trivial git command succeeding.
  pub fn is_repository(&self) -> bool {
    if !self.path.join(".git").exists() {
      return false;
    }
    self
      .run(&["rev-parse", "--git-dir"])
      .map(|output| output.status.success())
      .unwrap_or(false)
  }

  pub fn current_branch(&self) -> Result<String> {
    let stdout = self
      .run_checked(&["rev-parse", "--abbrev-ref", "HEAD"])
      .context("failed to get current branch")?;
    Ok(stdout.trim().to_string())
  }

  /// True iff `git status --porcelain` reports anything.
  pub fn has_uncommitted_changes(&self) -> Result<bool> {
    let stdout = self
      .run_checked(&["status", "--porcelain"])
      .context("failed to check git status")?;
    Ok(!stdout.trim().is_empty())
  }

  /// Check whether a local branch exists.
  ///
  /// `show-ref --verify --quiet` exits 1 when the ref is absent; any other
  /// non-zero exit is a real error.
  pub fn branch_exists(&self, branch: &str) -> Result<bool> {
    let refname = format!("refs/heads/{branch}");
    let output = self.run(&["show-ref", "--verify", "--quiet", &refname])?;
    if output.status.success() {
      return Ok(true);
    }
    if output.status.code() == Some(1) {
      return Ok(false);
    }
    bail!(
      "failed to check if branch '{branch}' exists: {}",
      best_error_line(&String::from_utf8_lossy(&output.stderr))
    );
  }

  /// Create a branch and switch to it. `from` defaults to HEAD.
  pub fn create_branch(&self, branch: &str, from: Option<&str>) -> Result<()> {
    let from = from.unwrap_or("HEAD");
    self
      .run_checked(&["checkout", "-b", branch, from])
      .with_context(|| format!("failed to create branch '{branch}'"))?;
    Ok(())
  }

  pub fn checkout_branch(&self, branch: &str) -> Result<()> {
    self
      .run_checked(&["checkout", branch])
      .with_context(|| format!("failed to checkout branch '{branch}'"))?;
    Ok(())
  }

  /// Force-delete a local branch.
  pub fn delete_branch(&self, branch: &str) -> Result<()> {
    self
      .run_checked(&["branch", "-D", branch])
      .with_context(|| format!("failed to delete branch '{branch}'"))?;
    Ok(())
  }

  pub fn stash_push(&self, message: &str) -> Result<()> {
    self
      .run_checked(&["stash", "push", "-m", message])
      .context("failed to stash changes")?;
    Ok(())
  }

  /// List stash entries, newest first, as raw `stash list` lines.
  pub fn stash_list(&self) -> Result<Vec<String>> {
    let stdout = self.run_checked(&["stash", "list"]).context("failed to list stashes")?;
    Ok(stdout.lines().map(|line| line.to_string()).collect())
  }

  /// Pop the newest stash whose entry contains `message`.
  ///
  /// Git lists stashes newest first, so the lowest-indexed match wins;
  /// older stashes carrying the same message are left in place. Fails when
  /// no entry matches.
  pub fn stash_pop_by_message(&self, message: &str) -> Result<()> {
    let stashes = self.stash_list()?;
    for (index, entry) in stashes.iter().enumerate() {
      if entry.contains(message) {
        let stash_ref = format!("stash@{{{index}}}");
        self
          .run_checked(&["stash", "pop", &stash_ref])
          .with_context(|| format!("failed to pop stash '{message}'"))?;
        return Ok(());
      }
    }
    bail!("stash with message '{message}' not found");
  }

  /// Create a worktree at `path` bound to `branch`, creating the branch off
  /// HEAD when it does not exist yet.
  pub fn worktree_add<P: AsRef<Path>>(&self, path: P, branch: &str) -> Result<()> {
    let abs = absolute_path(path.as_ref())?;
    let abs = abs.to_string_lossy();
    if self.branch_exists(branch)? {
      self
        .run_checked(&["worktree", "add", &abs, branch])
        .with_context(|| format!("failed to create worktree for branch '{branch}'"))?;
    } else {
      self
        .run_checked(&["worktree", "add", "-b", branch, &abs])
        .with_context(|| format!("failed to create worktree for new branch '{branch}'"))?;
    }
    Ok(())
  }

  /// Remove the worktree at `path`. A no-op when the directory is absent.
  pub fn worktree_remove<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let abs = absolute_path(path.as_ref())?;
    if !abs.exists() {
      return Ok(());
    }
    let abs = abs.to_string_lossy();
    self
      .run_checked(&["worktree", "remove", "--force", &abs])
      .context("failed to remove worktree")?;
    Ok(())
  }

  /// Absolute paths of every worktree attached to this repository,
  /// including the main working directory.
  pub fn worktree_list(&self) -> Result<Vec<PathBuf>> {
    let stdout = self
      .run_checked(&["worktree", "list", "--porcelain"])
      .context("failed to list worktrees")?;
    Ok(parse_worktree_porcelain(&stdout))
  }

  pub fn worktree_exists<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
    let target = absolute_path(path.as_ref())?;
    let target = target.canonicalize().unwrap_or(target);
    for worktree in self.worktree_list()? {
      let worktree = worktree.canonicalize().unwrap_or(worktree);
      if worktree == target {
        return Ok(true);
      }
    }
    Ok(false)
  }

  /// Whether the current branch has an upstream configured.
  ///
  /// `rev-parse --abbrev-ref @{upstream}` exits 128 when no upstream is
  /// set; that maps to `false` rather than an error.
  pub fn has_upstream(&self) -> Result<bool> {
    let output = self.run(&["rev-parse", "--abbrev-ref", "@{upstream}"])?;
    if output.status.success() {
      return Ok(true);
    }
    if output.status.code() == Some(128) {
      return Ok(false);
    }
    bail!(
      "failed to check upstream: {}",
      best_error_line(&String::from_utf8_lossy(&output.stderr))
    );
  }

  pub fn set_upstream(&self, remote: &str, branch: &str) -> Result<()> {
    let upstream = format!("--set-upstream-to={remote}/{branch}");
    self
      .run_checked(&["branch", &upstream])
      .with_context(|| format!("failed to set upstream to {remote}/{branch}"))?;
    Ok(())
  }

  /// Push, setting the upstream on first push of a branch.
  pub fn push_with_upstream(&self, remote: &str) -> Result<()> {
    if self.has_upstream()? {
      self.run_checked(&["push"]).context("failed to push")?;
    } else {
      let branch = self.current_branch()?;
      self
        .run_checked(&["push", "--set-upstream", remote, &branch])
        .with_context(|| format!("failed to push with upstream {remote}/{branch}"))?;
    }
    Ok(())
  }

  /// Whether `branch` exists on `remote`.
  pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool> {
    let stdout = self
      .run_checked(&["ls-remote", "--heads", remote, branch])
      .context("failed to check remote branch")?;
    Ok(!stdout.trim().is_empty())
  }

  /// Pull, configuring the upstream first when the remote branch already
  /// exists. When it does not, fails with a hint to push first.
  pub fn pull(&self, rebase: bool) -> Result<()> {
    if !self.has_upstream()? {
      let branch = self.current_branch()?;
      if !self.remote_branch_exists("origin", &branch)? {
        bail!("branch '{branch}' has no upstream and does not exist on origin; push it first");
      }
      self.set_upstream("origin", &branch)?;
    }

    if rebase {
      self.run_checked(&["pull", "--rebase"]).context("failed to pull")?;
    } else {
      self.run_checked(&["pull"]).context("failed to pull")?;
    }
    Ok(())
  }
}

/// Parse `git worktree list --porcelain` output into worktree paths.
pub fn parse_worktree_porcelain(raw: &str) -> Vec<PathBuf> {
  raw
    .lines()
    .filter_map(|line| line.strip_prefix("worktree "))
    .map(|value| PathBuf::from(value.trim()))
    .collect()
}

/// Absolute form of `path` without requiring it to exist, resolving `.`
/// and `..` components lexically.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
  let joined = if path.is_absolute() {
    path.to_path_buf()
  } else {
    env::current_dir().context("failed to get current directory")?.join(path)
  };

  let mut normalized = PathBuf::new();
  for component in joined.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        normalized.pop();
      }
      other => normalized.push(other),
    }
  }
  Ok(normalized)
}

/// Pick the most useful line out of captured stderr.
pub(crate) fn best_error_line(stderr: &str) -> String {
  let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|line| !line.is_empty()).collect();

  if lines.is_empty() {
    return "unknown error".to_string();
  }

  if let Some(line) = lines.iter().find(|line| line.to_ascii_lowercase().starts_with("error:")) {
    return (*line).to_string();
  }

  lines.last().map(|line| (*line).to_string()).unwrap_or_default()
}
