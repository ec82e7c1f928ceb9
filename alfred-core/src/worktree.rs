//! # Worktree Management
//!
//! Maps (repository, context) pairs to deterministic sibling directories
//! and manages the git worktrees living there. The layer is stateless:
//! every operation derives the worktree address from the naming rule
//! `<repo.path>-<context>` and asks git for the rest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::config::Repository;
use crate::git::GitRepo;

/// Stash message used for every context-aware stash.
pub fn stash_label(context: &str) -> String {
  format!("alfred-context-{context}")
}

/// A repository's working copy for one context: the per-context worktree
/// of a non-master repository, or the clone itself when no worktree is
/// involved.
#[derive(Debug, Clone)]
pub struct WorktreeInfo {
  pub repo: Repository,
  pub worktree_path: PathBuf,
  pub branch: String,
}

/// Direction of a stash operation on a worktree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashOp {
  Push,
  Pop,
}

/// Outcome of [`WorktreeManager::handle_stash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashOutcome {
  Pushed,
  NothingToPush,
  Popped,
  NoStash,
  /// The pop ran but git reported a failure, typically a merge conflict.
  /// The working tree keeps whatever git left behind.
  PopConflict,
}

pub struct WorktreeManager {
  workdir: PathBuf,
}

impl WorktreeManager {
  pub fn new<P: AsRef<Path>>(workdir: P) -> Self {
    Self {
      workdir: workdir.as_ref().to_path_buf(),
    }
  }

  fn clone_path(&self, repo: &Repository) -> PathBuf {
    self.workdir.join(repo.path.trim_start_matches("./"))
  }

  /// Deterministic worktree address: `<repo.path>-<context>`, a sibling of
  /// the repository directory.
  pub fn worktree_path(&self, repo: &Repository, context: &str) -> PathBuf {
    let base = repo.path.trim_start_matches("./").trim_end_matches('/');
    self.workdir.join(format!("{base}-{context}"))
  }

  /// Ensure a worktree exists for the context, bound to the context
  /// branch. Creating the branch off the repository's HEAD when needed is
  /// delegated to the git adapter.
  pub fn create_for_context(&self, repo: &Repository, context: &str) -> Result<WorktreeInfo> {
    let git = GitRepo::new(self.clone_path(repo));
    if !git.is_repository() {
      bail!("repository {} is not a git repository", repo.identifier());
    }

    let worktree_path = self.worktree_path(repo, context);
    if git.worktree_exists(&worktree_path)? {
      info!("worktree {} already exists for {}", worktree_path.display(), repo.identifier());
    } else {
      info!(
        "creating worktree {} for {} with branch {context}",
        worktree_path.display(),
        repo.identifier()
      );
      git
        .worktree_add(&worktree_path, context)
        .with_context(|| format!("failed to create worktree for {}", repo.identifier()))?;
    }

    Ok(WorktreeInfo {
      repo: repo.clone(),
      worktree_path,
      branch: context.to_string(),
    })
  }

  /// Remove the context worktree when present. Best-effort idempotent.
  pub fn remove_for_context(&self, repo: &Repository, context: &str) -> Result<()> {
    let git = GitRepo::new(self.clone_path(repo));
    let worktree_path = self.worktree_path(repo, context);

    if git.worktree_exists(&worktree_path)? {
      info!("removing worktree {} for {}", worktree_path.display(), repo.identifier());
      git.worktree_remove(&worktree_path)?;
    }
    Ok(())
  }

  /// The subset of `repos` whose context worktree directory currently
  /// exists on disk.
  pub fn list_for_context(&self, repos: &[&Repository], context: &str) -> Vec<WorktreeInfo> {
    repos
      .iter()
      .filter_map(|repo| {
        let worktree_path = self.worktree_path(repo, context);
        worktree_path.exists().then(|| WorktreeInfo {
          repo: (*repo).clone(),
          worktree_path,
          branch: context.to_string(),
        })
      })
      .collect()
  }

  /// Run a context-labelled stash operation inside the worktree's own
  /// working directory. Pushes are conditional on uncommitted changes;
  /// pops tolerate an absent stash.
  pub fn handle_stash(&self, worktree: &WorktreeInfo, context: &str, op: StashOp) -> Result<StashOutcome> {
    let git = GitRepo::new(&worktree.worktree_path);
    let label = stash_label(context);

    match op {
      StashOp::Push => {
        if git.has_uncommitted_changes().context("failed to check changes")? {
          git.stash_push(&label)?;
          info!("stashed changes in {} worktree", worktree.repo.identifier());
          Ok(StashOutcome::Pushed)
        } else {
          Ok(StashOutcome::NothingToPush)
        }
      }
      StashOp::Pop => {
        let has_stash = git.stash_list()?.iter().any(|entry| entry.contains(&label));
        if !has_stash {
          debug!("no stash to restore in {} worktree", worktree.repo.identifier());
          return Ok(StashOutcome::NoStash);
        }
        match git.stash_pop_by_message(&label) {
          Ok(()) => {
            info!("restored stash in {} worktree", worktree.repo.identifier());
            Ok(StashOutcome::Popped)
          }
          Err(err) => {
            warn!("failed to restore stash in {}: {err:#}", worktree.repo.identifier());
            Ok(StashOutcome::PopConflict)
          }
        }
      }
    }
  }

  /// Check that the worktree directory exists, is a git repository, and
  /// sits on the expected context branch.
  pub fn validate(&self, worktree: &WorktreeInfo) -> Result<()> {
    if !worktree.worktree_path.exists() {
      bail!("worktree directory {} does not exist", worktree.worktree_path.display());
    }

    let git = GitRepo::new(&worktree.worktree_path);
    if !git.is_repository() {
      bail!("worktree {} is not a valid git repository", worktree.worktree_path.display());
    }

    let current_branch = git.current_branch().context("failed to get current branch in worktree")?;
    if current_branch != worktree.branch {
      bail!(
        "worktree {} is on branch {current_branch}, expected {}",
        worktree.worktree_path.display(),
        worktree.branch
      );
    }

    Ok(())
  }

  /// One-line status: the branch, with a modified marker or a diagnostic.
  pub fn status_string(&self, worktree: &WorktreeInfo) -> String {
    if let Err(err) = self.validate(worktree) {
      return format!("Invalid: {err:#}");
    }

    let git = GitRepo::new(&worktree.worktree_path);
    match git.has_uncommitted_changes() {
      Ok(true) => format!("{} (modified)", worktree.branch),
      Ok(false) => worktree.branch.clone(),
      Err(_) => format!("{} (error checking changes)", worktree.branch),
    }
  }
}

#[cfg(test)]
mod tests {
  use alfred_test_utils::{init_repo_with_commit, write_file};

  use super::*;

  fn repo_entry(name: &str) -> Repository {
    Repository {
      name: name.to_string(),
      alias: None,
      path: format!("./{name}"),
    }
  }

  #[test]
  fn worktree_path_is_deterministic() {
    let manager = WorktreeManager::new("/work");
    let repo = repo_entry("ui");

    let first = manager.worktree_path(&repo, "feature-x");
    let second = manager.worktree_path(&repo, "feature-x");
    assert_eq!(first, second);
    assert_eq!(first, PathBuf::from("/work/ui-feature-x"));

    assert_eq!(manager.worktree_path(&repo, "other"), PathBuf::from("/work/ui-other"));
  }

  #[test]
  fn stash_label_format() {
    assert_eq!(stash_label("feature-x"), "alfred-context-feature-x");
  }

  #[test]
  fn create_validate_and_remove() {
    let temp = tempfile::TempDir::new().unwrap();
    init_repo_with_commit(&temp.path().join("ui")).unwrap();

    let manager = WorktreeManager::new(temp.path());
    let repo = repo_entry("ui");

    let info = manager.create_for_context(&repo, "feature-x").unwrap();
    assert_eq!(info.worktree_path, temp.path().join("ui-feature-x"));
    assert!(info.worktree_path.exists());
    manager.validate(&info).unwrap();
    assert_eq!(manager.status_string(&info), "feature-x");

    // Creating again is a no-op
    manager.create_for_context(&repo, "feature-x").unwrap();

    manager.remove_for_context(&repo, "feature-x").unwrap();
    assert!(!info.worktree_path.exists());
    manager.remove_for_context(&repo, "feature-x").unwrap();
  }

  #[test]
  fn list_for_context_returns_existing_only() {
    let temp = tempfile::TempDir::new().unwrap();
    init_repo_with_commit(&temp.path().join("ui")).unwrap();
    init_repo_with_commit(&temp.path().join("core")).unwrap();

    let manager = WorktreeManager::new(temp.path());
    let ui = repo_entry("ui");
    let core = repo_entry("core");

    manager.create_for_context(&ui, "feature-x").unwrap();

    let existing = manager.list_for_context(&[&ui, &core], "feature-x");
    assert_eq!(existing.len(), 1);
    assert_eq!(existing[0].repo.name, "ui");
  }

  #[test]
  fn stash_push_and_pop_through_worktree() {
    let temp = tempfile::TempDir::new().unwrap();
    init_repo_with_commit(&temp.path().join("ui")).unwrap();

    let manager = WorktreeManager::new(temp.path());
    let repo = repo_entry("ui");
    let info = manager.create_for_context(&repo, "feature-x").unwrap();

    // Nothing to push on a clean tree
    assert_eq!(manager.handle_stash(&info, "feature-x", StashOp::Push).unwrap(), StashOutcome::NothingToPush);
    // Nothing to pop either
    assert_eq!(manager.handle_stash(&info, "feature-x", StashOp::Pop).unwrap(), StashOutcome::NoStash);

    write_file(&info.worktree_path, "file.txt", "dirty");
    assert_eq!(manager.handle_stash(&info, "feature-x", StashOp::Push).unwrap(), StashOutcome::Pushed);
    assert_eq!(manager.status_string(&info), "feature-x");

    assert_eq!(manager.handle_stash(&info, "feature-x", StashOp::Pop).unwrap(), StashOutcome::Popped);
    assert_eq!(manager.status_string(&info), "feature-x (modified)");
  }

  #[test]
  fn status_reports_invalid_worktrees() {
    let temp = tempfile::TempDir::new().unwrap();
    let manager = WorktreeManager::new(temp.path());
    let info = WorktreeInfo {
      repo: repo_entry("ui"),
      worktree_path: temp.path().join("ui-feature-x"),
      branch: "feature-x".to_string(),
    };

    assert!(manager.status_string(&info).starts_with("Invalid:"));
  }
}
