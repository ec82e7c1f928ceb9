//! # Context Switching
//!
//! The orchestrator that takes the whole workspace from one context to
//! another: stash, branch and worktree transitions, pubspec rewriting,
//! current-context persistence, and the package-manager post-hook.
//!
//! A switch is not atomic across repositories. The ordering invariants are
//! what hold the design together: stashes on the source context complete
//! before any branch transition, the master repository moves before any
//! worktree is created, every transition completes before a manifest is
//! touched, and the current-context pointer only advances after the
//! manifest phase.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::config::{Config, MAIN_CONTEXT, Repository, is_reserved_context};
use crate::git::GitRepo;
use crate::prompts::{InteractiveStashGate, StashGate};
use crate::pubspec::{self, Pubspec};
use crate::state;
use crate::worktree::{StashOp, StashOutcome, WorktreeInfo, WorktreeManager, stash_label};

/// The user declined the stash gate; the switch did not happen by design.
#[derive(Debug, thiserror::Error)]
#[error("switch cancelled by user")]
pub struct SwitchCancelled;

/// Result of a completed switch.
#[derive(Debug)]
pub struct SwitchReport {
  /// The context the workspace ended up on.
  pub context: String,
  /// Repositories whose stash restore hit a conflict. Their working trees
  /// hold whatever git left behind and deserve a look.
  pub conflicts: Vec<String>,
}

pub struct ContextManager {
  config: Config,
  worktrees: WorktreeManager,
  gate: Box<dyn StashGate>,
}

impl ContextManager {
  pub fn new(config: Config) -> Self {
    Self::with_gate(config, Box::new(InteractiveStashGate))
  }

  /// Construct with a custom stash gate, e.g. a non-interactive stub.
  pub fn with_gate(config: Config, gate: Box<dyn StashGate>) -> Self {
    let worktrees = WorktreeManager::new(config.workdir());
    Self {
      config,
      worktrees,
      gate,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn config_mut(&mut self) -> &mut Config {
    &mut self.config
  }

  pub fn worktrees(&self) -> &WorktreeManager {
    &self.worktrees
  }

  /// The active context name; empty when none is active.
  pub fn current_context(&self) -> Result<String> {
    state::current_context(self.config.workdir())
  }

  /// All context names, the synthetic `main` first.
  pub fn list_contexts(&self) -> Vec<String> {
    self.config.context_names()
  }

  /// The directory a repository is worked on in for a given context: the
  /// per-context worktree for non-master repositories in worktree mode,
  /// the clone itself otherwise.
  pub fn active_path(&self, repo: &Repository, context: &str) -> PathBuf {
    let is_master = self.config.master.as_deref() == Some(repo.identifier());
    if self.config.is_branch_mode() || is_reserved_context(context) || is_master {
      self.config.repo_path(repo)
    } else {
      self.worktrees.worktree_path(repo, context)
    }
  }

  /// Switch the workspace to `target`.
  ///
  /// Switching to the already-active context is a no-op. Failures during
  /// stash or branch/worktree transitions abort the switch and leave the
  /// current-context pointer unchanged; manifest and post-hook failures
  /// downgrade to warnings.
  pub fn switch_context(&self, target: &str) -> Result<SwitchReport> {
    info!("switching to context: {target} (mode: {:?})", self.config.mode);

    let current = self.current_context().context("failed to get current context")?;
    if current == target {
      info!("already on context '{target}'");
      return Ok(SwitchReport {
        context: target.to_string(),
        conflicts: Vec::new(),
      });
    }

    if is_reserved_context(target) {
      return self.switch_to_main(&current);
    }
    if !self.config.context_exists(target) {
      bail!("context '{target}' not found");
    }

    if self.config.is_branch_mode() {
      self.switch_branch_mode(target, &current)
    } else {
      self.switch_worktree_mode(target, &current)
    }
  }

  /// Label for stashes pushed when leaving `current` for `target`.
  ///
  /// Work stashed on a user context keeps that context's label so it is
  /// restored on the next visit. Work lying around on main (or with no
  /// context active) travels with the switch: it is pushed under the
  /// target label and restored by the immediately following pop.
  fn departure_label(&self, current: &str, target: &str) -> String {
    if !current.is_empty() && !is_reserved_context(current) {
      stash_label(current)
    } else {
      stash_label(target)
    }
  }

  fn switch_worktree_mode(&self, target: &str, current: &str) -> Result<SwitchReport> {
    let mut conflicts = Vec::new();

    let master = if self.config.context_contains_master(target) {
      Some(self.config.master_repo().context("failed to get master repo")?)
    } else {
      None
    };

    // Stash phase: source-context work is parked before anything moves.
    if let Some(master_repo) = master {
      let git = GitRepo::new(self.config.repo_path(master_repo));
      if !git.is_repository() {
        bail!("master repository {} is not a git repository", master_repo.identifier());
      }
      if !current.is_empty() && git.has_uncommitted_changes()? {
        git.stash_push(&self.departure_label(current, target))?;
        info!("stashed changes in master repo {}", master_repo.identifier());
      }
    }
    if !current.is_empty() && !is_reserved_context(current) {
      self.stash_context_worktrees(current)?;
    }

    // The master switches branches in place, before any worktree appears.
    if let Some(master_repo) = master {
      let git = GitRepo::new(self.config.repo_path(master_repo));
      self
        .transition_repo(&git, master_repo.identifier(), target)
        .with_context(|| format!("failed to switch master repo to context '{target}'"))?;
      self.restore_stash(&git, target, master_repo.identifier(), &mut conflicts);
    }

    // Per-context worktrees for every non-master participant.
    let mut active = Vec::new();
    if let Some(master_repo) = master {
      active.push(WorktreeInfo {
        repo: master_repo.clone(),
        worktree_path: self.config.repo_path(master_repo),
        branch: target.to_string(),
      });
    }
    for repo in self.config.non_master_repos_for_context(target)? {
      let worktree = self
        .worktrees
        .create_for_context(repo, target)
        .with_context(|| format!("failed to create worktree for repo {}", repo.identifier()))?;
      if self.worktrees.handle_stash(&worktree, target, StashOp::Pop)? == StashOutcome::PopConflict {
        conflicts.push(worktree.repo.identifier().to_string());
      }
      active.push(worktree);
    }

    self.update_manifests(&active);
    state::set_current_context(self.config.workdir(), target).context("failed to set current context")?;
    self.run_pub_get(&active);

    info!("successfully switched to context '{target}' in worktree mode");
    Ok(SwitchReport {
      context: target.to_string(),
      conflicts,
    })
  }

  fn switch_branch_mode(&self, target: &str, current: &str) -> Result<SwitchReport> {
    let mut conflicts = Vec::new();
    let repos = self.config.context_repos(target)?;

    // Stash everything first, then transition, then restore.
    if !current.is_empty() {
      for repo in &repos {
        let git = GitRepo::new(self.config.repo_path(repo));
        if !git.is_repository() {
          continue;
        }
        if git.has_uncommitted_changes()? {
          git.stash_push(&self.departure_label(current, target))?;
          info!("stashed changes in {}", repo.identifier());
        }
      }
    }

    let mut active = Vec::new();
    for repo in &repos {
      let git = GitRepo::new(self.config.repo_path(repo));
      if !git.is_repository() {
        bail!("repository {} is not a git repository", repo.identifier());
      }
      self
        .transition_repo(&git, repo.identifier(), target)
        .with_context(|| format!("failed to switch repo {} to context", repo.identifier()))?;
      active.push(WorktreeInfo {
        repo: (*repo).clone(),
        worktree_path: self.config.repo_path(repo),
        branch: target.to_string(),
      });
    }

    for worktree in &active {
      let git = GitRepo::new(&worktree.worktree_path);
      self.restore_stash(&git, target, worktree.repo.identifier(), &mut conflicts);
    }

    self.update_manifests(&active);
    state::set_current_context(self.config.workdir(), target).context("failed to set current context")?;
    self.run_pub_get(&active);

    info!("successfully switched to context '{target}' in branch mode");
    Ok(SwitchReport {
      context: target.to_string(),
      conflicts,
    })
  }

  /// Switch back to the synthetic main context. Worktrees are kept; the
  /// repositories that moved in place return to their mainline and their
  /// manifests revert to git references.
  fn switch_to_main(&self, current: &str) -> Result<SwitchReport> {
    info!("switching to main context - keeping worktrees and reverting dependencies to git");

    let leaving_user_context = !current.is_empty() && !is_reserved_context(current);
    if leaving_user_context {
      self.gate_master_stash(current)?;
    }

    let mut active = Vec::new();

    if self.config.is_branch_mode() {
      for repo in &self.config.repos {
        let git = GitRepo::new(self.config.repo_path(repo));
        if !git.is_repository() {
          warn!("repository {} is not a git repository, skipping", repo.identifier());
          continue;
        }
        let is_master = self.config.master.as_deref() == Some(repo.identifier());
        if leaving_user_context && !is_master && git.has_uncommitted_changes()? {
          git.stash_push(&stash_label(current))?;
          info!("stashed changes in {}", repo.identifier());
        }
        self.checkout_mainline(&git, repo.identifier())?;
        active.push(WorktreeInfo {
          repo: repo.clone(),
          worktree_path: self.config.repo_path(repo),
          branch: self.config.main_branch.clone(),
        });
      }

      for worktree in &active {
        self.revert_manifest_to_git(&worktree.worktree_path, &worktree.repo);
      }
    } else {
      match self.config.master_repo() {
        Ok(master) => {
          let git = GitRepo::new(self.config.repo_path(master));
          self
            .checkout_mainline(&git, master.identifier())
            .context("failed to switch master repo to main branch")?;
          self.revert_manifest_to_git(&self.config.repo_path(master), master);
          active.push(WorktreeInfo {
            repo: master.clone(),
            worktree_path: self.config.repo_path(master),
            branch: self.config.main_branch.clone(),
          });
        }
        Err(err) => warn!("no master repository configured: {err:#}"),
      }
    }

    state::set_current_context(self.config.workdir(), MAIN_CONTEXT).context("failed to set current context")?;
    self.run_pub_get(&active);

    info!("successfully switched to main context (worktrees preserved)");
    Ok(SwitchReport {
      context: MAIN_CONTEXT.to_string(),
      conflicts: Vec::new(),
    })
  }

  /// Confirm and perform the master-repository stash before a main
  /// switch. Declining aborts with [`SwitchCancelled`] before any state
  /// has changed.
  fn gate_master_stash(&self, current: &str) -> Result<()> {
    let Ok(master) = self.config.master_repo() else {
      debug!("no master repository configured, skipping stash check");
      return Ok(());
    };

    let git = GitRepo::new(self.config.repo_path(master));
    if !git.is_repository() {
      return Ok(());
    }

    match git.has_uncommitted_changes() {
      Ok(false) => return Ok(()),
      Err(err) => {
        warn!("failed to check for uncommitted changes in master repo: {err:#}");
        return Ok(());
      }
      Ok(true) => {}
    }

    if !self.gate.confirm_stash(current, master.identifier())? {
      return Err(SwitchCancelled.into());
    }

    git.stash_push(&stash_label(current))?;
    info!(
      "stashed uncommitted changes in master repo {} for context {current}",
      master.identifier()
    );
    Ok(())
  }

  /// Stash uncommitted work in every existing worktree of the source
  /// context.
  fn stash_context_worktrees(&self, context: &str) -> Result<()> {
    let repos = match self.config.non_master_repos_for_context(context) {
      Ok(repos) => repos,
      Err(err) => {
        warn!("failed to resolve repos of context '{context}': {err:#}");
        return Ok(());
      }
    };

    for worktree in self.worktrees.list_for_context(&repos, context) {
      self
        .worktrees
        .handle_stash(&worktree, context, StashOp::Push)
        .with_context(|| format!("failed to stash changes in {} worktree", worktree.repo.identifier()))?;
    }
    Ok(())
  }

  /// Move one repository onto the context branch, creating it off HEAD
  /// when it does not exist.
  fn transition_repo(&self, git: &GitRepo, identifier: &str, context: &str) -> Result<()> {
    if git.branch_exists(context)? {
      info!("switching to existing branch {context} in {identifier}");
      git.checkout_branch(context)
    } else {
      info!("creating new branch {context} in {identifier}");
      git.create_branch(context, None)
    }
  }

  /// Check out the mainline branch: the configured name first, then
  /// `main`, `master`, `develop`, staying put when none exists.
  fn checkout_mainline(&self, git: &GitRepo, identifier: &str) -> Result<()> {
    let configured = self.config.main_branch.as_str();
    if git.branch_exists(configured)? {
      info!("switching {identifier} to configured main branch: {configured}");
      return git.checkout_branch(configured);
    }

    for candidate in ["main", "master", "develop"] {
      if candidate == configured {
        continue;
      }
      if git.branch_exists(candidate).unwrap_or(false) {
        info!("configured main branch '{configured}' not found in {identifier}, switching to: {candidate}");
        return git.checkout_branch(candidate);
      }
    }

    let current_branch = git
      .current_branch()
      .with_context(|| format!("failed to get current branch for {identifier}"))?;
    info!("no main branch candidate found in {identifier}, staying on current branch: {current_branch}");
    Ok(())
  }

  /// Pop the target context's stash when one exists; conflicts are
  /// recorded for the final report rather than failing the switch.
  fn restore_stash(&self, git: &GitRepo, context: &str, identifier: &str, conflicts: &mut Vec<String>) {
    let label = stash_label(context);
    match git.stash_list() {
      Ok(stashes) if stashes.iter().any(|entry| entry.contains(&label)) => match git.stash_pop_by_message(&label) {
        Ok(()) => info!("restored stash in {identifier}"),
        Err(err) => {
          warn!("failed to restore stash in {identifier}: {err:#}");
          conflicts.push(identifier.to_string());
        }
      },
      Ok(_) => debug!("no stash to restore in {identifier}"),
      Err(err) => warn!("failed to list stashes in {identifier}: {err:#}"),
    }
  }

  /// Rewrite every active manifest so that each other participant is
  /// referenced by a relative path. Shape mismatches are expected (not
  /// every repository depends on every other) and log at debug level.
  fn update_manifests(&self, active: &[WorktreeInfo]) {
    debug!("updating pubspec files for {} working copies", active.len());

    for editing in active {
      if !pubspec::manifest_path(&editing.worktree_path).exists() {
        debug!("no pubspec.yaml found in {}, skipping", editing.repo.identifier());
        continue;
      }

      let mut manifest = match Pubspec::load(&editing.worktree_path) {
        Ok(manifest) => manifest,
        Err(err) => {
          warn!("failed to load pubspec.yaml in {}: {err:#}", editing.repo.identifier());
          continue;
        }
      };

      if let Err(err) = manifest.backup() {
        warn!("failed to backup pubspec.yaml in {}: {err:#}", editing.repo.identifier());
      }

      for other in active {
        if other.repo.identifier() == editing.repo.identifier() {
          continue;
        }

        let Some(relative) = pathdiff::diff_paths(&other.worktree_path, &editing.worktree_path) else {
          warn!(
            "failed to get relative path from {} to {}",
            editing.worktree_path.display(),
            other.worktree_path.display()
          );
          continue;
        };
        let relative = relative.to_string_lossy();

        // Dependency rewrites key on the package name, not the alias.
        let dependency = other.repo.name.as_str();
        match manifest.comment_git_and_add_path(dependency, &relative) {
          Ok(()) => info!(
            "commented git and added path dependency for {dependency} in {}: {relative}",
            editing.repo.identifier()
          ),
          Err(git_err) => match manifest.update_path_dependency(dependency, &relative) {
            Ok(()) => info!(
              "updated {dependency} path dependency in {} to: {relative}",
              editing.repo.identifier()
            ),
            Err(path_err) => debug!(
              "dependency {dependency} not found as git or path dependency in {}: {git_err:#}; {path_err:#}",
              editing.repo.identifier()
            ),
          },
        }
      }

      if let Err(err) = manifest.save() {
        warn!("failed to save pubspec.yaml in {}: {err:#}", editing.repo.identifier());
      }
    }
  }

  /// Revert every other repository's dependency in `dir`'s manifest from
  /// the switched form back to its original git reference.
  fn revert_manifest_to_git(&self, dir: &Path, editing: &Repository) {
    if !pubspec::manifest_path(dir).exists() {
      debug!("no pubspec.yaml found in {}, skipping dependency revert", editing.identifier());
      return;
    }

    let mut manifest = match Pubspec::load(dir) {
      Ok(manifest) => manifest,
      Err(err) => {
        warn!("failed to load pubspec.yaml in {}: {err:#}", editing.identifier());
        return;
      }
    };

    for repo in &self.config.repos {
      if repo.identifier() == editing.identifier() || repo.name == editing.name {
        continue;
      }
      match manifest.uncomment_git_and_remove_path(&repo.name) {
        Ok(()) => info!("reverted {} dependency in {} back to git reference", repo.name, editing.identifier()),
        Err(err) => debug!(
          "dependency {} not in switched form in {}: {err:#}",
          repo.name,
          editing.identifier()
        ),
      }
    }

    if let Err(err) = manifest.save() {
      warn!("failed to save pubspec.yaml in {}: {err:#}", editing.identifier());
    }
  }

  /// Best-effort `flutter pub get` in every active directory that has a
  /// manifest. Never affects the switch outcome.
  fn run_pub_get(&self, active: &[WorktreeInfo]) {
    for worktree in active {
      if !pubspec::manifest_path(&worktree.worktree_path).exists() {
        debug!("no pubspec.yaml in {}, skipping flutter pub get", worktree.repo.identifier());
        continue;
      }

      info!(
        "running flutter pub get in {} (path: {})",
        worktree.repo.identifier(),
        worktree.worktree_path.display()
      );
      match Command::new("flutter")
        .args(["pub", "get"])
        .current_dir(&worktree.worktree_path)
        .output()
      {
        Ok(output) if output.status.success() => {
          info!("flutter pub get completed successfully in {}", worktree.repo.identifier());
        }
        Ok(output) => warn!(
          "flutter pub get failed in {}: {}",
          worktree.repo.identifier(),
          String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(err) => warn!("failed to run flutter pub get in {}: {err}", worktree.repo.identifier()),
      }
    }
  }

  /// Delete the named contexts: worktrees, context branches, and the
  /// descriptor entries. Reserved and unknown names are rejected before
  /// any side effect.
  pub fn delete_contexts(&mut self, contexts: &[String]) -> Result<()> {
    for name in contexts {
      if is_reserved_context(name) {
        bail!("cannot delete built-in context '{name}'");
      }
      if !self.config.context_exists(name) {
        bail!("context '{name}' not found");
      }
    }

    info!("deleting contexts: {}", contexts.join(", "));
    for name in contexts {
      self
        .delete_context(name)
        .with_context(|| format!("failed to delete context {name}"))?;
    }

    for name in contexts {
      if let Err(err) = self.config.remove_context(name) {
        warn!("failed to remove context from config: {err:#}");
      }
    }
    self.config.save().context("failed to save config after deletion")?;

    Ok(())
  }

  fn delete_context(&self, context: &str) -> Result<()> {
    for repo in self.config.non_master_repos_for_context(context)? {
      if let Err(err) = self.worktrees.remove_for_context(repo, context) {
        warn!("failed to remove worktree for {}: {err:#}", repo.identifier());
      }
    }

    for repo in self.config.context_repos(context)? {
      let git = GitRepo::new(self.config.repo_path(repo));
      if !git.is_repository() {
        continue;
      }
      match git.branch_exists(context) {
        Ok(true) => {
          if let Err(err) = git.delete_branch(context) {
            warn!("failed to delete branch {context} in {}: {err:#}", repo.identifier());
          } else {
            info!("deleted branch {context} in {}", repo.identifier());
          }
        }
        Ok(false) => {}
        Err(err) => warn!("failed to check branch {context} in {}: {err:#}", repo.identifier()),
      }
    }

    Ok(())
  }

  /// The current context and a status line per participating repository.
  pub fn context_status(&self) -> Result<(String, Vec<(String, String)>)> {
    let current = self.current_context()?;
    if current.is_empty() {
      return Ok((current, Vec::new()));
    }

    let repos = self.config.context_repos(&current)?;
    let mut statuses = Vec::new();

    for repo in repos {
      let dir = self.active_path(repo, &current);
      let status = if !dir.exists() {
        "No worktree (not switched to this context yet)".to_string()
      } else if is_reserved_context(&current) {
        self.plain_repo_status(&dir)
      } else {
        let worktree = WorktreeInfo {
          repo: repo.clone(),
          worktree_path: dir,
          branch: current.clone(),
        };
        self.worktrees.status_string(&worktree)
      };
      statuses.push((repo.identifier().to_string(), status));
    }

    Ok((current, statuses))
  }

  /// Branch-plus-modified status without a branch expectation, used on
  /// the synthetic context where repositories sit on whatever mainline
  /// they have.
  fn plain_repo_status(&self, dir: &Path) -> String {
    let git = GitRepo::new(dir);
    if !git.is_repository() {
      return "not a git repository".to_string();
    }
    match (git.current_branch(), git.has_uncommitted_changes()) {
      (Ok(branch), Ok(true)) => format!("{branch} (modified)"),
      (Ok(branch), Ok(false)) => branch,
      (Ok(branch), Err(_)) => format!("{branch} (error checking changes)"),
      (Err(err), _) => format!("Error: {err:#}"),
    }
  }
}
