//! End-to-end switch scenarios over real git repositories.
//!
//! Each test builds a fresh three-repo workspace (core/ui/app, master
//! `app`) and drives the context manager the way the CLI does, with the
//! stash gate stubbed out.

use std::fs;
use std::path::Path;

use alfred_core::{Config, ContextManager, GitRepo, StashGate, SwitchCancelled, current_context};
use alfred_test_utils::{WorkspaceFixture, pubspec_with_git_deps, write_file};
use anyhow::Result;

struct AcceptGate;

impl StashGate for AcceptGate {
  fn confirm_stash(&self, _current_context: &str, _repo_identifier: &str) -> Result<bool> {
    Ok(true)
  }
}

struct DeclineGate;

impl StashGate for DeclineGate {
  fn confirm_stash(&self, _current_context: &str, _repo_identifier: &str) -> Result<bool> {
    Ok(false)
  }
}

fn manager(fixture: &WorkspaceFixture) -> ContextManager {
  let config = Config::load(fixture.path()).expect("fixture config loads");
  ContextManager::with_gate(config, Box::new(AcceptGate))
}

fn branch_of(dir: &Path) -> String {
  GitRepo::new(dir).current_branch().expect("current branch")
}

#[test]
fn initialize_then_switch_in_worktree_mode() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();

  // The master switches in place; the non-master participant gets a
  // sibling worktree on the context branch.
  assert_eq!(branch_of(&fixture.dir("app")), "feature-x");
  assert!(fixture.dir("ui-feature-x").exists());
  assert_eq!(branch_of(&fixture.dir("ui-feature-x")), "feature-x");
  let ui_git = GitRepo::new(fixture.dir("ui"));
  assert!(ui_git.worktree_exists(fixture.dir("ui-feature-x")).unwrap());

  // Non-participants stay untouched.
  assert_eq!(branch_of(&fixture.dir("core")), "main");
  assert!(!fixture.dir("core-feature-x").exists());

  // The master references the worktree; the worktree references the
  // master's original path. Both carry the commented original block.
  let app_pubspec = fixture.read_pubspec("app");
  assert!(app_pubspec.contains("  ui_kit:\n    path: ../ui-feature-x\n"));
  assert!(app_pubspec.contains("  # ui_kit:\n"));
  assert!(app_pubspec.contains("  #     url: https://github.com/acme/ui_kit.git\n"));
  // core_models is not part of the context and keeps its git reference
  assert!(app_pubspec.contains("  core_models:\n    git:\n"));

  let ui_pubspec = fixture.read_pubspec("ui-feature-x");
  assert!(ui_pubspec.contains("  app:\n    path: ../app\n"));
  assert!(ui_pubspec.contains("  # app:\n"));

  // Backups precede the edits and stay in place
  assert!(fixture.dir("app").join("pubspec.yaml.backup").exists());
  assert!(fixture.dir("ui-feature-x").join("pubspec.yaml.backup").exists());

  assert_eq!(current_context(fixture.path()).unwrap(), "feature-x");
}

#[test]
fn return_to_main_preserves_worktrees() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  manager.switch_context("main").unwrap();

  assert_eq!(branch_of(&fixture.dir("app")), "main");

  // Worktrees survive the main switch, still on the context branch
  assert!(fixture.dir("ui-feature-x").exists());
  assert_eq!(branch_of(&fixture.dir("ui-feature-x")), "feature-x");

  // The master manifest is back in git shape, byte for byte
  assert_eq!(
    fixture.read_pubspec("app"),
    pubspec_with_git_deps("app", &["ui_kit", "core_models"])
  );

  assert_eq!(current_context(fixture.path()).unwrap(), "main");
}

#[test]
fn resume_preserves_uncommitted_master_work() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  manager.switch_context("main").unwrap();

  // An edit made while on main travels into the context: it is stashed
  // under the target label and popped right after the transition.
  write_file(&fixture.dir("app"), "README.md", "# app\nwork in flight\n");
  manager.switch_context("feature-x").unwrap();

  assert_eq!(branch_of(&fixture.dir("app")), "feature-x");
  assert_eq!(
    fs::read_to_string(fixture.dir("app").join("README.md")).unwrap(),
    "# app\nwork in flight\n"
  );
  assert_eq!(current_context(fixture.path()).unwrap(), "feature-x");

  // The manifest is switched again after the round trip
  assert!(fixture.read_pubspec("app").contains("  ui_kit:\n    path: ../ui-feature-x\n"));
}

#[test]
fn declined_stash_gate_aborts_before_any_change() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  manager(&fixture).switch_context("feature-x").unwrap();

  write_file(&fixture.dir("app"), "README.md", "# app\nunfinished\n");
  let switched_pubspec = fixture.read_pubspec("app");

  let declining = ContextManager::with_gate(Config::load(fixture.path()).unwrap(), Box::new(DeclineGate));
  let err = declining.switch_context("main").unwrap_err();
  assert!(err.downcast_ref::<SwitchCancelled>().is_some());

  // Nothing moved: branch, manifest, edit, and pointer are all intact
  assert_eq!(branch_of(&fixture.dir("app")), "feature-x");
  assert_eq!(fixture.read_pubspec("app"), switched_pubspec);
  assert_eq!(
    fs::read_to_string(fixture.dir("app").join("README.md")).unwrap(),
    "# app\nunfinished\n"
  );
  assert_eq!(current_context(fixture.path()).unwrap(), "feature-x");
}

#[test]
fn branch_mode_switch_cross_references_all_repos() {
  let fixture = WorkspaceFixture::new("branch", &[("alpha", &["core_models", "ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("alpha").unwrap();

  for dir in ["core", "ui", "app"] {
    assert_eq!(branch_of(&fixture.dir(dir)), "alpha");
  }

  // No sibling worktree directories in branch mode
  for dir in ["core-alpha", "ui-alpha", "app-alpha"] {
    assert!(!fixture.dir(dir).exists());
  }

  // Manifests cross-reference the original directories
  let app_pubspec = fixture.read_pubspec("app");
  assert!(app_pubspec.contains("  ui_kit:\n    path: ../ui\n"));
  assert!(app_pubspec.contains("  core_models:\n    path: ../core\n"));

  let ui_pubspec = fixture.read_pubspec("ui");
  assert!(ui_pubspec.contains("  app:\n    path: ../app\n"));
  assert!(ui_pubspec.contains("  core_models:\n    path: ../core\n"));

  assert_eq!(current_context(fixture.path()).unwrap(), "alpha");
}

#[test]
fn branch_mode_return_to_main_reverts_every_manifest() {
  let fixture = WorkspaceFixture::new("branch", &[("alpha", &["core_models", "ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("alpha").unwrap();
  manager.switch_context("main").unwrap();

  for dir in ["core", "ui", "app"] {
    assert_eq!(branch_of(&fixture.dir(dir)), "main");
  }

  assert_eq!(
    fixture.read_pubspec("app"),
    pubspec_with_git_deps("app", &["ui_kit", "core_models"])
  );
  assert_eq!(
    fixture.read_pubspec("ui"),
    pubspec_with_git_deps("ui_kit", &["app", "core_models"])
  );

  assert_eq!(current_context(fixture.path()).unwrap(), "main");
}

#[test]
fn switching_contexts_preserves_worktree_changes() {
  let fixture = WorkspaceFixture::new(
    "worktree",
    &[("feature-x", &["ui_kit", "app"]), ("feature-y", &["ui_kit", "app"])],
  )
  .unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  write_file(&fixture.dir("ui-feature-x"), "README.md", "# ui_kit\nhalf done\n");

  manager.switch_context("feature-y").unwrap();
  assert!(fixture.dir("ui-feature-y").exists());
  // The dirty state was stashed away under the source context's label
  assert_eq!(
    fs::read_to_string(fixture.dir("ui-feature-x").join("README.md")).unwrap(),
    "# ui_kit\n"
  );

  manager.switch_context("feature-x").unwrap();
  assert_eq!(
    fs::read_to_string(fixture.dir("ui-feature-x").join("README.md")).unwrap(),
    "# ui_kit\nhalf done\n"
  );
}

#[test]
fn switch_to_active_context_is_a_noop() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  let pubspec_before = fixture.read_pubspec("app");

  let report = manager.switch_context("feature-x").unwrap();
  assert_eq!(report.context, "feature-x");
  assert!(report.conflicts.is_empty());
  assert_eq!(fixture.read_pubspec("app"), pubspec_before);
  assert_eq!(current_context(fixture.path()).unwrap(), "feature-x");
}

#[test]
fn unknown_context_aborts_without_moving_the_pointer() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  assert!(manager.switch_context("ghost").is_err());
  assert_eq!(current_context(fixture.path()).unwrap(), "feature-x");
}

#[test]
fn delete_context_removes_worktrees_and_branches() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let mut manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  manager.switch_context("main").unwrap();

  manager.delete_contexts(&["feature-x".to_string()]).unwrap();

  assert!(!fixture.dir("ui-feature-x").exists());
  assert!(!GitRepo::new(fixture.dir("ui")).branch_exists("feature-x").unwrap());
  assert!(!GitRepo::new(fixture.dir("app")).branch_exists("feature-x").unwrap());

  let reloaded = Config::load(fixture.path()).unwrap();
  assert!(!reloaded.context_exists("feature-x"));
}

#[test]
fn status_reports_each_participant() {
  let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();
  let manager = manager(&fixture);

  manager.switch_context("feature-x").unwrap();
  let (current, statuses) = manager.context_status().unwrap();

  assert_eq!(current, "feature-x");
  let ui_status = statuses.iter().find(|(name, _)| name == "ui_kit").unwrap();
  assert!(ui_status.1.starts_with("feature-x"));
  let app_status = statuses.iter().find(|(name, _)| name == "app").unwrap();
  assert!(app_status.1.starts_with("feature-x"));
}
