//! # Alfred Core Library
//!
//! Core library for the alfred CLI: the git adapter, the pubspec editor,
//! the workspace configuration store, the worktree manager, and the
//! context switcher that ties them together. The CLI crate wires these
//! components to the command surface; everything here is usable without
//! a terminal.

pub mod config;
pub mod context;
pub mod git;
pub mod output;
pub mod prompts;
pub mod pubspec;
pub mod state;
pub mod worktree;

// Re-export the main types for the CLI and for tests
pub use config::{ALFRED_DIR, CONFIG_FILE, Config, MAIN_CONTEXT, Mode, Repository, is_reserved_context};
pub use context::{ContextManager, SwitchCancelled, SwitchReport};
pub use git::{FileChange, GitRepo, status_description};
pub use output::{
  ColorMode, format_branch, format_command, format_context_name, format_repo_name, format_repo_path, print_error,
  print_header, print_info, print_success, print_warning,
};
pub use prompts::{InteractiveStashGate, StashGate, alfred_theme};
pub use pubspec::{GitDependency, PUBSPEC_FILE, Pubspec, extract_package_name_from_file, manifest_path};
pub use state::{current_context, ensure_workspace_gitignore, set_current_context};
pub use worktree::{StashOp, StashOutcome, WorktreeInfo, WorktreeManager, stash_label};
