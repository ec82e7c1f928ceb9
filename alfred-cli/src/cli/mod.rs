//! # Command Line Interface
//!
//! Defines the CLI structure and command handlers for the alfred tool:
//! workspace initialization, context management, and the batch git
//! operations that run across every repository of the active context.

use std::env;
use std::path::PathBuf;

use alfred_core::{ColorMode, Config, ContextManager};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod commit;
mod create;
mod delete;
mod diagnose;
mod init;
mod list;
mod main_branch;
mod prepare;
mod pull;
mod push;
mod scan;
mod status;
mod switch;
mod version;

/// A CLI for managing multi-repo Dart/Flutter workspaces
#[derive(Parser)]
#[command(name = "alfred")]
#[command(about = "Context switching for multi-repo Dart/Flutter workspaces")]
#[command(long_about = "Alfred keeps several sibling repositories in sync: named contexts map to a\n\
        branch plus a subset of repositories, and a single switch moves every\n\
        selected repository onto the context branch while rewriting pubspec git\n\
        dependencies into co-located path dependencies.")]
#[command(version)]
pub struct Cli {
  /// Enable debug logging
  #[arg(long, global = true)]
  pub debug: bool,

  /// When to use colored output
  #[arg(long, global = true, value_enum, default_value = "auto")]
  pub colors: ColorMode,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
  /// Initialize alfred in the current directory
  Init(init::InitArgs),
  /// Scan the directory and auto-configure repositories
  Scan(scan::ScanArgs),
  /// Show the current context and repository status
  Status(status::StatusArgs),
  /// List available contexts
  List(list::ListArgs),
  /// Switch to a different context
  Switch(switch::SwitchArgs),
  /// Create a new context
  Create(create::CreateArgs),
  /// Delete contexts
  Delete(delete::DeleteArgs),
  /// Revert a repository to git dependencies for production
  Prepare(prepare::PrepareArgs),
  /// Set the main branch used when switching to the main context
  #[command(name = "main-branch")]
  MainBranch(main_branch::MainBranchArgs),
  /// Interactive commit across all repositories of the current context
  Commit(commit::CommitArgs),
  /// Push changes for all repositories of the current context
  Push(push::PushArgs),
  /// Pull changes for all repositories of the current context
  Pull(pull::PullArgs),
  /// Diagnose git status and upstream configuration for the current context
  Diagnose(diagnose::DiagnoseArgs),
  /// Show version information
  Version(version::VersionArgs),
}

/// Run the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
  init_tracing(if cli.debug { Level::DEBUG } else { Level::INFO });

  match cli.colors {
    ColorMode::Yes => owo_colors::set_override(true),
    ColorMode::No => owo_colors::set_override(false),
    ColorMode::Auto => {}
  }

  match cli.command {
    Commands::Init(args) => init::run(args),
    Commands::Scan(args) => scan::run(args),
    Commands::Status(args) => status::run(args),
    Commands::List(args) => list::run(args),
    Commands::Switch(args) => switch::run(args),
    Commands::Create(args) => create::run(args),
    Commands::Delete(args) => delete::run(args),
    Commands::Prepare(args) => prepare::run(args),
    Commands::MainBranch(args) => main_branch::run(args),
    Commands::Commit(args) => commit::run(args),
    Commands::Push(args) => push::run(args),
    Commands::Pull(args) => pull::run(args),
    Commands::Diagnose(args) => diagnose::run(args),
    Commands::Version(args) => version::run(args),
  }
}

fn init_tracing(level: Level) {
  let fmt_layer = fmt::layer().with_target(false).without_time();
  let filter = EnvFilter::default().add_directive(level.into());

  tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().ok();
}

/// The workspace root every command operates on.
pub(crate) fn workspace_root() -> Result<PathBuf> {
  env::current_dir().context("failed to get current directory")
}

/// Load the workspace configuration and wire up the context manager.
pub(crate) fn load_manager() -> Result<ContextManager> {
  let config = Config::load(workspace_root()?)?;
  Ok(ContextManager::new(config))
}

/// The active context, or an error telling the user to switch first.
pub(crate) fn require_current_context(manager: &ContextManager) -> Result<String> {
  let current = manager.current_context()?;
  if current.is_empty() {
    bail!("no context is currently active. Use 'alfred switch' to activate a context");
  }
  Ok(current)
}
