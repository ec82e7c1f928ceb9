//! # Diagnose Command
//!
//! Enumerates per-repository git state for the current context. A switch
//! is not atomic across repositories, so this is the tool for reasoning
//! about recovery after an aborted one.

use alfred_core::{GitRepo, format_branch, format_repo_name, format_repo_path, print_header};
use anyhow::{Result, bail};
use clap::Args;

use super::{load_manager, require_current_context};

#[derive(Args, Debug)]
pub struct DiagnoseArgs {}

pub fn run(_args: DiagnoseArgs) -> Result<()> {
  let manager = load_manager()?;
  let current = require_current_context(&manager)?;
  let repos = manager.config().context_repos(&current)?;
  if repos.is_empty() {
    bail!("no repositories in current context");
  }

  print_header(&format!("Diagnosing context '{current}'"));

  for repo in repos {
    let path = manager.active_path(repo, &current);
    println!("\nRepository: {}", format_repo_name(repo.identifier()));
    println!("  Path: {}", format_repo_path(&path.display().to_string()));

    let git = GitRepo::new(&path);
    if !git.is_repository() {
      println!("  ✗ Not a valid git repository");
      continue;
    }

    let branch = match git.current_branch() {
      Ok(branch) => {
        println!("  Branch: {}", format_branch(&branch));
        Some(branch)
      }
      Err(err) => {
        println!("  ✗ Failed to get current branch: {err:#}");
        None
      }
    };

    match git.has_upstream() {
      Ok(true) => println!("  ✓ Upstream configured"),
      Ok(false) => {
        println!("  ⚠ No upstream configured");
        if let Some(branch) = branch {
          match git.remote_branch_exists("origin", &branch) {
            Ok(true) => println!("  ✓ Remote branch 'origin/{branch}' exists"),
            Ok(false) => println!("  ⚠ Remote branch 'origin/{branch}' does not exist"),
            Err(err) => println!("  ✗ Failed to check remote branch: {err:#}"),
          }
        }
      }
      Err(err) => println!("  ✗ Failed to check upstream: {err:#}"),
    }

    match git.has_uncommitted_changes() {
      Ok(true) => println!("  ⚠ Has uncommitted changes"),
      Ok(false) => println!("  ✓ Working directory clean"),
      Err(err) => println!("  ✗ Failed to check for changes: {err:#}"),
    }
  }

  Ok(())
}
