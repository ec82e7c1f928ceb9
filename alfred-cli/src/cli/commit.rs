//! # Commit Command
//!
//! Walks every repository of the current context, lets the user pick the
//! files to stage, and commits with a per-repository message.

use std::io::IsTerminal;

use alfred_core::{GitRepo, alfred_theme, format_repo_name, print_info, print_success, print_warning, status_description};
use anyhow::{Context, Result, bail};
use clap::Args;
use dialoguer::{Input, MultiSelect};

use super::{load_manager, require_current_context};

#[derive(Args, Debug)]
pub struct CommitArgs {}

pub fn run(_args: CommitArgs) -> Result<()> {
  if !std::io::stdin().is_terminal() {
    bail!("the commit interface requires a terminal");
  }

  let manager = load_manager()?;
  let current = require_current_context(&manager)?;
  let repos = manager.config().context_repos(&current)?;
  if repos.is_empty() {
    bail!("no repositories in current context");
  }

  for repo in repos {
    let path = manager.active_path(repo, &current);
    let git = GitRepo::new(&path);
    if !git.is_repository() {
      print_warning(&format!("{} is not a git repository, skipping", repo.identifier()));
      continue;
    }

    let changes = git.file_changes()?;
    if changes.is_empty() {
      print_info(&format!("{}: nothing to commit", repo.identifier()));
      continue;
    }

    println!("\nChanges in {}:", format_repo_name(repo.identifier()));
    let items: Vec<String> = changes
      .iter()
      .map(|change| format!("{:<10} {}", status_description(&change.status), change.path))
      .collect();
    let preselected: Vec<bool> = changes.iter().map(|change| change.staged).collect();

    let selection = MultiSelect::with_theme(&alfred_theme())
      .with_prompt("Select files to stage (space toggles, enter confirms)")
      .items(&items)
      .defaults(&preselected)
      .interact()
      .context("failed to select files")?;

    // Bring the index in line with the selection
    for (index, change) in changes.iter().enumerate() {
      let selected = selection.contains(&index);
      if selected && !change.staged {
        git.stage(&change.path)?;
      } else if !selected && change.staged {
        git.unstage(&change.path)?;
      }
    }

    if !git.has_staged_changes()? {
      print_info(&format!("{}: nothing staged, skipping commit", repo.identifier()));
      continue;
    }

    let message: String = Input::with_theme(&alfred_theme())
      .with_prompt(format!("Commit message for {}", repo.identifier()))
      .allow_empty(true)
      .interact_text()
      .context("failed to read commit message")?;

    if message.trim().is_empty() {
      print_info(&format!("{}: empty message, skipping commit", repo.identifier()));
      continue;
    }

    git.commit(&message)?;
    print_success(&format!("Committed staged changes in {}", repo.identifier()));
  }

  Ok(())
}
