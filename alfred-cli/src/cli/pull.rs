//! # Pull Command

use alfred_core::{GitRepo, print_error, print_success};
use anyhow::{Result, bail};
use clap::{ArgAction, Args};

use super::{load_manager, require_current_context};

#[derive(Args, Debug)]
pub struct PullArgs {
  /// Use rebase instead of merge
  #[arg(
    short,
    long,
    default_value_t = true,
    action = ArgAction::Set,
    num_args = 0..=1,
    default_missing_value = "true"
  )]
  pub rebase: bool,
}

pub fn run(args: PullArgs) -> Result<()> {
  let manager = load_manager()?;
  let current = require_current_context(&manager)?;
  let repos = manager.config().context_repos(&current)?;
  if repos.is_empty() {
    bail!("no repositories in current context");
  }

  println!("Pulling changes for context '{current}'...\n");

  let mut successes = Vec::new();
  let mut failures = Vec::new();

  for repo in repos {
    let git = GitRepo::new(manager.active_path(repo, &current));
    match git.pull(args.rebase) {
      Ok(()) => successes.push(repo.identifier().to_string()),
      Err(err) => failures.push(format!("{}: {err:#}", repo.identifier())),
    }
  }

  println!();
  if !successes.is_empty() {
    print_success(&format!("Successfully pulled {} repositories: {}", successes.len(), successes.join(", ")));
  }
  if !failures.is_empty() {
    print_error(&format!("Failed to pull {} repositories:", failures.len()));
    for failure in &failures {
      println!("  {failure}");
    }
    bail!("pull failed for some repositories");
  }

  Ok(())
}
