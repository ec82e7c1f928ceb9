//! # Push Command

use alfred_core::{GitRepo, print_error, print_success};
use anyhow::{Result, bail};
use clap::Args;

use super::{load_manager, require_current_context};

#[derive(Args, Debug)]
pub struct PushArgs {
  /// Force set the upstream branch even if already configured
  #[arg(short = 'u', long)]
  pub set_upstream: bool,
}

pub fn run(args: PushArgs) -> Result<()> {
  let manager = load_manager()?;
  let current = require_current_context(&manager)?;
  let repos = manager.config().context_repos(&current)?;
  if repos.is_empty() {
    bail!("no repositories in current context");
  }

  println!("Pushing changes for context '{current}'...\n");

  let mut successes = Vec::new();
  let mut failures = Vec::new();

  for repo in repos {
    let git = GitRepo::new(manager.active_path(repo, &current));

    let result = if args.set_upstream {
      git
        .current_branch()
        .and_then(|branch| git.set_upstream("origin", &branch))
        .and_then(|()| git.push_with_upstream("origin"))
    } else {
      git.push_with_upstream("origin")
    };

    match result {
      Ok(()) => successes.push(repo.identifier().to_string()),
      Err(err) => failures.push(format!("{}: {err:#}", repo.identifier())),
    }
  }

  println!();
  if !successes.is_empty() {
    print_success(&format!("Successfully pushed {} repositories: {}", successes.len(), successes.join(", ")));
  }
  if !failures.is_empty() {
    print_error(&format!("Failed to push {} repositories:", failures.len()));
    for failure in &failures {
      println!("  {failure}");
    }
    bail!("push failed for some repositories");
  }

  Ok(())
}
