//! # Prepare Command
//!
//! Reverts a repository's switched dependencies back to git references so
//! the manifest is fit for production, without moving any branches.

use std::io::IsTerminal;
use std::process::Command;

use alfred_core::{Pubspec, alfred_theme, print_success, print_warning};
use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;
use tracing::debug;

use super::load_manager;

#[derive(Args, Debug)]
pub struct PrepareArgs {
  /// Repository to prepare (alias or name); the master when omitted
  pub repository: Option<String>,
}

pub fn run(args: PrepareArgs) -> Result<()> {
  let manager = load_manager()?;
  let config = manager.config();

  let target = match &args.repository {
    Some(alias) => config.repo_by_alias(alias)?,
    None => config
      .master_repo()
      .context("no master repository configured and no repository specified")?,
  };
  let target_path = config.repo_path(target);

  let mut pubspec =
    Pubspec::load(&target_path).with_context(|| format!("failed to load pubspec.yaml from {}", target.path))?;

  println!("Preparing {} for production by reverting to git dependencies...", target.identifier());

  let mut reverted = 0;
  for repo in &config.repos {
    if repo.name == target.name {
      continue;
    }
    match pubspec.uncomment_git_and_remove_path(&repo.name) {
      Ok(()) => {
        reverted += 1;
        print_success(&format!("Reverted {} dependency to git reference", repo.name));
      }
      Err(err) => debug!("no commented git dependency found for {} in {}: {err:#}", repo.name, target.identifier()),
    }
  }

  if reverted == 0 {
    print_warning(&format!(
      "No dependencies to revert in {}. Repository may already be prepared.",
      target.identifier()
    ));
    return Ok(());
  }

  pubspec.save().context("failed to save pubspec.yaml")?;

  print_success(&format!(
    "Successfully prepared {} - all dependencies reverted to git references",
    target.identifier()
  ));

  if std::io::stdin().is_terminal() {
    let run_pub_get = Confirm::with_theme(&alfred_theme())
      .with_prompt("Run 'flutter pub get' to update dependencies?")
      .default(false)
      .interact()
      .context("failed to read pub get choice")?;

    if run_pub_get {
      match Command::new("flutter").args(["pub", "get"]).current_dir(&target_path).output() {
        Ok(output) if output.status.success() => print_success("Dependencies updated successfully"),
        Ok(output) => print_warning(&format!(
          "flutter pub get failed: {}",
          String::from_utf8_lossy(&output.stderr).trim()
        )),
        Err(err) => print_warning(&format!("failed to run flutter pub get: {err}")),
      }
    }
  }

  Ok(())
}
