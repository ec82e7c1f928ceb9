//! # Main-Branch Command

use std::io::IsTerminal;

use alfred_core::{alfred_theme, format_command, print_success};
use anyhow::{Context, Result, bail};
use clap::Args;
use dialoguer::Input;

use super::load_manager;

#[derive(Args, Debug)]
pub struct MainBranchArgs {
  /// Branch name to use when switching to the main context
  pub branch: Option<String>,
}

pub fn run(args: MainBranchArgs) -> Result<()> {
  let mut manager = load_manager()?;

  let branch = match args.branch {
    Some(branch) => branch,
    None => {
      if !std::io::stdin().is_terminal() {
        bail!("no branch name given. Usage: alfred main-branch <name>");
      }
      Input::with_theme(&alfred_theme())
        .with_prompt("Main branch name")
        .default("main".to_string())
        .interact_text()
        .context("failed to read main branch name")?
    }
  };

  let branch = branch.trim().to_string();
  if branch.is_empty() {
    bail!("branch name cannot be empty");
  }

  manager
    .config_mut()
    .set_main_branch(&branch)
    .context("failed to set main branch")?;

  print_success(&format!("Main branch set to: {branch}"));
  println!(
    "Now {} will switch all repositories to the '{branch}' branch",
    format_command("alfred switch main")
  );
  Ok(())
}
