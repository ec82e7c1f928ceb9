//! # Init Command
//!
//! Initializes the workspace: either by delegating to the scanner or by
//! writing a sample configuration to edit by hand.

use std::fs;
use std::io::IsTerminal;

use alfred_core::{ALFRED_DIR, CONFIG_FILE, alfred_theme, ensure_workspace_gitignore, print_success, print_warning};
use anyhow::{Context, Result, bail};
use clap::Args;
use dialoguer::{Input, Select};

use super::{scan, workspace_root};

#[derive(Args, Debug)]
pub struct InitArgs {}

pub fn run(_args: InitArgs) -> Result<()> {
  let workdir = workspace_root()?;
  let config_path = workdir.join(ALFRED_DIR).join(CONFIG_FILE);
  if config_path.exists() {
    bail!("alfred is already initialized (.alfred/alfred.yaml exists)");
  }

  println!("Initializing alfred...");

  if std::io::stdin().is_terminal() {
    let choice = Select::with_theme(&alfred_theme())
      .with_prompt("Choose initialization method")
      .items(&[
        "Scan directory for existing Dart/Flutter packages (recommended)",
        "Create with sample configuration",
      ])
      .default(0)
      .interact()
      .context("failed to read initialization choice")?;

    if choice == 0 {
      return scan::run(scan::ScanArgs {});
    }
  }

  let main_branch = prompt_main_branch()?;

  fs::create_dir_all(workdir.join(ALFRED_DIR)).context("failed to create .alfred directory")?;
  print_success("Created .alfred directory");

  let sample_config = format!(
    "repos:\n  - name: core\n    path: ./core\n  - name: ui\n    path: ./ui\n  - name: app\n    path: ./app\n\n\
     master: app\nmode: worktree\nmain_branch: {main_branch}\n\n\
     contexts:\n  feature-1:\n    - ui\n    - app\n  feature-2:\n    - ui\n    - app\n    - core\n"
  );
  fs::write(&config_path, sample_config).context("failed to create alfred.yaml")?;
  print_success("Created .alfred/alfred.yaml");

  update_gitignore(&workdir);

  println!();
  print_success("Alfred initialized with sample configuration");
  print_success(&format!("Main branch: {main_branch}"));
  println!("Edit .alfred/alfred.yaml to configure your repositories and contexts.");
  Ok(())
}

/// Ask for the mainline branch name, defaulting to `main` without a TTY.
pub(crate) fn prompt_main_branch() -> Result<String> {
  if !std::io::stdin().is_terminal() {
    return Ok("main".to_string());
  }

  Input::with_theme(&alfred_theme())
    .with_prompt("Main branch name (used by 'alfred switch main')")
    .default("main".to_string())
    .interact_text()
    .context("failed to read main branch name")
}

/// Best-effort `.gitignore` update with a manual fallback hint.
pub(crate) fn update_gitignore(workdir: &std::path::Path) {
  match ensure_workspace_gitignore(workdir) {
    Ok(()) => print_success("Updated .gitignore to ignore .alfred directory"),
    Err(err) => {
      print_warning(&format!("failed to update .gitignore: {err:#}"));
      println!("Please manually add '.alfred/' to your .gitignore file");
    }
  }
}
