//! # Scan Command
//!
//! Discovers Dart/Flutter packages in the immediate subdirectories of the
//! workspace, asks which one is the master, and writes the configuration.

use std::fs;
use std::io::IsTerminal;
use std::path::Path;

use alfred_core::{
  ALFRED_DIR, CONFIG_FILE, Config, Repository, alfred_theme, extract_package_name_from_file, format_command,
  print_info, print_success, print_warning,
};
use anyhow::{Context, Result, bail};
use clap::Args;
use dialoguer::{Confirm, Select};

use super::init::{prompt_main_branch, update_gitignore};
use super::workspace_root;

#[derive(Args, Debug)]
pub struct ScanArgs {}

pub fn run(_args: ScanArgs) -> Result<()> {
  let workdir = workspace_root()?;

  if workdir.join(ALFRED_DIR).join(CONFIG_FILE).exists() {
    if !std::io::stdin().is_terminal() {
      print_info("Alfred is already initialized in this directory.");
      return Ok(());
    }
    let overwrite = Confirm::with_theme(&alfred_theme())
      .with_prompt("Alfred is already initialized in this directory. Overwrite the existing configuration?")
      .default(false)
      .interact()
      .context("failed to read overwrite choice")?;
    if !overwrite {
      print_info("Operation canceled.");
      return Ok(());
    }
  }

  let packages = scan_for_packages(&workdir)?;
  if packages.is_empty() {
    bail!("no Dart/Flutter packages found in current directory");
  }

  let master = select_master(&packages)?;
  let main_branch = prompt_main_branch()?;

  let mut config = Config::new(&workdir);
  config.repos = packages;
  config.master = Some(master.clone());
  config.main_branch = main_branch.clone();
  config.save()?;

  update_gitignore(&workdir);

  println!();
  print_success(&format!("Alfred configured successfully with {} repositories", config.repos.len()));
  print_success(&format!("Master repository: {master}"));
  print_success(&format!("Main branch: {main_branch}"));
  println!(
    "You can now use {} to create and switch contexts",
    format_command("alfred switch <context-name>")
  );

  Ok(())
}

/// Immediate subdirectories containing a `pubspec.yaml`, as repository
/// entries named after their package.
fn scan_for_packages(workdir: &Path) -> Result<Vec<Repository>> {
  let mut packages = Vec::new();

  let entries = fs::read_dir(workdir).context("failed to read current directory")?;
  for entry in entries {
    let entry = entry.context("failed to read directory entry")?;
    let file_name = entry.file_name();
    let name = file_name.to_string_lossy();
    if name.starts_with('.') || !entry.path().is_dir() {
      continue;
    }

    let pubspec_path = entry.path().join("pubspec.yaml");
    if !pubspec_path.exists() {
      continue;
    }

    match extract_package_name_from_file(&pubspec_path) {
      Ok(package_name) => packages.push(Repository {
        name: package_name,
        alias: None,
        path: format!("./{name}"),
      }),
      Err(err) => print_warning(&format!("Could not read package name from {}: {err:#}", pubspec_path.display())),
    }
  }

  packages.sort_by(|a, b| a.path.cmp(&b.path));
  Ok(packages)
}

/// Pick the master repository. Without a TTY the first package is used so
/// scripted setups still produce a usable configuration.
fn select_master(packages: &[Repository]) -> Result<String> {
  if !std::io::stdin().is_terminal() {
    let fallback = packages[0].identifier().to_string();
    print_info(&format!("No TTY available, using '{fallback}' as the master repository"));
    return Ok(fallback);
  }

  let items: Vec<String> = packages
    .iter()
    .map(|repo| format!("{} ({})", repo.identifier(), repo.path))
    .collect();

  let selection = Select::with_theme(&alfred_theme())
    .with_prompt("Select the master repository (it keeps its directory on every switch)")
    .items(&items)
    .default(0)
    .interact()
    .context("failed to select master repository")?;

  Ok(packages[selection].identifier().to_string())
}
