//! # Status Command

use alfred_core::{format_command, format_context_name, format_repo_name, print_header};
use anyhow::{Context, Result};
use clap::Args;

use super::load_manager;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub fn run(_args: StatusArgs) -> Result<()> {
  let manager = load_manager()?;
  let (current, statuses) = manager.context_status().context("failed to get context status")?;

  print_header("Alfred Project Status");

  if current.is_empty() {
    println!("No context is currently active.");
    println!("Use {} to activate a context.", format_command("alfred switch"));
    return Ok(());
  }

  println!("Current context: {}", format_context_name(&current));
  println!();

  if statuses.is_empty() {
    println!("No repositories in current context.");
    return Ok(());
  }

  println!("Repository status:");
  for (repo, status) in statuses {
    println!("  {}: {status}", format_repo_name(&repo));
  }

  Ok(())
}
