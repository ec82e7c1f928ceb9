//! # Delete Command

use std::io::IsTerminal;

use alfred_core::{alfred_theme, format_command, print_info, print_success};
use anyhow::{Context, Result};
use clap::Args;
use dialoguer::MultiSelect;

use super::load_manager;

#[derive(Args, Debug)]
pub struct DeleteArgs {
  /// Context names to delete; selected interactively when omitted
  pub contexts: Vec<String>,
}

pub fn run(args: DeleteArgs) -> Result<()> {
  let mut manager = load_manager()?;

  let targets = if args.contexts.is_empty() {
    match select_contexts(&manager)? {
      Some(targets) => targets,
      None => return Ok(()),
    }
  } else {
    args.contexts
  };

  manager
    .delete_contexts(&targets)
    .context("failed to delete contexts")?;

  print_success(&format!("Successfully deleted contexts: {}", targets.join(", ")));
  Ok(())
}

fn select_contexts(manager: &alfred_core::ContextManager) -> Result<Option<Vec<String>>> {
  // The synthetic context is not deletable and is not offered
  let deletable: Vec<String> = manager.config().contexts.keys().cloned().collect();
  if deletable.is_empty() {
    print_info("No contexts available to delete.");
    return Ok(None);
  }

  if !std::io::stdin().is_terminal() {
    println!("Available contexts:");
    for context in &deletable {
      println!("  {context}");
    }
    println!("\nUsage: {}", format_command("alfred delete <context-name> [<context-name>...]"));
    return Ok(None);
  }

  let selection = MultiSelect::with_theme(&alfred_theme())
    .with_prompt("Select contexts to delete")
    .items(&deletable)
    .interact()
    .context("failed to select contexts")?;

  if selection.is_empty() {
    print_info("No contexts selected for deletion.");
    return Ok(None);
  }

  Ok(Some(selection.into_iter().map(|index| deletable[index].clone()).collect()))
}
