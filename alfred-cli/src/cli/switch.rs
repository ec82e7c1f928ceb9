//! # Switch Command
//!
//! The entry point of the core state transition: resolves (or offers to
//! create) the target context and hands it to the context manager.

use std::io::IsTerminal;

use alfred_core::{
  SwitchCancelled, SwitchReport, alfred_theme, format_command, format_context_name, is_reserved_context, print_info,
  print_success, print_warning,
};
use anyhow::{Context, Result, bail};
use clap::Args;
use dialoguer::{Confirm, MultiSelect, Select};

use super::load_manager;

#[derive(Args, Debug)]
pub struct SwitchArgs {
  /// Context name to switch to
  pub context: Option<String>,
}

pub fn run(args: SwitchArgs) -> Result<()> {
  let mut manager = load_manager()?;

  let target = match args.context {
    Some(context) => {
      if !is_reserved_context(&context) && !manager.config().context_exists(&context) {
        if !offer_context_creation(&mut manager, &context)? {
          return Ok(());
        }
      }
      context
    }
    None => match select_context(&manager)? {
      Some(context) => context,
      None => return Ok(()),
    },
  };

  match manager.switch_context(&target) {
    Ok(report) => {
      report_switch(&report);
      Ok(())
    }
    Err(err) if err.downcast_ref::<SwitchCancelled>().is_some() => {
      print_info("Switch cancelled.");
      Ok(())
    }
    Err(err) => Err(err).context("failed to switch context"),
  }
}

fn report_switch(report: &SwitchReport) {
  if report.context == "main" {
    print_success("Switched to main context - all repositories on main/master branches");
  } else {
    print_success(&format!("Switched to context '{}'", report.context));
  }
  if !report.conflicts.is_empty() {
    print_warning(&format!(
      "Stash restore hit conflicts in: {}. Review those working trees before continuing.",
      report.conflicts.join(", ")
    ));
  }
}

/// The target context does not exist; offer to create it on the spot.
fn offer_context_creation(manager: &mut alfred_core::ContextManager, context: &str) -> Result<bool> {
  if !std::io::stdin().is_terminal() {
    bail!("context '{context}' not found. Use 'alfred create' to create it");
  }

  println!("Context '{}' not found.", format_context_name(context));
  let create = Confirm::with_theme(&alfred_theme())
    .with_prompt("Would you like to create it?")
    .default(false)
    .interact()
    .context("failed to read creation choice")?;

  if !create {
    print_available_contexts(manager);
    return Ok(false);
  }

  let identifiers: Vec<String> = manager
    .config()
    .repo_identifiers()
    .into_iter()
    .map(String::from)
    .collect();
  if identifiers.is_empty() {
    bail!("no repositories configured in alfred.yaml");
  }

  let selection = MultiSelect::with_theme(&alfred_theme())
    .with_prompt(format!("Select repositories for context '{context}'"))
    .items(&identifiers)
    .interact()
    .context("failed to select repositories")?;
  if selection.is_empty() {
    bail!("no repositories selected");
  }

  let selected: Vec<String> = selection.into_iter().map(|index| identifiers[index].clone()).collect();
  manager.config_mut().add_context(context, selected)?;
  manager.config_mut().save()?;
  print_success(&format!("Created context '{context}'"));
  Ok(true)
}

/// No argument given: pick a context interactively, or print the list
/// when no TTY is available.
fn select_context(manager: &alfred_core::ContextManager) -> Result<Option<String>> {
  let contexts = manager.list_contexts();
  let current = manager.current_context().unwrap_or_default();

  if !std::io::stdin().is_terminal() {
    print_available_contexts(manager);
    println!("\nUsage: {}", format_command("alfred switch <context-name>"));
    return Ok(None);
  }

  let items: Vec<String> = contexts
    .iter()
    .map(|context| {
      if *context == current {
        format!("{context} (current)")
      } else {
        context.clone()
      }
    })
    .collect();

  let selection = Select::with_theme(&alfred_theme())
    .with_prompt("Select a context")
    .items(&items)
    .default(0)
    .interact()
    .context("failed to select context")?;

  Ok(Some(contexts[selection].clone()))
}

fn print_available_contexts(manager: &alfred_core::ContextManager) {
  let current = manager.current_context().unwrap_or_default();
  println!("Available contexts:");
  for context in manager.list_contexts() {
    if context == current {
      println!("● {context} (current)");
    } else {
      println!("  {context}");
    }
  }
}
