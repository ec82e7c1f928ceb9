//! # Create Command

use std::io::IsTerminal;

use alfred_core::{alfred_theme, is_reserved_context, print_success};
use anyhow::{Context, Result, bail};
use clap::Args;
use dialoguer::{Input, MultiSelect};

use super::load_manager;

#[derive(Args, Debug)]
pub struct CreateArgs {
  /// Context name; prompted for when omitted
  pub name: Option<String>,

  /// Repositories for the context (alias or name), comma separated
  #[arg(short, long, value_delimiter = ',')]
  pub repos: Vec<String>,
}

pub fn run(args: CreateArgs) -> Result<()> {
  let mut manager = load_manager()?;

  if manager.config().repos.is_empty() {
    bail!("no repositories configured in alfred.yaml");
  }

  let name = match args.name {
    Some(name) => name,
    None => prompt_name()?,
  };

  if is_reserved_context(&name) {
    bail!("cannot create context with reserved name '{name}' - this is a built-in context");
  }
  if manager.config().context_exists(&name) {
    bail!("context '{name}' already exists");
  }

  let repos = if args.repos.is_empty() {
    prompt_repos(&manager, &name)?
  } else {
    args.repos
  };

  manager
    .config_mut()
    .add_context(&name, repos.clone())
    .context("failed to add context")?;
  manager.config_mut().save().context("failed to save config")?;

  print_success(&format!("Created context '{name}' with repositories: {}", repos.join(", ")));
  Ok(())
}

fn prompt_name() -> Result<String> {
  if !std::io::stdin().is_terminal() {
    bail!("no context name given. Usage: alfred create <name> --repos <a,b>");
  }

  let name: String = Input::with_theme(&alfred_theme())
    .with_prompt("Context name")
    .interact_text()
    .context("failed to read context name")?;

  let trimmed = name.trim().to_string();
  if trimmed.is_empty() {
    bail!("context name cannot be empty");
  }
  Ok(trimmed)
}

fn prompt_repos(manager: &alfred_core::ContextManager, name: &str) -> Result<Vec<String>> {
  if !std::io::stdin().is_terminal() {
    bail!("no repositories given. Usage: alfred create {name} --repos <a,b>");
  }

  let identifiers: Vec<String> = manager
    .config()
    .repo_identifiers()
    .into_iter()
    .map(String::from)
    .collect();

  let selection = MultiSelect::with_theme(&alfred_theme())
    .with_prompt(format!("Select repositories for context '{name}'"))
    .items(&identifiers)
    .interact()
    .context("failed to select repositories")?;

  if selection.is_empty() {
    bail!("no repositories selected");
  }

  Ok(selection.into_iter().map(|index| identifiers[index].clone()).collect())
}
