//! # List Command

use alfred_core::format_context_name;
use anyhow::Result;
use clap::Args;

use super::load_manager;

#[derive(Args, Debug)]
pub struct ListArgs {}

pub fn run(_args: ListArgs) -> Result<()> {
  let manager = load_manager()?;
  let contexts = manager.list_contexts();
  let current = manager.current_context().unwrap_or_default();

  println!("Available contexts:");
  for context in contexts {
    let marker = if context == current { "●" } else { " " };
    let annotation = if context == "main" {
      " - main/master branches for all repos"
    } else {
      ""
    };
    if context == current {
      println!("{marker} {} (current){annotation}", format_context_name(&context));
    } else {
      println!("{marker} {context}{annotation}");
    }
  }

  Ok(())
}
