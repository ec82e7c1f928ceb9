//! # Prompts
//!
//! A custom dialoguer theme for consistent styling across alfred's
//! interactive prompts, plus the confirmation seam used before the master
//! repository is stashed on a main switch.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use console::Style;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use tracing::info;

/// Returns a custom dialoguer theme matching alfred's color palette.
pub fn alfred_theme() -> ColorfulTheme {
  ColorfulTheme {
    prompt_style: Style::new().cyan().bold(),
    active_item_prefix: Style::new().green().apply_to("❯ ".to_string()),
    active_item_style: Style::new().green(),
    ..ColorfulTheme::default()
  }
}

/// Confirmation gate queried before uncommitted master-repository changes
/// are stashed on a switch back to the main context.
///
/// Implementations may block on user interaction; the switch is aborted
/// when the gate answers `false`.
pub trait StashGate {
  fn confirm_stash(&self, current_context: &str, repo_identifier: &str) -> Result<bool>;
}

/// Interactive gate backed by a dialoguer confirm prompt. Without a TTY
/// the gate auto-confirms so scripted invocations never hang.
pub struct InteractiveStashGate;

impl StashGate for InteractiveStashGate {
  fn confirm_stash(&self, current_context: &str, repo_identifier: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
      info!("no TTY available for stash confirmation, auto-stashing changes in {repo_identifier}");
      return Ok(true);
    }

    Confirm::with_theme(&alfred_theme())
      .with_prompt(format!(
        "Stash uncommitted changes in {repo_identifier} under context '{current_context}' and switch to main?"
      ))
      .default(true)
      .interact()
      .context("stash confirmation failed")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interactive_gate_auto_confirms_without_tty() {
    // Test harnesses have no TTY on stdin, so the gate must short-circuit
    // instead of blocking.
    let gate = InteractiveStashGate;
    assert!(gate.confirm_stash("feature-x", "app").unwrap());
  }
}
