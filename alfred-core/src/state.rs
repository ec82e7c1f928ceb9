//! # Persisted Workspace State
//!
//! The current-context pointer lives in a single file under the hidden
//! `.alfred/` directory at the workspace root. The initializer also keeps
//! the workspace `.gitignore` aware of that directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::ALFRED_DIR;

/// Pointer file name inside `.alfred/`.
pub const CURRENT_CONTEXT_FILE: &str = "current-context";

const GITIGNORE_ENTRY: &str = ".alfred/";
const GITIGNORE_BLOCK: &str = "# Alfred CLI state and configuration\n.alfred/\n";

fn current_context_path(workdir: &Path) -> PathBuf {
  workdir.join(ALFRED_DIR).join(CURRENT_CONTEXT_FILE)
}

/// Read the active context name. An absent file means no context is
/// active and reads as the empty string.
pub fn current_context(workdir: &Path) -> Result<String> {
  let path = current_context_path(workdir);
  if !path.exists() {
    return Ok(String::new());
  }
  let data = fs::read_to_string(&path).context("failed to read context file")?;
  Ok(data.trim().to_string())
}

/// Persist the active context name, creating `.alfred/` when needed.
pub fn set_current_context(workdir: &Path, context: &str) -> Result<()> {
  let alfred_dir = workdir.join(ALFRED_DIR);
  fs::create_dir_all(&alfred_dir).context("failed to create .alfred directory")?;
  fs::write(current_context_path(workdir), context).context("failed to write context file")?;
  Ok(())
}

/// Ensure the workspace `.gitignore` ignores `.alfred/`.
///
/// Presence of the literal entry anywhere in the file short-circuits the
/// append, so repeated initialization never duplicates the block.
pub fn ensure_workspace_gitignore(workdir: &Path) -> Result<()> {
  let gitignore_path = workdir.join(".gitignore");

  let mut content = if gitignore_path.exists() {
    fs::read_to_string(&gitignore_path).context("failed to read .gitignore")?
  } else {
    String::new()
  };

  if content.contains(GITIGNORE_ENTRY) {
    return Ok(());
  }

  if !content.is_empty() && !content.ends_with('\n') {
    content.push('\n');
  }
  content.push_str(GITIGNORE_BLOCK);

  fs::write(&gitignore_path, content).context("failed to update .gitignore")?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absent_pointer_reads_as_empty() {
    let temp = tempfile::TempDir::new().unwrap();
    assert_eq!(current_context(temp.path()).unwrap(), "");
  }

  #[test]
  fn pointer_round_trip() {
    let temp = tempfile::TempDir::new().unwrap();
    set_current_context(temp.path(), "feature-x").unwrap();
    assert_eq!(current_context(temp.path()).unwrap(), "feature-x");

    set_current_context(temp.path(), "main").unwrap();
    assert_eq!(current_context(temp.path()).unwrap(), "main");
  }

  #[test]
  fn trailing_whitespace_is_trimmed() {
    let temp = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(ALFRED_DIR)).unwrap();
    fs::write(temp.path().join(ALFRED_DIR).join(CURRENT_CONTEXT_FILE), "feature-x\n").unwrap();
    assert_eq!(current_context(temp.path()).unwrap(), "feature-x");
  }

  #[test]
  fn gitignore_created_when_missing() {
    let temp = tempfile::TempDir::new().unwrap();
    ensure_workspace_gitignore(temp.path()).unwrap();

    let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
    assert!(content.contains(".alfred/"));
  }

  #[test]
  fn gitignore_appended_with_newline() {
    let temp = tempfile::TempDir::new().unwrap();
    fs::write(temp.path().join(".gitignore"), "target/").unwrap();
    ensure_workspace_gitignore(temp.path()).unwrap();

    let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
    assert!(content.starts_with("target/\n"));
    assert!(content.contains(".alfred/"));
  }

  #[test]
  fn gitignore_append_is_idempotent() {
    let temp = tempfile::TempDir::new().unwrap();
    ensure_workspace_gitignore(temp.path()).unwrap();
    ensure_workspace_gitignore(temp.path()).unwrap();

    let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
    assert_eq!(content.matches(".alfred/").count(), 1);
  }
}
