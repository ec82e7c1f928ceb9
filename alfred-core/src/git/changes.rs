//! File-level change tracking for the commit flow: porcelain status
//! parsing, per-file diffs, and staging operations.

use anyhow::{Context, Result, bail};

use super::{GitRepo, best_error_line};

/// A changed file in a git repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
  /// Path relative to the repository root.
  pub path: String,
  /// Two-character-derived status code (`M`, `A`, `D`, `??`, ...).
  pub status: String,
  /// Whether the change is staged.
  pub staged: bool,
}

impl GitRepo {
  /// All changed files, staged and unstaged, from `status --porcelain`.
  pub fn file_changes(&self) -> Result<Vec<FileChange>> {
    let stdout = self
      .run_checked(&["status", "--porcelain"])
      .context("failed to get git status")?;
    Ok(parse_status_porcelain(&stdout))
  }

  /// The diff for one file, staged or unstaged.
  pub fn file_diff(&self, path: &str, staged: bool) -> Result<String> {
    let diff = if staged {
      self.run_checked(&["diff", "--cached", "--", path])
    } else {
      self.run_checked(&["diff", "--", path])
    };
    diff.context("failed to get diff")
  }

  pub fn stage(&self, path: &str) -> Result<()> {
    self
      .run_checked(&["add", path])
      .with_context(|| format!("failed to stage '{path}'"))?;
    Ok(())
  }

  pub fn unstage(&self, path: &str) -> Result<()> {
    self
      .run_checked(&["reset", "HEAD", path])
      .with_context(|| format!("failed to unstage '{path}'"))?;
    Ok(())
  }

  /// Commit staged changes. An empty message is rejected before git runs.
  pub fn commit(&self, message: &str) -> Result<()> {
    if message.trim().is_empty() {
      bail!("commit message cannot be empty");
    }
    self
      .run_checked(&["commit", "-m", message])
      .context("failed to commit changes")?;
    Ok(())
  }

  /// Whether anything is staged. `diff --cached --quiet` exits 1 when the
  /// index differs from HEAD.
  pub fn has_staged_changes(&self) -> Result<bool> {
    let output = self.run(&["diff", "--cached", "--quiet"])?;
    if output.status.success() {
      return Ok(false);
    }
    if output.status.code() == Some(1) {
      return Ok(true);
    }
    bail!(
      "failed to check staged changes: {}",
      best_error_line(&String::from_utf8_lossy(&output.stderr))
    );
  }
}

/// Parse `git status --porcelain` output.
///
/// Each line is `XY path` where X is the staged column and Y the unstaged
/// column; untracked files are `??` and renames carry `old -> new` (the
/// new name is kept). One record is emitted per line, `staged` true iff
/// the staged column holds a non-space, non-`?` letter.
pub fn parse_status_porcelain(raw: &str) -> Vec<FileChange> {
  let mut changes = Vec::new();

  for line in raw.lines() {
    if line.len() < 3 {
      continue;
    }

    let staged_status = &line[0..1];
    let unstaged_status = &line[1..2];
    let mut path = line[2..].trim().to_string();

    if let Some((_, new_name)) = path.split_once(" -> ") {
      path = new_name.to_string();
    }

    let (status, staged) = if staged_status == "?" && unstaged_status == "?" {
      ("??".to_string(), false)
    } else if staged_status != " " && staged_status != "?" {
      (staged_status.to_string(), true)
    } else if unstaged_status != " " {
      (unstaged_status.to_string(), false)
    } else {
      continue;
    };

    changes.push(FileChange { path, status, staged });
  }

  changes
}

/// Human-readable description of a porcelain status code.
pub fn status_description(status: &str) -> &'static str {
  match status {
    "M" => "Modified",
    "A" => "Added",
    "D" => "Deleted",
    "R" => "Renamed",
    "C" => "Copied",
    "U" => "Unmerged",
    _ => "New",
  }
}
