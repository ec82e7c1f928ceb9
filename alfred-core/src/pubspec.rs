//! # Pubspec Editing
//!
//! Reversible, formatting-preserving edits on a repository's
//! `pubspec.yaml`. All edits are pattern-anchored against the declaration
//! of a named top-level dependency and operate on the raw text, so
//! comments, indentation quirks, and unrelated keys survive round trips.
//!
//! The switched form of a dependency is "commented-git-over-path": a
//! `path:` block followed by the original `git:` block with every line
//! commented out. The commented copy is what makes the rewrite reversible
//! without any external metadata.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;

/// File name of the manifest within each repository.
pub const PUBSPEC_FILE: &str = "pubspec.yaml";

/// A git dependency extracted from a pubspec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitDependency {
  pub url: String,
  /// Empty when the dependency has no `ref:` line.
  pub reference: String,
}

/// One `pubspec.yaml`, held in memory as exact bytes.
pub struct Pubspec {
  content: String,
  path: PathBuf,
}

/// Path of the manifest inside a repository directory.
pub fn manifest_path<P: AsRef<Path>>(repo_path: P) -> PathBuf {
  repo_path.as_ref().join(PUBSPEC_FILE)
}

/// Read the `name:` key out of a pubspec file without loading the editor.
pub fn extract_package_name_from_file<P: AsRef<Path>>(path: P) -> Result<String> {
  let content = fs::read_to_string(path.as_ref())
    .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
  package_name_from_content(&content)
}

fn package_name_from_content(content: &str) -> Result<String> {
  let pattern = Regex::new(r"(?m)^name:[ \t]*(.+)$").expect("static pattern");
  let captures = pattern
    .captures(content)
    .context("pubspec.yaml has no top-level 'name' key")?;
  let raw = captures[1].trim();
  Ok(raw.trim_matches(|c| c == '"' || c == '\'').to_string())
}

impl Pubspec {
  /// Load the pubspec of the given repository directory.
  pub fn load<P: AsRef<Path>>(repo_path: P) -> Result<Self> {
    let path = manifest_path(repo_path);
    let content = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Self { content, path })
  }

  #[cfg(test)]
  fn from_content(content: &str, path: PathBuf) -> Self {
    Self {
      content: content.to_string(),
      path,
    }
  }

  /// The current in-memory text.
  pub fn content(&self) -> &str {
    &self.content
  }

  /// Persist the in-memory text to disk.
  pub fn save(&self) -> Result<()> {
    fs::write(&self.path, &self.content).with_context(|| format!("failed to write {}", self.path.display()))?;
    Ok(())
  }

  /// Copy the on-disk bytes to `<pubspec>.backup`, preserving the state
  /// before any edits of this run.
  pub fn backup(&self) -> Result<()> {
    let backup_path = self.backup_path();
    let data = fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))?;
    fs::write(&backup_path, data).with_context(|| format!("failed to write {}", backup_path.display()))?;
    Ok(())
  }

  fn backup_path(&self) -> PathBuf {
    let mut name = self.path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
  }

  /// The package name declared by the top-level `name:` key.
  pub fn package_name(&self) -> Result<String> {
    package_name_from_content(&self.content)
  }

  /// All git-shape dependencies, keyed by dependency name.
  pub fn git_dependencies(&self) -> HashMap<String, GitDependency> {
    let pattern = Regex::new(
      r"(?m)^[ \t]*(\w+):[ \t]*\n[ \t]+git:[ \t]*\n[ \t]+url:[ \t]*(.+)\n(?:[ \t]+ref:[ \t]*(.+)\n)?",
    )
    .expect("static pattern");

    let mut dependencies = HashMap::new();
    for captures in pattern.captures_iter(&self.content) {
      let name = captures[1].to_string();
      let url = captures[2].trim().to_string();
      let reference = captures.get(3).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
      dependencies.insert(name, GitDependency { url, reference });
    }
    dependencies
  }

  fn git_block_pattern(dep_name: &str) -> Regex {
    let escaped = regex::escape(dep_name);
    Regex::new(&format!(
      r"(?m)^([ \t]*){escaped}:[ \t]*\n([ \t]+)git:[ \t]*\n[ \t]+url:.*\n(?:[ \t]+ref:.*\n)?"
    ))
    .expect("valid dependency pattern")
  }

  fn path_block_pattern(dep_name: &str) -> Regex {
    let escaped = regex::escape(dep_name);
    Regex::new(&format!(r"(?m)^([ \t]*){escaped}:[ \t]*\n([ \t]+)path:[ \t]*(.+)\n")).expect("valid dependency pattern")
  }

  /// Replace a git-shape dependency with a path dependency.
  ///
  /// Fails when the dependency is not currently in git shape; the text is
  /// left untouched in that case.
  pub fn convert_git_to_path(&mut self, dep_name: &str, local_path: &str) -> Result<()> {
    let pattern = Self::git_block_pattern(dep_name);
    if !pattern.is_match(&self.content) {
      bail!("dependency '{dep_name}' is not a git dependency");
    }

    self.content = pattern
      .replace_all(&self.content, |captures: &regex::Captures| {
        format!("{}{dep_name}:\n{}path: {local_path}\n", &captures[1], &captures[2])
      })
      .into_owned();
    Ok(())
  }

  /// Rewrite a git-shape dependency into the switched form: a path block
  /// followed by a line-by-line commented copy of the original git block.
  pub fn comment_git_and_add_path(&mut self, dep_name: &str, local_path: &str) -> Result<()> {
    let pattern = Self::git_block_pattern(dep_name);
    if !pattern.is_match(&self.content) {
      bail!("dependency '{dep_name}' is not a git dependency");
    }

    self.content = pattern
      .replace_all(&self.content, |captures: &regex::Captures| {
        let indent = &captures[1];
        let value_indent = &captures[2];
        let mut replacement = format!("{indent}{dep_name}:\n{value_indent}path: {local_path}\n");
        for line in captures[0].lines() {
          let rest = line.strip_prefix(indent).unwrap_or(line);
          replacement.push_str(indent);
          replacement.push_str("# ");
          replacement.push_str(rest);
          replacement.push('\n');
        }
        replacement
      })
      .into_owned();
    Ok(())
  }

  /// Reverse [`Self::comment_git_and_add_path`]: drop the path block and
  /// restore the git block from its commented copy, byte for byte.
  pub fn uncomment_git_and_remove_path(&mut self, dep_name: &str) -> Result<()> {
    let escaped = regex::escape(dep_name);
    let head = Regex::new(&format!(r"(?m)^([ \t]*){escaped}:[ \t]*\n[ \t]+path:[ \t]*.+\n")).expect("valid pattern");

    let Some(captures) = head.captures(&self.content) else {
      bail!("dependency '{dep_name}' is not in commented-git-over-path form");
    };
    let whole = captures.get(0).expect("match");
    let indent = captures[1].to_string();
    let comment_prefix = format!("{indent}# ");

    // Walk the commented copy line by line; it starts at the end of the
    // path block and every line carries the block's indent plus "# ".
    let tail = &self.content[whole.end()..];
    let mut restored = String::new();
    let mut consumed = 0usize;
    for line in tail.split_inclusive('\n') {
      let Some(rest) = line.strip_prefix(&comment_prefix) else {
        break;
      };
      restored.push_str(&indent);
      restored.push_str(rest);
      consumed += line.len();
    }

    if consumed == 0 || !restored.trim_start().starts_with(&format!("{dep_name}:")) {
      bail!("dependency '{dep_name}' is not in commented-git-over-path form");
    }

    let mut content = String::with_capacity(self.content.len());
    content.push_str(&self.content[..whole.start()]);
    content.push_str(&restored);
    content.push_str(&self.content[whole.end() + consumed..]);
    self.content = content;
    Ok(())
  }

  /// Replace only the `path:` value of an existing path dependency.
  pub fn update_path_dependency(&mut self, dep_name: &str, new_path: &str) -> Result<()> {
    let pattern = Self::path_block_pattern(dep_name);
    if !pattern.is_match(&self.content) {
      bail!("dependency '{dep_name}' is not a path dependency");
    }

    self.content = pattern
      .replace_all(&self.content, |captures: &regex::Captures| {
        format!("{}{dep_name}:\n{}path: {new_path}\n", &captures[1], &captures[2])
      })
      .into_owned();
    Ok(())
  }

  /// Replace a path dependency with a git dependency. The `ref:` line is
  /// written only when a reference is known.
  pub fn convert_path_to_git(&mut self, dep_name: &str, git_url: &str, git_ref: &str) -> Result<()> {
    let pattern = Self::path_block_pattern(dep_name);
    if !pattern.is_match(&self.content) {
      bail!("dependency '{dep_name}' is not a path dependency");
    }

    self.content = pattern
      .replace_all(&self.content, |captures: &regex::Captures| {
        let indent = &captures[1];
        let value_indent = &captures[2];
        let mut replacement = format!("{indent}{dep_name}:\n{value_indent}git:\n{value_indent}  url: {git_url}\n");
        if !git_ref.is_empty() {
          replacement.push_str(&format!("{value_indent}  ref: {git_ref}\n"));
        }
        replacement
      })
      .into_owned();
    Ok(())
  }

  /// Restore a path dependency to git shape using the entry recorded in
  /// the `<pubspec>.backup` file.
  pub fn convert_path_to_git_from_backup(&mut self, dep_name: &str) -> Result<()> {
    let backup_path = self.backup_path();
    if !backup_path.exists() {
      bail!("no backup found for '{}'", self.path.display());
    }

    let backup_content =
      fs::read_to_string(&backup_path).with_context(|| format!("failed to read {}", backup_path.display()))?;
    let backup = Pubspec {
      content: backup_content,
      path: backup_path,
    };

    let dependencies = backup.git_dependencies();
    let Some(dependency) = dependencies.get(dep_name) else {
      bail!("could not find git dependency info for '{dep_name}' in backup");
    };

    self.convert_path_to_git(dep_name, &dependency.url, &dependency.reference)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "\
name: app
description: The application shell.

environment:
  sdk: \">=3.0.0 <4.0.0\"

dependencies:
  flutter:
    sdk: flutter
  ui_kit:
    git:
      url: https://github.com/acme/ui_kit.git
      ref: v1.2.0
  core_models:
    git:
      url: https://github.com/acme/core_models.git
  http: ^1.2.0

dev_dependencies:
  flutter_test:
    sdk: flutter
";

  fn pubspec(content: &str) -> Pubspec {
    Pubspec::from_content(content, PathBuf::from("/tmp/pubspec.yaml"))
  }

  #[test]
  fn extracts_package_name() {
    assert_eq!(pubspec(SAMPLE).package_name().unwrap(), "app");
    assert_eq!(pubspec("name: \"quoted_pkg\"\n").package_name().unwrap(), "quoted_pkg");
    assert!(pubspec("description: nothing here\n").package_name().is_err());
  }

  #[test]
  fn scans_git_dependencies() {
    let deps = pubspec(SAMPLE).git_dependencies();
    assert_eq!(deps.len(), 2);
    assert_eq!(deps["ui_kit"].url, "https://github.com/acme/ui_kit.git");
    assert_eq!(deps["ui_kit"].reference, "v1.2.0");
    assert_eq!(deps["core_models"].url, "https://github.com/acme/core_models.git");
    assert_eq!(deps["core_models"].reference, "");
  }

  #[test]
  fn convert_git_to_path_replaces_block() {
    let mut pubspec = pubspec(SAMPLE);
    pubspec.convert_git_to_path("ui_kit", "../ui_kit-feature").unwrap();

    assert!(pubspec.content().contains("  ui_kit:\n    path: ../ui_kit-feature\n"));
    assert!(!pubspec.content().contains("url: https://github.com/acme/ui_kit.git"));
    // The other dependency is untouched
    assert!(pubspec.content().contains("url: https://github.com/acme/core_models.git"));
  }

  #[test]
  fn comment_then_uncomment_is_byte_identical() {
    let mut pubspec = pubspec(SAMPLE);
    pubspec.comment_git_and_add_path("ui_kit", "../ui_kit-feature").unwrap();

    assert!(pubspec.content().contains("  ui_kit:\n    path: ../ui_kit-feature\n"));
    assert!(pubspec.content().contains("  # ui_kit:\n"));
    assert!(pubspec.content().contains("  #   git:\n"));
    assert!(pubspec.content().contains("  #     url: https://github.com/acme/ui_kit.git\n"));
    assert!(pubspec.content().contains("  #     ref: v1.2.0\n"));

    pubspec.uncomment_git_and_remove_path("ui_kit").unwrap();
    assert_eq!(pubspec.content(), SAMPLE);
  }

  #[test]
  fn round_trip_without_ref_line() {
    let mut pubspec = pubspec(SAMPLE);
    pubspec.comment_git_and_add_path("core_models", "../core_models-x").unwrap();
    pubspec.uncomment_git_and_remove_path("core_models").unwrap();
    assert_eq!(pubspec.content(), SAMPLE);
  }

  #[test]
  fn comment_twice_errors_and_leaves_bytes_alone() {
    let mut pubspec = pubspec(SAMPLE);
    pubspec.comment_git_and_add_path("ui_kit", "../ui_kit-feature").unwrap();
    let switched = pubspec.content().to_string();

    let err = pubspec.comment_git_and_add_path("ui_kit", "../elsewhere").unwrap_err();
    assert!(err.to_string().contains("not a git dependency"));
    assert_eq!(pubspec.content(), switched);
  }

  #[test]
  fn uncomment_requires_switched_form() {
    let mut pubspec = pubspec(SAMPLE);
    let err = pubspec.uncomment_git_and_remove_path("ui_kit").unwrap_err();
    assert!(err.to_string().contains("commented-git-over-path"));
    assert_eq!(pubspec.content(), SAMPLE);
  }

  #[test]
  fn update_path_dependency_touches_only_the_path() {
    let mut pubspec = pubspec(SAMPLE);
    pubspec.comment_git_and_add_path("ui_kit", "../ui_kit-a").unwrap();
    pubspec.update_path_dependency("ui_kit", "../ui_kit-b").unwrap();

    assert!(pubspec.content().contains("  ui_kit:\n    path: ../ui_kit-b\n"));
    // The commented copy is still intact, so the rewrite stays reversible
    pubspec.uncomment_git_and_remove_path("ui_kit").unwrap();
    assert_eq!(pubspec.content(), SAMPLE);
  }

  #[test]
  fn update_path_requires_path_shape() {
    let mut pubspec = pubspec(SAMPLE);
    let err = pubspec.update_path_dependency("ui_kit", "../x").unwrap_err();
    assert!(err.to_string().contains("not a path dependency"));
  }

  #[test]
  fn version_dependencies_are_never_matched() {
    let mut pubspec = pubspec(SAMPLE);
    assert!(pubspec.convert_git_to_path("http", "../http").is_err());
    assert!(pubspec.update_path_dependency("http", "../http").is_err());
    assert!(pubspec.comment_git_and_add_path("flutter", "../flutter").is_err());
    assert_eq!(pubspec.content(), SAMPLE);
  }

  #[test]
  fn convert_path_to_git_writes_ref_only_when_present() {
    let mut with_ref = pubspec(SAMPLE);
    with_ref.convert_git_to_path("ui_kit", "../ui_kit-x").unwrap();
    with_ref
      .convert_path_to_git("ui_kit", "https://github.com/acme/ui_kit.git", "v1.2.0")
      .unwrap();
    assert!(with_ref.content().contains("      ref: v1.2.0\n"));

    let mut without_ref = pubspec(SAMPLE);
    without_ref.convert_git_to_path("core_models", "../core_models-x").unwrap();
    without_ref
      .convert_path_to_git("core_models", "https://github.com/acme/core_models.git", "")
      .unwrap();
    assert!(without_ref.content().contains("  core_models:\n    git:\n      url: https://github.com/acme/core_models.git\n"));
    assert!(!without_ref.content().contains("core_models.git\n      ref:"));
  }

  #[test]
  fn backup_and_restore_from_backup() {
    let temp = tempfile::TempDir::new().unwrap();
    fs::write(temp.path().join(PUBSPEC_FILE), SAMPLE).unwrap();

    let mut pubspec = Pubspec::load(temp.path()).unwrap();
    pubspec.backup().unwrap();
    pubspec.convert_git_to_path("ui_kit", "../ui_kit-x").unwrap();
    pubspec.save().unwrap();

    let mut reloaded = Pubspec::load(temp.path()).unwrap();
    reloaded.convert_path_to_git_from_backup("ui_kit").unwrap();
    reloaded.save().unwrap();

    let restored = fs::read_to_string(temp.path().join(PUBSPEC_FILE)).unwrap();
    assert!(restored.contains("      url: https://github.com/acme/ui_kit.git\n"));
    assert!(restored.contains("      ref: v1.2.0\n"));
  }

  #[test]
  fn restore_from_backup_unknown_dependency() {
    let temp = tempfile::TempDir::new().unwrap();
    fs::write(temp.path().join(PUBSPEC_FILE), SAMPLE).unwrap();

    let mut pubspec = Pubspec::load(temp.path()).unwrap();
    pubspec.backup().unwrap();
    let err = pubspec.convert_path_to_git_from_backup("unheard_of").unwrap_err();
    assert!(err.to_string().contains("unheard_of"));
  }

  #[test]
  fn extract_package_name_from_file_reads_disk() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join(PUBSPEC_FILE);
    fs::write(&path, "name: disk_pkg\n").unwrap();
    assert_eq!(extract_package_name_from_file(&path).unwrap(), "disk_pkg");
  }
}
