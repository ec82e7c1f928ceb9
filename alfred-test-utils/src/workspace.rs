//! Multi-repo workspace fixtures: sibling repositories with pubspecs,
//! git-URL cross-dependencies, and a written alfred configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use crate::git::{create_commit, init_repo};

/// A temporary workspace of three repositories — `core` (package
/// `core_models`), `ui` (package `ui_kit`), and `app` (the master) — each
/// a git clone with one commit on `main` containing its `pubspec.yaml`.
pub struct WorkspaceFixture {
  temp_dir: TempDir,
}

/// Render a pubspec with git-shape dependencies on the named packages.
pub fn pubspec_with_git_deps(package: &str, deps: &[&str]) -> String {
  let mut content = format!(
    "name: {package}\nversion: 1.0.0\n\nenvironment:\n  sdk: \">=3.0.0 <4.0.0\"\n\ndependencies:\n"
  );
  for dep in deps {
    content.push_str(&format!(
      "  {dep}:\n    git:\n      url: https://github.com/acme/{dep}.git\n      ref: main\n"
    ));
  }
  content
}

impl WorkspaceFixture {
  /// Build the standard three-repo workspace. `mode` is `worktree` or
  /// `branch`; `contexts` maps context names to repo identifiers.
  pub fn new(mode: &str, contexts: &[(&str, &[&str])]) -> Result<Self> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    let packages: &[(&str, &str, &[&str])] = &[
      ("core", "core_models", &[]),
      ("ui", "ui_kit", &["app", "core_models"]),
      ("app", "app", &["ui_kit", "core_models"]),
    ];

    for (dir, package, deps) in packages {
      let repo = init_repo(&root.join(dir))?;
      let pubspec = pubspec_with_git_deps(package, deps);
      create_commit(&repo, "pubspec.yaml", &pubspec, "add pubspec")?;
      create_commit(&repo, "README.md", &format!("# {package}\n"), "add readme")?;
    }

    let mut config = String::from(
      "repos:\n  - name: core_models\n    path: ./core\n  - name: ui_kit\n    path: ./ui\n  - name: app\n    path: ./app\n",
    );
    config.push_str(&format!("\nmaster: app\nmode: {mode}\nmain_branch: main\n"));
    if contexts.is_empty() {
      config.push_str("\ncontexts: {}\n");
    } else {
      config.push_str("\ncontexts:\n");
      for (name, repos) in contexts {
        config.push_str(&format!("  {name}:\n"));
        for repo in *repos {
          config.push_str(&format!("    - {repo}\n"));
        }
      }
    }

    fs::create_dir_all(root.join(".alfred"))?;
    fs::write(root.join(".alfred").join("alfred.yaml"), config)?;

    Ok(Self { temp_dir })
  }

  /// The workspace root.
  pub fn path(&self) -> &Path {
    self.temp_dir.path()
  }

  /// Path of a directory under the workspace root.
  pub fn dir(&self, name: &str) -> PathBuf {
    self.temp_dir.path().join(name)
  }

  /// Read the pubspec of a directory under the workspace root.
  pub fn read_pubspec(&self, dir: &str) -> String {
    fs::read_to_string(self.dir(dir).join("pubspec.yaml")).expect("Failed to read pubspec.yaml")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_three_repos_with_config() {
    let fixture = WorkspaceFixture::new("worktree", &[("feature-x", &["ui_kit", "app"])]).unwrap();

    for dir in ["core", "ui", "app"] {
      assert!(fixture.dir(dir).join(".git").exists());
      assert!(fixture.dir(dir).join("pubspec.yaml").exists());
    }

    let config = fs::read_to_string(fixture.path().join(".alfred/alfred.yaml")).unwrap();
    assert!(config.contains("master: app"));
    assert!(config.contains("mode: worktree"));
    assert!(config.contains("feature-x:"));

    let app_pubspec = fixture.read_pubspec("app");
    assert!(app_pubspec.contains("name: app"));
    assert!(app_pubspec.contains("url: https://github.com/acme/ui_kit.git"));
  }

  #[test]
  fn pubspec_rendering_matches_git_shape() {
    let content = pubspec_with_git_deps("app", &["ui_kit"]);
    assert!(content.contains("  ui_kit:\n    git:\n      url: https://github.com/acme/ui_kit.git\n      ref: main\n"));
  }
}
