//! # Workspace Configuration
//!
//! Loads and saves the workspace descriptor at
//! `<workdir>/.alfred/alfred.yaml`: the repository list, the designated
//! master, the switching mode, the mainline branch name, and the context
//! map. The synthetic `main` context is fabricated on read and never
//! stored in the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Hidden state directory at the workspace root.
pub const ALFRED_DIR: &str = ".alfred";
/// Workspace descriptor file name inside [`ALFRED_DIR`].
pub const CONFIG_FILE: &str = "alfred.yaml";
/// Context names that designate the synthetic mainline context.
pub const RESERVED_CONTEXTS: [&str; 2] = ["main", "master"];
/// Canonical name of the synthetic context.
pub const MAIN_CONTEXT: &str = "main";

/// Whether a context name designates the synthetic mainline context.
pub fn is_reserved_context(name: &str) -> bool {
  RESERVED_CONTEXTS.contains(&name)
}

/// One repository entry of the workspace descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
  /// Package name from the repository's pubspec; the stable identity used
  /// for dependency rewrites.
  pub name: String,
  /// Optional short label. User-facing selection falls back to `name`
  /// when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alias: Option<String>,
  /// Workspace-relative location of the git clone.
  pub path: String,
}

impl Repository {
  /// The alias when set, the package name otherwise.
  pub fn identifier(&self) -> &str {
    self.alias.as_deref().filter(|alias| !alias.is_empty()).unwrap_or(&self.name)
  }
}

/// How a switch moves repositories onto a context branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// Non-master repositories get per-context sibling worktrees.
  #[default]
  Worktree,
  /// Every repository switches branches in place.
  Branch,
}

fn default_main_branch() -> String {
  "main".to_string()
}

/// The workspace descriptor.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub repos: Vec<Repository>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub master: Option<String>,
  #[serde(default)]
  pub mode: Mode,
  #[serde(default = "default_main_branch")]
  pub main_branch: String,
  #[serde(default)]
  pub contexts: BTreeMap<String, Vec<String>>,

  #[serde(skip)]
  workdir: PathBuf,
}

impl Config {
  /// Load the descriptor of the workspace rooted at `workdir`.
  pub fn load<P: AsRef<Path>>(workdir: P) -> Result<Self> {
    let workdir = workdir.as_ref().to_path_buf();
    let config_path = workdir.join(ALFRED_DIR).join(CONFIG_FILE);

    if !config_path.exists() {
      bail!("alfred.yaml not found in .alfred directory. Run 'alfred scan' to initialize");
    }

    let data = fs::read_to_string(&config_path).with_context(|| format!("failed to read {}", config_path.display()))?;
    let mut config: Config =
      serde_yaml::from_str(&data).with_context(|| format!("failed to parse {}", config_path.display()))?;

    if config.main_branch.is_empty() {
      config.main_branch = default_main_branch();
    }
    if config.master.as_deref() == Some("") {
      config.master = None;
    }
    config.workdir = workdir;

    Ok(config)
  }

  /// Create an in-memory descriptor for `workdir` (used by the
  /// initializer before the first save).
  pub fn new<P: AsRef<Path>>(workdir: P) -> Self {
    Self {
      repos: Vec::new(),
      master: None,
      mode: Mode::default(),
      main_branch: default_main_branch(),
      contexts: BTreeMap::new(),
      workdir: workdir.as_ref().to_path_buf(),
    }
  }

  /// Persist the descriptor, creating `.alfred/` when needed.
  pub fn save(&self) -> Result<()> {
    let alfred_dir = self.workdir.join(ALFRED_DIR);
    fs::create_dir_all(&alfred_dir).context("failed to create .alfred directory")?;

    let data = serde_yaml::to_string(self).context("failed to serialize config")?;
    let config_path = alfred_dir.join(CONFIG_FILE);
    fs::write(&config_path, data).with_context(|| format!("failed to write {}", config_path.display()))?;
    Ok(())
  }

  /// The workspace root this descriptor belongs to.
  pub fn workdir(&self) -> &Path {
    &self.workdir
  }

  /// Absolute-ish location of a repository's clone.
  pub fn repo_path(&self, repo: &Repository) -> PathBuf {
    self.workdir.join(repo.path.trim_start_matches("./"))
  }

  /// Resolve a repository by alias-or-name.
  pub fn repo_by_alias(&self, alias: &str) -> Result<&Repository> {
    self
      .repos
      .iter()
      .find(|repo| repo.identifier() == alias)
      .with_context(|| format!("repository '{alias}' not found"))
  }

  /// All context names, the synthetic `main` first.
  pub fn context_names(&self) -> Vec<String> {
    let mut names = vec![MAIN_CONTEXT.to_string()];
    names.extend(self.contexts.keys().cloned());
    names
  }

  /// The repositories participating in a context. The synthetic context
  /// spans every configured repository.
  pub fn context_repos(&self, context: &str) -> Result<Vec<&Repository>> {
    if is_reserved_context(context) {
      return Ok(self.repos.iter().collect());
    }

    let aliases = self
      .contexts
      .get(context)
      .with_context(|| format!("context '{context}' not found"))?;

    aliases.iter().map(|alias| self.repo_by_alias(alias)).collect()
  }

  /// Participants of a context excluding the master repository.
  pub fn non_master_repos_for_context(&self, context: &str) -> Result<Vec<&Repository>> {
    let master = self.master.as_deref();
    Ok(
      self
        .context_repos(context)?
        .into_iter()
        .filter(|repo| Some(repo.identifier()) != master)
        .collect(),
    )
  }

  /// Whether a user-defined context exists. The synthetic context is not
  /// part of the map and reports false.
  pub fn context_exists(&self, context: &str) -> bool {
    self.contexts.contains_key(context)
  }

  /// Add a context after validating that every reference resolves.
  /// Reserved names are rejected before any change.
  pub fn add_context(&mut self, name: &str, repo_aliases: Vec<String>) -> Result<()> {
    if is_reserved_context(name) {
      bail!("cannot create context with reserved name '{name}'");
    }
    for alias in &repo_aliases {
      self
        .repo_by_alias(alias)
        .with_context(|| format!("cannot create context '{name}'"))?;
    }
    self.contexts.insert(name.to_string(), repo_aliases);
    Ok(())
  }

  pub fn remove_context(&mut self, name: &str) -> Result<()> {
    if is_reserved_context(name) {
      bail!("cannot remove built-in context '{name}'");
    }
    if self.contexts.remove(name).is_none() {
      bail!("context '{name}' does not exist");
    }
    Ok(())
  }

  pub fn has_master(&self) -> bool {
    self.master.is_some()
  }

  pub fn master_repo(&self) -> Result<&Repository> {
    let master = self.master.as_deref().context("no master repository configured")?;
    self.repo_by_alias(master)
  }

  /// Whether the master repository participates in a context. The
  /// synthetic context always contains it.
  pub fn context_contains_master(&self, context: &str) -> bool {
    let Some(master) = self.master.as_deref() else {
      return false;
    };
    if is_reserved_context(context) {
      return true;
    }
    self
      .contexts
      .get(context)
      .map(|aliases| aliases.iter().any(|alias| alias == master))
      .unwrap_or(false)
  }

  pub fn is_branch_mode(&self) -> bool {
    self.mode == Mode::Branch
  }

  pub fn is_worktree_mode(&self) -> bool {
    self.mode == Mode::Worktree
  }

  /// Set the mainline branch name and persist the descriptor.
  pub fn set_main_branch(&mut self, branch: &str) -> Result<()> {
    self.main_branch = branch.to_string();
    self.save()
  }

  /// Alias-or-name of every configured repository, in descriptor order.
  pub fn repo_identifiers(&self) -> Vec<&str> {
    self.repos.iter().map(|repo| repo.identifier()).collect()
  }
}
