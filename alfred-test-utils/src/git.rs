//! Git repository fixtures for testing.
//!
//! Repositories are created through `git2` so tests do not depend on the
//! git binary for setup; the code under test shells out to git itself.

use std::fs;
use std::path::Path;

use anyhow::Result;
use git2::{BranchType, Repository, Signature};
use tempfile::TempDir;

/// A test guard holding a temporary git repository. The repository starts
/// on an unborn `main` branch with a test identity configured.
pub struct GitRepoTestGuard {
  /// The temporary directory containing the git repository
  pub temp_dir: TempDir,
  /// The git repository
  pub repo: Repository,
}

impl GitRepoTestGuard {
  pub fn new() -> Self {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let repo = init_repo(temp_dir.path()).expect("Failed to initialize git repository");
    Self { temp_dir, repo }
  }

  /// Get the path to the git repository
  pub fn path(&self) -> &Path {
    self.temp_dir.path()
  }
}

impl Default for GitRepoTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

/// Initialize a repository at `path` with a test identity, starting on an
/// unborn `main` branch.
pub fn init_repo(path: &Path) -> Result<Repository> {
  fs::create_dir_all(path)?;
  let repo = Repository::init(path)?;

  {
    let mut config = repo.config()?;
    config.set_str("user.name", "Alfred Test User")?;
    config.set_str("user.email", "alfred-test@example.com")?;
  }

  // Pin the default branch name regardless of the host's init.defaultBranch
  repo.set_head("refs/heads/main")?;

  Ok(repo)
}

/// Initialize a repository at `path` and give it one commit on `main`.
pub fn init_repo_with_commit(path: &Path) -> Result<Repository> {
  let repo = init_repo(path)?;
  create_commit(&repo, "file.txt", "content", "initial commit")?;
  Ok(repo)
}

/// Write a file inside a directory, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &str) {
  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).expect("Failed to create parent directories");
  }
  fs::write(path, content).expect("Failed to write file");
}

/// Create a commit adding (or updating) one file.
pub fn create_commit(repo: &Repository, file_name: &str, content: &str, message: &str) -> Result<()> {
  let repo_path = repo.workdir().expect("repository has a working directory");
  write_file(repo_path, file_name, content);

  let mut index = repo.index()?;
  index.add_path(Path::new(file_name))?;
  index.write()?;

  let tree_id = index.write_tree()?;
  let tree = repo.find_tree(tree_id)?;
  let signature = Signature::now("Alfred Test User", "alfred-test@example.com")?;

  match repo.head().ok().and_then(|head| head.peel_to_commit().ok()) {
    Some(parent) => {
      repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
    }
    None => {
      repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[])?;
    }
  }

  Ok(())
}

/// Create a branch off `start_point` (HEAD when None).
pub fn create_branch(repo: &Repository, branch_name: &str, start_point: Option<&str>) -> Result<()> {
  let commit = if let Some(start) = start_point {
    repo
      .find_branch(start, BranchType::Local)?
      .into_reference()
      .peel_to_commit()?
  } else {
    repo.head()?.peel_to_commit()?
  };

  repo.branch(branch_name, &commit, false)?;
  Ok(())
}
