//! Test infrastructure for git-cleanup integration tests.
#![allow(dead_code)]

use anyhow::Result;
use git_cleanup::config::{Config, Verbosity};
use git_cleanup::git::{Git, no_op_logger};
use git_cleanup::retry::RetryPolicy;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Quiet config so test output stays readable.
pub fn test_config() -> Config {
    Config {
        verbosity: Verbosity::Quiet,
        ..Config::default()
    }
}

/// Runs git once in `path`, without retries.
pub fn run_git(path: &Path, args: &[&str]) -> Result<String> {
    Ok(Git::new(Some(path.to_path_buf()), no_op_logger)
        .with_policy(RetryPolicy::never())
        .query(args)?)
}

pub fn configure_identity(path: &Path) -> Result<()> {
    run_git(path, &["config", "user.email", "test@example.com"])?;
    run_git(path, &["config", "user.name", "Test User"])?;
    run_git(path, &["config", "commit.gpgsign", "false"])?;
    run_git(path, &["config", "pull.rebase", "false"])?;
    Ok(())
}

/// A temporary git repository for testing.
/// Automatically cleaned up when dropped, together with its remote and
/// worktrees.
pub struct TestRepo {
    _temp_dir: TempDir,
    remote: Option<TempDir>,
    worktrees: TempDir,
    path: PathBuf,
}

impl TestRepo {
    /// Creates a new test repository with an initial commit on the master branch.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("repo");
        std::fs::create_dir(&path)?;

        run_git(&path, &["init", "-b", "master"])?;
        configure_identity(&path)?;

        std::fs::write(path.join("README.md"), "# Test Repo\n")?;
        run_git(&path, &["add", "README.md"])?;
        run_git(&path, &["commit", "-m", "Initial commit"])?;

        Ok(Self {
            _temp_dir: temp_dir,
            remote: None,
            worktrees: TempDir::new()?,
            path,
        })
    }

    /// Creates a test repository pushed to a bare `origin`, with
    /// `origin/HEAD` pointing at master.
    pub fn with_remote() -> Result<Self> {
        let repo = Self::without_remote_head()?;
        run_git(&repo.path, &["remote", "set-head", "origin", "master"])?;
        Ok(repo)
    }

    /// Like [`TestRepo::with_remote`] but leaves `origin/HEAD` unset.
    pub fn without_remote_head() -> Result<Self> {
        let mut repo = Self::new()?;
        let remote = TempDir::new()?;
        run_git(remote.path(), &["init", "--bare"])?;

        let url = remote.path().to_string_lossy().to_string();
        run_git(&repo.path, &["remote", "add", "origin", &url])?;
        run_git(&repo.path, &["push", "-u", "origin", "master"])?;

        repo.remote = Some(remote);
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git(&self) -> Git {
        Git::new(Some(self.path.clone()), no_op_logger)
    }

    pub fn remote_path(&self) -> Option<&Path> {
        self.remote.as_ref().map(TempDir::path)
    }

    /// Deletes the remote directory so network operations fail.
    pub fn remove_remote(&mut self) {
        self.remote = None;
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        run_git(&self.path, &["branch", name])?;
        Ok(())
    }

    /// Creates `name`, pushes it and sets it as the branch's upstream.
    pub fn push_tracking_branch(&self, name: &str) -> Result<()> {
        self.create_branch(name)?;
        run_git(&self.path, &["push", "-u", "origin", name])?;
        Ok(())
    }

    /// Deletes `name` on the remote, leaving the local branch behind.
    pub fn delete_remote_branch(&self, name: &str) -> Result<()> {
        run_git(&self.path, &["push", "origin", "--delete", name])?;
        Ok(())
    }

    /// Checks out the existing `branch` in a new worktree directory `dir_name`.
    pub fn add_worktree(&self, dir_name: &str, branch: &str) -> Result<PathBuf> {
        let path = self.worktrees.path().join(dir_name);
        let path_arg = path.to_string_lossy().to_string();
        run_git(&self.path, &["worktree", "add", &path_arg, branch])?;
        Ok(path)
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(!run_git(&self.path, &["branch", "--list", name])?.is_empty())
    }

    pub fn has_stash_at(&self, path: &Path) -> Result<bool> {
        Ok(!run_git(path, &["stash", "list"])?.is_empty())
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    pub fn make_dirty_at(&self, path: &Path) -> Result<()> {
        std::fs::write(path.join("README.md"), "# Modified\n")?;
        Ok(())
    }
}

/// Commits `contents` as `name` on the branch checked out at `path`.
pub fn commit_file_at(path: &Path, name: &str, contents: &str) -> Result<()> {
    std::fs::write(path.join(name), contents)?;
    run_git(path, &["add", name])?;
    run_git(path, &["commit", "-m", &format!("Update {name}")])?;
    Ok(())
}

/// Branch checked out at `path`.
pub fn current_branch_at(path: &Path) -> Result<String> {
    run_git(path, &["branch", "--show-current"])
}

pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
