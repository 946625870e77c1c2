// Cleanup flow and its result types

use crate::config::Config;
use crate::git::Git;
use crate::output::{self, create_status_view};
use crate::streamer::{self, LineSink};
use crate::worktree;
use anyhow::Context;
use std::path::PathBuf;

/// A setup step failed inside a status view, which has already shown its
/// output and error.
#[derive(Debug, thiserror::Error)]
#[error("{step} failed")]
pub struct StepFailed {
    pub step: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StepFailed {
    #[must_use]
    pub fn new(step: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            step: step.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Branch name or worktree path the failure belongs to.
    pub item: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub default_branch: String,
    pub deleted_branches: Vec<String>,
    pub reset_worktrees: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
}

impl CleanupReport {
    #[must_use]
    pub fn new(default_branch: String) -> Self {
        Self {
            default_branch,
            deleted_branches: Vec::new(),
            reset_worktrees: Vec::new(),
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, item: impl Into<String>, error: &anyhow::Error) {
        self.failures.push(ItemFailure {
            item: item.into(),
            error: format!("{error:#}"),
        });
    }
}

/// Brings the default branch up to date and removes local branches whose
/// upstream is gone.
///
/// Setup steps (default branch, checkout, pull, prune) abort the run on
/// failure. After that every worktree and branch is handled independently:
/// failures are recorded in the report and the loop moves on.
///
/// # Errors
///
/// Returns the first setup failure.
pub fn cleanup(git: &Git, config: &Config) -> anyhow::Result<CleanupReport> {
    let default_branch = git.default_branch()?;
    let current_branch = git
        .current_branch()
        .context("failed to get current branch")?;

    if current_branch != default_branch {
        setup_step(config, "Checking out default branch", |sink| {
            git.checkout(&default_branch, sink)
        })?;
    }

    setup_step(config, "Pulling latest changes", |sink| {
        git.pull(&default_branch, sink)
    })?;

    setup_step(config, "Pruning local branches", |sink| git.fetch_prune(sink))?;

    let deleted = git
        .deleted_branches()
        .context("error getting deleted branches")?;

    let mut report = CleanupReport::new(default_branch.clone());
    let mut stuck = Vec::new();

    for branch in &deleted.worktree_branches {
        if let Err(err) = reset_worktree(git, config, &default_branch, branch, &mut report) {
            report.fail(branch.as_str(), &err);
            stuck.push(branch);
        }
    }

    for branch in &deleted.branches {
        // Still checked out in a worktree that could not be reset.
        if stuck.contains(&branch) {
            continue;
        }

        let result = streamer::run(
            create_status_view(config),
            &format!("Deleting branch: {branch}"),
            |sink| git.delete_branch(branch, sink),
        );
        match result {
            Ok(()) => report.deleted_branches.push(branch.clone()),
            Err(err) => report.fail(branch.as_str(), &err),
        }
    }

    Ok(report)
}

fn setup_step<F>(config: &Config, title: &str, op: F) -> Result<(), StepFailed>
where
    F: FnOnce(&LineSink) -> anyhow::Result<()> + Send,
{
    streamer::run(create_status_view(config), title, op).map_err(|err| StepFailed::new(title, err))
}

fn reset_worktree(
    git: &Git,
    config: &Config,
    default_branch: &str,
    branch: &str,
    report: &mut CleanupReport,
) -> anyhow::Result<()> {
    let path = git.worktree_for_branch(branch).inspect_err(|err| {
        output::print_item_error(&format!(
            "Error finding worktree for branch {branch}: {err:#}"
        ));
    })?;

    streamer::run(
        create_status_view(config),
        &format!("Resetting worktree: {}", output::display_path(&path)),
        |sink| worktree::reset(git, default_branch, &path, config.worktree_prefix(), sink),
    )?;

    report.reset_worktrees.push(path);
    Ok(())
}
