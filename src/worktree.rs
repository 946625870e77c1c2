//! Resetting a pooled worktree whose branch was deleted upstream.
//!
//! Worktrees are kept as a reusable pool: each one has a home branch named
//! after its directory (minus an optional prefix). When the feature branch
//! checked out in a worktree is gone upstream, the worktree is moved back to
//! its home branch, rebased onto the fresh default branch, so the feature
//! branch can be deleted.

use crate::constants::REMOTE;
use crate::git::Git;
use crate::streamer::LineSink;
use anyhow::Context;
use std::path::Path;

/// Home branch for the worktree at `path`.
///
/// # Errors
///
/// Fails when the directory name is not valid UTF-8 or is nothing but `prefix`.
pub fn pool_branch(path: &Path, prefix: &str) -> anyhow::Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid worktree directory: {}", path.display()))?;
    let branch = name.strip_prefix(prefix).unwrap_or(name);
    if branch.is_empty() {
        anyhow::bail!("cannot derive a branch name from {}", path.display());
    }
    Ok(branch.to_string())
}

/// Moves the worktree at `path` onto its pool branch.
///
/// Local changes are stashed first and restored afterwards. If the switch
/// fails, an interrupted rebase is aborted and the worktree is put back on
/// the branch it started on before the stash is popped, so the changes land
/// where they came from. The switch error is the one returned; a failed
/// restore is attached to it.
///
/// # Errors
///
/// Returns the first git failure.
pub fn reset(
    git: &Git,
    default_branch: &str,
    path: &Path,
    prefix: &str,
    sink: &LineSink,
) -> anyhow::Result<()> {
    let branch = pool_branch(path, prefix)?;
    let worktree = git.at(path);

    let original = worktree.current_branch()?;
    let stashed = worktree.has_uncommitted_changes()? && worktree.stash(sink)?;

    match switch_to_pool_branch(git, &worktree, default_branch, &branch, sink) {
        Ok(()) if stashed => worktree.stash_pop(sink),
        Ok(()) => Ok(()),
        Err(err) => match restore(&worktree, &original, stashed, sink) {
            Ok(()) => Err(err),
            Err(restore_err) => Err(err.context(format!(
                "could not restore worktree to {original}: {restore_err:#}"
            ))),
        },
    }
}

/// Undoes a failed switch: aborts a stopped rebase, returns to `original`
/// (empty for a detached HEAD) and pops the stash taken before the switch.
fn restore(worktree: &Git, original: &str, stashed: bool, sink: &LineSink) -> anyhow::Result<()> {
    if worktree.rebase_in_progress()? {
        worktree.abort_rebase()?;
    }
    if !original.is_empty() && worktree.current_branch()? != original {
        worktree.checkout(original, sink)?;
    }
    if stashed {
        worktree.stash_pop(sink)?;
    }
    Ok(())
}

fn switch_to_pool_branch(
    git: &Git,
    worktree: &Git,
    default_branch: &str,
    branch: &str,
    sink: &LineSink,
) -> anyhow::Result<()> {
    if git.branch_exists(branch)? {
        worktree.rebase(&format!("{REMOTE}/{default_branch}"), branch, sink)?;
        worktree.checkout(branch, sink)
    } else {
        worktree.checkout_new_branch(branch, sink)
    }
}
