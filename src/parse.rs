//! Parsers for git's text output.
//!
//! These are pure functions so they can be tested against captured output
//! without running git.

use crate::constants::DEFAULT_BRANCH_PREFIXES;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static GONE_UPSTREAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"origin/.*: gone\]").expect("valid gone-upstream regex"));

/// Local branches whose upstream on `origin` no longer exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedBranches {
    /// Every gone branch, in `branch -vv` order.
    pub branches: Vec<String>,
    /// The subset checked out in a linked worktree.
    pub worktree_branches: Vec<String>,
}

/// One entry of `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    /// Short branch name, `None` for a detached or bare worktree.
    pub branch: Option<String>,
}

/// Cleans a probed default branch name.
///
/// Strips `refs/heads/`, `refs/remotes/` and `origin/` in that order. Returns
/// `None` when nothing usable is left so the caller can try the next probe.
/// A bare `HEAD` is unusable: it means `origin/HEAD` was echoed back unresolved.
#[must_use]
pub fn normalize_default_branch(raw: &str) -> Option<String> {
    let name = DEFAULT_BRANCH_PREFIXES
        .iter()
        .fold(raw.trim(), |name, prefix| {
            name.strip_prefix(prefix).unwrap_or(name)
        });

    match name {
        "" | "HEAD" => None,
        name => Some(name.to_string()),
    }
}

/// Classifies `git branch -vv` output.
///
/// A line is a deleted branch when its tracking info reads
/// `[origin/<name>: gone]`. A leading `+` marks a branch checked out in
/// another worktree; a leading `*` marks the current branch.
#[must_use]
pub fn parse_deleted_branches(branch_vv: &str) -> DeletedBranches {
    let mut deleted = DeletedBranches::default();

    for line in branch_vv.lines() {
        if !GONE_UPSTREAM.is_match(line) {
            continue;
        }

        let in_worktree = line.starts_with('+');
        let mut fields = line.split_whitespace();
        let name = match fields.next() {
            Some("+" | "*") => fields.next(),
            other => other,
        };
        let Some(name) = name else { continue };

        if in_worktree {
            deleted.worktree_branches.push(name.to_string());
        }
        deleted.branches.push(name.to_string());
    }

    deleted
}

/// Parses `git worktree list --porcelain` into its entries.
#[must_use]
pub fn parse_worktrees(porcelain: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in porcelain.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            worktrees.extend(current.take());
            current = Some(Worktree {
                path: PathBuf::from(path),
                branch: None,
            });
        } else if let Some(reference) = line.strip_prefix("branch ") {
            if let Some(worktree) = current.as_mut() {
                let name = reference.strip_prefix("refs/heads/").unwrap_or(reference);
                worktree.branch = Some(name.to_string());
            }
        }
    }
    worktrees.extend(current);

    worktrees
}
