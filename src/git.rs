//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands: spawning,
//! streaming each output line to a [`LineSink`] while the command runs,
//! retrying transient failures, and turning failures into [`CommandError`]s
//! whose message is git's own trimmed output.

use crate::config::Config;
use crate::constants::DEFAULT_BRANCH_PROBES;
use crate::parse::{self, DeletedBranches, Worktree};
use crate::retry::RetryPolicy;
use crate::streamer::LineSink;
use colored::Colorize;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Callback used to report git invocations and retries.
pub type GitLogger = fn(&str);

pub fn verbose_logger(message: &str) {
    eprintln!("  {}", message.dimmed());
}

pub fn no_op_logger(_message: &str) {}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn `git {args}`")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for `git {args}`")]
    Wait {
        args: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit. `message` is the trimmed combined output.
    #[error("{message}")]
    Failed { args: String, message: String },
}

/// Handle for running git in one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    cwd: Option<PathBuf>,
    policy: RetryPolicy,
    logger: GitLogger,
}

impl Git {
    #[must_use]
    pub fn new(cwd: Option<PathBuf>, logger: GitLogger) -> Self {
        Self {
            cwd,
            policy: RetryPolicy::default(),
            logger,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cwd.clone(), config.git_logger())
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The same handle, running in `dir` instead.
    #[must_use]
    pub fn at(&self, dir: &Path) -> Self {
        Self {
            cwd: Some(dir.to_path_buf()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Runs `git <args>`, streaming output lines to `sink`, retrying on
    /// transient failures. Returns trimmed stdout of the last attempt.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's [`CommandError`].
    pub fn run(&self, args: &[&str], sink: &LineSink) -> Result<String, CommandError> {
        let logger = self.logger;
        self.policy.execute(
            thread::sleep,
            |attempt, err: &CommandError| {
                logger(&format!(
                    "retrying `git {}` (attempt {}/{}): {}",
                    args.join(" "),
                    attempt,
                    self.policy.max_attempts,
                    err
                ));
            },
            |_| self.run_once(args, sink),
        )
    }

    /// [`Git::run`] without streaming, for commands whose output is parsed.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's [`CommandError`].
    pub fn query(&self, args: &[&str]) -> Result<String, CommandError> {
        self.run(args, &LineSink::discard())
    }

    fn run_once(&self, args: &[&str], sink: &LineSink) -> Result<String, CommandError> {
        let joined = args.join(" ");
        (self.logger)(&format!("$ git {joined}"));

        let mut command = Command::new("git");
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        let mut child = command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                args: joined.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (out_lines, err_lines) = thread::scope(|scope| {
            let err_reader = scope.spawn(move || read_lines(stderr, sink));
            let out_lines = read_lines(stdout, sink);
            (out_lines, err_reader.join().unwrap_or_default())
        });

        let status = child.wait().map_err(|source| CommandError::Wait {
            args: joined.clone(),
            source,
        })?;

        if status.success() {
            return Ok(out_lines.join("\n").trim().to_string());
        }

        let combined = out_lines
            .iter()
            .chain(&err_lines)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let combined = combined.trim();
        let message = if combined.is_empty() {
            format!("git {joined} exited with {status}")
        } else {
            combined.to_string()
        };
        Err(CommandError::Failed {
            args: joined,
            message,
        })
    }

    /// Resolves the remote's default branch.
    ///
    /// # Errors
    ///
    /// Fails with "failed to get default branch" when no probe yields a name.
    pub fn default_branch(&self) -> anyhow::Result<String> {
        resolve_default_branch(|args| Ok(self.query(args)?))
    }

    pub fn current_branch(&self) -> anyhow::Result<String> {
        Ok(self.query(&["branch", "--show-current"])?)
    }

    pub fn checkout(&self, branch: &str, sink: &LineSink) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run(&["checkout", branch], sink)?;
        Ok(())
    }

    pub fn checkout_new_branch(&self, branch: &str, sink: &LineSink) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run(&["checkout", "-b", branch], sink)?;
        Ok(())
    }

    pub fn pull(&self, branch: &str, sink: &LineSink) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run(&["pull", "origin", branch], sink)?;
        Ok(())
    }

    pub fn fetch_prune(&self, sink: &LineSink) -> anyhow::Result<()> {
        self.run(&["fetch", "-p"], sink)?;
        Ok(())
    }

    pub fn deleted_branches(&self) -> anyhow::Result<DeletedBranches> {
        let output = self.query(&["branch", "-vv"])?;
        Ok(parse::parse_deleted_branches(&output))
    }

    pub fn delete_branch(&self, branch: &str, sink: &LineSink) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run(&["branch", "-D", branch], sink)?;
        Ok(())
    }

    pub fn branch_exists(&self, branch: &str) -> anyhow::Result<bool> {
        validate_branch_name(branch)?;
        let reference = format!("refs/heads/{branch}");
        Ok(self
            .query(&["show-ref", "--verify", "--quiet", &reference])
            .is_ok())
    }

    pub fn worktrees(&self) -> anyhow::Result<Vec<Worktree>> {
        let output = self.query(&["worktree", "list", "--porcelain"])?;
        Ok(parse::parse_worktrees(&output))
    }

    /// Path of the worktree that has `branch` checked out.
    pub fn worktree_for_branch(&self, branch: &str) -> anyhow::Result<PathBuf> {
        self.worktrees()?
            .into_iter()
            .find(|w| w.branch.as_deref() == Some(branch))
            .map(|w| w.path)
            .ok_or_else(|| anyhow::anyhow!("worktree not found for branch {branch}"))
    }

    pub fn has_uncommitted_changes(&self) -> anyhow::Result<bool> {
        Ok(!self.query(&["status", "--porcelain"])?.is_empty())
    }

    /// Stashes local changes. Returns whether anything was stashed.
    pub fn stash(&self, sink: &LineSink) -> anyhow::Result<bool> {
        let output = self.run(&["stash"], sink)?;
        Ok(!output.contains("No local changes to save"))
    }

    pub fn stash_pop(&self, sink: &LineSink) -> anyhow::Result<()> {
        self.run(&["stash", "pop"], sink)?;
        Ok(())
    }

    /// Rebases `branch` onto `upstream`, checking `branch` out first.
    pub fn rebase(&self, upstream: &str, branch: &str, sink: &LineSink) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run(&["rebase", upstream, branch], sink)?;
        Ok(())
    }

    /// Whether a rebase has stopped midway in this working tree.
    pub fn rebase_in_progress(&self) -> anyhow::Result<bool> {
        for state_dir in ["rebase-merge", "rebase-apply"] {
            let path = PathBuf::from(self.query(&["rev-parse", "--git-path", state_dir])?);
            let path = match &self.cwd {
                Some(cwd) if path.is_relative() => cwd.join(path),
                _ => path,
            };
            if path.exists() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Aborts a rebase in progress. Fails if there is none.
    pub fn abort_rebase(&self) -> anyhow::Result<()> {
        self.query(&["rebase", "--abort"])?;
        Ok(())
    }
}

/// Tries each default-branch probe in order; the first one whose output
/// normalizes to a branch name wins.
///
/// # Errors
///
/// Fails with "failed to get default branch" when every probe fails or
/// yields nothing usable.
pub fn resolve_default_branch<P>(mut probe: P) -> anyhow::Result<String>
where
    P: FnMut(&[&str]) -> anyhow::Result<String>,
{
    DEFAULT_BRANCH_PROBES
        .iter()
        .filter_map(|args| probe(args).ok())
        .find_map(|output| parse::normalize_default_branch(&output))
        .ok_or_else(|| anyhow::anyhow!("failed to get default branch"))
}

fn validate_branch_name(branch: &str) -> anyhow::Result<()> {
    if branch.is_empty() || branch.starts_with('-') || branch.contains(['\0', '\n']) {
        anyhow::bail!("Invalid branch name: {:?}", branch);
    }
    Ok(())
}

/// Reads `pipe` to the end, forwarding each line to `sink` as it arrives.
fn read_lines(pipe: Option<impl Read>, sink: &LineSink) -> Vec<String> {
    let Some(pipe) = pipe else {
        return Vec::new();
    };

    BufReader::new(pipe)
        .split(b'\n')
        .map_while(Result::ok)
        .map(|bytes| {
            let line = String::from_utf8_lossy(&bytes);
            // Progress output rewrites the line in place; keep what ends up visible.
            let line = line
                .split('\r')
                .rfind(|segment| !segment.is_empty())
                .unwrap_or_default()
                .to_string();
            sink.send(&line);
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_first_successful_probe_wins() {
        let calls = RefCell::new(Vec::new());
        let branch = resolve_default_branch(|args| {
            calls.borrow_mut().push(args.join(" "));
            Ok("refs/remotes/origin/main".to_string())
        })
        .unwrap();

        assert_eq!(branch, "main");
        assert_eq!(calls.into_inner(), vec!["symbolic-ref refs/remotes/origin/HEAD"]);
    }

    #[test]
    fn test_failed_probe_falls_through() {
        let branch = resolve_default_branch(|args| match args[0] {
            "symbolic-ref" => anyhow::bail!("fatal: ref refs/remotes/origin/HEAD is not a symbolic ref"),
            _ => Ok("origin/develop".to_string()),
        })
        .unwrap();

        assert_eq!(branch, "develop");
    }

    #[test]
    fn test_unresolved_head_falls_through_to_config() {
        let branch = resolve_default_branch(|args| match args[0] {
            "symbolic-ref" => anyhow::bail!("not a symbolic ref"),
            "rev-parse" => Ok("origin/HEAD".to_string()),
            _ => Ok("trunk".to_string()),
        })
        .unwrap();

        assert_eq!(branch, "trunk");
    }

    #[test]
    fn test_empty_output_falls_through() {
        let branch = resolve_default_branch(|args| match args[0] {
            "config" => Ok("main".to_string()),
            _ => Ok(String::new()),
        })
        .unwrap();

        assert_eq!(branch, "main");
    }

    #[test]
    fn test_all_probes_failing_reports_default_branch_error() {
        let err = resolve_default_branch(|_| anyhow::bail!("nope")).unwrap_err();
        assert_eq!(err.to_string(), "failed to get default branch");
    }

    #[test]
    fn test_validate_branch_name() {
        assert!(validate_branch_name("feature/x").is_ok());
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("-D").is_err());
        assert!(validate_branch_name("a\nb").is_err());
    }

    #[test]
    fn test_read_lines_forwards_and_collects() {
        let input: &[u8] = b"first\r\n\nsecond\n";
        let lines = read_lines(Some(input), &LineSink::discard());
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn test_read_lines_keeps_last_carriage_return_segment() {
        let input: &[u8] = b"Rebasing (1/1)\rerror: could not apply 1a2b3c\nCounting: 50%\rCounting: 100%\r\n";
        let lines = read_lines(Some(input), &LineSink::discard());
        assert_eq!(lines, vec!["error: could not apply 1a2b3c", "Counting: 100%"]);
    }

    #[test]
    fn test_failed_error_displays_output_only() {
        let err = CommandError::Failed {
            args: "branch -D x".to_string(),
            message: "error: branch 'x' not found.".to_string(),
        };
        assert_eq!(err.to_string(), "error: branch 'x' not found.");
    }

    #[test]
    fn test_at_changes_directory_only() {
        let git = Git::new(None, no_op_logger);
        let moved = git.at(Path::new("/tmp/elsewhere"));
        assert_eq!(moved.cwd(), Some(Path::new("/tmp/elsewhere")));
        assert_eq!(git.cwd(), None);
    }
}
