//! Configuration types for CLI verbosity and options.

use crate::git::{self, GitLogger};
use std::path::PathBuf;

/// Runtime configuration derived from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Directory every git command runs in. `None` means the process cwd.
    pub cwd: Option<PathBuf>,
    /// Prefix stripped from a worktree directory name to get its pool branch.
    pub worktree_prefix: Option<String>,
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the appropriate git logger based on verbosity settings.
    ///
    /// Config only picks which callback to use; the loggers themselves live
    /// in the git module.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }

    #[must_use]
    pub fn worktree_prefix(&self) -> &str {
        self.worktree_prefix.as_deref().unwrap_or_default()
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// Maps the mutually exclusive `--quiet` / `--verbose` flags.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }
}
