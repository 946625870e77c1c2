//! Application-wide constants.
//!
//! Centralized configuration values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Number of streamed lines kept visible under the spinner.
pub const MAX_DISPLAY_LINES: usize = 2;

/// Total attempts for a git command failing with a transient error.
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts of a transiently failing git command.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Spinner tick interval in milliseconds.
pub const PROGRESS_TICK_MS: u64 = 100;

pub const PASS_GLYPH: &str = "\u{2714}";
pub const FAIL_GLYPH: &str = "\u{2716}";

/// Indentation applied to every line of a failed operation's error message.
pub const ERROR_INDENT: &str = "  ";

/// Remote whose default branch and upstream state drive the cleanup.
pub const REMOTE: &str = "origin";

/// Ways to ask git for the default branch, tried in order.
pub const DEFAULT_BRANCH_PROBES: &[&[&str]] = &[
    &["symbolic-ref", "refs/remotes/origin/HEAD"],
    &["rev-parse", "--abbrev-ref", "origin/HEAD"],
    &["config", "--get", "init.defaultBranch"],
];

/// Prefixes stripped, in order, from a probed default branch name.
pub const DEFAULT_BRANCH_PREFIXES: &[&str] = &["refs/heads/", "refs/remotes/", "origin/"];

/// Substrings of git error output that indicate a ref-locking or network race.
pub const TRANSIENT_SUBSTRINGS: &[&str] = &[
    "cannot lock ref",
    "unable to update local ref",
    "fatal: unable to access",
    "fatal: the remote end hung up unexpectedly",
    "fatal: early EOF",
    "fatal: index-pack failed",
    "fatal: pack-objects failed",
];

/// Regex for the "ref is at X but expected Y" race.
pub const TRANSIENT_REF_MISMATCH: &str = r"is at \S+ but expected";
