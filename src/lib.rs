//! Git working-copy cleanup library.
//!
//! This crate provides functionality to tidy a local repository by:
//! - Checking out and pulling the default branch
//! - Pruning remote-tracking branches
//! - Resetting pooled worktrees whose branch was deleted upstream
//! - Deleting local branches whose upstream is gone
//!
//! Every git command runs under a live status view ([`streamer`]) and is
//! retried when it fails with a known transient error ([`retry`]).

pub mod cleanup;
pub mod config;
pub mod constants;
pub mod git;
pub mod output;
pub mod parse;
pub mod retry;
pub mod streamer;
pub mod worktree;
