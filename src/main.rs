use clap::{Parser, Subcommand};
use git_cleanup::cleanup;
use git_cleanup::config::{Config, Verbosity};
use git_cleanup::git::Git;
use git_cleanup::output;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "git-cleanup", version)]
#[command(about = "Update the default branch and remove branches whose upstream is gone")]
struct Cli {
    /// Only print failures and a one-line summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every git command and all of its output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Update the default branch, reset stale worktrees and delete gone branches
    Cleanup(CleanupArgs),
}

#[derive(clap::Args, Default)]
struct CleanupArgs {
    /// Run in this repository instead of the current directory
    #[arg(long, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Prefix stripped from worktree directory names to get their pool branch
    #[arg(long, value_name = "PREFIX")]
    worktree_prefix: Option<String>,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Command::Cleanup(args) = cli
        .command
        .unwrap_or_else(|| Command::Cleanup(CleanupArgs::default()));

    let config = Config {
        verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
        cwd: args.cwd,
        worktree_prefix: args.worktree_prefix,
    };

    let working_dir = match &config.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };
    output::print_working_dir(&working_dir, &config);

    let git = Git::from_config(&config);
    let report = cleanup::cleanup(&git, &config)?;
    output::print_summary(&report, &config);

    Ok(())
}
