//! Spinners, colored output, and summary formatting.
//!
//! This module provides the terminal side of a cleanup run: the live status
//! view each git operation runs under, error reporting for items that fail,
//! and the closing summary.

use crate::cleanup::{CleanupReport, StepFailed};
use crate::config::{Config, Verbosity};
use crate::constants::{ERROR_INDENT, FAIL_GLYPH, PASS_GLYPH, PROGRESS_TICK_MS};
use crate::streamer::{LineBuffer, StatusView};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Status view for one operation, drawn on stderr.
///
/// In normal mode this is a spinner with the streamed lines in slots below
/// it; slots are added and removed so exactly one is drawn per buffered line.
/// Verbose mode prints every line instead, and quiet mode shows failures only.
pub struct TerminalView {
    verbosity: Verbosity,
    multi: MultiProgress,
    spinner: Option<ProgressBar>,
    slots: Vec<ProgressBar>,
}

#[must_use]
pub fn create_status_view(config: &Config) -> TerminalView {
    TerminalView {
        verbosity: config.verbosity,
        multi: MultiProgress::new(),
        spinner: None,
        slots: Vec::new(),
    }
}

impl TerminalView {
    fn is_live(&self) -> bool {
        self.spinner.is_some() && !self.multi.is_hidden()
    }

    fn finish(&mut self, line: String) {
        match self.spinner.take() {
            Some(spinner) if !self.multi.is_hidden() => {
                spinner.set_style(plain_style());
                spinner.finish_with_message(line);
            }
            Some(spinner) => {
                spinner.finish_and_clear();
                eprintln!("{line}");
            }
            None => eprintln!("{line}"),
        }
    }

    fn resize_slots(&mut self, count: usize) {
        while self.slots.len() > count {
            if let Some(slot) = self.slots.pop() {
                slot.finish_and_clear();
                self.multi.remove(&slot);
            }
        }
        while self.slots.len() < count {
            let slot = self.multi.add(ProgressBar::new_spinner());
            slot.set_style(plain_style());
            self.slots.push(slot);
        }
    }
}

impl StatusView for TerminalView {
    fn start(&mut self, title: &str) {
        match self.verbosity {
            Verbosity::Normal => {
                let spinner = self.multi.add(ProgressBar::new_spinner());
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .template("{spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_message(title.to_string());
                spinner.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
                self.spinner = Some(spinner);
            }
            Verbosity::Verbose => eprintln!("{} {}", "›".cyan(), title.bold()),
            Verbosity::Quiet => {}
        }
    }

    fn redraw(&mut self, buffer: &LineBuffer) {
        match self.verbosity {
            Verbosity::Normal if self.is_live() => {
                self.resize_slots(buffer.len());
                for (slot, line) in self.slots.iter().zip(buffer.lines()) {
                    slot.set_message(format!("{ERROR_INDENT}{}", line.dimmed()));
                }
            }
            Verbosity::Verbose => {
                if let Some(line) = buffer.latest() {
                    eprintln!("{ERROR_INDENT}{}", line.dimmed());
                }
            }
            _ => {}
        }
    }

    fn pass(&mut self, title: &str) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        self.finish(format!("{} {}", PASS_GLYPH.green(), title));
    }

    fn fail(&mut self, title: &str, error: &str) {
        self.finish(format!("{FAIL_GLYPH} {title}").red().to_string());
        for line in format_error_block(error) {
            eprintln!("{}", line.dimmed());
        }
    }
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Splits an error message into lines, each indented on its own.
#[must_use]
pub fn format_error_block(error: &str) -> Vec<String> {
    error
        .lines()
        .map(|line| format!("{ERROR_INDENT}{line}"))
        .collect()
}

/// Shows `path` with the home directory abbreviated to `~`.
#[must_use]
pub fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => shorten_home(path, &home),
        None => path.display().to_string(),
    }
}

fn shorten_home(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.display().to_string(),
    }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Working in:".cyan(),
        display_path(path).white().bold()
    )
}

/// Reports a per-item failure that happened outside a status view.
pub fn print_item_error(message: &str) {
    eprintln!("{}", message.red());
}

/// Top-level error line. A failed setup step was already rendered with its
/// error block, so only the step is named again.
#[must_use]
pub fn format_fatal(err: &anyhow::Error) -> String {
    if err.is::<StepFailed>() {
        err.to_string()
    } else {
        format!("{err:#}")
    }
}

pub fn print_fatal(err: &anyhow::Error) {
    eprintln!("{} {}", FAIL_GLYPH.red(), format_fatal(err).red());
}

pub fn print_summary(report: &CleanupReport, config: &Config) {
    if config.is_quiet() {
        print_quiet_summary(report);
    } else {
        print_normal_summary(report);
    }
}

fn print_quiet_summary(report: &CleanupReport) {
    println!("{}", format_counts(report));
    for failure in &report.failures {
        eprintln!("error: {}: {}", failure.item, failure.error);
    }
}

fn print_normal_summary(report: &CleanupReport) {
    println!(
        "{} {}",
        format!("{PASS_GLYPH} Git cleanup completed").green(),
        format!("({})", format_counts(report)).dimmed()
    );
    if !report.failures.is_empty() {
        println!(
            "{}",
            format!(
                "{} {} failed",
                report.failures.len(),
                plural(report.failures.len(), "item", "items")
            )
            .red()
            .bold()
        );
    }
}

fn format_counts(report: &CleanupReport) -> String {
    let branches = report.deleted_branches.len();
    let worktrees = report.reset_worktrees.len();
    format!(
        "{} {} deleted, {} {} reset",
        branches,
        plural(branches, "branch", "branches"),
        worktrees,
        plural(worktrees, "worktree", "worktrees")
    )
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::ItemFailure;
    use std::path::PathBuf;

    fn report() -> CleanupReport {
        CleanupReport {
            default_branch: "main".to_string(),
            deleted_branches: vec!["a".to_string(), "b".to_string()],
            reset_worktrees: vec![PathBuf::from("/tmp/pool-1")],
            failures: vec![ItemFailure {
                item: "c".to_string(),
                error: "error: boom".to_string(),
            }],
        }
    }

    #[test]
    fn test_error_block_indents_every_line() {
        assert_eq!(
            format_error_block("error: one\nhint: two\n\nthree"),
            vec!["  error: one", "  hint: two", "  ", "  three"]
        );
    }

    #[test]
    fn test_error_block_single_line() {
        assert_eq!(format_error_block("fatal: nope"), vec!["  fatal: nope"]);
    }

    #[test]
    fn test_shorten_home() {
        let home = Path::new("/home/me");
        assert_eq!(shorten_home(Path::new("/home/me/src/pool-1"), home), "~/src/pool-1");
        assert_eq!(shorten_home(Path::new("/home/me"), home), "~");
        assert_eq!(shorten_home(Path::new("/srv/pool-1"), home), "/srv/pool-1");
        assert_eq!(shorten_home(Path::new("/home/meow"), home), "/home/meow");
    }

    #[test]
    fn test_format_counts_pluralizes() {
        assert_eq!(format_counts(&report()), "2 branches deleted, 1 worktree reset");
        assert_eq!(
            format_counts(&CleanupReport::new("main".to_string())),
            "0 branches deleted, 0 worktrees reset"
        );
    }

    #[test]
    fn test_quiet_view_draws_nothing_until_failure() {
        let config = Config {
            verbosity: Verbosity::Quiet,
            ..Config::default()
        };
        let mut view = create_status_view(&config);
        let mut buffer = LineBuffer::default();
        buffer.push("line");

        // Should not panic
        view.start("title");
        view.redraw(&buffer);
        view.pass("title");
        view.fail("title", "error: one\nerror: two");
    }

    #[test]
    fn test_summary_smoke() {
        let quiet = Config {
            verbosity: Verbosity::Quiet,
            ..Config::default()
        };
        print_summary(&report(), &quiet);
        print_summary(&report(), &Config::default());
    }

    #[test]
    fn test_format_fatal_names_rendered_step_only() {
        let err = anyhow::Error::new(StepFailed::new(
            "Pulling latest changes",
            anyhow::anyhow!("fatal: 'origin' does not appear to be a git repository"),
        ));

        assert_eq!(format_fatal(&err), "Pulling latest changes failed");
    }

    #[test]
    fn test_format_fatal_keeps_unrendered_chain() {
        let err = anyhow::anyhow!("fatal: not a git repository")
            .context("failed to get current branch");

        assert_eq!(
            format_fatal(&err),
            "failed to get current branch: fatal: not a git repository"
        );
    }
}
