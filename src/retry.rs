//! Retry policy for git commands that fail with known transient errors.
//!
//! Git reports ref-locking races and flaky network transfers only through the
//! text of its error output, so classification is plain string matching
//! against a list of signatures. The list is data on [`RetryPolicy`] rather
//! than control flow, which keeps it easy to extend when git rewords a message.

use crate::constants::{MAX_ATTEMPTS, RETRY_DELAY, TRANSIENT_REF_MISMATCH, TRANSIENT_SUBSTRINGS};
use regex::Regex;
use std::fmt::Display;
use std::time::Duration;

/// A piece of error text that marks a failure as transient.
#[derive(Debug, Clone)]
pub enum TransientSignature {
    Contains(String),
    Matches(Regex),
}

impl TransientSignature {
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        match self {
            TransientSignature::Contains(needle) => message.contains(needle.as_str()),
            TransientSignature::Matches(pattern) => pattern.is_match(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub signatures: Vec<TransientSignature>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let mut signatures: Vec<TransientSignature> = TRANSIENT_SUBSTRINGS
            .iter()
            .map(|s| TransientSignature::Contains((*s).to_string()))
            .collect();
        if let Ok(pattern) = Regex::new(TRANSIENT_REF_MISMATCH) {
            signatures.push(TransientSignature::Matches(pattern));
        }

        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
            signatures,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs every command exactly once.
    #[must_use]
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            signatures: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_transient(&self, message: &str) -> bool {
        self.signatures.iter().any(|s| s.matches(message))
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the attempt
    /// budget is spent. `sleep` is called with [`RetryPolicy::delay`] between
    /// attempts, never after the last one. The final attempt's result is
    /// returned as-is.
    ///
    /// `on_retry` receives the 1-based number of the attempt about to start
    /// and the error that triggered it.
    pub fn execute<T, E, S, R, A>(&self, sleep: S, mut on_retry: R, mut attempt: A) -> Result<T, E>
    where
        E: Display,
        S: Fn(Duration),
        R: FnMut(u32, &E),
        A: FnMut(u32) -> Result<T, E>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut number = 1;
        loop {
            let result = attempt(number);
            let retry = matches!(
                &result,
                Err(err) if number < max_attempts && self.is_transient(&err.to_string())
            );
            if !retry {
                return result;
            }

            number += 1;
            if let Err(err) = &result {
                on_retry(number, err);
            }
            sleep(self.delay);
        }
    }
}
