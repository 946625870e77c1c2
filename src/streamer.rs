//! Live status rendering for a single running operation.
//!
//! [`run`] starts a status view labelled with a title, runs the operation on a
//! worker thread, and redraws the view each time the operation pushes a line
//! through its [`LineSink`]. Only the last [`MAX_DISPLAY_LINES`] lines are kept.
//! When the operation returns, the transient lines are erased and the view is
//! finalized as passed or failed.

use crate::constants::MAX_DISPLAY_LINES;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// The most recent lines of an operation's output, oldest first.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a line, dropping the oldest once full. Empty lines are ignored.
    /// Returns whether the buffer changed.
    pub fn push(&mut self, line: impl Into<String>) -> bool {
        let line = line.into();
        if line.is_empty() || self.capacity == 0 {
            return false;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        true
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(MAX_DISPLAY_LINES)
    }
}

enum StreamEvent {
    Line(String),
    Finished(anyhow::Result<()>),
}

/// Write end handed to a running operation.
///
/// Cloneable so several reader threads can feed the same view. Sending never
/// fails: lines pushed after the view has gone away are dropped.
#[derive(Debug, Clone, Default)]
pub struct LineSink {
    tx: Option<Sender<StreamEvent>>,
}

impl LineSink {
    /// A sink that discards everything, for commands nobody is watching.
    #[must_use]
    pub fn discard() -> Self {
        Self::default()
    }

    pub fn send(&self, line: &str) {
        if line.is_empty() {
            return;
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(StreamEvent::Line(line.to_string()));
        }
    }
}

/// Rendering seam for [`run`].
///
/// `run` calls `start` once, `redraw` after every buffer change, and then
/// exactly one of `pass` or `fail`.
pub trait StatusView {
    fn start(&mut self, title: &str);

    /// Replaces the previously drawn lines with the buffer's contents.
    fn redraw(&mut self, buffer: &LineBuffer);

    fn pass(&mut self, title: &str);

    /// `error` may span several lines; each is shown on its own.
    fn fail(&mut self, title: &str, error: &str);
}

/// Runs `operation` under a live status view titled `title`.
///
/// The operation runs on its own thread and reports output through the
/// [`LineSink`] it is given. The calling thread redraws `view` as lines
/// arrive, keeps draining lines still queued once the operation has
/// finished, then finalizes the view. The operation's result is returned
/// after it has been rendered.
///
/// # Errors
///
/// Returns the operation's own error, or an error if the operation panicked.
pub fn run<V, F>(mut view: V, title: &str, operation: F) -> anyhow::Result<()>
where
    V: StatusView,
    F: FnOnce(&LineSink) -> anyhow::Result<()> + Send,
{
    let mut buffer = LineBuffer::default();
    let (tx, rx) = mpsc::channel();

    view.start(title);

    let result = thread::scope(|scope| {
        let worker = scope.spawn(move || {
            let sink = LineSink {
                tx: Some(tx.clone()),
            };
            let result = operation(&sink);
            drop(sink);
            let _ = tx.send(StreamEvent::Finished(result));
        });

        let result = consume(&rx, &mut buffer, &mut view);
        match worker.join() {
            Ok(()) => result,
            Err(_) => Err(anyhow::anyhow!("{title} panicked")),
        }
    });

    buffer.clear();
    view.redraw(&buffer);

    match &result {
        Ok(()) => view.pass(title),
        Err(err) => view.fail(title, &format!("{err:#}")),
    }

    result
}

fn consume<V: StatusView>(
    rx: &Receiver<StreamEvent>,
    buffer: &mut LineBuffer,
    view: &mut V,
) -> anyhow::Result<()> {
    loop {
        match rx.recv() {
            Ok(StreamEvent::Line(line)) => {
                if buffer.push(line) {
                    view.redraw(buffer);
                }
            }
            Ok(StreamEvent::Finished(result)) => {
                for event in rx.try_iter() {
                    if let StreamEvent::Line(line) = event {
                        if buffer.push(line) {
                            view.redraw(buffer);
                        }
                    }
                }
                return result;
            }
            Err(_) => anyhow::bail!("operation ended without reporting a result"),
        }
    }
}
