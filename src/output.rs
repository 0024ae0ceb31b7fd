//! Output records emitted by executors and supervisors, and the sink that
//! consumes them.

pub mod buffer;
pub mod console;

use crate::config::ProcessKey;
use chrono::{DateTime, Local};
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    StdOut,
    StdErr,
}

impl Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::StdOut => write!(f, "out"),
            OutputStream::StdErr => write!(f, "err"),
        }
    }
}

/// One line of child output, without its trailing newline.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub key: ProcessKey,
    pub display_path: String,
    pub stream: OutputStream,
    pub line: String,
    pub timestamp: DateTime<Local>,
}

impl OutputLine {
    pub fn new(
        key: ProcessKey,
        display_path: impl Into<String>,
        stream: OutputStream,
        line: impl Into<String>,
    ) -> Self {
        Self {
            key,
            display_path: display_path.into(),
            stream,
            line: line.into(),
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Starting,
    Exited,
    Restarting,
    Stopped,
    Failed,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            EventKind::Starting => "starting",
            EventKind::Exited => "exited",
            EventKind::Restarting => "restarting",
            EventKind::Stopped => "stopped",
            EventKind::Failed => "failed",
        };
        write!(f, "{kind}")
    }
}

/// A lifecycle event for one process (or, with the synthetic `group` key,
/// for a group as a whole).
#[derive(Debug, Clone)]
pub struct OutputEvent {
    pub key: ProcessKey,
    pub display_path: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Local>,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

impl OutputEvent {
    fn new(key: &ProcessKey, display_path: &str, kind: EventKind) -> Self {
        Self {
            key: key.clone(),
            display_path: display_path.to_string(),
            kind,
            timestamp: Local::now(),
            exit_code: None,
            message: None,
        }
    }

    pub fn starting(key: &ProcessKey, display_path: &str) -> Self {
        Self::new(key, display_path, EventKind::Starting)
    }

    pub fn exited(key: &ProcessKey, display_path: &str, exit_code: Option<i32>) -> Self {
        Self {
            exit_code,
            ..Self::new(key, display_path, EventKind::Exited)
        }
    }

    pub fn stopped(key: &ProcessKey, display_path: &str) -> Self {
        Self::new(key, display_path, EventKind::Stopped)
    }

    pub fn restarting(key: &ProcessKey, display_path: &str, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(key, display_path, EventKind::Restarting)
        }
    }

    pub fn failed(key: &ProcessKey, display_path: &str, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(key, display_path, EventKind::Failed)
        }
    }
}

/// Consumer for output records. Implementations must serialize their own
/// writes; producers call from many threads and never block on the sink.
pub trait OutputSink: Send + Sync {
    fn write(&self, line: OutputLine);
    fn write_event(&self, event: OutputEvent);
}
