//! Process execution contract.
//!
//! A [`ProcessExecutor`] runs one process instance to completion. The
//! supervisor only sees this trait, so tests can substitute scripted
//! executors and the runtime can substitute the OS-backed one.

pub mod os;
pub mod rotation;
pub mod script;
pub mod tailer;

use crate::config::{OutputPolicy, ProcessKey, ResolvedProcess};
use crate::event::cancellation::CancelToken;
use crate::output::OutputSink;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare log output at `{path}`: {source}")]
    LogSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Everything the executor needs to spawn one process instance.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub key: ProcessKey,
    pub display_path: String,
    pub program: PathBuf,
    pub arguments: Vec<String>,
    pub working_directory: PathBuf,
    pub environment: BTreeMap<String, Option<String>>,
    pub shell_command: Option<String>,
    pub output: OutputPolicy,
}

impl From<&ResolvedProcess> for ExecutionRequest {
    fn from(process: &ResolvedProcess) -> Self {
        Self {
            key: process.key.clone(),
            display_path: process.display_path.clone(),
            program: process.executable_path.clone(),
            arguments: process.arguments.clone(),
            working_directory: process.working_directory.clone(),
            environment: process.environment.clone(),
            shell_command: process.shell_command.clone(),
            output: process.output.clone(),
        }
    }
}

/// How one executor invocation ended.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Absent when the run was cancelled or faulted.
    pub exit_code: Option<i32>,
    pub cancelled: bool,
    pub failure: Option<ExecutorError>,
}

impl ExecutionResult {
    pub fn exited(exit_code: Option<i32>) -> Self {
        Self {
            exit_code,
            cancelled: false,
            failure: None,
        }
    }

    pub fn stopped() -> Self {
        Self {
            exit_code: None,
            cancelled: true,
            failure: None,
        }
    }

    pub fn failed(failure: ExecutorError) -> Self {
        Self {
            exit_code: None,
            cancelled: false,
            failure: Some(failure),
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.failure.is_some()
    }
}

/// Runs one process instance to completion.
///
/// Implementations must emit a `Starting` event before spawning and exactly
/// one terminal event per invocation (`Exited`, `Stopped` or `Failed`), and
/// must honor the cancel token promptly, returning a cancelled result after
/// best-effort teardown of the child.
pub trait ProcessExecutor: Send + Sync {
    fn run(
        &self,
        request: &ExecutionRequest,
        sink: &Arc<dyn OutputSink>,
        cancel: &CancelToken,
    ) -> ExecutionResult;
}
