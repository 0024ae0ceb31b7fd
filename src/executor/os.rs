//! OS-backed process executor.
//!
//! Inherit-mode processes run directly with the supervisor's stdio. File-mode
//! processes run through a generated wrapper script that appends both streams
//! to a rotated log file, which a [`FileTailer`] follows back into the sink.

use super::{ExecutionRequest, ExecutionResult, ExecutorError, ProcessExecutor};
use crate::config::OutputPolicy;
use crate::event::cancellation::CancelToken;
use crate::executor::rotation::rotate_at_start;
use crate::executor::script::write_wrapper_script;
use crate::executor::tailer::FileTailer;
use crate::output::{OutputEvent, OutputSink};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OsExecutor {
    poll_interval: Duration,
    /// Grace period between the polite termination request and the hard kill.
    shutdown_timeout: Duration,
}

impl Default for OsExecutor {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl OsExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

enum WaitOutcome {
    Exited(Option<i32>),
    Cancelled,
}

impl ProcessExecutor for OsExecutor {
    fn run(
        &self,
        request: &ExecutionRequest,
        sink: &Arc<dyn OutputSink>,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        sink.write_event(OutputEvent::starting(&request.key, &request.display_path));

        if cancel.is_cancelled() {
            // Torn down before the child was ever spawned.
            debug!(key = %request.key, "cancelled before spawn");
            sink.write_event(OutputEvent::stopped(&request.key, &request.display_path));
            return ExecutionResult::stopped();
        }

        let outcome = match &request.output {
            OutputPolicy::Inherit => self.run_inherited(request, cancel),
            OutputPolicy::File {
                path,
                max_bytes,
                max_files,
            } => self.run_to_file(request, sink, cancel, path, *max_bytes, *max_files),
        };

        match outcome {
            Ok(WaitOutcome::Exited(exit_code)) => {
                sink.write_event(OutputEvent::exited(
                    &request.key,
                    &request.display_path,
                    exit_code,
                ));
                ExecutionResult::exited(exit_code)
            }
            Ok(WaitOutcome::Cancelled) => {
                sink.write_event(OutputEvent::stopped(&request.key, &request.display_path));
                ExecutionResult::stopped()
            }
            Err(err) => {
                sink.write_event(OutputEvent::failed(
                    &request.key,
                    &request.display_path,
                    err.to_string(),
                ));
                ExecutionResult::failed(err)
            }
        }
    }
}

impl OsExecutor {
    fn run_inherited(
        &self,
        request: &ExecutionRequest,
        cancel: &CancelToken,
    ) -> Result<WaitOutcome, ExecutorError> {
        let mut command = Command::new(&request.program);
        command.args(&request.arguments);
        configure(&mut command, request);

        let child = spawn(command, &request.program)?;
        Ok(self.wait_for_exit(child, cancel))
    }

    fn run_to_file(
        &self,
        request: &ExecutionRequest,
        sink: &Arc<dyn OutputSink>,
        cancel: &CancelToken,
        log_path: &Path,
        max_bytes: u64,
        max_files: u32,
    ) -> Result<WaitOutcome, ExecutorError> {
        let log_setup = |source| ExecutorError::LogSetup {
            path: log_path.to_path_buf(),
            source,
        };

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(log_setup)?;
        }

        // Rotation trouble is reported but never blocks the run.
        if let Err(err) = rotate_at_start(log_path, max_bytes, max_files) {
            warn!(key = %request.key, %err, "log rotation failed");
            sink.write_event(OutputEvent::failed(
                &request.key,
                &request.display_path,
                format!("log rotation failed: {err}"),
            ));
        }

        let tail_from = ensure_log_file(log_path).map_err(log_setup)?;
        let script = write_wrapper_script(request, log_path).map_err(log_setup)?;

        let mut command = wrapper_command(&script);
        if request.shell_command.is_none() {
            // Shell-command wrappers already embed the full command line.
            command.args(&request.arguments);
        }
        configure(&mut command, request);
        command.stdin(Stdio::null());

        let child = spawn(command, &request.program)?;

        let process_done = Arc::new(AtomicBool::new(false));
        let tailer = FileTailer::new(
            log_path.to_path_buf(),
            request.key.clone(),
            request.display_path.clone(),
            tail_from,
            Arc::clone(&process_done),
            cancel.clone(),
            Arc::clone(sink),
        )
        .spawn();

        let outcome = self.wait_for_exit(child, cancel);

        // The exit marker lets the tailer finish its final drain and stop.
        process_done.store(true, Ordering::Release);
        let _ = tailer.join();

        Ok(outcome)
    }

    /// Polls the child until it exits or the token trips; on cancellation
    /// performs the graceful-then-forced shutdown and reports `Cancelled`.
    fn wait_for_exit(&self, mut child: Child, cancel: &CancelToken) -> WaitOutcome {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return WaitOutcome::Exited(exit_code(&status)),
                Ok(None) => {}
                Err(err) => {
                    warn!(%err, "could not query child state, killing it");
                    let _ = child.kill();
                    let code = child.wait().ok().as_ref().and_then(exit_code);
                    return WaitOutcome::Exited(code);
                }
            }
            if cancel.is_cancelled() {
                self.terminate(&mut child);
                return WaitOutcome::Cancelled;
            }
            cancel.wait(self.poll_interval);
        }
    }

    #[cfg(unix)]
    fn terminate(&self, child: &mut Child) {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;
        use std::time::Instant;

        let pid = Pid::from_raw(child.id() as i32);
        debug!(%pid, "stopping child process");
        if signal::kill(pid, Signal::SIGTERM).is_ok() {
            let deadline = Instant::now() + self.shutdown_timeout;
            while Instant::now() < deadline {
                if let Ok(Some(_)) = child.try_wait() {
                    return;
                }
                std::thread::sleep(self.poll_interval);
            }
        }
        let _ = child.kill();
        let _ = child.wait();
    }

    #[cfg(not(unix))]
    fn terminate(&self, child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn configure(command: &mut Command, request: &ExecutionRequest) {
    command.current_dir(&request.working_directory);
    for (name, value) in &request.environment {
        match value {
            Some(value) => {
                command.env(name, value);
            }
            None => {
                command.env_remove(name);
            }
        }
    }
}

fn spawn(mut command: Command, program: &Path) -> Result<Child, ExecutorError> {
    debug!(program = %program.display(), "spawning child process");
    command.spawn().map_err(|source| ExecutorError::Spawn {
        program: program.display().to_string(),
        source,
    })
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn wrapper_command(script: &Path) -> Command {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(script);
            command
        }
    } else {
        fn wrapper_command(script: &Path) -> Command {
            Command::new(script)
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Children killed by a signal carry no exit code; fall back to the
        /// signal number so the restart policy still has something to act on.
        fn exit_code(status: &ExitStatus) -> Option<i32> {
            use std::os::unix::process::ExitStatusExt;
            status.code().or_else(|| status.signal())
        }
    } else {
        fn exit_code(status: &ExitStatus) -> Option<i32> {
            status.code()
        }
    }
}

/// Creates the log file if absent and reports its current length, which is
/// where the tailer starts reading.
fn ensure_log_file(path: &Path) -> io::Result<u64> {
    let file = OpenOptions::new()
        .append(true)
        .read(true)
        .create(true)
        .open(path)?;
    Ok(file.metadata()?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputPolicy, ProcessKey, ResolvedProcess};
    use crate::output::buffer::BufferSink;
    use crate::output::EventKind;
    use crate::utils::threads::spawn_named_thread;
    use std::time::Instant;
    use tempfile::tempdir;

    fn sink() -> (Arc<BufferSink>, Arc<dyn OutputSink>) {
        let buffer = Arc::new(BufferSink::new());
        (buffer.clone(), buffer as Arc<dyn OutputSink>)
    }

    fn event_kinds(buffer: &BufferSink, key: &ProcessKey) -> Vec<EventKind> {
        buffer.events(key).iter().map(|event| event.kind).collect()
    }

    #[cfg(unix)]
    fn shell(key: ProcessKey, command: &str) -> ResolvedProcess {
        ResolvedProcess::new(key, "/bin/sh")
            .with_arguments(vec!["-c".to_string(), command.to_string()])
            .with_shell_command(command)
            .with_display_path(command)
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_reports_exit_zero() {
        let key = ProcessKey::new("core", "ok");
        let request = ExecutionRequest::from(&shell(key.clone(), "exit 0"));
        let (buffer, sink) = sink();

        let result = OsExecutor::new().run(&request, &sink, &CancelToken::new());

        assert_eq!(result.exit_code, Some(0));
        assert!(!result.cancelled);
        assert!(!result.is_faulted());
        assert_eq!(event_kinds(&buffer, &key), [EventKind::Starting, EventKind::Exited]);
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_is_propagated() {
        let key = ProcessKey::new("core", "fails");
        let request = ExecutionRequest::from(&shell(key.clone(), "exit 3"));
        let (buffer, sink) = sink();

        let result = OsExecutor::new().run(&request, &sink, &CancelToken::new());

        assert_eq!(result.exit_code, Some(3));
        assert_eq!(buffer.events(&key)[1].exit_code, Some(3));
    }

    #[test]
    fn spawn_failure_is_a_faulted_result() {
        let key = ProcessKey::new("core", "ghost");
        let request = ExecutionRequest::from(&ResolvedProcess::new(
            key.clone(),
            "./definitely-not-a-command",
        ));
        let (buffer, sink) = sink();

        let result = OsExecutor::new().run(&request, &sink, &CancelToken::new());

        assert!(result.is_faulted());
        assert_eq!(result.exit_code, None);
        assert_eq!(event_kinds(&buffer, &key), [EventKind::Starting, EventKind::Failed]);
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_stops_a_blocked_child() {
        let key = ProcessKey::new("core", "sleeper");
        let request = ExecutionRequest::from(&shell(key.clone(), "sleep 30"));
        let (buffer, sink) = sink();
        let cancel = CancelToken::new();

        let canceller = {
            let cancel = cancel.clone();
            spawn_named_thread("canceller", move || {
                std::thread::sleep(Duration::from_millis(200));
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let executor = OsExecutor::new().with_shutdown_timeout(Duration::from_secs(1));
        let result = executor.run(&request, &sink, &cancel);
        canceller.join().unwrap();

        assert!(result.cancelled);
        assert_eq!(result.exit_code, None);
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(event_kinds(&buffer, &key), [EventKind::Starting, EventKind::Stopped]);
    }

    #[test]
    fn pre_tripped_token_reports_starting_then_stopped() {
        let key = ProcessKey::new("core", "never");
        let request = ExecutionRequest::from(&ResolvedProcess::new(key.clone(), "/bin/true"));
        let (buffer, sink) = sink();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = OsExecutor::new().run(&request, &sink, &cancel);

        assert!(result.cancelled);
        assert_eq!(event_kinds(&buffer, &key), [EventKind::Starting, EventKind::Stopped]);
    }

    #[cfg(unix)]
    #[test]
    fn file_mode_logs_and_tails_output() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("logs").join("core").join("echoer.log");
        let key = ProcessKey::new("core", "echoer");
        let request = ExecutionRequest::from(&shell(key.clone(), "echo file-test").with_output(
            OutputPolicy::File {
                path: log.clone(),
                max_bytes: 0,
                max_files: 1,
            },
        ));
        let (buffer, sink) = sink();

        let result = OsExecutor::new().run(&request, &sink, &CancelToken::new());

        assert_eq!(result.exit_code, Some(0));
        let contents = fs::read_to_string(&log).unwrap();
        assert!(contents.contains("file-test"));
        assert!(buffer
            .lines(&key)
            .iter()
            .any(|line| line.contains("file-test")));
    }

    #[cfg(unix)]
    #[test]
    fn file_mode_applies_environment() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("env.log");
        let key = ProcessKey::new("core", "env");
        let mut process = shell(key.clone(), "echo value=$PROCVD_TEST_VALUE").with_output(
            OutputPolicy::File {
                path: log,
                max_bytes: 0,
                max_files: 1,
            },
        );
        process
            .environment
            .insert("PROCVD_TEST_VALUE".to_string(), Some("42".to_string()));
        let request = ExecutionRequest::from(&process);
        let (buffer, sink) = sink();

        let result = OsExecutor::new().run(&request, &sink, &CancelToken::new());

        assert_eq!(result.exit_code, Some(0));
        assert!(buffer.lines(&key).contains(&"value=42".to_string()));
    }
}
