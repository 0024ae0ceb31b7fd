//! Per-group supervision: spawning, exit watching, restart policy.

use super::{RestartReason, SupervisorEvent};
use crate::config::{ProcessKey, ResolvedProcessGroup, RestartMode};
use crate::event::cancellation::CancelToken;
use crate::event::channel::EventPublisher;
use crate::executor::{ExecutionRequest, ExecutionResult, ProcessExecutor};
use crate::output::{OutputEvent, OutputSink};
use crate::utils::threads::spawn_named_thread;
use std::mem::take;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const RESTART_LIMIT_MESSAGE: &str = "restart limit reached";

/// Owns one group's lifecycle.
///
/// `run` drives the group until the stop token trips or the group reaches a
/// terminal state; `request_restart` asks for the current run to be torn
/// down and started again. A `SupervisorEvent::GroupRestarting` is published
/// before every restart so dependents can be restarted in turn.
pub struct GroupSupervisor {
    group: ResolvedProcessGroup,
    executor: Arc<dyn ProcessExecutor>,
    sink: Arc<dyn OutputSink>,
    events: EventPublisher<SupervisorEvent>,
    state: Mutex<RunState>,
}

/// The only mutable supervisor state; the mutex is held just long enough to
/// swap the token or flip the flag, never across a wait.
#[derive(Default)]
struct RunState {
    run_token: Option<CancelToken>,
    restart_requested: bool,
}

impl GroupSupervisor {
    pub fn new(
        group: ResolvedProcessGroup,
        executor: Arc<dyn ProcessExecutor>,
        sink: Arc<dyn OutputSink>,
        events: EventPublisher<SupervisorEvent>,
    ) -> Self {
        Self {
            group,
            executor,
            sink,
            events,
            state: Mutex::new(RunState::default()),
        }
    }

    pub fn group_name(&self) -> &str {
        &self.group.name
    }

    /// Asks the supervisor to tear down its current run and start over.
    ///
    /// Between runs the request is remembered and applied to the next run;
    /// during a run the run token is tripped, which the run routines
    /// classify as an external restart.
    pub fn request_restart(&self) {
        let mut state = self.state.lock().unwrap();
        match &state.run_token {
            Some(run_token) => run_token.cancel(),
            None => state.restart_requested = true,
        }
    }

    /// Runs the group until `stop` trips, the restart budget is exhausted,
    /// or (process mode) every process settles without an external restart.
    pub fn run(&self, stop: &CancelToken) {
        let group_key = ProcessKey::for_group(self.group.name.as_str());
        let mut restarts: u32 = 0;

        while !stop.is_cancelled() {
            let run_token = stop.child();
            {
                let mut state = self.state.lock().unwrap();
                if take(&mut state.restart_requested) {
                    // A restart arrived while idle; fold it into this run.
                    run_token.cancel();
                }
                state.run_token = Some(run_token.clone());
            }

            let reason = match self.group.restart_mode {
                RestartMode::Group => self.run_whole_group(&run_token, stop),
                RestartMode::Process => self.run_each_process(&run_token, stop),
            };

            self.state.lock().unwrap().run_token = None;

            if stop.is_cancelled() {
                break;
            }
            let Some(reason) = reason else {
                debug!(group = %self.group.name, "group settled, not restarting");
                break;
            };

            if self
                .group
                .restart_policy
                .max_restarts
                .is_some_and(|max| restarts >= max)
            {
                warn!(group = %self.group.name, "group {RESTART_LIMIT_MESSAGE}");
                self.sink.write_event(OutputEvent::failed(
                    &group_key,
                    &self.group.name,
                    RESTART_LIMIT_MESSAGE,
                ));
                break;
            }
            restarts += 1;

            info!(group = %self.group.name, %reason, "restarting group");
            self.sink.write_event(OutputEvent::restarting(
                &group_key,
                &self.group.name,
                reason.to_string(),
            ));
            let _ = self.events.publish(SupervisorEvent::GroupRestarting {
                group: self.group.name.clone(),
                reason,
            });

            if stop.wait(self.group.restart_policy.restart_delay) {
                break;
            }
        }
    }

    /// Group mode: all processes race; the first non-cancelled completion
    /// tears the rest down and triggers a group restart.
    fn run_whole_group(&self, run_token: &CancelToken, stop: &CancelToken) -> Option<RestartReason> {
        let (results_tx, results_rx) = crossbeam::channel::unbounded::<ExecutionResult>();
        let handles: Vec<_> = self
            .group
            .processes
            .iter()
            .map(|process| {
                let request = ExecutionRequest::from(process);
                let executor = Arc::clone(&self.executor);
                let sink = Arc::clone(&self.sink);
                let run_token = run_token.clone();
                let results_tx = results_tx.clone();
                spawn_named_thread(format!("proc {}", process.key), move || {
                    let result = executor.run(&request, &sink, &run_token);
                    let _ = results_tx.send(result);
                })
            })
            .collect();
        drop(results_tx);

        let mut reason = None;
        for result in results_rx.iter() {
            if stop.is_cancelled() {
                break;
            }
            if !result.cancelled {
                reason = Some(RestartReason::ProcessExit);
                run_token.cancel();
                break;
            }
            if run_token.is_cancelled() {
                reason = Some(RestartReason::ExternalRequest);
                break;
            }
            // A stray cancelled result with the run still live: keep racing
            // the remaining processes.
        }

        run_token.cancel();
        for handle in handles {
            let _ = handle.join();
        }

        match reason {
            Some(reason) => Some(reason),
            None if stop.is_cancelled() => None,
            None => Some(RestartReason::ExternalRequest),
        }
    }

    /// Process mode: every process loops independently under the shared run
    /// token, restarting itself within the group's budget.
    fn run_each_process(
        &self,
        run_token: &CancelToken,
        stop: &CancelToken,
    ) -> Option<RestartReason> {
        let handles: Vec<_> = self
            .group
            .processes
            .iter()
            .map(|process| {
                let request = ExecutionRequest::from(process);
                let executor = Arc::clone(&self.executor);
                let sink = Arc::clone(&self.sink);
                let run_token = run_token.clone();
                let policy = self.group.restart_policy.clone();
                spawn_named_thread(format!("proc {}", process.key), move || {
                    let mut restarts: u32 = 0;
                    loop {
                        let result = executor.run(&request, &sink, &run_token);
                        if run_token.is_cancelled() || result.cancelled {
                            break;
                        }
                        restarts += 1;
                        if policy.max_restarts.is_some_and(|max| restarts > max) {
                            warn!(key = %request.key, "process {RESTART_LIMIT_MESSAGE}");
                            sink.write_event(OutputEvent::failed(
                                &request.key,
                                &request.display_path,
                                RESTART_LIMIT_MESSAGE,
                            ));
                            break;
                        }
                        debug!(key = %request.key, restarts, "restarting process");
                        if run_token.wait(policy.restart_delay) {
                            break;
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            let _ = handle.join();
        }

        if stop.is_cancelled() {
            None
        } else if run_token.is_cancelled() {
            Some(RestartReason::ExternalRequest)
        } else {
            // Every process settled on its own; the group is done.
            None
        }
    }
}
