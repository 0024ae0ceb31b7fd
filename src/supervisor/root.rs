//! Top-level supervision: one group supervisor per group, launched in
//! dependency order, with restarts propagated to dependents.

use super::{GroupSupervisor, SupervisorEvent};
use crate::config::ResolvedProcessConfig;
use crate::event::cancellation::CancelToken;
use crate::event::channel::{pub_sub, EventConsumer};
use crate::executor::ProcessExecutor;
use crate::graph::{DependencyGraph, GraphError};
use crate::output::OutputSink;
use crate::utils::threads::spawn_named_thread;
use crossbeam::channel::RecvTimeoutError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs every group supervisor concurrently and fans restart notifications
/// out to the restarting group's dependents.
///
/// Start order is a dispatch hint for deterministic start-up logs; groups do
/// not wait for their dependencies to become ready.
pub struct RootSupervisor {
    graph: DependencyGraph,
    supervisors: BTreeMap<String, Arc<GroupSupervisor>>,
    events: EventConsumer<SupervisorEvent>,
}

impl std::fmt::Debug for RootSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootSupervisor").finish_non_exhaustive()
    }
}

impl RootSupervisor {
    pub fn new(
        config: &ResolvedProcessConfig,
        executor: Arc<dyn ProcessExecutor>,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, GraphError> {
        let graph = DependencyGraph::build(config)?;
        let (events_publisher, events) = pub_sub();

        let supervisors = config
            .groups
            .values()
            .map(|group| {
                let supervisor = GroupSupervisor::new(
                    group.clone(),
                    Arc::clone(&executor),
                    Arc::clone(&sink),
                    events_publisher.clone(),
                );
                (group.name.clone(), Arc::new(supervisor))
            })
            .collect();

        Ok(Self {
            graph,
            supervisors,
            events,
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Blocks until every group supervisor has returned, either because
    /// `stop` tripped or because the group reached a terminal state.
    pub fn run(self, stop: &CancelToken) {
        let Self {
            graph,
            supervisors,
            events,
        } = self;
        let graph = Arc::new(graph);
        let done = Arc::new(AtomicBool::new(false));

        let dispatcher = {
            let graph = Arc::clone(&graph);
            let supervisors = supervisors.clone();
            let done = Arc::clone(&done);
            spawn_named_thread("restart dispatcher", move || loop {
                match events.recv_timeout(DISPATCH_POLL_INTERVAL) {
                    Ok(SupervisorEvent::GroupRestarting { group, reason }) => {
                        for dependent in graph.dependents(&group) {
                            debug!(%group, %dependent, %reason, "propagating restart");
                            if let Some(supervisor) = supervisors.get(dependent) {
                                supervisor.request_restart();
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if done.load(Ordering::Acquire) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            })
        };

        let handles: Vec<_> = graph
            .start_order()
            .iter()
            .map(|name| {
                let supervisor = Arc::clone(&supervisors[name]);
                let stop = stop.clone();
                info!(group = %name, "starting group supervisor");
                spawn_named_thread(format!("group {name}"), move || supervisor.run(&stop))
            })
            .collect();

        for handle in handles {
            let _ = handle.join();
        }

        done.store(true, Ordering::Release);
        let _ = dispatcher.join();
        info!("all group supervisors returned");
    }
}
