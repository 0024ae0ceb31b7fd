//! # procvd
//!
//! Process-group supervisor for local multi-process workflows.
//!
//! Given a declarative configuration describing groups of child processes
//! and the dependencies between them, `procvd` launches the groups in
//! topological order, keeps their processes running according to per-group
//! restart policies, propagates restarts across the dependency graph and
//! multiplexes child output to a pluggable sink.

pub mod cli;
pub mod config;
pub mod event;
pub mod executor;
pub mod graph;
pub mod logging;
pub mod output;
pub mod supervisor;
pub mod utils;
