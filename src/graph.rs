//! Start-order derivation over the group dependency graph.

use crate::config::ResolvedProcessConfig;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("group `{group}` depends on unknown group `{dependency}`")]
    UnknownDependency { group: String, dependency: String },

    #[error("dependency cycle detected among groups: {}", groups.join(", "))]
    CycleDetected { groups: Vec<String> },
}

/// Deterministic launch order plus the reverse adjacency used for restart
/// propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    start_order: Vec<String>,
    dependents: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Kahn's algorithm with the ready set kept ordered, so ties always
    /// resolve to the lexicographically smallest group name.
    pub fn build(config: &ResolvedProcessConfig) -> Result<Self, GraphError> {
        let mut in_degree: BTreeMap<&str, usize> = config
            .groups
            .keys()
            .map(|name| (name.as_str(), 0))
            .collect();
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for (name, group) in &config.groups {
            for dependency in &group.dependencies {
                if !config.groups.contains_key(dependency) {
                    return Err(GraphError::UnknownDependency {
                        group: name.clone(),
                        dependency: dependency.clone(),
                    });
                }
                // The set dedups repeated declarations so in-degrees stay in
                // step with the decrements below.
                if dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .insert(name.as_str())
                {
                    *in_degree.get_mut(name.as_str()).expect("group is present") += 1;
                }
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut start_order = Vec::with_capacity(config.groups.len());

        while let Some(name) = ready.pop_first() {
            start_order.push(name.to_string());
            for &dependent in dependents.get(name).into_iter().flatten() {
                let degree = in_degree.get_mut(dependent).expect("group is present");
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if start_order.len() < config.groups.len() {
            let groups = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(GraphError::CycleDetected { groups });
        }

        let dependents = dependents
            .into_iter()
            .map(|(name, dependents)| {
                (
                    name.to_string(),
                    dependents.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();

        Ok(Self {
            start_order,
            dependents,
        })
    }

    pub fn start_order(&self) -> &[String] {
        &self.start_order
    }

    /// Groups that declare `group` as a dependency, sorted by name. Empty
    /// for unknown groups.
    pub fn dependents(&self, group: &str) -> &[String] {
        self.dependents
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
