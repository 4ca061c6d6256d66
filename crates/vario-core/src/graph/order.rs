//! Module dependency analysis.
//!
//! A module depends on another when one of its inputs reads, directly or
//! through a chain of inputs, from an output of the other module. Execution
//! never needs this order (fetching is demand-driven), but a dependency cycle
//! means some module would read its own stale output, so assembly code runs
//! [`ModuleGraph::validate`] before the first cycle.

use std::collections::VecDeque;

use crate::error::GraphError;

use super::id::{Direction, ModuleId, SocketId};
use super::module_graph::{DataSource, ModuleGraph};

impl ModuleGraph {
    /// Returns the module whose output ultimately feeds `input`, if any.
    pub fn upstream_module(&self, input: SocketId) -> Option<ModuleId> {
        let mut current = input;
        for _ in 0..=self.socket_count() {
            let entry = self.entry(current)?;
            match entry.direction {
                Direction::Output => return entry.owner,
                Direction::Input => current = entry.source.upstream()?,
            }
        }
        None
    }

    /// Modules that `module` reads from, without duplicates.
    pub fn dependencies(&self, module: ModuleId) -> Vec<ModuleId> {
        let Some(data) = self.module_data(module) else {
            return Vec::new();
        };
        let mut deps: Vec<ModuleId> = data
            .inputs
            .iter()
            .filter_map(|&input| self.upstream_module(input))
            .filter(|&up| self.module_data(up).is_some())
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Inputs of live modules that have no data source.
    pub fn unconnected_inputs(&self) -> Vec<SocketId> {
        self.module_ids()
            .into_iter()
            .filter_map(|id| self.module_data(id))
            .flat_map(|data| data.inputs.iter().copied())
            .filter(|&input| {
                self.entry(input)
                    .is_some_and(|e| matches!(e.source, DataSource::None))
            })
            .collect()
    }

    /// Checks the module dependency graph for cycles.
    ///
    /// Returns the modules in an order where every module comes after the
    /// modules it reads from, or `CycleDetected` naming the modules involved.
    /// A module reading its own output counts as a cycle.
    pub fn validate(&self) -> Result<Vec<ModuleId>, GraphError> {
        let ids = self.module_ids();
        let n = ids.iter().map(|id| id.0 as usize + 1).max().unwrap_or(0);
        let mut in_degree = vec![0usize; n];
        let mut downstream: Vec<Vec<ModuleId>> = vec![Vec::new(); n];

        for &id in &ids {
            for dep in self.dependencies(id) {
                downstream[dep.0 as usize].push(id);
                in_degree[id.0 as usize] += 1;
            }
        }

        // Pop from the front so independent modules keep their id order.
        let mut queue: VecDeque<ModuleId> = ids
            .iter()
            .copied()
            .filter(|id| in_degree[id.0 as usize] == 0)
            .collect();
        let mut sorted = Vec::with_capacity(ids.len());

        while let Some(id) = queue.pop_front() {
            sorted.push(id);
            for &next in &downstream[id.0 as usize] {
                in_degree[next.0 as usize] -= 1;
                if in_degree[next.0 as usize] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if sorted.len() != ids.len() {
            let stuck: Vec<String> = ids
                .iter()
                .filter(|id| in_degree[id.0 as usize] > 0)
                .filter_map(|&id| self.module_info(id).map(|m| m.instance.to_string()))
                .collect();
            tracing::debug!("graph_validate: cycle through {}", stuck.join(", "));
            return Err(GraphError::CycleDetected(stuck.join(", ")));
        }
        Ok(sorted)
    }
}
