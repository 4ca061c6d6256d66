//! Building a processing loop from a machine.

use vario_core::ProcessingLoop;
use vario_core::graph::ModuleGraph;
use vario_modules::{ModuleRegistry, Settings};

use crate::error::ConfigError;
use crate::machine::Machine;
use crate::validation::{ValidationError, validate_machine};

impl Machine {
    /// Adds the machine's modules and wiring to `graph`.
    ///
    /// Steps run in file order: modules, connections, constants, fallbacks.
    /// The first failure aborts; modules added before it stay in the graph.
    pub fn apply(&self, graph: &mut ModuleGraph, registry: &ModuleRegistry) -> Result<(), ConfigError> {
        validate_machine(self, registry)?;
        let conversion = self.conversion.to_settings();

        for entry in &self.modules {
            let settings = entry
                .settings
                .iter()
                .collect::<Settings>()
                .with_conversion(conversion.clone());
            registry
                .create(&entry.module_type, graph, &entry.instance, &settings)
                .map_err(|source| ConfigError::Module {
                    instance: entry.instance.clone(),
                    source,
                })?;
        }
        for connection in &self.connections {
            graph.connect_paths(&connection.input, &connection.output)?;
        }
        for constant in &self.constants {
            graph.connect_constant_str(&constant.input, &constant.value, &conversion)?;
        }
        for fallback in &self.fallbacks {
            graph.set_fallback_str(&fallback.socket, &fallback.value, &conversion)?;
        }
        tracing::debug!(
            "machine_apply: '{}' with {} modules, {} connections",
            self.name,
            self.modules.len(),
            self.connections.len()
        );
        Ok(())
    }

    /// Builds a validated processing loop for this machine.
    ///
    /// Module initialization (and with it the check for required settings)
    /// happens when the loop starts.
    pub fn build(&self, registry: &ModuleRegistry) -> Result<ProcessingLoop, ConfigError> {
        let mut graph = ModuleGraph::new();
        self.apply(&mut graph, registry)?;
        graph.validate()?;

        let mut roots = Vec::with_capacity(self.roots.len());
        for path in &self.roots {
            let id = graph
                .socket_id(path)
                .ok_or_else(|| vario_core::GraphError::PathNotFound(path.clone()))?;
            roots.push(id);
        }

        let period = self
            .period()
            .ok_or(ValidationError::InvalidFrequency(self.frequency_hz))?;
        let mut pl = ProcessingLoop::new(graph, period);
        for root in roots {
            pl.add_root(root);
        }
        Ok(pl)
    }
}
