//! Shared helpers for CLI commands.

use anyhow::Context;
use std::path::Path;
use vario_config::Machine;
use vario_core::graph::{ModuleGraph, SocketId};
use vario_core::{ConversionSettings, ProcessingLoop};
use vario_modules::ModuleRegistry;

/// Loads a machine file and builds its processing loop.
pub fn load(path: &Path) -> anyhow::Result<(Machine, ProcessingLoop)> {
    let machine = Machine::load(path)?;
    let pl = machine
        .build(&ModuleRegistry::new())
        .with_context(|| format!("failed to build machine '{}'", machine.name))?;
    Ok((machine, pl))
}

/// Resolves socket paths, failing on the first unknown one.
pub fn resolve(graph: &ModuleGraph, paths: &[String]) -> anyhow::Result<Vec<SocketId>> {
    paths
        .iter()
        .map(|p| {
            graph
                .socket_id(p)
                .ok_or_else(|| anyhow::anyhow!("no socket at path '{p}'"))
        })
        .collect()
}

/// Current text value of a socket.
pub fn value_text(graph: &ModuleGraph, id: SocketId, conversion: &ConversionSettings) -> String {
    graph
        .socket_info(id)
        .map(|info| info.socket.to_string(conversion))
        .unwrap_or_else(|| conversion.nil_value.clone())
}
