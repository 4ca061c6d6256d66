//! The module trait and module construction.

use crate::cycle::Cycle;
use crate::error::{GraphError, ModuleError};
use crate::value::SocketValue;

use super::context::ProcessContext;
use super::id::{ModuleId, ModuleIn, ModuleOut, SocketId};
use super::module_graph::ModuleGraph;

/// A unit of computation that reads input sockets and writes output sockets.
///
/// Modules never call each other. The graph calls [`process`](Self::process)
/// at most once per cycle, and only when one of the module's outputs is read
/// (or the processing loop drives the module directly). All inputs have been
/// pulled from their sources by the time `process` runs.
///
/// # Example
///
/// ```rust
/// use vario_core::graph::{Module, ModuleGraph, ModuleIn, ModuleOut, ProcessContext};
/// use vario_core::ModuleError;
///
/// struct Doubler {
///     input: ModuleIn<f64>,
///     output: ModuleOut<f64>,
/// }
///
/// impl Module for Doubler {
///     fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
///         let v = ctx.get_optional(self.input).map(|v| v * 2.0);
///         ctx.set_optional(self.output, v);
///         Ok(())
///     }
/// }
///
/// let mut graph = ModuleGraph::new();
/// graph
///     .add_module("doubler", |b| Doubler {
///         input: b.input("in"),
///         output: b.output("out"),
///     })
///     .unwrap();
/// assert!(graph.socket_id("/doubler/out").is_some());
/// ```
pub trait Module {
    /// One-time setup before the first cycle.
    fn initialize(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Computes outputs from inputs for the current cycle.
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError>;

    /// Called after `process` returned an error.
    ///
    /// The default logs the error within the module's span.
    fn rescue(&mut self, cycle: &Cycle, error: &ModuleError) {
        tracing::warn!(cycle = cycle.number(), %error, "module processing failed");
    }

    /// Whether all outputs are set to nil after a failed `process`.
    fn set_nil_on_error(&self) -> bool {
        true
    }
}

/// Registers a module's sockets while the module value is being built.
///
/// Passed to the closure given to [`ModuleGraph::add_module`]. Socket paths
/// are `/<instance>/<name>`. Registration errors are collected and returned
/// from `add_module`, which then removes the half-built module again.
pub struct ModuleBuilder<'g> {
    graph: &'g mut ModuleGraph,
    module: ModuleId,
    error: Option<GraphError>,
}

impl<'g> ModuleBuilder<'g> {
    pub(crate) fn new(graph: &'g mut ModuleGraph, module: ModuleId) -> Self {
        Self {
            graph,
            module,
            error: None,
        }
    }

    /// Id of the module under construction.
    pub fn id(&self) -> ModuleId {
        self.module
    }

    /// Registers an input socket.
    pub fn input<T: SocketValue>(&mut self, name: &str) -> ModuleIn<T> {
        let result = self.graph.add_input(self.module, name);
        self.keep(result, ModuleIn::new)
    }

    /// Registers an input socket with a fallback value.
    pub fn input_with_fallback<T: SocketValue>(&mut self, name: &str, fallback: T) -> ModuleIn<T> {
        let input = self.input(name);
        if self.error.is_none() {
            self.graph.set_fallback(input, Some(fallback));
        }
        input
    }

    /// Registers an output socket.
    pub fn output<T: SocketValue>(&mut self, name: &str) -> ModuleOut<T> {
        let result = self.graph.add_output(self.module, name);
        self.keep(result, ModuleOut::new)
    }

    pub(crate) fn finish(self) -> Option<GraphError> {
        self.error
    }

    fn keep<H>(&mut self, result: Result<H, GraphError>, dangling: fn(SocketId) -> H) -> H {
        result.unwrap_or_else(|e| {
            self.error.get_or_insert(e);
            dangling(SocketId::sentinel())
        })
    }
}
