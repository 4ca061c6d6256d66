//! Read access to sockets and the per-call processing context.

use crate::cycle::Cycle;
use crate::error::SocketError;
use crate::socket::{BasicSocket, Socket};
use crate::value::SocketValue;

use super::id::{ModuleId, ModuleOut, SocketId, TypedSocket};
use super::module_graph::ModuleGraph;

/// Read-only access to sockets by id.
///
/// Implemented by [`ModuleGraph`] and [`ProcessContext`], so change detectors
/// work both inside `process` and from the outside of the graph.
pub trait SocketView {
    /// Looks up a socket, type-erased.
    fn socket_dyn(&self, id: SocketId) -> Option<&dyn BasicSocket>;

    /// Looks up a socket through a typed handle.
    fn typed_socket<T: SocketValue>(&self, handle: impl TypedSocket<T>) -> Option<&Socket<T>>
    where
        Self: Sized,
    {
        self.socket_dyn(handle.socket_id())?.downcast_ref::<T>()
    }
}

/// Context handed to [`Module::process`](super::Module::process).
///
/// Reads return what the sockets hold after the graph pulled this module's
/// inputs. Writes are accepted only for outputs owned by the running module.
pub struct ProcessContext<'a> {
    graph: &'a mut ModuleGraph,
    module: ModuleId,
    cycle: &'a Cycle,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(graph: &'a mut ModuleGraph, module: ModuleId, cycle: &'a Cycle) -> Self {
        Self {
            graph,
            module,
            cycle,
        }
    }

    /// The cycle being processed.
    pub fn cycle(&self) -> &Cycle {
        self.cycle
    }

    /// Id of the running module.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Reads a socket: value, else fallback, else nil error.
    pub fn get<T: SocketValue>(&self, handle: impl TypedSocket<T>) -> Result<T, SocketError> {
        self.graph.get(handle)
    }

    /// Reads a socket: value, else fallback.
    pub fn get_optional<T: SocketValue>(&self, handle: impl TypedSocket<T>) -> Option<T> {
        self.graph.get_optional(handle)
    }

    /// Writes an output.
    pub fn set<T: SocketValue>(&mut self, output: ModuleOut<T>, value: T) {
        self.write(output, Some(value));
    }

    /// Writes nil to an output.
    pub fn set_nil<T: SocketValue>(&mut self, output: ModuleOut<T>) {
        self.write(output, None);
    }

    /// Writes a value or nil to an output.
    pub fn set_optional<T: SocketValue>(&mut self, output: ModuleOut<T>, value: Option<T>) {
        self.write(output, value);
    }

    fn write<T: SocketValue>(&mut self, output: ModuleOut<T>, value: Option<T>) {
        let time = self.cycle.update_time();
        let module = self.module;
        let Some(entry) = self.graph.entry_mut(output.id()) else {
            return;
        };
        if entry.owner != Some(module) {
            tracing::warn!(
                path = entry.cell.path(),
                "ignoring write to a socket the module does not own"
            );
            return;
        }
        if let Some(socket) = entry.cell.downcast_mut::<T>() {
            socket.set_optional(value);
            socket.stamp(time);
        }
    }
}

impl SocketView for ProcessContext<'_> {
    fn socket_dyn(&self, id: SocketId) -> Option<&dyn BasicSocket> {
        self.graph.socket_dyn(id)
    }
}
