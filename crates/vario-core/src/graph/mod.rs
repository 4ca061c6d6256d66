//! Module graph for the vario socket/cycle core.
//!
//! Modules own sockets; inputs pull from outputs; every read happens in the
//! context of a [`Cycle`](crate::Cycle).
//!
//! # Architecture
//!
//! - [`ModuleGraph`]: slot arenas of modules and sockets addressed by
//!   [`ModuleId`] and [`SocketId`]. Ids are sequential and never reused.
//! - [`ModuleIn`] / [`ModuleOut`]: typed, copyable handles. Module structs
//!   keep the handles of their own sockets and read/write them through the
//!   [`ProcessContext`] passed to [`Module::process`].
//! - Pull execution: [`ModuleGraph::fetch`] brings one socket up to date for
//!   a cycle, transitively running the modules it depends on. Per-socket and
//!   per-module cycle memos guarantee one `process` call per module per cycle.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vario_core::Cycle;
//! use vario_core::graph::{Module, ModuleGraph, ModuleIn, ModuleOut, ProcessContext};
//! use vario_core::ModuleError;
//!
//! struct Constant(ModuleOut<f64>);
//!
//! impl Module for Constant {
//!     fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
//!         ctx.set(self.0, 1.5);
//!         Ok(())
//!     }
//! }
//!
//! struct Reader(ModuleIn<f64>);
//!
//! impl Module for Reader {
//!     fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut graph = ModuleGraph::new();
//! let mut out = None;
//! graph.add_module("source", |b| {
//!     let o = b.output("value");
//!     out = Some(o);
//!     Constant(o)
//! })?;
//! let mut input = None;
//! graph.add_module("reader", |b| {
//!     let i = b.input_with_fallback("value", 0.0);
//!     input = Some(i);
//!     Reader(i)
//! })?;
//! let (out, input) = (out.unwrap(), input.unwrap());
//!
//! assert_eq!(graph.get(input), Ok(0.0));
//! graph.connect(input, out)?;
//!
//! let cycle = Cycle::new(1, Duration::ZERO, Duration::from_millis(20), Duration::from_millis(20));
//! graph.fetch(input, &cycle);
//! assert_eq!(graph.get(input), Ok(1.5));
//! # Ok::<(), vario_core::GraphError>(())
//! ```

mod context;
mod id;
mod module;
mod module_graph;
mod order;

pub use context::{ProcessContext, SocketView};
pub use id::{Direction, ModuleId, ModuleIn, ModuleOut, SocketId, TypedSocket};
pub use module::{Module, ModuleBuilder};
pub use module_graph::{ModuleGraph, ModuleInfo, SocketInfo, SourceKind};
