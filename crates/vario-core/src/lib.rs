//! Vario Core - sockets, modules and cycles for avionics dataflow
//!
//! This crate provides the runtime that flight-data modules plug into: typed
//! value cells ("sockets"), modules that own them, a graph that wires module
//! inputs to outputs, and a processing loop that pulls the whole thing up to
//! date once per cycle.
//!
//! # Core Abstractions
//!
//! ## Values
//!
//! - [`Socket`] - Nilable, versioned value cell with an optional fallback
//! - [`BasicSocket`] - Type-erased socket operations (path, serial, text and blob I/O)
//! - [`SocketValue`] / [`ValueKind`] - The closed set of storable value types
//! - [`si`] - Physical quantities ([`Length`], [`Speed`], [`Pressure`], ...) with units
//!
//! ## Graph
//!
//! - [`ModuleGraph`](graph::ModuleGraph) - Arena of modules and sockets, wiring and pull execution
//! - [`Module`](graph::Module) - Trait implemented by every processing unit
//! - [`ModuleIn`](graph::ModuleIn) / [`ModuleOut`](graph::ModuleOut) - Typed socket handles
//!
//! ## Time
//!
//! - [`Cycle`] - Frozen "now" shared by everything processed in one tick
//! - [`ProcessingLoop`] - Fixed-rate driver producing cycles
//!
//! ## Change Detection
//!
//! - [`SocketChanged`], [`SocketValueChanged`] - Per-socket change detectors
//! - [`SocketObserver`] - Fires a callback when any watched socket changed
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vario_core::graph::{Module, ModuleGraph, ModuleIn, ModuleOut, ProcessContext};
//! use vario_core::{ModuleError, ProcessingLoop, Speed};
//!
//! struct Tas {
//!     ias: ModuleIn<Speed>,
//!     tas: ModuleOut<Speed>,
//! }
//!
//! impl Module for Tas {
//!     fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
//!         let ias = ctx.get_optional(self.ias);
//!         ctx.set_optional(self.tas, ias.map(|v| v * 1.1));
//!         Ok(())
//!     }
//! }
//!
//! let mut graph = ModuleGraph::new();
//! graph.add_module("tas", |b| Tas {
//!     ias: b.input("ias"),
//!     tas: b.output("tas"),
//! })?;
//! let ias = graph.input::<Speed>("/tas/ias")?;
//! let tas = graph.output::<Speed>("/tas/tas")?;
//! graph.connect_constant(ias, Speed::from_knots(100.0))?;
//!
//! let mut pl = ProcessingLoop::new(graph, Duration::from_millis(20));
//! pl.execute_cycle(Duration::ZERO)?;
//! let knots = pl.graph().get(tas).map(Speed::knots);
//! assert!((knots.unwrap() - 110.0).abs() < 1e-9);
//! # Ok::<(), vario_core::GraphError>(())
//! ```

pub mod accounting;
pub mod convert;
pub mod cycle;
pub mod error;
pub mod graph;
pub mod observe;
pub mod processing_loop;
pub mod si;
pub mod socket;
pub mod value;

pub use accounting::TimingStats;
pub use convert::ConversionSettings;
pub use cycle::Cycle;
pub use error::{ConversionError, GraphError, ModuleError, SocketError};
pub use observe::{SocketChanged, SocketObserver, SocketValueChanged};
pub use processing_loop::ProcessingLoop;
pub use si::{Angle, Dimension, Frequency, Length, Pressure, Speed, Temperature, Time, Unit};
pub use socket::{BasicSocket, Socket};
pub use value::{SocketValue, ValueKind};
