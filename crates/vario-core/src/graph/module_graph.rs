//! Module graph: socket registration, wiring and pull-driven execution.
//!
//! [`ModuleGraph`] owns every module and every socket in two slot arenas.
//! Sockets hold a non-owning back-reference to their module; modules list the
//! sockets registered against them. Either side can go away first: removing a
//! module deregisters its sockets, and a deregistered socket stays readable
//! (as nil) for anyone still holding its handle.
//!
//! Execution is lazy. [`fetch`](ModuleGraph::fetch) on an output runs its
//! owning module for the given cycle unless it already ran; the module first
//! fetches all of its inputs, which in turn fetch their sources. Each socket
//! and each module remembers the last cycle number it was fetched or
//! processed in, so fan-out never causes duplicate work.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Instant;

use crate::accounting::TimingStats;
use crate::convert::ConversionSettings;
use crate::cycle::Cycle;
use crate::error::{GraphError, SocketError};
use crate::socket::{BasicSocket, Socket};
use crate::value::SocketValue;

use super::context::{ProcessContext, SocketView};
use super::id::{Direction, ModuleId, ModuleIn, ModuleOut, SocketId, TypedSocket};
use super::module::{Module, ModuleBuilder};

/// Where an input socket takes its value from.
pub(crate) enum DataSource {
    /// Unconnected: the input reads as nil (or its fallback).
    None,
    /// A fixed value held in a private socket.
    Constant(Box<dyn BasicSocket>),
    /// Another socket of the same type.
    Socket(SocketId),
    /// Another socket, possibly of another type, mapped through a function.
    Transform {
        source: SocketId,
        transform: Box<dyn Transform>,
    },
}

impl DataSource {
    /// The socket this source reads from, if any.
    pub(crate) fn upstream(&self) -> Option<SocketId> {
        match self {
            DataSource::Socket(src) | DataSource::Transform { source: src, .. } => Some(*src),
            DataSource::None | DataSource::Constant(_) => None,
        }
    }
}

/// Maps what a source socket reads as into an input's value.
pub(crate) trait Transform {
    /// Writes the mapped value into `target` if it differs from the current
    /// one. Returns whether it wrote, or `None` if either socket has an
    /// unexpected type.
    fn apply(&self, source: &dyn BasicSocket, target: &mut dyn BasicSocket) -> Option<bool>;
}

struct MapFn<A, B, F> {
    map: F,
    types: PhantomData<fn(Option<A>) -> Option<B>>,
}

impl<A, B, F> Transform for MapFn<A, B, F>
where
    A: SocketValue,
    B: SocketValue,
    F: Fn(Option<A>) -> Option<B>,
{
    fn apply(&self, source: &dyn BasicSocket, target: &mut dyn BasicSocket) -> Option<bool> {
        let value = (self.map)(source.downcast_ref::<A>()?.get_optional());
        Some(target.downcast_mut::<B>()?.assign_if_changed(value))
    }
}

/// Public summary of an input's data source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Not connected.
    None,
    /// Bound to a constant.
    Constant,
    /// Connected to another socket.
    Socket(SocketId),
    /// Connected to another socket through a transform.
    Transformed(SocketId),
}

/// Arena slot of a socket.
pub(crate) struct SocketEntry {
    pub direction: Direction,
    pub owner: Option<ModuleId>,
    pub cell: Box<dyn BasicSocket>,
    pub source: DataSource,
    pub readers: usize,
    pub fetched_cycle: u64,
}

/// Arena slot of a module.
pub(crate) struct ModuleData {
    pub instance: String,
    pub type_name: &'static str,
    /// Taken out while the module runs.
    pub module: Option<Box<dyn Module>>,
    pub inputs: Vec<SocketId>,
    pub outputs: Vec<SocketId>,
    pub last_processed_cycle: u64,
    pub processing: bool,
    pub initialized: bool,
    pub times: TimingStats,
}

/// Read-only description of a socket.
pub struct SocketInfo<'a> {
    /// Socket id.
    pub id: SocketId,
    /// Input or output.
    pub direction: Direction,
    /// Owning module, `None` once deregistered.
    pub owner: Option<ModuleId>,
    /// Number of inputs reading from this socket.
    pub readers: usize,
    /// Data source (always [`SourceKind::None`] for outputs).
    pub source: SourceKind,
    /// The socket itself.
    pub socket: &'a dyn BasicSocket,
}

/// Read-only description of a module.
pub struct ModuleInfo<'a> {
    /// Module id.
    pub id: ModuleId,
    /// Instance name.
    pub instance: &'a str,
    /// Short name of the module's Rust type.
    pub type_name: &'static str,
    /// Registered inputs.
    pub inputs: &'a [SocketId],
    /// Registered outputs.
    pub outputs: &'a [SocketId],
    /// Recent `process` durations.
    pub processing_times: &'a TimingStats,
}

/// Arena of modules and their sockets.
///
/// # Usage
///
/// 1. Add modules with [`add_module()`](Self::add_module); the builder closure
///    registers the module's sockets and returns the module value.
/// 2. Wire inputs with [`connect()`](Self::connect),
///    [`connect_constant()`](Self::connect_constant),
///    [`connect_transformed()`](Self::connect_transformed) or by path with
///    [`connect_paths()`](Self::connect_paths).
/// 3. Check the wiring with [`validate()`](Self::validate).
/// 4. Each cycle, [`fetch()`](Self::fetch) the sockets you need (or let a
///    [`ProcessingLoop`](crate::ProcessingLoop) drive the graph) and read them
///    with [`get()`](Self::get).
#[derive(Default)]
pub struct ModuleGraph {
    modules: Vec<Option<ModuleData>>,
    sockets: Vec<Option<SocketEntry>>,
    paths: HashMap<String, SocketId>,
    instances: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Modules ---

    /// Adds a module.
    ///
    /// `build` receives a [`ModuleBuilder`] to register sockets under
    /// `/<instance>/...` and returns the module value holding their handles.
    pub fn add_module<M, F>(&mut self, instance: &str, build: F) -> Result<ModuleId, GraphError>
    where
        M: Module + 'static,
        F: FnOnce(&mut ModuleBuilder<'_>) -> M,
    {
        if instance.is_empty() || instance.contains('/') {
            return Err(GraphError::InvalidInstance(instance.to_string()));
        }
        if self.instances.contains_key(instance) {
            return Err(GraphError::DuplicateInstance(instance.to_string()));
        }

        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Some(ModuleData {
            instance: instance.to_string(),
            type_name: short_type_name::<M>(),
            module: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            last_processed_cycle: 0,
            processing: false,
            initialized: false,
            times: TimingStats::default(),
        }));
        self.instances.insert(instance.to_string(), id);

        let mut builder = ModuleBuilder::new(self, id);
        let module = build(&mut builder);
        if let Some(err) = builder.finish() {
            let _ = self.remove_module(id);
            return Err(err);
        }

        if let Some(data) = self.module_data_mut(id) {
            data.module = Some(Box::new(module));
        }
        tracing::debug!("graph_add: module '{instance}' as {id}");
        Ok(id)
    }

    /// Removes a module, deregistering all of its sockets first.
    ///
    /// Handles to the module's sockets stay valid and read as nil.
    pub fn remove_module(&mut self, id: ModuleId) -> Result<(), GraphError> {
        let data = self.module_data(id).ok_or(GraphError::ModuleNotFound(id))?;
        let sockets: Vec<SocketId> = data
            .inputs
            .iter()
            .chain(data.outputs.iter())
            .copied()
            .collect();

        for socket in sockets {
            self.deregister(socket);
        }

        if let Some(data) = self.modules[id.0 as usize].take() {
            self.instances.remove(&data.instance);
            tracing::debug!("graph_remove: module '{}' ({id})", data.instance);
        }
        Ok(())
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.iter().flatten().count()
    }

    /// Looks up a module by instance name.
    pub fn module_id(&self, instance: &str) -> Option<ModuleId> {
        self.instances.get(instance).copied()
    }

    /// Describes a module.
    pub fn module_info(&self, id: ModuleId) -> Option<ModuleInfo<'_>> {
        self.module_data(id).map(|data| ModuleInfo {
            id,
            instance: &data.instance,
            type_name: data.type_name,
            inputs: &data.inputs,
            outputs: &data.outputs,
            processing_times: &data.times,
        })
    }

    /// Iterates over live modules in id order.
    pub fn modules(&self) -> impl Iterator<Item = ModuleInfo<'_>> {
        (0..self.modules.len()).filter_map(|i| self.module_info(ModuleId(i as u32)))
    }

    /// Ids of live modules in id order.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules().map(|m| m.id).collect()
    }

    /// Runs `initialize` on every module that has not been initialized yet.
    pub fn initialize_modules(&mut self) -> Result<(), GraphError> {
        for data in self.modules.iter_mut().flatten() {
            if data.initialized {
                continue;
            }
            if let Some(module) = data.module.as_mut() {
                module
                    .initialize()
                    .map_err(|source| GraphError::Initialization {
                        instance: data.instance.clone(),
                        source,
                    })?;
            }
            data.initialized = true;
            tracing::debug!("graph_init: module '{}'", data.instance);
        }
        Ok(())
    }

    // --- Sockets ---

    /// Registers an input socket on `owner`.
    pub fn add_input<T: SocketValue>(
        &mut self,
        owner: ModuleId,
        name: &str,
    ) -> Result<ModuleIn<T>, GraphError> {
        self.add_socket::<T>(owner, name, Direction::Input)
            .map(ModuleIn::new)
    }

    /// Registers an output socket on `owner`.
    pub fn add_output<T: SocketValue>(
        &mut self,
        owner: ModuleId,
        name: &str,
    ) -> Result<ModuleOut<T>, GraphError> {
        self.add_socket::<T>(owner, name, Direction::Output)
            .map(ModuleOut::new)
    }

    /// Deregisters a socket from its module.
    ///
    /// Clears an input's data source and the socket's value, and drops the
    /// path registration. The slot stays, so handles keep resolving and read
    /// as nil (or the fallback). A deregistered input refuses new data
    /// sources. Calling this on an already deregistered or removed socket
    /// only clears what is left.
    pub fn deregister(&mut self, id: impl Into<SocketId>) {
        let id = id.into();
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        let old_source = std::mem::replace(&mut entry.source, DataSource::None);
        let owner = entry.owner.take();
        let path = entry.cell.path().to_string();
        entry.cell.clear_if_set();

        if let Some(src) = old_source.upstream() {
            self.release_reader(src);
        }
        if let Some(owner) = owner {
            if let Some(data) = self.module_data_mut(owner) {
                data.inputs.retain(|s| *s != id);
                data.outputs.retain(|s| *s != id);
            }
            tracing::debug!("graph_deregister: '{path}'");
        }
        if self.paths.get(&path) == Some(&id) {
            self.paths.remove(&path);
        }
    }

    /// Deregisters and frees a socket slot. Inputs that read from it become
    /// unconnected. Returns false if the socket was already gone.
    pub fn remove_socket(&mut self, id: impl Into<SocketId>) -> bool {
        let id = id.into();
        self.deregister(id);
        let Some(entry) = self.sockets.get_mut(id.0 as usize).and_then(Option::take) else {
            return false;
        };

        for reader in self.sockets.iter_mut().flatten() {
            if reader.source.upstream() == Some(id) {
                reader.source = DataSource::None;
                reader.fetched_cycle = 0;
            }
        }
        tracing::debug!("graph_remove: socket '{}'", entry.cell.path());
        true
    }

    /// Number of live socket slots (registered or deregistered).
    pub fn socket_count(&self) -> usize {
        self.sockets.iter().flatten().count()
    }

    /// Looks up a registered socket by path.
    pub fn socket_id(&self, path: &str) -> Option<SocketId> {
        self.paths.get(path).copied()
    }

    /// Looks up a registered input by path, checking its type.
    pub fn input<T: SocketValue>(&self, path: &str) -> Result<ModuleIn<T>, GraphError> {
        self.typed_lookup::<T>(path, Direction::Input)
            .map(ModuleIn::new)
    }

    /// Looks up a registered output by path, checking its type.
    pub fn output<T: SocketValue>(&self, path: &str) -> Result<ModuleOut<T>, GraphError> {
        self.typed_lookup::<T>(path, Direction::Output)
            .map(ModuleOut::new)
    }

    /// Describes a socket.
    pub fn socket_info(&self, id: SocketId) -> Option<SocketInfo<'_>> {
        self.entry(id).map(|entry| SocketInfo {
            id,
            direction: entry.direction,
            owner: entry.owner,
            readers: entry.readers,
            source: match &entry.source {
                DataSource::None => SourceKind::None,
                DataSource::Constant(_) => SourceKind::Constant,
                DataSource::Socket(src) => SourceKind::Socket(*src),
                DataSource::Transform { source, .. } => SourceKind::Transformed(*source),
            },
            socket: entry.cell.as_ref(),
        })
    }

    /// Iterates over all socket slots in id order.
    pub fn sockets(&self) -> impl Iterator<Item = SocketInfo<'_>> {
        (0..self.sockets.len()).filter_map(|i| self.socket_info(SocketId(i as u32)))
    }

    /// Number of inputs currently reading from `id`.
    pub fn readers_count(&self, id: impl Into<SocketId>) -> usize {
        self.entry(id.into()).map_or(0, |e| e.readers)
    }

    /// Mutable type-erased access, for injecting values from text or blobs.
    pub fn socket_mut(&mut self, id: SocketId) -> Option<&mut dyn BasicSocket> {
        let entry = self.entry_mut(id)?;
        let cell: &mut dyn BasicSocket = entry.cell.as_mut();
        Some(cell)
    }

    /// Reads a socket: value, else fallback, else nil error. Stale handles
    /// read as nil.
    pub fn get<T: SocketValue>(&self, handle: impl TypedSocket<T>) -> Result<T, SocketError> {
        match self.typed_socket(handle) {
            Some(socket) => socket.get(),
            None => Err(SocketError::NilValue {
                path: handle.socket_id().to_string(),
            }),
        }
    }

    /// Reads a socket: value, else fallback.
    pub fn get_optional<T: SocketValue>(&self, handle: impl TypedSocket<T>) -> Option<T> {
        self.typed_socket(handle)?.get_optional()
    }

    /// Writes a value into a socket from outside of any module.
    ///
    /// Writing an input only lasts until its next fetch.
    pub fn set<T: SocketValue>(&mut self, handle: impl TypedSocket<T>, value: T) {
        if let Some(socket) = self.typed_socket_mut(handle) {
            socket.set(value);
        }
    }

    /// Writes nil into a socket from outside of any module.
    pub fn set_nil<T: SocketValue>(&mut self, handle: impl TypedSocket<T>) {
        if let Some(socket) = self.typed_socket_mut(handle) {
            socket.set_nil();
        }
    }

    /// Sets or clears a socket's fallback.
    pub fn set_fallback<T: SocketValue>(&mut self, handle: impl TypedSocket<T>, fallback: Option<T>) {
        if let Some(socket) = self.typed_socket_mut(handle) {
            socket.set_fallback(fallback);
        }
    }

    /// Sets a socket's fallback from text.
    pub fn set_fallback_str(
        &mut self,
        path: &str,
        text: &str,
        settings: &ConversionSettings,
    ) -> Result<(), GraphError> {
        let id = self.path_id(path)?;
        let entry = self
            .entry_mut(id)
            .ok_or(GraphError::SocketNotFound(id))?;
        entry
            .cell
            .set_fallback_from_string(text, settings)
            .map_err(|source| GraphError::Conversion {
                path: path.to_string(),
                source,
            })
    }

    // --- Wiring ---

    /// Connects `input` to read from `source` (an output or another input).
    ///
    /// Rebinding an already connected input is allowed and replaces the old
    /// source. Fails if the connection would make a module depend on itself.
    pub fn connect<T: SocketValue>(
        &mut self,
        input: ModuleIn<T>,
        source: impl TypedSocket<T>,
    ) -> Result<(), GraphError> {
        self.bind(input.id(), DataSource::Socket(source.socket_id()))
    }

    /// Binds `input` to a constant value.
    pub fn connect_constant<T: SocketValue>(
        &mut self,
        input: ModuleIn<T>,
        value: T,
    ) -> Result<(), GraphError> {
        let entry = self
            .entry(input.id())
            .ok_or(GraphError::SocketNotFound(input.id()))?;
        let mut constant = Socket::<T>::new(format!("{}#constant", entry.cell.path()));
        constant.set(value);
        self.bind(input.id(), DataSource::Constant(Box::new(constant)))
    }

    /// Unbinds `input`; it reads as nil (or its fallback) from the next fetch.
    pub fn disconnect<T: SocketValue>(&mut self, input: ModuleIn<T>) -> Result<(), GraphError> {
        self.bind(input.id(), DataSource::None)
    }

    /// Connects `input` to read `source` mapped through `transform`.
    ///
    /// The transform runs whenever the input is fetched and sees what the
    /// source reads as (nil included). The source counts the input as a
    /// reader and cycles are rejected as for [`connect()`](Self::connect).
    pub fn connect_transformed<A, B, F>(
        &mut self,
        input: ModuleIn<B>,
        source: impl TypedSocket<A>,
        transform: F,
    ) -> Result<(), GraphError>
    where
        A: SocketValue,
        B: SocketValue,
        F: Fn(Option<A>) -> Option<B> + 'static,
    {
        let source = source.socket_id();
        for (id, kind) in [(input.id(), B::KIND), (source, A::KIND)] {
            let entry = self.entry(id).ok_or(GraphError::SocketNotFound(id))?;
            if entry.cell.kind() != kind {
                return Err(GraphError::TypeMismatch {
                    path: entry.cell.path().to_string(),
                    expected: kind,
                    found: entry.cell.kind(),
                });
            }
        }
        let transform = MapFn {
            map: transform,
            types: PhantomData,
        };
        self.bind(
            input.id(),
            DataSource::Transform {
                source,
                transform: Box::new(transform),
            },
        )
    }

    /// Connects two sockets by path, checking that their types agree.
    pub fn connect_paths(&mut self, input: &str, source: &str) -> Result<(), GraphError> {
        let input_id = self.path_id(input)?;
        let source_id = self.path_id(source)?;
        self.bind(input_id, DataSource::Socket(source_id))
    }

    /// Binds the input at `path` to a constant parsed from `text`.
    pub fn connect_constant_str(
        &mut self,
        path: &str,
        text: &str,
        settings: &ConversionSettings,
    ) -> Result<(), GraphError> {
        let id = self.path_id(path)?;
        let entry = self.entry(id).ok_or(GraphError::SocketNotFound(id))?;
        let mut constant = entry.cell.blank(&format!("{path}#constant"));
        constant
            .from_string(text, settings)
            .map_err(|source| GraphError::Conversion {
                path: path.to_string(),
                source,
            })?;
        self.bind(id, DataSource::Constant(constant))
    }

    /// Data source of an input.
    pub fn source_of(&self, input: impl Into<SocketId>) -> Option<SourceKind> {
        self.socket_info(input.into()).map(|info| info.source)
    }

    fn bind(&mut self, input: SocketId, source: DataSource) -> Result<(), GraphError> {
        let entry = self.entry(input).ok_or(GraphError::SocketNotFound(input))?;
        let input_path = entry.cell.path().to_string();
        if entry.direction != Direction::Input {
            return Err(GraphError::InvalidConnection(format!(
                "'{input_path}' is an output and cannot be given a data source"
            )));
        }
        if entry.owner.is_none() {
            return Err(GraphError::InvalidConnection(format!(
                "'{input_path}' is deregistered"
            )));
        }

        let new_source = source.upstream();
        let description = match &source {
            DataSource::None => "nothing".to_string(),
            DataSource::Constant(constant) => {
                check_types(entry.cell.as_ref(), constant.as_ref())?;
                "constant".to_string()
            }
            DataSource::Socket(src) | DataSource::Transform { source: src, .. } => {
                let src = *src;
                let src_entry = self.entry(src).ok_or(GraphError::SocketNotFound(src))?;
                if src == input {
                    return Err(GraphError::InvalidConnection(format!(
                        "cannot connect '{input_path}' to itself"
                    )));
                }
                if matches!(source, DataSource::Socket(_)) {
                    check_types(entry.cell.as_ref(), src_entry.cell.as_ref())?;
                }
                let src_path = src_entry.cell.path().to_string();
                if self.depends_on(src, input) {
                    return Err(GraphError::CycleDetected(format!(
                        "{input_path} << {src_path}"
                    )));
                }
                if matches!(source, DataSource::Transform { .. }) {
                    format!("fn({src_path})")
                } else {
                    src_path
                }
            }
        };

        let Some(entry) = self.entry_mut(input) else {
            return Err(GraphError::SocketNotFound(input));
        };
        let old_source = std::mem::replace(&mut entry.source, source);
        entry.fetched_cycle = 0;
        if let Some(old) = old_source.upstream() {
            self.release_reader(old);
        }
        if let Some(src) = new_source.and_then(|src| self.entry_mut(src)) {
            src.readers += 1;
        }

        tracing::debug!("graph_connect: {input_path} << {description}");
        Ok(())
    }

    /// True if the value of `start` depends on `input`, or on the module
    /// owning `input`.
    fn depends_on(&self, start: SocketId, input: SocketId) -> bool {
        let input_owner = self.entry(input).and_then(|e| e.owner);
        let mut visited = vec![false; self.sockets.len()];
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if current == input {
                return true;
            }
            let idx = current.0 as usize;
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            let Some(entry) = self.entry(current) else {
                continue;
            };
            match entry.direction {
                Direction::Input => {
                    if let Some(src) = entry.source.upstream() {
                        stack.push(src);
                    }
                }
                Direction::Output => {
                    if let Some(owner) = entry.owner {
                        if Some(owner) == input_owner {
                            return true;
                        }
                        if let Some(data) = self.module_data(owner) {
                            stack.extend(data.inputs.iter().copied());
                        }
                    }
                }
            }
        }
        false
    }

    // --- Execution ---

    /// Brings a socket up to date for `cycle`.
    ///
    /// - Output owned by a module: runs the module unless it already ran in
    ///   this cycle.
    /// - Deregistered output: becomes nil.
    /// - Input: fetches its source and copies what the source reads as
    ///   (mapped through the transform, if any), writing (and bumping the
    ///   serial) only if the value changed.
    ///
    /// A socket is fetched at most once per cycle number.
    pub fn fetch(&mut self, id: impl Into<SocketId>, cycle: &Cycle) {
        let id = id.into();
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        if entry.fetched_cycle >= cycle.number() {
            return;
        }
        entry.fetched_cycle = cycle.number();

        match (entry.direction, entry.owner) {
            (Direction::Output, Some(owner)) => self.fetch_and_process(owner, cycle),
            (Direction::Output, None) => {
                if entry.cell.clear_if_set() {
                    entry.cell.stamp(cycle.update_time());
                }
            }
            (Direction::Input, _) => self.pull_input(id, cycle),
        }
    }

    /// Runs a module for `cycle` unless it already ran in it.
    ///
    /// The module's inputs are fetched first. If `process` fails, the
    /// module's [`rescue`](Module::rescue) hook runs and, unless the module
    /// opts out, all of its outputs become nil.
    pub fn fetch_and_process(&mut self, id: ModuleId, cycle: &Cycle) {
        let Some(data) = self.module_data_mut(id) else {
            return;
        };
        if data.last_processed_cycle >= cycle.number() {
            if data.processing {
                tracing::warn!(
                    parent: cycle.logger(),
                    "re-entrant fetch of module '{}'; its outputs keep the previous value",
                    data.instance
                );
            }
            return;
        }
        let Some(mut module) = data.module.take() else {
            return;
        };
        data.last_processed_cycle = cycle.number();
        data.processing = true;

        let span = tracing::debug_span!(parent: cycle.logger(), "module", instance = %data.instance);
        let _guard = span.enter();

        let mut i = 0;
        while let Some(input) = self.module_data(id).and_then(|d| d.inputs.get(i).copied()) {
            self.fetch(input, cycle);
            i += 1;
        }

        let started = Instant::now();
        let result = module.process(&mut ProcessContext::new(self, id, cycle));
        let elapsed = started.elapsed();

        if let Err(error) = &result {
            module.rescue(cycle, error);
            if module.set_nil_on_error() {
                self.nil_outputs(id, cycle);
            }
        }

        if let Some(data) = self.module_data_mut(id) {
            data.module = Some(module);
            data.processing = false;
            data.times.push(elapsed);
        }
    }

    fn pull_input(&mut self, id: SocketId, cycle: &Cycle) {
        let upstream = self.entry(id).and_then(|e| e.source.upstream());
        let time = cycle.update_time();

        if let Some(src) = upstream {
            self.fetch(src, cycle);
            if let Some((source, target)) = self.pair_mut(src, id) {
                let failed = source.cell.nil_by_fetch_error();
                let SocketEntry { cell, source: data_source, .. } = target;
                let written = match data_source {
                    DataSource::Transform { transform, .. } => {
                        transform.apply(source.cell.as_ref(), cell.as_mut())
                    }
                    _ => cell.pull_from(source.cell.as_ref()),
                };
                if written.unwrap_or(false) {
                    cell.stamp(time);
                }
                cell.set_nil_by_fetch_error(failed);
                return;
            }
        }

        let Some(SocketEntry { cell, source, .. }) = self.entry_mut(id) else {
            return;
        };
        let changed = match source {
            DataSource::Constant(constant) => cell.pull_from(&**constant).unwrap_or(false),
            _ => cell.clear_if_set(),
        };
        if changed {
            cell.stamp(time);
        }
    }

    fn nil_outputs(&mut self, id: ModuleId, cycle: &Cycle) {
        let outputs = self
            .module_data(id)
            .map(|d| d.outputs.clone())
            .unwrap_or_default();
        for output in outputs {
            if let Some(entry) = self.entry_mut(output) {
                if entry.cell.clear_if_set() {
                    entry.cell.stamp(cycle.update_time());
                }
                entry.cell.set_nil_by_fetch_error(true);
            }
        }
    }

    // --- Internal helpers ---

    fn add_socket<T: SocketValue>(
        &mut self,
        owner: ModuleId,
        name: &str,
        direction: Direction,
    ) -> Result<SocketId, GraphError> {
        let data = self
            .module_data(owner)
            .ok_or(GraphError::ModuleNotFound(owner))?;
        let path = format!("/{}/{}", data.instance, name.trim_start_matches('/'));
        if self.paths.contains_key(&path) {
            return Err(GraphError::DuplicatePath(path));
        }

        let id = SocketId(self.sockets.len() as u32);
        self.sockets.push(Some(SocketEntry {
            direction,
            owner: Some(owner),
            cell: Box::new(Socket::<T>::new(path.clone())),
            source: DataSource::None,
            readers: 0,
            fetched_cycle: 0,
        }));
        if let Some(data) = self.module_data_mut(owner) {
            match direction {
                Direction::Input => data.inputs.push(id),
                Direction::Output => data.outputs.push(id),
            }
        }
        tracing::debug!("graph_register: {direction} '{path}' as {id}");
        self.paths.insert(path, id);
        Ok(id)
    }

    fn typed_lookup<T: SocketValue>(
        &self,
        path: &str,
        direction: Direction,
    ) -> Result<SocketId, GraphError> {
        let id = self.path_id(path)?;
        let entry = self.entry(id).ok_or(GraphError::SocketNotFound(id))?;
        if entry.direction != direction {
            return Err(GraphError::InvalidConnection(format!(
                "'{path}' is not an {direction}put"
            )));
        }
        if entry.cell.downcast_ref::<T>().is_none() {
            return Err(GraphError::TypeMismatch {
                path: path.to_string(),
                expected: T::KIND,
                found: entry.cell.kind(),
            });
        }
        Ok(id)
    }

    fn path_id(&self, path: &str) -> Result<SocketId, GraphError> {
        self.socket_id(path)
            .ok_or_else(|| GraphError::PathNotFound(path.to_string()))
    }

    fn release_reader(&mut self, id: SocketId) {
        if let Some(entry) = self.entry_mut(id) {
            assert!(
                entry.readers > 0,
                "readers count underflow on '{}'",
                entry.cell.path()
            );
            entry.readers -= 1;
        }
    }

    pub(crate) fn entry(&self, id: SocketId) -> Option<&SocketEntry> {
        self.sockets.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn entry_mut(&mut self, id: SocketId) -> Option<&mut SocketEntry> {
        self.sockets.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn module_data(&self, id: ModuleId) -> Option<&ModuleData> {
        self.modules.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn module_data_mut(&mut self, id: ModuleId) -> Option<&mut ModuleData> {
        self.modules.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Splits the socket arena into a shared `read` entry and a mutable
    /// `write` entry.
    fn pair_mut(&mut self, read: SocketId, write: SocketId) -> Option<(&SocketEntry, &mut SocketEntry)> {
        let (r, w) = (read.0 as usize, write.0 as usize);
        if r == w || r >= self.sockets.len() || w >= self.sockets.len() {
            return None;
        }
        if r < w {
            let (head, tail) = self.sockets.split_at_mut(w);
            Some((head[r].as_ref()?, tail[0].as_mut()?))
        } else {
            let (head, tail) = self.sockets.split_at_mut(r);
            Some((tail[0].as_ref()?, head[w].as_mut()?))
        }
    }

    fn typed_socket_mut<T: SocketValue>(&mut self, handle: impl TypedSocket<T>) -> Option<&mut Socket<T>> {
        self.entry_mut(handle.socket_id())?.cell.downcast_mut::<T>()
    }
}

impl SocketView for ModuleGraph {
    fn socket_dyn(&self, id: SocketId) -> Option<&dyn BasicSocket> {
        self.entry(id).map(|e| e.cell.as_ref())
    }
}

fn check_types(target: &dyn BasicSocket, source: &dyn BasicSocket) -> Result<(), GraphError> {
    if Any::type_id(target.as_any()) == Any::type_id(source.as_any()) {
        Ok(())
    } else {
        Err(GraphError::TypeMismatch {
            path: target.path().to_string(),
            expected: target.kind(),
            found: source.kind(),
        })
    }
}

fn short_type_name<M>() -> &'static str {
    let full = type_name::<M>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
