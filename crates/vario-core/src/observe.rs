//! Change detection over sockets.
//!
//! Detectors compare what a socket holds now against what they saw the last
//! time they were asked, and answer the same for every call within one cycle.
//! They read through a [`SocketView`], so they work inside
//! [`Module::process`](crate::graph::Module::process) (via the
//! [`ProcessContext`](crate::graph::ProcessContext)) and from outside the
//! graph alike.
//!
//! A detector starts out as if it had seen a nil socket with serial 0, so the
//! first check after a socket was written reports a change.

use core::time::Duration;

use crate::cycle::Cycle;
use crate::graph::{SocketId, SocketView, TypedSocket};
use crate::value::SocketValue;

/// Detects serial changes of one socket.
#[derive(Debug, Clone)]
pub struct SocketChanged {
    socket: SocketId,
    last_serial: u64,
    last_cycle: u64,
    changed: bool,
}

impl SocketChanged {
    /// Watches `socket`.
    pub fn new(socket: impl Into<SocketId>) -> Self {
        Self {
            socket: socket.into(),
            last_serial: 0,
            last_cycle: 0,
            changed: false,
        }
    }

    /// The watched socket.
    pub fn socket(&self) -> SocketId {
        self.socket
    }

    /// True if the socket was written since the previous cycle this was
    /// asked in. Repeated calls within one cycle return the same answer.
    ///
    /// A socket that no longer exists counts as unchanged.
    pub fn serial_changed(&mut self, view: &impl SocketView, cycle: &Cycle) -> bool {
        if cycle.number() != self.last_cycle {
            self.last_cycle = cycle.number();
            let serial = view.socket_dyn(self.socket).map_or(self.last_serial, |s| s.serial());
            self.changed = serial != self.last_serial;
            self.last_serial = serial;
        }
        self.changed
    }
}

/// Detects value changes of one typed socket.
///
/// Unlike [`SocketChanged`], rewriting an equal value is not a change.
#[derive(Debug, Clone)]
pub struct SocketValueChanged<T: SocketValue> {
    socket: SocketId,
    last_value: Option<T>,
    last_cycle: u64,
    changed: bool,
}

impl<T: SocketValue> SocketValueChanged<T> {
    /// Watches `socket`.
    pub fn new(socket: impl TypedSocket<T>) -> Self {
        Self {
            socket: socket.socket_id(),
            last_value: None,
            last_cycle: 0,
            changed: false,
        }
    }

    /// The watched socket.
    pub fn socket(&self) -> SocketId {
        self.socket
    }

    /// Value seen at the last check (what the socket read as, fallback
    /// included).
    pub fn last_value(&self) -> Option<&T> {
        self.last_value.as_ref()
    }

    /// True if what the socket reads as differs from the previous cycle this
    /// was asked in. Repeated calls within one cycle return the same answer.
    pub fn value_changed(&mut self, view: &impl SocketView, cycle: &Cycle) -> bool {
        if cycle.number() != self.last_cycle {
            self.last_cycle = cycle.number();
            let current = view
                .socket_dyn(self.socket)
                .and_then(|s| s.downcast_ref::<T>())
                .and_then(|s| s.get_optional());
            self.changed = current != self.last_value;
            self.last_value = current;
        }
        self.changed
    }

    /// True if the value changed in this cycle and now equals `expected`.
    pub fn value_changed_to(
        &mut self,
        expected: Option<&T>,
        view: &impl SocketView,
        cycle: &Cycle,
    ) -> bool {
        self.value_changed(view, cycle) && self.last_value.as_ref() == expected
    }
}

/// Watches a set of sockets and fires when any of them changed.
///
/// [`process`](Self::process) is meant to be called once per cycle (extra
/// calls in the same cycle are answered from memory). With a minimum dt set,
/// a change that comes too soon after the previous firing is held back and
/// fires in the first cycle after the interval passed.
pub struct SocketObserver {
    watched: Vec<SocketChanged>,
    callback: Option<Box<dyn FnMut(&Cycle)>>,
    minimum_dt: Duration,
    last_cycle: u64,
    fired: bool,
    pending: bool,
    touched: bool,
    serial: u64,
    update_time: Option<Duration>,
    update_dt: Duration,
}

impl SocketObserver {
    /// Creates an observer watching nothing.
    pub fn new() -> Self {
        Self {
            watched: Vec::new(),
            callback: None,
            minimum_dt: Duration::ZERO,
            last_cycle: 0,
            fired: false,
            pending: false,
            touched: false,
            serial: 0,
            update_time: None,
            update_dt: Duration::ZERO,
        }
    }

    /// Adds a socket to the watch set.
    pub fn observe(&mut self, socket: impl Into<SocketId>) -> &mut Self {
        let socket = socket.into();
        if !self.watched.iter().any(|w| w.socket() == socket) {
            self.watched.push(SocketChanged::new(socket));
        }
        self
    }

    /// Number of watched sockets.
    pub fn len(&self) -> usize {
        self.watched.len()
    }

    /// True if no socket is watched.
    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Sets the function called on every firing.
    pub fn on_update(&mut self, callback: impl FnMut(&Cycle) + 'static) -> &mut Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Minimum loop time between two firings.
    pub fn set_minimum_dt(&mut self, dt: Duration) {
        self.minimum_dt = dt;
    }

    /// Forces the next [`process`](Self::process) to fire (subject to the
    /// minimum dt) even if nothing changed.
    pub fn touch(&mut self) {
        self.touched = true;
    }

    /// Number of times the observer fired.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Cycle time of the last firing.
    pub fn update_time(&self) -> Option<Duration> {
        self.update_time
    }

    /// Time between the last two firings (zero after the first one).
    pub fn update_dt(&self) -> Duration {
        self.update_dt
    }

    /// Checks the watched sockets and fires if due. Returns true if the
    /// observer fired in this cycle.
    pub fn process(&mut self, view: &impl SocketView, cycle: &Cycle) -> bool {
        if cycle.number() == self.last_cycle {
            return self.fired;
        }
        self.last_cycle = cycle.number();

        // Every detector must see this cycle, so no short-circuiting here.
        let changed = self
            .watched
            .iter_mut()
            .fold(false, |acc, w| w.serial_changed(view, cycle) || acc);
        self.pending |= changed || std::mem::take(&mut self.touched);

        let now = cycle.update_time();
        let due = self
            .update_time
            .is_none_or(|last| now.saturating_sub(last) >= self.minimum_dt);
        self.fired = self.pending && due;

        if self.fired {
            self.pending = false;
            self.serial += 1;
            self.update_dt = self.update_time.map_or(Duration::ZERO, |last| now.saturating_sub(last));
            self.update_time = Some(now);
            if let Some(callback) = self.callback.as_mut() {
                callback(cycle);
            }
        }
        self.fired
    }
}

impl Default for SocketObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SocketObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SocketObserver")
            .field("watched", &self.watched)
            .field("minimum_dt", &self.minimum_dt)
            .field("serial", &self.serial)
            .field("update_time", &self.update_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use crate::graph::{Module, ModuleGraph, ModuleOut, ProcessContext};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Passive;

    impl Module for Passive {
        fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    fn graph_with(names: &[&str]) -> (ModuleGraph, Vec<ModuleOut<i32>>) {
        let mut graph = ModuleGraph::new();
        graph
            .add_module("src", |b| {
                for name in names {
                    let _: ModuleOut<i32> = b.output(name);
                }
                Passive
            })
            .unwrap();
        let outs = names
            .iter()
            .map(|n| graph.output(&format!("/src/{n}")).unwrap())
            .collect();
        (graph, outs)
    }

    fn cycle_at(n: u64, ms: u64) -> Cycle {
        Cycle::new(n, Duration::from_millis(ms), Duration::from_millis(10), Duration::from_millis(10))
    }

    #[test]
    fn test_serial_changed_idempotent_within_cycle() {
        let (mut graph, outs) = graph_with(&["a"]);
        let mut det = SocketChanged::new(outs[0]);

        let c1 = cycle_at(1, 0);
        assert!(!det.serial_changed(&graph, &c1));

        graph.set(outs[0], 1);
        // Same cycle: still the memoized answer.
        assert!(!det.serial_changed(&graph, &c1));

        let c2 = c1.next(Duration::from_millis(10));
        assert!(det.serial_changed(&graph, &c2));
        assert!(det.serial_changed(&graph, &c2));

        let c3 = c2.next(Duration::from_millis(10));
        assert!(!det.serial_changed(&graph, &c3));
    }

    #[test]
    fn test_equal_rewrite_is_serial_change_not_value_change() {
        let (mut graph, outs) = graph_with(&["a"]);
        let mut serial = SocketChanged::new(outs[0]);
        let mut value = SocketValueChanged::new(outs[0]);

        graph.set(outs[0], 4);
        let c1 = cycle_at(1, 0);
        assert!(serial.serial_changed(&graph, &c1));
        assert!(value.value_changed(&graph, &c1));

        graph.set(outs[0], 4);
        let c2 = c1.next(Duration::from_millis(10));
        assert!(serial.serial_changed(&graph, &c2));
        assert!(!value.value_changed(&graph, &c2));
        assert_eq!(value.last_value(), Some(&4));
    }

    #[test]
    fn test_value_changed_to() {
        let (mut graph, outs) = graph_with(&["a"]);
        let mut det = SocketValueChanged::new(outs[0]);

        graph.set(outs[0], 1);
        let c1 = cycle_at(1, 0);
        assert!(!det.value_changed_to(Some(&2), &graph, &c1));

        graph.set(outs[0], 2);
        let c2 = c1.next(Duration::from_millis(10));
        assert!(det.value_changed_to(Some(&2), &graph, &c2));

        graph.set_nil(outs[0]);
        let c3 = c2.next(Duration::from_millis(10));
        assert!(det.value_changed_to(None, &graph, &c3));
    }

    #[test]
    fn test_observer_fires_on_any_change() {
        let (mut graph, outs) = graph_with(&["a", "b"]);
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);

        let mut obs = SocketObserver::new();
        obs.observe(outs[0]).observe(outs[1]).observe(outs[1]);
        obs.on_update(move |_| f.set(f.get() + 1));
        assert_eq!(obs.len(), 2);

        let c1 = cycle_at(1, 0);
        assert!(!obs.process(&graph, &c1));

        graph.set(outs[1], 3);
        let c2 = cycle_at(2, 10);
        assert!(obs.process(&graph, &c2));
        assert!(obs.process(&graph, &c2));
        assert_eq!(fired.get(), 1);
        assert_eq!(obs.serial(), 1);
        assert_eq!(obs.update_time(), Some(Duration::from_millis(10)));

        let c3 = cycle_at(3, 20);
        assert!(!obs.process(&graph, &c3));
    }

    #[test]
    fn test_observer_minimum_dt_defers_firing() {
        let (mut graph, outs) = graph_with(&["a"]);
        let mut obs = SocketObserver::new();
        obs.observe(outs[0]);
        obs.set_minimum_dt(Duration::from_millis(25));

        graph.set(outs[0], 1);
        assert!(obs.process(&graph, &cycle_at(1, 0)));

        graph.set(outs[0], 2);
        assert!(!obs.process(&graph, &cycle_at(2, 10)));
        assert!(!obs.process(&graph, &cycle_at(3, 20)));
        // Nothing changed since, but the held-back change is now due.
        assert!(obs.process(&graph, &cycle_at(4, 30)));
        assert_eq!(obs.update_dt(), Duration::from_millis(30));
        assert_eq!(obs.serial(), 2);
    }

    #[test]
    fn test_observer_touch_forces_firing() {
        let (graph, outs) = graph_with(&["a"]);
        let mut obs = SocketObserver::new();
        obs.observe(outs[0]);

        assert!(!obs.process(&graph, &cycle_at(1, 0)));
        obs.touch();
        assert!(obs.process(&graph, &cycle_at(2, 10)));
        assert!(!obs.process(&graph, &cycle_at(3, 20)));
    }
}
