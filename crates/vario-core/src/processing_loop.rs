//! Fixed-rate driver for a [`ModuleGraph`].
//!
//! [`ProcessingLoop`] owns the graph and turns wall-clock ticks into
//! [`Cycle`]s. Each tick advances the cycle number, demand-drives the graph
//! (root sockets if any were registered, every module otherwise) and drops
//! the cycle again. Cycles are never revisited.
//!
//! ```rust
//! use std::time::Duration;
//! use vario_core::ProcessingLoop;
//! use vario_core::graph::ModuleGraph;
//!
//! let mut pl = ProcessingLoop::new(ModuleGraph::new(), Duration::from_millis(20));
//! let first = pl.execute_cycle(Duration::ZERO)?;
//! let second = pl.execute_cycle(Duration::from_millis(20))?;
//! assert_eq!((first.number(), second.number()), (1, 2));
//! # Ok::<(), vario_core::GraphError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::accounting::TimingStats;
use crate::cycle::Cycle;
use crate::error::GraphError;
use crate::graph::{ModuleGraph, SocketId};

/// Cycles slower than this many periods are logged as late.
const LATENCY_WARNING_FACTOR: u32 = 2;

/// Periodic cycle driver owning a module graph.
pub struct ProcessingLoop {
    graph: ModuleGraph,
    period: Duration,
    next_number: u64,
    last_time: Option<Duration>,
    roots: Vec<SocketId>,
    started: bool,
    processing_times: TimingStats,
    intervals: TimingStats,
    latencies: TimingStats,
}

impl ProcessingLoop {
    /// Creates a loop running `graph` once every `period`.
    pub fn new(graph: ModuleGraph, period: Duration) -> Self {
        Self {
            graph,
            period,
            next_number: 1,
            last_time: None,
            roots: Vec::new(),
            started: false,
            processing_times: TimingStats::default(),
            intervals: TimingStats::default(),
            latencies: TimingStats::default(),
        }
    }

    /// The graph being driven.
    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// Mutable access to the graph, for wiring or injecting values between
    /// cycles.
    pub fn graph_mut(&mut self) -> &mut ModuleGraph {
        &mut self.graph
    }

    /// Gives the graph back.
    pub fn into_graph(self) -> ModuleGraph {
        self.graph
    }

    /// Intended time between cycles.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Intended cycles per second.
    pub fn frequency(&self) -> f64 {
        1.0 / self.period.as_secs_f64()
    }

    /// Number the next cycle will get.
    pub fn next_cycle_number(&self) -> u64 {
        self.next_number
    }

    /// Restricts demand-driving to the given socket (repeatable).
    ///
    /// Without roots every module is processed each cycle. With roots only
    /// the modules they transitively depend on run.
    pub fn add_root(&mut self, socket: impl Into<SocketId>) {
        let socket = socket.into();
        if !self.roots.contains(&socket) {
            self.roots.push(socket);
        }
    }

    /// Root sockets registered with [`add_root`](Self::add_root).
    pub fn roots(&self) -> &[SocketId] {
        &self.roots
    }

    /// Validates the graph and initializes its modules.
    ///
    /// Called by the first [`execute_cycle`](Self::execute_cycle) if not
    /// called explicitly.
    pub fn start(&mut self) -> Result<(), GraphError> {
        self.graph.validate()?;
        self.graph.initialize_modules()?;
        self.started = true;
        tracing::debug!(
            "loop_start: {} modules at {:.1} Hz",
            self.graph.module_count(),
            self.frequency()
        );
        Ok(())
    }

    /// Runs one cycle at loop time `now`.
    ///
    /// Modules added since the last cycle are initialized first. Returns the
    /// cycle that was executed.
    pub fn execute_cycle(&mut self, now: Duration) -> Result<Cycle, GraphError> {
        if self.started {
            self.graph.initialize_modules()?;
        } else {
            self.start()?;
        }

        let dt = self
            .last_time
            .map_or(self.period, |last| now.saturating_sub(last));
        let cycle = Cycle::new(self.next_number, now, dt, self.period);
        self.next_number += 1;
        self.last_time = Some(now);
        self.intervals.push(dt);

        if dt > self.period * LATENCY_WARNING_FACTOR {
            tracing::warn!(
                parent: cycle.logger(),
                "cycle came {:.1} ms late (period {:.1} ms)",
                (dt - self.period).as_secs_f64() * 1e3,
                self.period.as_secs_f64() * 1e3
            );
        }

        let started = Instant::now();
        cycle.logger().in_scope(|| {
            if self.roots.is_empty() {
                for module in self.graph.module_ids() {
                    self.graph.fetch_and_process(module, &cycle);
                }
            } else {
                for &root in &self.roots {
                    self.graph.fetch(root, &cycle);
                }
            }
        });
        self.processing_times.push(started.elapsed());

        Ok(cycle)
    }

    /// Runs `count` cycles at the loop's cadence.
    pub fn run_cycles(&mut self, count: u64) -> Result<(), GraphError> {
        let running = AtomicBool::new(true);
        self.run(Some(count), &running, |_, _| {}).map(|_| ())
    }

    /// Runs cycles until `running` is cleared.
    pub fn run_until(&mut self, running: &AtomicBool) -> Result<u64, GraphError> {
        self.run(None, running, |_, _| {})
    }

    /// Runs at most `limit` cycles (unbounded if `None`) while `running` is
    /// set, calling `on_cycle` after each one. Sleeps between cycles to keep
    /// the cadence; a late cycle is run immediately and the schedule is not
    /// caught up. Returns the number of cycles run.
    pub fn run<F>(
        &mut self,
        limit: Option<u64>,
        running: &AtomicBool,
        mut on_cycle: F,
    ) -> Result<u64, GraphError>
    where
        F: FnMut(&ModuleGraph, &Cycle),
    {
        let epoch = Instant::now();
        let offset = self.last_time.map_or(Duration::ZERO, |t| t + self.period);
        let mut deadline = Duration::ZERO;
        let mut count = 0;

        while running.load(Ordering::SeqCst) && limit.is_none_or(|n| count < n) {
            let elapsed = epoch.elapsed();
            if elapsed < deadline {
                std::thread::sleep(deadline - elapsed);
            }
            let now = epoch.elapsed();
            self.latencies.push(now.saturating_sub(deadline));

            let cycle = self.execute_cycle(offset + now)?;
            on_cycle(&self.graph, &cycle);
            count += 1;

            deadline = (deadline + self.period).max(now);
        }
        tracing::debug!("loop_stop: {count} cycles");
        Ok(count)
    }

    /// Measured cycles per second, from the mean interval between cycles.
    pub fn actual_frequency(&self) -> Option<f64> {
        self.intervals
            .mean()
            .filter(|dt| !dt.is_zero())
            .map(|dt| 1.0 / dt.as_secs_f64())
    }

    /// Time spent demand-driving the graph, per cycle.
    pub fn processing_times(&self) -> &TimingStats {
        &self.processing_times
    }

    /// How late each cycle started relative to its schedule.
    pub fn latencies(&self) -> &TimingStats {
        &self.latencies
    }
}

impl core::fmt::Debug for ProcessingLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessingLoop")
            .field("period", &self.period)
            .field("next_number", &self.next_number)
            .field("roots", &self.roots)
            .field("started", &self.started)
            .field("modules", &self.graph.module_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use crate::graph::{Module, ModuleIn, ModuleOut, ProcessContext};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        out: ModuleOut<u64>,
        calls: Rc<Cell<u64>>,
    }

    impl Module for Counter {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
            self.calls.set(self.calls.get() + 1);
            let n = ctx.cycle().number();
            ctx.set(self.out, n);
            Ok(())
        }
    }

    struct Sink {
        input: ModuleIn<u64>,
        seen: Rc<Cell<u64>>,
    }

    impl Module for Sink {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
            self.seen.set(ctx.get(self.input)?);
            Ok(())
        }
    }

    fn counter(graph: &mut ModuleGraph, name: &str) -> (ModuleOut<u64>, Rc<Cell<u64>>) {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        graph
            .add_module(name, |b| Counter {
                out: b.output("n"),
                calls: c,
            })
            .unwrap();
        (graph.output(&format!("/{name}/n")).unwrap(), calls)
    }

    #[test]
    fn test_cycle_numbers_and_dt() {
        let mut pl = ProcessingLoop::new(ModuleGraph::new(), Duration::from_millis(20));
        let c1 = pl.execute_cycle(Duration::from_millis(5)).unwrap();
        let c2 = pl.execute_cycle(Duration::from_millis(30)).unwrap();

        assert_eq!(c1.number(), 1);
        assert_eq!(c1.update_dt(), Duration::from_millis(20));
        assert_eq!(c2.number(), 2);
        assert_eq!(c2.update_dt(), Duration::from_millis(25));
        assert_eq!(c2.intended_update_dt(), Duration::from_millis(20));
        assert_eq!(pl.next_cycle_number(), 3);
    }

    #[test]
    fn test_debug_summarizes_loop() {
        let mut pl = ProcessingLoop::new(ModuleGraph::new(), Duration::from_millis(20));
        pl.execute_cycle(Duration::ZERO).unwrap();
        let text = format!("{pl:?}");
        assert!(text.starts_with("ProcessingLoop {"), "got: {text}");
        assert!(text.contains("next_number: 2"), "got: {text}");
        assert!(text.contains("modules: 0"), "got: {text}");
    }

    #[test]
    fn test_every_module_processed_once_per_cycle() {
        let mut graph = ModuleGraph::new();
        let (out, calls) = counter(&mut graph, "counter");
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        graph
            .add_module("sink", |b| Sink {
                input: b.input("n"),
                seen: s,
            })
            .unwrap();
        let input = graph.input::<u64>("/sink/n").unwrap();
        graph.connect(input, out).unwrap();

        let mut pl = ProcessingLoop::new(graph, Duration::from_millis(10));
        for i in 0..3 {
            pl.execute_cycle(Duration::from_millis(i * 10)).unwrap();
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(seen.get(), 3);
        assert_eq!(pl.processing_times().len(), 3);
    }

    #[test]
    fn test_roots_limit_processing() {
        let mut graph = ModuleGraph::new();
        let (a, a_calls) = counter(&mut graph, "a");
        let (_, b_calls) = counter(&mut graph, "b");

        let mut pl = ProcessingLoop::new(graph, Duration::from_millis(10));
        pl.add_root(a);
        pl.add_root(a);
        assert_eq!(pl.roots().len(), 1);

        pl.execute_cycle(Duration::ZERO).unwrap();
        assert_eq!(a_calls.get(), 1);
        assert_eq!(b_calls.get(), 0);
        assert_eq!(pl.graph().get(a), Ok(1));
    }

    #[test]
    fn test_initialization_error_stops_first_cycle() {
        struct Unready;
        impl Module for Unready {
            fn initialize(&mut self) -> Result<(), ModuleError> {
                Err(ModuleError::failed("not calibrated"))
            }
            fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
                Ok(())
            }
        }

        let mut graph = ModuleGraph::new();
        graph.add_module("unready", |_| Unready).unwrap();
        let mut pl = ProcessingLoop::new(graph, Duration::from_millis(10));
        assert!(matches!(
            pl.execute_cycle(Duration::ZERO),
            Err(GraphError::Initialization { .. })
        ));
        assert_eq!(pl.next_cycle_number(), 1);
    }

    #[test]
    fn test_run_cycles_keeps_counting() {
        let mut graph = ModuleGraph::new();
        let (out, calls) = counter(&mut graph, "c");
        let mut pl = ProcessingLoop::new(graph, Duration::from_millis(1));

        pl.run_cycles(5).unwrap();
        pl.run_cycles(2).unwrap();
        assert_eq!(calls.get(), 7);
        assert_eq!(pl.graph().get(out), Ok(7));
        assert!(pl.actual_frequency().is_some());
        assert_eq!(pl.latencies().len(), 7);
    }

    #[test]
    fn test_run_until_cleared_flag_runs_nothing() {
        let mut pl = ProcessingLoop::new(ModuleGraph::new(), Duration::from_millis(1));
        let running = AtomicBool::new(false);
        assert_eq!(pl.run_until(&running).unwrap(), 0);
    }

    #[test]
    fn test_run_reports_each_cycle() {
        let mut graph = ModuleGraph::new();
        let (out, _) = counter(&mut graph, "c");
        let mut pl = ProcessingLoop::new(graph, Duration::from_millis(1));
        let running = AtomicBool::new(true);

        let mut seen = Vec::new();
        let n = pl
            .run(Some(3), &running, |graph, cycle| {
                seen.push((cycle.number(), graph.get(out).unwrap()));
            })
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(seen, vec![(1, 1), (2, 2), (3, 3)]);
    }
}
