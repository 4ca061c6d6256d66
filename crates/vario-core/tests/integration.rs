//! Integration tests for vario-core.
//!
//! Drives small avionics-shaped graphs through the public API: typed handles,
//! path wiring, text/blob injection, teardown while wired, change detection
//! inside modules, and the processing loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use vario_core::graph::{Module, ModuleGraph, ModuleIn, ModuleOut, ProcessContext, SocketView};
use vario_core::{
    BasicSocket, ConversionError, ConversionSettings, Cycle, GraphError, Length, ModuleError,
    Pressure, ProcessingLoop, Socket, SocketObserver, SocketValueChanged, Speed, ValueKind,
};

fn cycle(n: u64) -> Cycle {
    Cycle::new(
        n,
        Duration::from_millis(n * 100),
        Duration::from_millis(100),
        Duration::from_millis(100),
    )
}

// ============================================================================
// Test modules
// ============================================================================

/// Holds a pressure output that tests inject into from outside.
struct PressureSensor;

impl Module for PressureSensor {
    fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Standard-atmosphere pressure altitude from static pressure.
struct Altimeter {
    pressure: ModuleIn<Pressure>,
    altitude: ModuleOut<Length>,
}

impl Module for Altimeter {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let altitude = ctx.get_optional(self.pressure).map(|p| {
            Length::from_si(44_330.77 * (1.0 - (p.si() / 101_325.0).powf(0.190_263)))
        });
        ctx.set_optional(self.altitude, altitude);
        Ok(())
    }
}

/// Records every altitude it observes changing.
struct Recorder {
    altitude: ModuleIn<Length>,
    changed: SocketValueChanged<Length>,
    log: Rc<RefCell<Vec<Option<f64>>>>,
}

impl Module for Recorder {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let cycle = ctx.cycle().clone();
        if self.changed.value_changed(&*ctx, &cycle) {
            let value = ctx.get_optional(self.altitude).map(Length::feet);
            self.log.borrow_mut().push(value);
        }
        Ok(())
    }
}

struct Chain {
    graph: ModuleGraph,
    static_pressure: ModuleOut<Pressure>,
    altitude: ModuleOut<Length>,
    log: Rc<RefCell<Vec<Option<f64>>>>,
}

fn altimeter_chain() -> Chain {
    let mut graph = ModuleGraph::new();
    graph
        .add_module("sensor", |b| {
            let _: ModuleOut<Pressure> = b.output("static");
            PressureSensor
        })
        .unwrap();
    graph
        .add_module("altimeter", |b| Altimeter {
            pressure: b.input("pressure"),
            altitude: b.output("altitude"),
        })
        .unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let shared = Rc::clone(&log);
    graph
        .add_module("recorder", |b| {
            let altitude = b.input("altitude");
            Recorder {
                altitude,
                changed: SocketValueChanged::new(altitude),
                log: shared,
            }
        })
        .unwrap();

    graph
        .connect_paths("/altimeter/pressure", "/sensor/static")
        .unwrap();
    graph
        .connect_paths("/recorder/altitude", "/altimeter/altitude")
        .unwrap();

    Chain {
        static_pressure: graph.output("/sensor/static").unwrap(),
        altitude: graph.output("/altimeter/altitude").unwrap(),
        graph,
        log,
    }
}

// ============================================================================
// 1. Socket scenarios
// ============================================================================

#[test]
fn nil_value_nil_with_blob_round_trip() {
    let mut s = Socket::<i32>::new("/t/s");
    assert!(s.is_nil());
    s.set(5);
    assert_eq!(s.serial(), 1);
    let blob = s.to_blob();
    assert_eq!(blob.len(), 5);

    let mut other = Socket::<i32>::new("/t/other");
    other.from_blob(&blob).unwrap();
    assert_eq!(other.get(), Ok(5));

    s.set_nil();
    assert_eq!(s.serial(), 2);
    assert!(matches!(
        other.from_blob(&[1, 2, 3]),
        Err(ConversionError::InvalidBlobSize { actual: 3, expected: 5 })
    ));
}

#[test]
fn fallback_then_connected_value() {
    let mut graph = ModuleGraph::new();
    graph
        .add_module("sensor", |b| {
            let _: ModuleOut<f64> = b.output("value");
            PressureSensor
        })
        .unwrap();
    graph
        .add_module("display", |b| {
            let _: ModuleIn<f64> = b.input_with_fallback("value", 0.0);
            PressureSensor
        })
        .unwrap();
    let input = graph.input::<f64>("/display/value").unwrap();
    let output = graph.output::<f64>("/sensor/value").unwrap();

    assert_eq!(graph.get(input), Ok(0.0));
    graph.connect(input, output).unwrap();
    graph.set(output, 1.5);
    graph.fetch(input, &cycle(1));
    assert_eq!(graph.get(input), Ok(1.5));
}

// ============================================================================
// 2. Pull execution through a chain
// ============================================================================

#[test]
fn altitude_follows_injected_pressure() {
    let mut chain = altimeter_chain();
    chain.graph.set(chain.static_pressure, Pressure::from_si(101_325.0));
    chain.graph.fetch(chain.altitude, &cycle(1));
    let alt = chain.graph.get(chain.altitude).unwrap();
    assert!(alt.si().abs() < 1e-6, "altitude at sea level: {alt}");

    chain.graph.set(chain.static_pressure, Pressure::from_hpa(700.0));
    chain.graph.fetch(chain.altitude, &cycle(2));
    let feet = chain.graph.get(chain.altitude).unwrap().feet();
    assert!((feet - 9_882.0).abs() < 10.0, "got {feet} ft");
}

#[test]
fn injection_from_text_uses_units() {
    let settings = ConversionSettings::default().with_preferred_units(["ft", "hPa"]);
    let mut chain = altimeter_chain();

    let id = chain.graph.socket_id("/sensor/static").unwrap();
    chain
        .graph
        .socket_mut(id)
        .unwrap()
        .from_string("1013.25 hPa", &settings)
        .unwrap();
    chain.graph.fetch(chain.altitude, &cycle(1));

    let socket = chain.graph.socket_dyn(chain.altitude.id()).unwrap();
    assert_eq!(socket.kind(), ValueKind::Quantity(vario_core::Dimension::Length));
    assert!(socket.to_string(&settings).ends_with(" ft"));
    assert!(socket.to_f64().unwrap().abs() < 1e-6);

    let err = chain
        .graph
        .socket_mut(id)
        .unwrap()
        .from_string("12 kt", &settings)
        .unwrap_err();
    assert!(matches!(err, ConversionError::IncompatibleUnit { .. }));
}

#[test]
fn processing_loop_runs_chain_and_detects_changes() {
    let chain = altimeter_chain();
    let (pressure, log) = (chain.static_pressure, chain.log);
    let mut pl = ProcessingLoop::new(chain.graph, Duration::from_millis(100));

    pl.graph_mut().set(pressure, Pressure::from_si(101_325.0));
    pl.execute_cycle(Duration::ZERO).unwrap();
    pl.execute_cycle(Duration::from_millis(100)).unwrap();
    pl.graph_mut().set_nil(pressure);
    pl.execute_cycle(Duration::from_millis(200)).unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert!(log[0].is_some_and(|ft| ft.abs() < 1e-6));
    assert_eq!(log[1], None);
}

// ============================================================================
// 3. Teardown while wired
// ============================================================================

#[test]
fn removing_upstream_module_degrades_to_nil() {
    let mut chain = altimeter_chain();
    chain.graph.set(chain.static_pressure, Pressure::from_hpa(900.0));
    chain.graph.fetch(chain.altitude, &cycle(1));
    assert!(chain.graph.get_optional(chain.altitude).is_some());

    let sensor = chain.graph.module_id("sensor").unwrap();
    chain.graph.remove_module(sensor).unwrap();
    chain.graph.fetch(chain.altitude, &cycle(2));
    assert_eq!(chain.graph.get_optional(chain.altitude), None);

    // Reconnecting to a new sensor restores the value.
    chain
        .graph
        .add_module("sensor2", |b| {
            let _: ModuleOut<Pressure> = b.output("static");
            PressureSensor
        })
        .unwrap();
    chain
        .graph
        .connect_paths("/altimeter/pressure", "/sensor2/static")
        .unwrap();
    let fresh = chain.graph.output::<Pressure>("/sensor2/static").unwrap();
    chain.graph.set(fresh, Pressure::from_hpa(1013.25));
    chain.graph.fetch(chain.altitude, &cycle(3));
    assert!(chain.graph.get_optional(chain.altitude).is_some());
}

#[test]
fn wiring_errors_are_reported() {
    let mut chain = altimeter_chain();
    assert!(matches!(
        chain
            .graph
            .connect_paths("/altimeter/pressure", "/altimeter/altitude"),
        Err(GraphError::TypeMismatch { .. })
    ));
    assert!(matches!(
        chain.graph.connect_paths("/altimeter/pressure", "/nowhere"),
        Err(GraphError::PathNotFound(_))
    ));
    assert!(chain.graph.validate().is_ok());
}

// ============================================================================
// 4. Observer inside a module
// ============================================================================

struct Alert {
    observer: SocketObserver,
    fired: ModuleOut<bool>,
}

impl Module for Alert {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let cycle = ctx.cycle().clone();
        let fired = self.observer.process(&*ctx, &cycle);
        ctx.set(self.fired, fired);
        Ok(())
    }
}

#[test]
fn observer_inside_module_sees_upstream_writes() {
    let mut graph = ModuleGraph::new();
    graph
        .add_module("src", |b| {
            let _: ModuleOut<Speed> = b.output("ias");
            PressureSensor
        })
        .unwrap();
    let ias = graph.output::<Speed>("/src/ias").unwrap();
    graph
        .add_module("alert", |b| {
            let input: ModuleIn<Speed> = b.input("ias");
            let mut observer = SocketObserver::new();
            observer.observe(input);
            Alert {
                observer,
                fired: b.output("fired"),
            }
        })
        .unwrap();
    graph.connect_paths("/alert/ias", "/src/ias").unwrap();
    let fired = graph.output::<bool>("/alert/fired").unwrap();

    let mut pl = ProcessingLoop::new(graph, Duration::from_millis(100));
    pl.add_root(fired);
    pl.execute_cycle(Duration::ZERO).unwrap();
    assert_eq!(pl.graph().get(fired), Ok(false));

    pl.graph_mut().set(ias, Speed::from_knots(120.0));
    pl.execute_cycle(Duration::from_millis(100)).unwrap();
    assert_eq!(pl.graph().get(fired), Ok(true));

    // Same value again: the input copy does not change, so nothing fires.
    pl.graph_mut().set(ias, Speed::from_knots(120.0));
    pl.execute_cycle(Duration::from_millis(200)).unwrap();
    assert_eq!(pl.graph().get(fired), Ok(false));
}
