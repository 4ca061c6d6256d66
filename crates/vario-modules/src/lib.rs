//! Module library and registry for the vario avionics core.
//!
//! This crate provides the built-in modules and a registry for creating them
//! by type id, which is how machine files instantiate a graph.
//!
//! # Modules
//!
//! | id | category | what it does |
//! |----|----------|--------------|
//! | `sine` | Source | Sine wave over loop time |
//! | `air-sim` | Source | Standard-atmosphere pitot-static and OAT sensors |
//! | `adc` | Computer | Altitudes, airspeeds and vertical speed |
//! | `lowpass` | Filter | First-order smoothing |
//! | `altitude-alert` | Warning | Approach-to-selected-altitude alert |
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vario_core::{Length, ProcessingLoop};
//! use vario_core::graph::ModuleGraph;
//! use vario_modules::{ModuleRegistry, Settings};
//!
//! let registry = ModuleRegistry::new();
//! let mut graph = ModuleGraph::new();
//! registry
//!     .create("air-sim", &mut graph, "sim", &Settings::new().with("altitude", "3000 ft"))
//!     .unwrap();
//! registry.create("adc", &mut graph, "adc", &Settings::new()).unwrap();
//! graph.connect_paths("/adc/static-pressure", "/sim/static-pressure").unwrap();
//!
//! let altitude = graph.output::<Length>("/adc/altitude-std").unwrap();
//! let mut pl = ProcessingLoop::new(graph, Duration::from_millis(100));
//! pl.execute_cycle(Duration::ZERO).unwrap();
//! let feet = pl.graph().get(altitude).unwrap().feet();
//! assert!((feet - 3000.0).abs() < 1.0);
//! ```

pub mod adc;
pub mod air_sim;
pub mod altitude_alert;
pub mod atmosphere;
pub mod lowpass;
pub mod registry;
pub mod settings;
pub mod sine;

pub use adc::AirDataComputer;
pub use air_sim::AirSimulator;
pub use altitude_alert::AltitudeAlert;
pub use lowpass::{LowPass, Scalar};
pub use registry::{
    ModuleCategory, ModuleDescriptor, ModuleFactory, ModuleRegistry, RegistryError,
    SettingDescriptor, SocketDescriptor,
};
pub use settings::Settings;
pub use sine::Sine;
