//! Machine descriptions for the vario avionics core.
//!
//! A machine file describes a complete processing loop in TOML: the loop
//! frequency, text conversion rules, the module instances with their
//! settings, and how their sockets are wired. [`Machine::build`] turns it into
//! a ready-to-run [`ProcessingLoop`](vario_core::ProcessingLoop).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vario_config::Machine;
//! use vario_modules::ModuleRegistry;
//!
//! let machine = Machine::from_toml(r#"
//!     name = "demo"
//!     frequency_hz = 10.0
//!
//!     [[modules]]
//!     type = "sine"
//!     instance = "gen"
//!     [modules.settings]
//!     amplitude = "2"
//!     period = "4 s"
//!
//!     [[modules]]
//!     type = "lowpass"
//!     instance = "smooth"
//!     [modules.settings]
//!     time-constant = "1 s"
//!
//!     [[connections]]
//!     input = "/smooth/input"
//!     output = "/gen/value"
//! "#).unwrap();
//!
//! let mut pl = machine.build(&ModuleRegistry::new()).unwrap();
//! pl.execute_cycle(Duration::ZERO).unwrap();
//! ```

mod build;
mod error;
mod machine;

/// Machine validation.
pub mod validation;

pub use error::ConfigError;
pub use machine::{Connection, Constant, ConversionSection, Fallback, Machine, ModuleEntry};
pub use validation::{ValidationError, ValidationResult, validate_machine};
