//! First-order low-pass filter for noisy sensor values.
//!
//! ```text
//! y += (x - y) * (1 - exp(-dt / tau))
//! ```
//!
//! `dt` is the cycle's measured update dt, so the response time stays the same
//! when the loop runs late. The filter works on plain `f64` sockets or on any
//! physical quantity, picked with the `dimension` setting.

use vario_core::graph::{Module, ModuleGraph, ModuleId, ModuleIn, ModuleOut, ProcessContext};
use vario_core::{
    Angle, Frequency, Length, ModuleError, Pressure, SocketValue, Speed, Temperature, Time,
    ValueKind,
};

use crate::registry::{
    ModuleCategory, ModuleDescriptor, RegistryError, SettingDescriptor, SocketDescriptor,
};
use crate::settings::{Settings, check_required};

/// Registry entry.
pub const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    id: "lowpass",
    name: "Low-pass Filter",
    description: "First-order smoothing of a scalar or quantity",
    category: ModuleCategory::Filter,
    inputs: &[SocketDescriptor {
        name: "input",
        kind: ValueKind::F64,
    }],
    outputs: &[SocketDescriptor {
        name: "output",
        kind: ValueKind::F64,
    }],
    settings: &[
        SettingDescriptor {
            name: "time-constant",
            description: "Time to reach 63 % of a step",
            required: true,
            default: None,
        },
        SettingDescriptor {
            name: "dimension",
            description: "Quantity to filter (length, speed, ...) or empty for plain numbers",
            required: false,
            default: Some(""),
        },
    ],
};

/// A socket value with a linear scalar representation.
pub trait Scalar: SocketValue + Copy {
    /// The scalar, in SI base units for quantities.
    fn to_scalar(self) -> f64;
    /// Builds a value from its scalar.
    fn from_scalar(value: f64) -> Self;
}

impl Scalar for f64 {
    fn to_scalar(self) -> f64 {
        self
    }

    fn from_scalar(value: f64) -> Self {
        value
    }
}

macro_rules! impl_scalar {
    ($($ty:ident),*) => {$(
        impl Scalar for $ty {
            fn to_scalar(self) -> f64 {
                self.si()
            }

            fn from_scalar(value: f64) -> Self {
                $ty::from_si(value)
            }
        }
    )*};
}

impl_scalar!(Length, Speed, Angle, Time, Pressure, Temperature, Frequency);

/// Adds a low-pass filter configured from `settings`, typed after its
/// `dimension` setting.
pub fn create(
    graph: &mut ModuleGraph,
    instance: &str,
    settings: &Settings,
) -> Result<ModuleId, RegistryError> {
    let dimension = settings.raw("dimension").unwrap_or("").trim().to_ascii_lowercase();
    match dimension.as_str() {
        "" => LowPass::<f64>::create(graph, instance, settings),
        "length" => LowPass::<Length>::create(graph, instance, settings),
        "speed" => LowPass::<Speed>::create(graph, instance, settings),
        "angle" => LowPass::<Angle>::create(graph, instance, settings),
        "time" => LowPass::<Time>::create(graph, instance, settings),
        "pressure" => LowPass::<Pressure>::create(graph, instance, settings),
        "temperature" => LowPass::<Temperature>::create(graph, instance, settings),
        "frequency" => LowPass::<Frequency>::create(graph, instance, settings),
        other => Err(ModuleError::InvalidSetting {
            name: "dimension".into(),
            reason: format!("unknown dimension '{other}'"),
        }
        .into()),
    }
}

/// First-order low-pass filter.
pub struct LowPass<T: Scalar> {
    input: ModuleIn<T>,
    output: ModuleOut<T>,
    time_constant: Option<Time>,
    state: Option<f64>,
}

impl<T: Scalar> LowPass<T> {
    /// Adds a filter over `T` configured from `settings`.
    pub fn create(
        graph: &mut ModuleGraph,
        instance: &str,
        settings: &Settings,
    ) -> Result<ModuleId, RegistryError> {
        let time_constant = settings.get("time-constant")?;
        Ok(graph.add_module(instance, |b| LowPass::<T> {
            input: b.input("input"),
            output: b.output("output"),
            time_constant,
            state: None,
        })?)
    }

    /// Feeds one sample taken `dt` seconds after the previous one.
    ///
    /// The first sample (and the first after a nil) passes through unchanged.
    pub fn step(&mut self, input: Option<T>, dt: f64) -> Option<T> {
        let Some(x) = input.map(Scalar::to_scalar) else {
            self.state = None;
            return None;
        };
        let tau = self.time_constant.map_or(0.0, |t| t.si());
        let y = match self.state {
            Some(y) if tau > 0.0 => y + (x - y) * (1.0 - (-dt / tau).exp()),
            _ => x,
        };
        self.state = Some(y);
        Some(T::from_scalar(y))
    }
}

impl<T: Scalar> Module for LowPass<T> {
    fn initialize(&mut self) -> Result<(), ModuleError> {
        check_required(&[("time-constant", self.time_constant.is_some())])
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let dt = ctx.cycle().update_dt().as_secs_f64();
        let x = ctx.get_optional(self.input);
        let y = self.step(x, dt);
        ctx.set_optional(self.output, y);
        Ok(())
    }
}
