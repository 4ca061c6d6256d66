//! Sine signal generator.
//!
//! ```text
//! value(t) = mean + amplitude * sin(2π * t / period + phase)
//! ```
//!
//! where `t` is the cycle's update time. Handy as a stand-in for any slowly
//! oscillating sensor reading.

use core::f64::consts::TAU;

use vario_core::graph::{Module, ModuleGraph, ModuleId, ModuleOut, ProcessContext};
use vario_core::{Angle, ModuleError, Time, ValueKind};

use crate::registry::{
    ModuleCategory, ModuleDescriptor, RegistryError, SettingDescriptor, SocketDescriptor,
};
use crate::settings::{Settings, check_required};

/// Registry entry.
pub const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    id: "sine",
    name: "Sine Generator",
    description: "Sine wave over loop time",
    category: ModuleCategory::Source,
    inputs: &[],
    outputs: &[SocketDescriptor {
        name: "value",
        kind: ValueKind::F64,
    }],
    settings: &[
        SettingDescriptor {
            name: "mean",
            description: "Center value",
            required: false,
            default: Some("0"),
        },
        SettingDescriptor {
            name: "amplitude",
            description: "Peak deviation from the mean",
            required: true,
            default: None,
        },
        SettingDescriptor {
            name: "period",
            description: "Duration of one full wave",
            required: true,
            default: None,
        },
        SettingDescriptor {
            name: "phase",
            description: "Phase offset at t = 0",
            required: false,
            default: Some("0 deg"),
        },
    ],
};

/// Sine wave generator.
pub struct Sine {
    value: ModuleOut<f64>,
    mean: f64,
    amplitude: Option<f64>,
    period: Option<Time>,
    phase: Angle,
}

impl Sine {
    /// Adds a sine generator configured from `settings`.
    pub fn create(
        graph: &mut ModuleGraph,
        instance: &str,
        settings: &Settings,
    ) -> Result<ModuleId, RegistryError> {
        let mean = settings.get_or("mean", 0.0)?;
        let amplitude = settings.get("amplitude")?;
        let period = settings.get("period")?;
        let phase = settings.get_or("phase", Angle::from_si(0.0))?;
        Ok(graph.add_module(instance, |b| Sine {
            value: b.output("value"),
            mean,
            amplitude,
            period,
            phase,
        })?)
    }

    /// Value at loop time `t` (seconds).
    pub fn value_at(&self, t: f64) -> Option<f64> {
        let amplitude = self.amplitude?;
        let period = self.period?.si();
        Some(self.mean + amplitude * (TAU * t / period + self.phase.si()).sin())
    }
}

impl Module for Sine {
    fn initialize(&mut self) -> Result<(), ModuleError> {
        check_required(&[
            ("amplitude", self.amplitude.is_some()),
            ("period", self.period.is_some()),
        ])?;
        if self.period.is_some_and(|p| p.si() <= 0.0) {
            return Err(ModuleError::InvalidSetting {
                name: "period".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let t = ctx.cycle().update_time().as_secs_f64();
        let value = self.value_at(t);
        ctx.set_optional(self.value, value);
        Ok(())
    }
}
