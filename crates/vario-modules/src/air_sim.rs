//! Simulated pitot-static and temperature sensors.
//!
//! Flies a sine altitude profile at constant calibrated airspeed through the
//! standard atmosphere and publishes what the sensors would read.

use core::f64::consts::TAU;

use vario_core::graph::{Module, ModuleGraph, ModuleId, ModuleOut, ProcessContext};
use vario_core::{Dimension, Length, ModuleError, Pressure, Speed, Temperature, Time};

use crate::atmosphere;
use crate::registry::{
    ModuleCategory, ModuleDescriptor, RegistryError, SettingDescriptor, SocketDescriptor, quantity,
};
use crate::settings::Settings;

/// Registry entry.
pub const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    id: "air-sim",
    name: "Air Simulator",
    description: "Standard-atmosphere pitot-static and OAT sensors over a sine altitude profile",
    category: ModuleCategory::Source,
    inputs: &[],
    outputs: &[
        SocketDescriptor {
            name: "altitude",
            kind: quantity(Dimension::Length),
        },
        SocketDescriptor {
            name: "static-pressure",
            kind: quantity(Dimension::Pressure),
        },
        SocketDescriptor {
            name: "total-pressure",
            kind: quantity(Dimension::Pressure),
        },
        SocketDescriptor {
            name: "temperature",
            kind: quantity(Dimension::Temperature),
        },
    ],
    settings: &[
        SettingDescriptor {
            name: "altitude",
            description: "Mean pressure altitude",
            required: false,
            default: Some("0 ft"),
        },
        SettingDescriptor {
            name: "amplitude",
            description: "Altitude swing around the mean",
            required: false,
            default: Some("0 ft"),
        },
        SettingDescriptor {
            name: "period",
            description: "Duration of one climb and descent",
            required: false,
            default: Some("60 s"),
        },
        SettingDescriptor {
            name: "airspeed",
            description: "Calibrated airspeed",
            required: false,
            default: Some("100 kt"),
        },
    ],
};

/// Standard-atmosphere sensor simulator.
pub struct AirSimulator {
    altitude_out: ModuleOut<Length>,
    static_pressure: ModuleOut<Pressure>,
    total_pressure: ModuleOut<Pressure>,
    temperature: ModuleOut<Temperature>,
    altitude: Length,
    amplitude: Length,
    period: Time,
    airspeed: Speed,
}

impl AirSimulator {
    /// Adds a simulator configured from `settings`.
    pub fn create(
        graph: &mut ModuleGraph,
        instance: &str,
        settings: &Settings,
    ) -> Result<ModuleId, RegistryError> {
        let altitude = settings.get_or("altitude", Length::from_si(0.0))?;
        let amplitude = settings.get_or("amplitude", Length::from_si(0.0))?;
        let period = settings.get_or("period", Time::from_si(60.0))?;
        let airspeed = settings.get_or("airspeed", Speed::from_knots(100.0))?;
        Ok(graph.add_module(instance, |b| AirSimulator {
            altitude_out: b.output("altitude"),
            static_pressure: b.output("static-pressure"),
            total_pressure: b.output("total-pressure"),
            temperature: b.output("temperature"),
            altitude,
            amplitude,
            period,
            airspeed,
        })?)
    }

    /// Simulated altitude at loop time `t` (seconds).
    pub fn altitude_at(&self, t: f64) -> Length {
        self.altitude + self.amplitude * (TAU * t / self.period.si()).sin()
    }
}

impl Module for AirSimulator {
    fn initialize(&mut self) -> Result<(), ModuleError> {
        if self.period.si() <= 0.0 {
            return Err(ModuleError::InvalidSetting {
                name: "period".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let h = self.altitude_at(ctx.cycle().update_time().as_secs_f64());
        let ps = atmosphere::pressure_at(h);
        let qc = atmosphere::impact_pressure(self.airspeed);

        ctx.set(self.altitude_out, h);
        ctx.set(self.static_pressure, ps);
        ctx.set(self.total_pressure, ps + qc);
        ctx.set(self.temperature, atmosphere::temperature_at(h));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vario_core::ProcessingLoop;

    #[test]
    fn test_profile_and_sensors() {
        let mut graph = ModuleGraph::new();
        let settings = Settings::new()
            .with("altitude", "5000 ft")
            .with("amplitude", "1000 ft")
            .with("period", "4 s");
        AirSimulator::create(&mut graph, "sim", &settings).unwrap();
        let alt = graph.output::<Length>("/sim/altitude").unwrap();
        let ps = graph.output::<Pressure>("/sim/static-pressure").unwrap();
        let pt = graph.output::<Pressure>("/sim/total-pressure").unwrap();
        let oat = graph.output::<Temperature>("/sim/temperature").unwrap();

        let mut pl = ProcessingLoop::new(graph, Duration::from_secs(1));
        pl.execute_cycle(Duration::ZERO).unwrap();
        assert!((pl.graph().get(alt).unwrap().feet() - 5000.0).abs() < 1e-6);

        pl.execute_cycle(Duration::from_secs(1)).unwrap();
        let g = pl.graph();
        assert!((g.get(alt).unwrap().feet() - 6000.0).abs() < 1e-6);
        assert!(g.get(pt).unwrap().si() > g.get(ps).unwrap().si());
        // 6000 ft is about 3 °C in the standard atmosphere.
        assert!((g.get(oat).unwrap().celsius() - 3.1).abs() < 0.2);
    }
}
