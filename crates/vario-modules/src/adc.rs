//! Air data computer.
//!
//! Turns pitot-static pressures and outside air temperature into altitudes,
//! airspeeds and vertical speed.
//!
//! | output | needs |
//! |--------|-------|
//! | `altitude-std` | static pressure |
//! | `altitude-qnh` | static pressure, QNH |
//! | `ias` | static and total pressure |
//! | `tas` | static and total pressure, temperature |
//! | `vertical-speed` | two static pressure readings |
//!
//! Every output whose inputs are not all available is nil.

use vario_core::graph::{Module, ModuleGraph, ModuleId, ModuleIn, ModuleOut, ProcessContext};
use vario_core::{
    Dimension, Length, ModuleError, Pressure, SocketValueChanged, Speed, Temperature, Time,
};

use crate::atmosphere;
use crate::registry::{
    ModuleCategory, ModuleDescriptor, RegistryError, SettingDescriptor, SocketDescriptor, quantity,
};
use crate::settings::Settings;

/// Registry entry.
pub const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    id: "adc",
    name: "Air Data Computer",
    description: "Altitudes, airspeeds and vertical speed from pitot-static pressures",
    category: ModuleCategory::Computer,
    inputs: &[
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
        SocketDescriptor {
            name: "qnh",
            kind: quantity(Dimension::Pressure),
        },
    ],
    outputs: &[
        SocketDescriptor {
            name: "altitude-std",
            kind: quantity(Dimension::Length),
        },
        SocketDescriptor {
            name: "altitude-qnh",
            kind: quantity(Dimension::Length),
        },
        SocketDescriptor {
            name: "ias",
            kind: quantity(Dimension::Speed),
        },
        SocketDescriptor {
            name: "tas",
            kind: quantity(Dimension::Speed),
        },
        SocketDescriptor {
            name: "vertical-speed",
            kind: quantity(Dimension::Speed),
        },
    ],
    settings: &[SettingDescriptor {
        name: "vertical-speed-window",
        description: "Shortest time between the two readings vertical speed is computed from",
        required: false,
        default: Some("0.5 s"),
    }],
};

/// Air data computer.
pub struct AirDataComputer {
    static_pressure: ModuleIn<Pressure>,
    total_pressure: ModuleIn<Pressure>,
    temperature: ModuleIn<Temperature>,
    qnh: ModuleIn<Pressure>,
    altitude_std: ModuleOut<Length>,
    altitude_qnh: ModuleOut<Length>,
    ias: ModuleOut<Speed>,
    tas: ModuleOut<Speed>,
    vertical_speed: ModuleOut<Speed>,
    static_changed: SocketValueChanged<Pressure>,
    window: Time,
    /// Altitude and time of the reading vertical speed is measured from.
    reference: Option<(Length, f64)>,
    last_vs: Option<Speed>,
}

impl AirDataComputer {
    /// Adds an air data computer configured from `settings`.
    ///
    /// QNH defaults to 1013.25 hPa until connected.
    pub fn create(
        graph: &mut ModuleGraph,
        instance: &str,
        settings: &Settings,
    ) -> Result<ModuleId, RegistryError> {
        let window = settings.get_or("vertical-speed-window", Time::from_si(0.5))?;
        Ok(graph.add_module(instance, |b| {
            let static_pressure = b.input("static-pressure");
            AirDataComputer {
                static_pressure,
                total_pressure: b.input("total-pressure"),
                temperature: b.input("temperature"),
                qnh: b.input_with_fallback("qnh", Pressure::from_si(atmosphere::P0)),
                altitude_std: b.output("altitude-std"),
                altitude_qnh: b.output("altitude-qnh"),
                ias: b.output("ias"),
                tas: b.output("tas"),
                vertical_speed: b.output("vertical-speed"),
                static_changed: SocketValueChanged::new(static_pressure),
                window,
                reference: None,
                last_vs: None,
            }
        })?)
    }

    fn update_vertical_speed(&mut self, altitude: Option<Length>, now: f64) -> Option<Speed> {
        let Some(altitude) = altitude else {
            self.reference = None;
            self.last_vs = None;
            return None;
        };
        match self.reference {
            None => self.reference = Some((altitude, now)),
            Some((h0, t0)) if now - t0 >= self.window.si() => {
                self.last_vs = Some((altitude - h0) / Time::from_si(now - t0));
                self.reference = Some((altitude, now));
            }
            Some(_) => {}
        }
        self.last_vs
    }
}

impl Module for AirDataComputer {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let ps = ctx.get_optional(self.static_pressure);
        let pt = ctx.get_optional(self.total_pressure);
        let oat = ctx.get_optional(self.temperature);
        let qnh = ctx.get_optional(self.qnh);

        let std_datum = Pressure::from_si(atmosphere::P0);
        let altitude_std = ps.map(|p| atmosphere::altitude_at(p, std_datum));
        let altitude_qnh = ps.zip(qnh).map(|(p, q)| atmosphere::altitude_at(p, q));
        let ias = ps
            .zip(pt)
            .map(|(s, t)| atmosphere::calibrated_airspeed(t - s));
        let tas = ias
            .zip(ps.zip(oat))
            .map(|(v, (p, t))| atmosphere::true_airspeed(v, atmosphere::density(p, t)));

        let cycle = ctx.cycle().clone();
        let vs = if self.static_changed.value_changed(&*ctx, &cycle) {
            self.update_vertical_speed(altitude_std, cycle.update_time().as_secs_f64())
        } else {
            self.last_vs
        };

        ctx.set_optional(self.altitude_std, altitude_std);
        ctx.set_optional(self.altitude_qnh, altitude_qnh);
        ctx.set_optional(self.ias, ias);
        ctx.set_optional(self.tas, tas);
        ctx.set_optional(self.vertical_speed, vs);
        Ok(())
    }
}
