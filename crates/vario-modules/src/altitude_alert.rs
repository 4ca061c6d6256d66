//! Altitude alerter.
//!
//! Raises `alert` while the aircraft approaches the selected altitude: closer
//! than `threshold` but not yet within `capture`. Each rising edge of the alert
//! is counted on `alerts`. The inputs are re-evaluated only when one of them
//! changed, and at most once per `minimum-interval`.

use std::time::Duration;

use vario_core::graph::{Module, ModuleGraph, ModuleId, ModuleIn, ModuleOut, ProcessContext};
use vario_core::{Dimension, Length, ModuleError, SocketObserver, Time, ValueKind};

use crate::registry::{
    ModuleCategory, ModuleDescriptor, RegistryError, SettingDescriptor, SocketDescriptor, quantity,
};
use crate::settings::Settings;

/// Registry entry.
pub const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    id: "altitude-alert",
    name: "Altitude Alerter",
    description: "Alerts when approaching the selected altitude",
    category: ModuleCategory::Warning,
    inputs: &[
        SocketDescriptor {
            name: "altitude",
            kind: quantity(Dimension::Length),
        },
        SocketDescriptor {
            name: "selected-altitude",
            kind: quantity(Dimension::Length),
        },
    ],
    outputs: &[
        SocketDescriptor {
            name: "alert",
            kind: ValueKind::Bool,
        },
        SocketDescriptor {
            name: "alerts",
            kind: ValueKind::U32,
        },
    ],
    settings: &[
        SettingDescriptor {
            name: "threshold",
            description: "Deviation below which the alert starts",
            required: false,
            default: Some("1000 ft"),
        },
        SettingDescriptor {
            name: "capture",
            description: "Deviation below which the altitude counts as captured",
            required: false,
            default: Some("200 ft"),
        },
        SettingDescriptor {
            name: "minimum-interval",
            description: "Shortest time between two evaluations",
            required: false,
            default: Some("1 s"),
        },
    ],
};

/// Altitude alerter.
pub struct AltitudeAlert {
    altitude: ModuleIn<Length>,
    selected: ModuleIn<Length>,
    alert: ModuleOut<bool>,
    alerts: ModuleOut<u32>,
    threshold: Length,
    capture: Length,
    observer: SocketObserver,
    active: bool,
    count: u32,
}

impl AltitudeAlert {
    /// Adds an alerter configured from `settings`.
    pub fn create(
        graph: &mut ModuleGraph,
        instance: &str,
        settings: &Settings,
    ) -> Result<ModuleId, RegistryError> {
        let threshold = settings.get_or("threshold", Length::from_feet(1000.0))?;
        let capture = settings.get_or("capture", Length::from_feet(200.0))?;
        let interval = settings.get_or("minimum-interval", Time::from_si(1.0))?;
        let interval = Duration::try_from_secs_f64(interval.si()).map_err(|_| {
            ModuleError::InvalidSetting {
                name: "minimum-interval".into(),
                reason: format!("{} s is not a usable duration", interval.si()),
            }
        })?;

        Ok(graph.add_module(instance, |b| {
            let altitude = b.input("altitude");
            let selected = b.input("selected-altitude");
            let mut observer = SocketObserver::new();
            observer.observe(altitude).observe(selected);
            observer.set_minimum_dt(interval);
            AltitudeAlert {
                altitude,
                selected,
                alert: b.output("alert"),
                alerts: b.output("alerts"),
                threshold,
                capture,
                observer,
                active: false,
                count: 0,
            }
        })?)
    }

    /// Whether the alert is on for the given altitudes.
    pub fn in_alert_band(&self, altitude: Length, selected: Length) -> bool {
        let deviation = (altitude - selected).si().abs();
        deviation > self.capture.si() && deviation <= self.threshold.si()
    }
}

impl Module for AltitudeAlert {
    fn initialize(&mut self) -> Result<(), ModuleError> {
        if self.capture.si() >= self.threshold.si() {
            return Err(ModuleError::InvalidSetting {
                name: "capture".into(),
                reason: "must be smaller than threshold".into(),
            });
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ModuleError> {
        let cycle = ctx.cycle().clone();
        if !self.observer.process(&*ctx, &cycle) {
            return Ok(());
        }

        let altitude = ctx.get_optional(self.altitude);
        let selected = ctx.get_optional(self.selected);
        let Some((altitude, selected)) = altitude.zip(selected) else {
            self.active = false;
            ctx.set_nil(self.alert);
            return Ok(());
        };

        let active = self.in_alert_band(altitude, selected);
        if active && !self.active {
            self.count += 1;
            tracing::info!(
                altitude_ft = altitude.feet(),
                selected_ft = selected.feet(),
                "altitude alert"
            );
        }
        self.active = active;
        ctx.set(self.alert, active);
        ctx.set(self.alerts, self.count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vario_core::Cycle;

    struct Rig {
        graph: ModuleGraph,
        altitude: ModuleIn<Length>,
        alert: ModuleOut<bool>,
        alerts: ModuleOut<u32>,
        cycle: Cycle,
    }

    impl Rig {
        fn new(settings: &Settings) -> Self {
            let mut graph = ModuleGraph::new();
            AltitudeAlert::create(&mut graph, "alt", settings).unwrap();
            let selected = graph.input("/alt/selected-altitude").unwrap();
            graph
                .connect_constant(selected, Length::from_feet(5000.0))
                .unwrap();
            graph.initialize_modules().unwrap();
            Rig {
                altitude: graph.input("/alt/altitude").unwrap(),
                alert: graph.output("/alt/alert").unwrap(),
                alerts: graph.output("/alt/alerts").unwrap(),
                graph,
                cycle: Cycle::new(1, Duration::ZERO, Duration::ZERO, Duration::from_secs(1)),
            }
        }

        /// Runs one cycle, optionally feeding a new altitude first.
        fn step(&mut self, feet: Option<f64>) -> (Option<bool>, Option<u32>) {
            if let Some(feet) = feet {
                self.graph
                    .connect_constant(self.altitude, Length::from_feet(feet))
                    .unwrap();
            }
            self.graph.fetch(self.alert, &self.cycle);
            self.graph.fetch(self.alerts, &self.cycle);
            self.cycle = self.cycle.next(Duration::from_secs(1));
            (
                self.graph.get_optional(self.alert),
                self.graph.get_optional(self.alerts),
            )
        }
    }

    #[test]
    fn test_band_edges() {
        let mut graph = ModuleGraph::new();
        AltitudeAlert::create(&mut graph, "alt", &Settings::new()).unwrap();
        let module = AltitudeAlert {
            altitude: graph.input("/alt/altitude").unwrap(),
            selected: graph.input("/alt/selected-altitude").unwrap(),
            alert: graph.output("/alt/alert").unwrap(),
            alerts: graph.output("/alt/alerts").unwrap(),
            threshold: Length::from_feet(1000.0),
            capture: Length::from_feet(200.0),
            observer: SocketObserver::new(),
            active: false,
            count: 0,
        };
        let sel = Length::from_feet(5000.0);
        assert!(!module.in_alert_band(Length::from_feet(3000.0), sel));
        assert!(module.in_alert_band(Length::from_feet(4500.0), sel));
        assert!(module.in_alert_band(Length::from_feet(5500.0), sel));
        assert!(!module.in_alert_band(Length::from_feet(4900.0), sel));
    }

    #[test]
    fn test_counts_rising_edges() {
        let mut rig = Rig::new(&Settings::new().with("minimum-interval", "0 s"));
        assert_eq!(rig.step(Some(3000.0)), (Some(false), Some(0)));
        assert_eq!(rig.step(Some(4200.0)), (Some(true), Some(1)));
        assert_eq!(rig.step(Some(4500.0)), (Some(true), Some(1)));
        assert_eq!(rig.step(Some(4900.0)), (Some(false), Some(1)));
        assert_eq!(rig.step(Some(4000.0)), (Some(true), Some(2)));
    }

    #[test]
    fn test_minimum_interval_defers_evaluation() {
        let mut rig = Rig::new(&Settings::new().with("minimum-interval", "2 s"));
        assert_eq!(rig.step(Some(3000.0)), (Some(false), Some(0)));
        // Too soon after the first evaluation: output unchanged.
        assert_eq!(rig.step(Some(4200.0)), (Some(false), Some(0)));
        // Held change is evaluated once the interval passed.
        assert_eq!(rig.step(None), (Some(true), Some(1)));
    }

    #[test]
    fn test_nil_altitude_clears_alert() {
        let mut rig = Rig::new(&Settings::new().with("minimum-interval", "0 s"));
        rig.step(Some(4200.0));
        rig.graph.disconnect(rig.altitude).unwrap();
        let (alert, alerts) = rig.step(None);
        assert_eq!(alert, None);
        assert_eq!(alerts, Some(1));
    }

    #[test]
    fn test_capture_must_be_inside_threshold() {
        let mut graph = ModuleGraph::new();
        let settings = Settings::new()
            .with("threshold", "300 ft")
            .with("capture", "500 ft");
        AltitudeAlert::create(&mut graph, "alt", &settings).unwrap();
        assert!(graph.initialize_modules().is_err());
    }

    #[test]
    fn test_minimum_interval_must_be_a_duration() {
        for text in ["-1 s", "inf s", "nan s", "1e20 s"] {
            let mut graph = ModuleGraph::new();
            let settings = Settings::new().with("minimum-interval", text);
            let err = AltitudeAlert::create(&mut graph, "alt", &settings).unwrap_err();
            assert!(
                matches!(
                    err,
                    RegistryError::Setting(ModuleError::InvalidSetting { ref name, .. })
                        if name == "minimum-interval"
                ),
                "{text}: {err}"
            );
            assert_eq!(graph.module_count(), 0);
        }
    }
}
