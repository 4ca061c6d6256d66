//! International Standard Atmosphere (troposphere) relations.
//!
//! All functions work in SI units and are valid below the tropopause
//! (11 000 m).

use vario_core::{Length, Pressure, Speed, Temperature};

/// Sea-level standard pressure (Pa).
pub const P0: f64 = 101_325.0;
/// Sea-level standard temperature (K).
pub const T0: f64 = 288.15;
/// Sea-level standard density (kg/m³).
pub const RHO0: f64 = 1.225;
/// Sea-level speed of sound (m/s).
pub const A0: f64 = 340.294;
/// Temperature lapse rate (K/m).
pub const LAPSE_RATE: f64 = 0.0065;
/// Specific gas constant of dry air (J/(kg·K)).
pub const R_AIR: f64 = 287.05;

/// Altitude scale of the barometric formula, `T0 / LAPSE_RATE` (m).
const H_SCALE: f64 = 44_330.77;
/// Barometric exponent `g / (R * L)`.
const EXPONENT: f64 = 5.255_876;

/// Static pressure at pressure altitude `h` above the 1013.25 hPa datum.
pub fn pressure_at(altitude: Length) -> Pressure {
    Pressure::from_si(P0 * (1.0 - altitude.si() / H_SCALE).powf(EXPONENT))
}

/// Standard temperature at `altitude`.
pub fn temperature_at(altitude: Length) -> Temperature {
    Temperature::from_si(T0 - LAPSE_RATE * altitude.si())
}

/// Altitude at which `pressure` is found, measured from the level where the
/// pressure is `datum`.
pub fn altitude_at(pressure: Pressure, datum: Pressure) -> Length {
    Length::from_si(H_SCALE * (1.0 - (pressure.si() / datum.si()).powf(1.0 / EXPONENT)))
}

/// Impact pressure (total minus static) sensed at calibrated airspeed `cas`.
pub fn impact_pressure(cas: Speed) -> Pressure {
    let m = cas.si() / A0;
    Pressure::from_si(P0 * ((1.0 + 0.2 * m * m).powf(3.5) - 1.0))
}

/// Calibrated airspeed from impact pressure. Negative impact pressure reads
/// as zero speed.
pub fn calibrated_airspeed(impact: Pressure) -> Speed {
    let qc = impact.si().max(0.0);
    Speed::from_si(A0 * (5.0 * ((qc / P0 + 1.0).powf(2.0 / 7.0) - 1.0)).sqrt())
}

/// Air density from static pressure and absolute temperature.
pub fn density(pressure: Pressure, temperature: Temperature) -> f64 {
    pressure.si() / (R_AIR * temperature.si())
}

/// True airspeed from equivalent airspeed and air density.
pub fn true_airspeed(eas: Speed, density: f64) -> Speed {
    eas * (RHO0 / density).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sea_level() {
        assert!((pressure_at(Length::from_si(0.0)).si() - P0).abs() < 1e-9);
        assert_eq!(temperature_at(Length::from_si(0.0)).si(), T0);
        assert!(altitude_at(Pressure::from_si(P0), Pressure::from_si(P0)).si().abs() < 1e-9);
    }

    #[test]
    fn test_pressure_altitude_inverse() {
        for feet in [0.0, 1_000.0, 10_000.0, 30_000.0] {
            let h = Length::from_feet(feet);
            let back = altitude_at(pressure_at(h), Pressure::from_si(P0));
            assert!((back.feet() - feet).abs() < 1.0, "{feet} ft -> {} ft", back.feet());
        }
    }

    #[test]
    fn test_known_pressure_at_10000_ft() {
        // 10 000 ft in the ISA is 696.8 hPa.
        let p = pressure_at(Length::from_feet(10_000.0));
        assert!((p.hpa() - 696.8).abs() < 0.5, "got {} hPa", p.hpa());
    }

    #[test]
    fn test_airspeed_inverse() {
        for knots in [0.0, 60.0, 120.0, 250.0] {
            let cas = Speed::from_knots(knots);
            let back = calibrated_airspeed(impact_pressure(cas));
            assert!((back.knots() - knots).abs() < 1e-6);
        }
    }

    #[test]
    fn test_tas_exceeds_eas_aloft() {
        let h = Length::from_feet(10_000.0);
        let rho = density(pressure_at(h), temperature_at(h));
        let tas = true_airspeed(Speed::from_knots(100.0), rho);
        // Rule of thumb: about 2 % per 1000 ft.
        assert!(tas.knots() > 115.0 && tas.knots() < 118.0, "got {}", tas.knots());
    }
}
