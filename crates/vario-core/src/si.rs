//! Physical quantities and their units.
//!
//! Every quantity is stored in its SI base unit (metres, metres per second,
//! radians, seconds, pascals, kelvins, hertz). Units only matter at the text
//! boundary: [`parse_quantity`] accepts any known unit of the right
//! [`Dimension`] and [`format_quantity`] renders in the first preferred unit
//! that matches, falling back to the base unit.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use core::time::Duration;

use crate::convert::{ConversionSettings, format_float};
use crate::error::ConversionError;

/// Physical dimension of a quantity socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Distance or altitude (base unit: m).
    Length,
    /// Airspeed, ground speed or vertical speed (base unit: m/s).
    Speed,
    /// Attitude, heading or track (base unit: rad).
    Angle,
    /// Durations (base unit: s).
    Time,
    /// Static, total or dynamic pressure (base unit: Pa).
    Pressure,
    /// Air temperature (base unit: K).
    Temperature,
    /// Rates and engine speeds (base unit: Hz).
    Frequency,
}

impl Dimension {
    /// Returns the lowercase name of the dimension.
    pub const fn name(self) -> &'static str {
        match self {
            Dimension::Length => "length",
            Dimension::Speed => "speed",
            Dimension::Angle => "angle",
            Dimension::Time => "time",
            Dimension::Pressure => "pressure",
            Dimension::Temperature => "temperature",
            Dimension::Frequency => "frequency",
        }
    }

    /// Returns the SI base unit of the dimension.
    pub fn base_unit(self) -> &'static Unit {
        // Each dimension lists its base unit first in the table.
        UNITS
            .iter()
            .find(|u| u.dimension == self)
            .unwrap_or(&UNITS[0])
    }

    /// Iterates over all known units of the dimension.
    pub fn units(self) -> impl Iterator<Item = &'static Unit> {
        UNITS.iter().filter(move |u| u.dimension == self)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit of measure: `si = value * scale + offset`.
#[derive(Debug, PartialEq)]
pub struct Unit {
    /// Canonical symbol used when formatting.
    pub symbol: &'static str,
    /// Additional spellings accepted when parsing.
    pub aliases: &'static [&'static str],
    /// Dimension this unit measures.
    pub dimension: Dimension,
    /// Multiplier to the SI base unit.
    pub scale: f64,
    /// Offset added after scaling (only non-zero for temperatures).
    pub offset: f64,
}

impl Unit {
    /// Converts a value in this unit to the SI base unit.
    #[inline]
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Converts a value in the SI base unit to this unit.
    #[inline]
    pub fn from_si(&self, si: f64) -> f64 {
        (si - self.offset) / self.scale
    }

    /// Looks up a unit by symbol or alias.
    pub fn find(symbol: &str) -> Option<&'static Unit> {
        UNITS
            .iter()
            .find(|u| u.symbol == symbol || u.aliases.contains(&symbol))
    }

    /// Looks up a unit and checks that it measures `dimension`.
    pub fn lookup(symbol: &str, dimension: Dimension) -> Result<&'static Unit, ConversionError> {
        let unit = Unit::find(symbol).ok_or_else(|| ConversionError::UnknownUnit(symbol.into()))?;
        if unit.dimension != dimension {
            return Err(ConversionError::IncompatibleUnit {
                unit: symbol.into(),
                expected: dimension,
            });
        }
        Ok(unit)
    }
}

const fn unit(
    symbol: &'static str,
    aliases: &'static [&'static str],
    dimension: Dimension,
    scale: f64,
    offset: f64,
) -> Unit {
    Unit {
        symbol,
        aliases,
        dimension,
        scale,
        offset,
    }
}

/// Known units. The first entry of each dimension is its SI base unit.
static UNITS: &[Unit] = &[
    unit("m", &[], Dimension::Length, 1.0, 0.0),
    unit("km", &[], Dimension::Length, 1000.0, 0.0),
    unit("ft", &[], Dimension::Length, 0.3048, 0.0),
    unit("nmi", &["NM"], Dimension::Length, 1852.0, 0.0),
    unit("mi", &[], Dimension::Length, 1609.344, 0.0),
    unit("m/s", &["mps"], Dimension::Speed, 1.0, 0.0),
    unit("km/h", &["kph"], Dimension::Speed, 1.0 / 3.6, 0.0),
    unit("kt", &["kn", "kts"], Dimension::Speed, 1852.0 / 3600.0, 0.0),
    unit("ft/min", &["fpm"], Dimension::Speed, 0.3048 / 60.0, 0.0),
    unit("mph", &[], Dimension::Speed, 0.44704, 0.0),
    unit("rad", &[], Dimension::Angle, 1.0, 0.0),
    unit("deg", &["°"], Dimension::Angle, core::f64::consts::PI / 180.0, 0.0),
    unit("s", &["sec"], Dimension::Time, 1.0, 0.0),
    unit("ms", &[], Dimension::Time, 0.001, 0.0),
    unit("min", &[], Dimension::Time, 60.0, 0.0),
    unit("h", &[], Dimension::Time, 3600.0, 0.0),
    unit("Pa", &[], Dimension::Pressure, 1.0, 0.0),
    unit("hPa", &["mbar", "mb"], Dimension::Pressure, 100.0, 0.0),
    unit("inHg", &[], Dimension::Pressure, 3386.389, 0.0),
    unit("psi", &[], Dimension::Pressure, 6894.757293168, 0.0),
    unit("K", &[], Dimension::Temperature, 1.0, 0.0),
    unit("°C", &["degC", "C"], Dimension::Temperature, 1.0, 273.15),
    unit("°F", &["degF", "F"], Dimension::Temperature, 5.0 / 9.0, 459.67 * 5.0 / 9.0),
    unit("Hz", &[], Dimension::Frequency, 1.0, 0.0),
    unit("kHz", &[], Dimension::Frequency, 1000.0, 0.0),
    unit("rpm", &[], Dimension::Frequency, 1.0 / 60.0, 0.0),
];

/// Parses `"<number> <unit>"` (whitespace optional) into an SI value.
///
/// A bare number is taken to be in the base unit.
pub fn parse_quantity(text: &str, dimension: Dimension) -> Result<f64, ConversionError> {
    let text = text.trim();
    let (number, rest) = split_number(text)
        .ok_or_else(|| ConversionError::parse(text, "expected a number followed by a unit"))?;
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(number);
    }
    Ok(Unit::lookup(rest, dimension)?.to_si(number))
}

/// Formats an SI value in the first preferred unit of its dimension.
pub fn format_quantity(si: f64, dimension: Dimension, settings: &ConversionSettings) -> String {
    let unit = settings
        .preferred_units
        .iter()
        .filter_map(|symbol| Unit::find(symbol))
        .find(|u| u.dimension == dimension)
        .unwrap_or_else(|| dimension.base_unit());
    format!("{} {}", format_float(unit.from_si(si), settings), unit.symbol)
}

/// Splits the longest numeric prefix off `text`.
fn split_number(text: &str) -> Option<(f64, &str)> {
    text.char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .find_map(|end| {
            text[..end]
                .trim_end()
                .parse::<f64>()
                .ok()
                .map(|n| (n, &text[end..]))
        })
}

macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident, $dimension:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
        pub struct $name(f64);

        impl $name {
            /// Dimension measured by this quantity.
            pub const DIMENSION: Dimension = Dimension::$dimension;

            /// Creates a quantity from a value in the SI base unit.
            #[inline]
            pub const fn from_si(value: f64) -> Self {
                Self(value)
            }

            /// Returns the value in the SI base unit.
            #[inline]
            pub const fn si(self) -> f64 {
                self.0
            }

            /// Creates a quantity from a value in the named unit.
            pub fn new(value: f64, unit: &str) -> Result<Self, ConversionError> {
                Ok(Self(Unit::lookup(unit, Self::DIMENSION)?.to_si(value)))
            }

            /// Returns the value expressed in the named unit.
            pub fn in_unit(self, unit: &str) -> Result<f64, ConversionError> {
                Ok(Unit::lookup(unit, Self::DIMENSION)?.from_si(self.0))
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} {}", self.0, Self::DIMENSION.base_unit().symbol)
            }
        }
    };
}

quantity!(
    /// Distance or altitude.
    Length, Length
);
quantity!(
    /// Linear speed.
    Speed, Speed
);
quantity!(
    /// Plane angle.
    Angle, Angle
);
quantity!(
    /// Time interval.
    Time, Time
);
quantity!(
    /// Pressure.
    Pressure, Pressure
);
quantity!(
    /// Absolute temperature.
    Temperature, Temperature
);
quantity!(
    /// Frequency.
    Frequency, Frequency
);

impl Length {
    /// Creates a length in feet.
    pub fn from_feet(feet: f64) -> Self {
        Self(feet * 0.3048)
    }

    /// Returns the length in feet.
    pub fn feet(self) -> f64 {
        self.0 / 0.3048
    }
}

impl Speed {
    /// Creates a speed in knots.
    pub fn from_knots(knots: f64) -> Self {
        Self(knots * 1852.0 / 3600.0)
    }

    /// Returns the speed in knots.
    pub fn knots(self) -> f64 {
        self.0 * 3600.0 / 1852.0
    }
}

impl Angle {
    /// Creates an angle in degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    /// Returns the angle in degrees.
    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

impl Pressure {
    /// Creates a pressure in hectopascals.
    pub fn from_hpa(hpa: f64) -> Self {
        Self(hpa * 100.0)
    }

    /// Returns the pressure in hectopascals.
    pub fn hpa(self) -> f64 {
        self.0 / 100.0
    }
}

impl Temperature {
    /// Creates a temperature in degrees Celsius.
    pub fn from_celsius(celsius: f64) -> Self {
        Self(celsius + 273.15)
    }

    /// Returns the temperature in degrees Celsius.
    pub fn celsius(self) -> f64 {
        self.0 - 273.15
    }
}

impl From<Duration> for Time {
    fn from(d: Duration) -> Self {
        Self(d.as_secs_f64())
    }
}

impl Div<Time> for Length {
    type Output = Speed;
    fn div(self, rhs: Time) -> Speed {
        Speed(self.0 / rhs.0)
    }
}

impl Mul<Time> for Speed {
    type Output = Length;
    fn mul(self, rhs: Time) -> Length {
        Length(self.0 * rhs.0)
    }
}
