//! Value types that can live in a socket.
//!
//! The set of socket value types is closed: booleans, fixed-width integers,
//! floats, strings and the physical quantities of [`crate::si`]. Each one
//! implements [`SocketValue`], which fixes its [`ValueKind`], its binary blob
//! layout and its text form.
//!
//! # Blob layout
//!
//! All blobs are little-endian and carry their own nil marker:
//!
//! | kind | size | nil |
//! |------|------|-----|
//! | `bool` | 1 | byte `2` (`0` false, `1` true) |
//! | integers | 1 + width | flag byte `0`, then zeroed payload |
//! | `f32`, `f64` | width | NaN |
//! | quantities | 9 | flag byte `0`, then zeroed `f64` |
//! | `String` | 1 + len | flag byte `0`, no payload |

use core::fmt;

use crate::convert::{ConversionSettings, format_float};
use crate::error::ConversionError;
use crate::si::{
    Angle, Dimension, Frequency, Length, Pressure, Speed, Temperature, Time, format_quantity,
    parse_quantity,
};

/// Runtime tag of a socket's value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `String`
    String,
    /// A physical quantity of the given dimension.
    Quantity(Dimension),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::I8 => f.write_str("i8"),
            ValueKind::I16 => f.write_str("i16"),
            ValueKind::I32 => f.write_str("i32"),
            ValueKind::I64 => f.write_str("i64"),
            ValueKind::U8 => f.write_str("u8"),
            ValueKind::U16 => f.write_str("u16"),
            ValueKind::U32 => f.write_str("u32"),
            ValueKind::U64 => f.write_str("u64"),
            ValueKind::F32 => f.write_str("f32"),
            ValueKind::F64 => f.write_str("f64"),
            ValueKind::String => f.write_str("string"),
            ValueKind::Quantity(d) => write!(f, "{d}"),
        }
    }
}

/// A type that can be stored in a [`Socket`](crate::Socket).
///
/// Implementations define the blob and text encodings used by links,
/// instruments and configuration. Nil is not a value of the type: encoders
/// take `Option<&Self>` and decoders return `Option<Self>`.
pub trait SocketValue: Clone + PartialEq + fmt::Debug + 'static {
    /// Runtime tag of this type.
    const KIND: ValueKind;

    /// Blob size in bytes, or `None` if blobs are variable-size.
    const BLOB_SIZE: Option<usize>;

    /// Appends the blob encoding of `value` to `out`.
    fn encode_blob(value: Option<&Self>, out: &mut Vec<u8>);

    /// Decodes a blob produced by [`encode_blob`](Self::encode_blob).
    fn decode_blob(blob: &[u8]) -> Result<Option<Self>, ConversionError>;

    /// Renders the value as text.
    fn format(&self, settings: &ConversionSettings) -> String;

    /// Parses text produced by [`format`](Self::format) or typed by a user.
    fn parse(text: &str, settings: &ConversionSettings) -> Result<Self, ConversionError>;

    /// Numeric view of the value, if it has one.
    fn to_f64(&self) -> Option<f64> {
        None
    }
}

fn check_size(blob: &[u8], expected: usize) -> Result<&[u8], ConversionError> {
    if blob.len() == expected {
        Ok(blob)
    } else {
        Err(ConversionError::InvalidBlobSize {
            actual: blob.len(),
            expected,
        })
    }
}

fn hex(blob: &[u8]) -> String {
    blob.iter().map(|b| format!("{b:02x}")).collect()
}

impl SocketValue for bool {
    const KIND: ValueKind = ValueKind::Bool;
    const BLOB_SIZE: Option<usize> = Some(1);

    fn encode_blob(value: Option<&Self>, out: &mut Vec<u8>) {
        out.push(match value {
            Some(false) => 0,
            Some(true) => 1,
            None => 2,
        });
    }

    fn decode_blob(blob: &[u8]) -> Result<Option<Self>, ConversionError> {
        match check_size(blob, 1)?[0] {
            0 => Ok(Some(false)),
            1 => Ok(Some(true)),
            2 => Ok(None),
            _ => Err(ConversionError::parse(hex(blob), "invalid boolean byte")),
        }
    }

    fn format(&self, settings: &ConversionSettings) -> String {
        if *self {
            settings.true_value.clone()
        } else {
            settings.false_value.clone()
        }
    }

    fn parse(text: &str, settings: &ConversionSettings) -> Result<Self, ConversionError> {
        let text = text.trim();
        if text == settings.true_value {
            Ok(true)
        } else if text == settings.false_value {
            Ok(false)
        } else {
            Err(ConversionError::parse(
                text,
                format!(
                    "expected '{}' or '{}'",
                    settings.true_value, settings.false_value
                ),
            ))
        }
    }

    fn to_f64(&self) -> Option<f64> {
        Some(if *self { 1.0 } else { 0.0 })
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl SocketValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;
            const BLOB_SIZE: Option<usize> = Some(1 + size_of::<$ty>());

            fn encode_blob(value: Option<&Self>, out: &mut Vec<u8>) {
                match value {
                    Some(v) => {
                        out.push(1);
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                    None => {
                        out.push(0);
                        out.extend_from_slice(&[0u8; size_of::<$ty>()]);
                    }
                }
            }

            fn decode_blob(blob: &[u8]) -> Result<Option<Self>, ConversionError> {
                let blob = check_size(blob, 1 + size_of::<$ty>())?;
                if blob[0] == 0 {
                    return Ok(None);
                }
                let mut bytes = [0u8; size_of::<$ty>()];
                bytes.copy_from_slice(&blob[1..]);
                Ok(Some(<$ty>::from_le_bytes(bytes)))
            }

            fn format(&self, _settings: &ConversionSettings) -> String {
                self.to_string()
            }

            fn parse(text: &str, _settings: &ConversionSettings) -> Result<Self, ConversionError> {
                text.trim()
                    .parse::<$ty>()
                    .map_err(|e| ConversionError::parse(text, e.to_string()))
            }

            fn to_f64(&self) -> Option<f64> {
                Some(*self as f64)
            }
        }
    )*};
}

impl_integer!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

// NaN doubles as nil, so a NaN value written to a float socket encodes as nil.
macro_rules! impl_float {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl SocketValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;
            const BLOB_SIZE: Option<usize> = Some(size_of::<$ty>());

            fn encode_blob(value: Option<&Self>, out: &mut Vec<u8>) {
                let v = value.copied().unwrap_or(<$ty>::NAN);
                out.extend_from_slice(&v.to_le_bytes());
            }

            fn decode_blob(blob: &[u8]) -> Result<Option<Self>, ConversionError> {
                let blob = check_size(blob, size_of::<$ty>())?;
                let mut bytes = [0u8; size_of::<$ty>()];
                bytes.copy_from_slice(blob);
                let v = <$ty>::from_le_bytes(bytes);
                Ok(if v.is_nan() { None } else { Some(v) })
            }

            fn format(&self, settings: &ConversionSettings) -> String {
                format_float(f64::from(*self), settings)
            }

            fn parse(text: &str, _settings: &ConversionSettings) -> Result<Self, ConversionError> {
                text.trim()
                    .parse::<$ty>()
                    .map_err(|e| ConversionError::parse(text, e.to_string()))
            }

            fn to_f64(&self) -> Option<f64> {
                Some(f64::from(*self))
            }
        }
    )*};
}

impl_float!(f32 => F32, f64 => F64);

impl SocketValue for String {
    const KIND: ValueKind = ValueKind::String;
    const BLOB_SIZE: Option<usize> = None;

    fn encode_blob(value: Option<&Self>, out: &mut Vec<u8>) {
        match value {
            Some(s) => {
                out.push(1);
                out.extend_from_slice(s.as_bytes());
            }
            None => out.push(0),
        }
    }

    fn decode_blob(blob: &[u8]) -> Result<Option<Self>, ConversionError> {
        let Some((&flag, payload)) = blob.split_first() else {
            return Err(ConversionError::InvalidBlobSize {
                actual: 0,
                expected: 1,
            });
        };
        if flag == 0 {
            return Ok(None);
        }
        String::from_utf8(payload.to_vec())
            .map(Some)
            .map_err(|e| ConversionError::parse(hex(payload), e.to_string()))
    }

    fn format(&self, _settings: &ConversionSettings) -> String {
        self.clone()
    }

    fn parse(text: &str, _settings: &ConversionSettings) -> Result<Self, ConversionError> {
        Ok(text.to_string())
    }
}

macro_rules! impl_quantity {
    ($($ty:ident),* $(,)?) => {$(
        impl SocketValue for $ty {
            const KIND: ValueKind = ValueKind::Quantity($ty::DIMENSION);
            const BLOB_SIZE: Option<usize> = Some(9);

            fn encode_blob(value: Option<&Self>, out: &mut Vec<u8>) {
                match value {
                    Some(q) => {
                        out.push(1);
                        out.extend_from_slice(&q.si().to_le_bytes());
                    }
                    None => {
                        out.push(0);
                        out.extend_from_slice(&[0u8; 8]);
                    }
                }
            }

            fn decode_blob(blob: &[u8]) -> Result<Option<Self>, ConversionError> {
                let blob = check_size(blob, 9)?;
                if blob[0] == 0 {
                    return Ok(None);
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&blob[1..]);
                Ok(Some($ty::from_si(f64::from_le_bytes(bytes))))
            }

            fn format(&self, settings: &ConversionSettings) -> String {
                format_quantity(self.si(), $ty::DIMENSION, settings)
            }

            fn parse(text: &str, _settings: &ConversionSettings) -> Result<Self, ConversionError> {
                parse_quantity(text, $ty::DIMENSION).map($ty::from_si)
            }

            fn to_f64(&self) -> Option<f64> {
                Some(self.si())
            }
        }
    )*};
}

impl_quantity!(Length, Speed, Angle, Time, Pressure, Temperature, Frequency);

#[cfg(test)]
mod tests {
    use super::*;

    fn blob<T: SocketValue>(value: Option<&T>) -> Vec<u8> {
        let mut out = Vec::new();
        T::encode_blob(value, &mut out);
        out
    }

    #[test]
    fn test_integer_blob_layout() {
        assert_eq!(blob(Some(&5i32)), vec![1, 5, 0, 0, 0]);
        assert_eq!(blob::<i32>(None), vec![0, 0, 0, 0, 0]);
        assert_eq!(i32::BLOB_SIZE, Some(5));
        assert_eq!(u8::BLOB_SIZE, Some(2));
    }

    #[test]
    fn test_integer_blob_rejects_wrong_size() {
        let err = i32::decode_blob(&[1, 5, 0]).unwrap_err();
        assert_eq!(
            err,
            ConversionError::InvalidBlobSize {
                actual: 3,
                expected: 5
            }
        );
    }

    #[test]
    fn test_bool_blob() {
        assert_eq!(blob(Some(&true)), vec![1]);
        assert_eq!(blob::<bool>(None), vec![2]);
        assert_eq!(bool::decode_blob(&[0]).unwrap(), Some(false));
        assert_eq!(bool::decode_blob(&[2]).unwrap(), None);
        assert!(matches!(
            bool::decode_blob(&[7]),
            Err(ConversionError::Parse { .. })
        ));
    }

    #[test]
    fn test_float_nil_is_nan() {
        assert_eq!(blob::<f64>(None).len(), 8);
        assert_eq!(f64::decode_blob(&blob::<f64>(None)).unwrap(), None);
        assert_eq!(f32::decode_blob(&blob(Some(&1.5f32))).unwrap(), Some(1.5));
    }

    #[test]
    fn test_string_blob() {
        let text = "N123AB".to_string();
        assert_eq!(String::decode_blob(&blob(Some(&text))).unwrap(), Some(text));
        assert_eq!(String::decode_blob(&[0]).unwrap(), None);
        assert!(matches!(
            String::decode_blob(&[]),
            Err(ConversionError::InvalidBlobSize { actual: 0, .. })
        ));
    }

    #[test]
    fn test_quantity_blob_is_si() {
        let alt = Length::from_feet(1000.0);
        let encoded = blob(Some(&alt));
        assert_eq!(encoded.len(), 9);
        assert_eq!(encoded[0], 1);
        assert_eq!(&encoded[1..], &304.8f64.to_le_bytes());
    }

    #[test]
    fn test_integer_parse_error() {
        let settings = ConversionSettings::default();
        assert_eq!(i16::parse(" 42 ", &settings).unwrap(), 42);
        assert!(matches!(
            i16::parse("4x2", &settings),
            Err(ConversionError::Parse { .. })
        ));
        assert!(u8::parse("300", &settings).is_err());
    }

    #[test]
    fn test_bool_uses_configured_tokens() {
        let settings = ConversionSettings::default().with_bool_values("ON", "OFF");
        assert_eq!(true.format(&settings), "ON");
        assert!(!bool::parse("OFF", &settings).unwrap());
        assert!(bool::parse("true", &settings).is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::I32.to_string(), "i32");
        assert_eq!(Speed::KIND.to_string(), "speed");
        assert_eq!(<Pressure as SocketValue>::KIND, ValueKind::Quantity(Dimension::Pressure));
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(7u16.to_f64(), Some(7.0));
        assert_eq!(true.to_f64(), Some(1.0));
        assert_eq!("x".to_string().to_f64(), None);
        assert_eq!(Time::from_si(2.0).to_f64(), Some(2.0));
    }
}
