//! The socket value cell.
//!
//! A [`Socket<T>`] holds an optional value of a [`SocketValue`] type plus an
//! optional fallback, and counts its writes in a serial number. Modules reach
//! sockets through the [`ModuleGraph`](crate::graph::ModuleGraph); the graph
//! stores them type-erased behind [`BasicSocket`].
//!
//! Write semantics:
//!
//! - every explicit write (`set`, `set_nil`, `set_optional`, `copy_from`,
//!   `from_string`, `from_blob`) bumps the serial, even if the value is equal;
//! - configuring the fallback never bumps the serial;
//! - reads prefer the value, then the fallback, and are nil otherwise.

use core::any::Any;
use core::time::Duration;

use crate::convert::ConversionSettings;
use crate::cycle::Cycle;
use crate::error::{ConversionError, SocketError};
use crate::value::{SocketValue, ValueKind};

/// Typed, nilable, versioned value cell.
#[derive(Debug, Clone)]
pub struct Socket<T: SocketValue> {
    path: String,
    value: Option<T>,
    fallback: Option<T>,
    serial: u64,
    modification_time: Option<Duration>,
    valid_time: Option<Duration>,
    nil_by_fetch_error: bool,
}

impl<T: SocketValue> Socket<T> {
    /// Creates a nil socket with no fallback.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
            fallback: None,
            serial: 0,
            modification_time: None,
            valid_time: None,
            nil_by_fetch_error: false,
        }
    }

    /// Builder method to set the fallback value.
    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Diagnostic path of the socket.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the value, else the fallback, else a nil error.
    pub fn get(&self) -> Result<T, SocketError> {
        self.get_optional().ok_or_else(|| SocketError::NilValue {
            path: self.path.clone(),
        })
    }

    /// Returns the value, else the fallback.
    pub fn get_optional(&self) -> Option<T> {
        self.value.as_ref().or(self.fallback.as_ref()).cloned()
    }

    /// Borrows the value, else the fallback.
    pub fn get_ref(&self) -> Option<&T> {
        self.value.as_ref().or(self.fallback.as_ref())
    }

    /// Returns the value, else the fallback, else `default`.
    pub fn value_or(&self, default: T) -> T {
        self.get_optional().unwrap_or(default)
    }

    /// True if a value (not just a fallback) is present.
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// True if neither a value nor a fallback is present.
    pub fn is_nil(&self) -> bool {
        self.value.is_none() && self.fallback.is_none()
    }

    /// Number of explicit writes so far.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Configured fallback.
    pub fn fallback(&self) -> Option<&T> {
        self.fallback.as_ref()
    }

    /// Sets or clears the fallback. Does not bump the serial.
    pub fn set_fallback(&mut self, fallback: Option<T>) {
        self.fallback = fallback;
    }

    /// Writes a value.
    pub fn set(&mut self, value: T) {
        self.write(Some(value));
    }

    /// Writes nil.
    pub fn set_nil(&mut self) {
        self.write(None);
    }

    /// Writes a value or nil.
    pub fn set_optional(&mut self, value: Option<T>) {
        self.write(value);
    }

    /// Writes what `other` reads as (its value, else its fallback).
    pub fn copy_from(&mut self, other: &Socket<T>) {
        self.write(other.get_optional());
    }

    /// Parses `text` and writes it. The nil sentinel writes nil.
    pub fn from_string(
        &mut self,
        text: &str,
        settings: &ConversionSettings,
    ) -> Result<(), ConversionError> {
        let value = parse_optional::<T>(text, settings)?;
        self.write(value);
        Ok(())
    }

    /// Renders what the socket reads as, or the nil sentinel.
    pub fn to_string(&self, settings: &ConversionSettings) -> String {
        match self.get_ref() {
            Some(v) => v.format(settings),
            None => settings.nil_value.clone(),
        }
    }

    /// Decodes `blob` and writes it.
    pub fn from_blob(&mut self, blob: &[u8]) -> Result<(), ConversionError> {
        let value = T::decode_blob(blob)?;
        self.write(value);
        Ok(())
    }

    /// Encodes what the socket reads as.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(T::BLOB_SIZE.unwrap_or(16));
        T::encode_blob(self.get_ref(), &mut out);
        out
    }

    /// Cycle time of the last write, if any.
    pub fn modification_time(&self) -> Option<Duration> {
        self.modification_time
    }

    /// Cycle time of the last non-nil write, if any.
    pub fn valid_time(&self) -> Option<Duration> {
        self.valid_time
    }

    /// Time since the last write, as seen from `cycle`.
    pub fn modification_age(&self, cycle: &Cycle) -> Option<Duration> {
        self.modification_time
            .map(|t| cycle.update_time().saturating_sub(t))
    }

    /// Time since the last non-nil write, as seen from `cycle`.
    pub fn valid_age(&self, cycle: &Cycle) -> Option<Duration> {
        self.valid_time.map(|t| cycle.update_time().saturating_sub(t))
    }

    /// True if the socket went nil because an upstream module failed.
    pub fn nil_by_fetch_error(&self) -> bool {
        self.nil_by_fetch_error
    }

    fn write(&mut self, value: Option<T>) {
        self.value = value;
        self.serial += 1;
        self.nil_by_fetch_error = false;
    }

    /// Writes only if the stored value differs. Returns true if written.
    pub(crate) fn assign_if_changed(&mut self, value: Option<T>) -> bool {
        if self.value == value {
            return false;
        }
        self.write(value);
        true
    }
}

fn parse_optional<T: SocketValue>(
    text: &str,
    settings: &ConversionSettings,
) -> Result<Option<T>, ConversionError> {
    if settings.is_nil_text(text) {
        Ok(None)
    } else {
        T::parse(text, settings).map(Some)
    }
}

/// Type-erased view of a [`Socket<T>`].
///
/// The graph stores every socket as `Box<dyn BasicSocket>`; instruments, links
/// and tools use this trait for operations that do not need the value type.
pub trait BasicSocket: Any {
    /// Diagnostic path.
    fn path(&self) -> &str;

    /// Value type tag.
    fn kind(&self) -> ValueKind;

    /// Number of explicit writes so far.
    fn serial(&self) -> u64;

    /// True if neither a value nor a fallback is present.
    fn is_nil(&self) -> bool;

    /// True if a value (not just a fallback) is present.
    fn is_valid(&self) -> bool;

    /// Numeric view of what the socket reads as.
    fn to_f64(&self) -> Option<f64>;

    /// See [`Socket::to_string`].
    fn to_string(&self, settings: &ConversionSettings) -> String;

    /// See [`Socket::to_blob`].
    fn to_blob(&self) -> Vec<u8>;

    /// See [`Socket::from_string`].
    fn from_string(&mut self, text: &str, settings: &ConversionSettings) -> Result<(), ConversionError>;

    /// See [`Socket::from_blob`].
    fn from_blob(&mut self, blob: &[u8]) -> Result<(), ConversionError>;

    /// Parses `text` as the fallback value; the nil sentinel clears it.
    fn set_fallback_from_string(
        &mut self,
        text: &str,
        settings: &ConversionSettings,
    ) -> Result<(), ConversionError>;

    /// Writes nil.
    fn set_nil(&mut self);

    /// Cycle time of the last write.
    fn modification_time(&self) -> Option<Duration>;

    /// Cycle time of the last non-nil write.
    fn valid_time(&self) -> Option<Duration>;

    /// True if the socket went nil because an upstream module failed.
    fn nil_by_fetch_error(&self) -> bool;

    /// Creates an empty socket of the same type at `path`.
    fn blank(&self, path: &str) -> Box<dyn BasicSocket>;

    /// Upcast for downcasting to `Socket<T>`.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to `Socket<T>`.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Pulls what `source` reads as, writing only on change.
    ///
    /// Returns `Some(changed)`, or `None` if `source` holds another type.
    #[doc(hidden)]
    fn pull_from(&mut self, source: &dyn BasicSocket) -> Option<bool>;

    /// Writes nil only if not nil already. Returns true if written.
    #[doc(hidden)]
    fn clear_if_set(&mut self) -> bool;

    /// Records the time of a write made during a cycle.
    #[doc(hidden)]
    fn stamp(&mut self, time: Duration);

    #[doc(hidden)]
    fn set_nil_by_fetch_error(&mut self, flag: bool);
}

impl<T: SocketValue> BasicSocket for Socket<T> {
    fn path(&self) -> &str {
        &self.path
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn serial(&self) -> u64 {
        self.serial
    }

    fn is_nil(&self) -> bool {
        Socket::is_nil(self)
    }

    fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    fn to_f64(&self) -> Option<f64> {
        self.get_ref().and_then(T::to_f64)
    }

    fn to_string(&self, settings: &ConversionSettings) -> String {
        Socket::to_string(self, settings)
    }

    fn to_blob(&self) -> Vec<u8> {
        Socket::to_blob(self)
    }

    fn from_string(&mut self, text: &str, settings: &ConversionSettings) -> Result<(), ConversionError> {
        Socket::from_string(self, text, settings)
    }

    fn from_blob(&mut self, blob: &[u8]) -> Result<(), ConversionError> {
        Socket::from_blob(self, blob)
    }

    fn set_fallback_from_string(
        &mut self,
        text: &str,
        settings: &ConversionSettings,
    ) -> Result<(), ConversionError> {
        self.fallback = parse_optional::<T>(text, settings)?;
        Ok(())
    }

    fn set_nil(&mut self) {
        Socket::set_nil(self);
    }

    fn modification_time(&self) -> Option<Duration> {
        self.modification_time
    }

    fn valid_time(&self) -> Option<Duration> {
        self.valid_time
    }

    fn nil_by_fetch_error(&self) -> bool {
        self.nil_by_fetch_error
    }

    fn blank(&self, path: &str) -> Box<dyn BasicSocket> {
        Box::new(Socket::<T>::new(path))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pull_from(&mut self, source: &dyn BasicSocket) -> Option<bool> {
        let source = source.as_any().downcast_ref::<Socket<T>>()?;
        Some(self.assign_if_changed(source.get_optional()))
    }

    fn clear_if_set(&mut self) -> bool {
        self.assign_if_changed(None)
    }

    fn stamp(&mut self, time: Duration) {
        self.modification_time = Some(time);
        if self.value.is_some() {
            self.valid_time = Some(time);
        }
    }

    fn set_nil_by_fetch_error(&mut self, flag: bool) {
        self.nil_by_fetch_error = flag;
    }
}

impl dyn BasicSocket + '_ {
    /// Downcasts to the typed socket.
    pub fn downcast_ref<T: SocketValue>(&self) -> Option<&Socket<T>> {
        self.as_any().downcast_ref()
    }

    /// Mutably downcasts to the typed socket.
    pub fn downcast_mut<T: SocketValue>(&mut self) -> Option<&mut Socket<T>> {
        self.as_any_mut().downcast_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::si::Speed;

    #[test]
    fn test_ages_follow_stamps() {
        let mut s = Socket::<f64>::new("/test/age");
        let c1 = Cycle::new(1, Duration::from_secs(1), Duration::ZERO, Duration::ZERO);
        assert_eq!(s.modification_age(&c1), None);

        s.set(1.0);
        s.stamp(Duration::from_secs(1));
        s.set_nil();
        s.stamp(Duration::from_secs(3));

        let c2 = c1.next(Duration::from_secs(4));
        assert_eq!(s.modification_age(&c2), Some(Duration::from_secs(2)));
        assert_eq!(s.valid_age(&c2), Some(Duration::from_secs(4)));
    }

    #[test]
    fn test_nil_then_value_then_nil() {
        let mut s = Socket::<i32>::new("/test/s");
        assert_eq!(s.get_optional(), None);
        assert_eq!(s.serial(), 0);

        s.set(5);
        assert_eq!(s.get_optional(), Some(5));
        assert_eq!(s.serial(), 1);

        s.set_nil();
        assert_eq!(s.get_optional(), None);
        assert_eq!(s.serial(), 2);
    }

    #[test]
    fn test_get_nil_names_path() {
        let s = Socket::<f64>::new("/adc/ias");
        assert_eq!(
            s.get(),
            Err(SocketError::NilValue {
                path: "/adc/ias".into()
            })
        );
    }

    #[test]
    fn test_fallback_does_not_bump_serial() {
        let mut s = Socket::<f64>::new("/s");
        s.set_fallback(Some(0.5));
        assert_eq!(s.serial(), 0);
        assert_eq!(s.get(), Ok(0.5));
        assert!(!s.is_nil());
        assert!(!s.is_valid());

        s.set(1.0);
        assert_eq!(s.get(), Ok(1.0));
        s.set_nil();
        assert_eq!(s.get(), Ok(0.5));
    }

    #[test]
    fn test_equal_writes_still_bump_serial() {
        let mut s = Socket::<u8>::new("/s");
        s.set(3);
        s.set(3);
        s.set_nil();
        s.set_nil();
        assert_eq!(s.serial(), 4);
    }

    #[test]
    fn test_assign_if_changed_skips_equal_values() {
        let mut s = Socket::<u8>::new("/s");
        assert!(s.assign_if_changed(Some(3)));
        assert!(!s.assign_if_changed(Some(3)));
        assert_eq!(s.serial(), 1);
        assert!(s.clear_if_set());
        assert!(!s.clear_if_set());
        assert_eq!(s.serial(), 2);
    }

    #[test]
    fn test_copy_from_reads_fallback() {
        let src = Socket::<i64>::new("/src").with_fallback(9);
        let mut dst = Socket::<i64>::new("/dst");
        dst.copy_from(&src);
        assert_eq!(dst.get_optional(), Some(9));
        assert!(dst.is_valid());
        assert_eq!(dst.serial(), 1);
    }

    #[test]
    fn test_blob_round_trip_i32() {
        let mut s = Socket::<i32>::new("/s");
        s.set(5);
        let blob = s.to_blob();
        assert_eq!(blob.len(), 5);

        let mut t = Socket::<i32>::new("/t");
        t.from_blob(&blob).unwrap();
        assert_eq!(t.get(), Ok(5));
    }

    #[test]
    fn test_from_blob_wrong_size_keeps_state() {
        let mut s = Socket::<i32>::new("/s");
        let err = s.from_blob(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::InvalidBlobSize {
                actual: 3,
                expected: 5
            }
        ));
        assert_eq!(s.serial(), 0);
    }

    #[test]
    fn test_string_round_trip_with_nil_sentinel() {
        let settings = ConversionSettings::default().with_nil_value("---");
        let mut s = Socket::<Speed>::new("/s");
        assert_eq!(s.to_string(&settings), "---");

        s.from_string("120 kt", &settings).unwrap();
        assert!((s.get().unwrap().knots() - 120.0).abs() < 1e-9);

        s.from_string("---", &settings).unwrap();
        assert!(s.is_nil());
        assert_eq!(s.serial(), 2);
    }

    #[test]
    fn test_from_string_parse_error() {
        let mut s = Socket::<i32>::new("/s");
        assert!(s.from_string("abc", &ConversionSettings::default()).is_err());
        assert_eq!(s.serial(), 0);
    }

    #[test]
    fn test_erased_access() {
        let mut boxed: Box<dyn BasicSocket> = Box::new(Socket::<bool>::new("/flag"));
        assert_eq!(boxed.kind(), ValueKind::Bool);
        boxed
            .from_string("true", &ConversionSettings::default())
            .unwrap();
        assert_eq!(boxed.to_f64(), Some(1.0));
        assert_eq!(boxed.downcast_ref::<bool>().unwrap().get(), Ok(true));
        assert!(boxed.downcast_ref::<i32>().is_none());

        boxed
            .set_fallback_from_string("false", &ConversionSettings::default())
            .unwrap();
        boxed.set_nil();
        assert_eq!(boxed.to_string(&ConversionSettings::default()), "false");
    }

    #[test]
    fn test_pull_from_writes_only_on_change() {
        let mut src: Box<dyn BasicSocket> = Box::new(Socket::<f32>::new("/src"));
        let mut dst = Socket::<f32>::new("/dst");

        src.downcast_mut::<f32>().unwrap().set(1.5);
        assert_eq!(dst.pull_from(src.as_ref()), Some(true));
        assert_eq!(dst.pull_from(src.as_ref()), Some(false));
        assert_eq!(dst.serial(), 1);

        let other = Socket::<i32>::new("/other");
        assert_eq!(dst.pull_from(&other), None);
    }

    #[test]
    fn test_stamp_tracks_valid_time() {
        let mut s = Socket::<i32>::new("/s");
        s.set(1);
        s.stamp(Duration::from_secs(1));
        s.set_nil();
        s.stamp(Duration::from_secs(2));
        assert_eq!(s.modification_time(), Some(Duration::from_secs(2)));
        assert_eq!(s.valid_time(), Some(Duration::from_secs(1)));
    }
}
