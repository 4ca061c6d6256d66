//! Text-valued module settings.
//!
//! Machine files give every setting as text (`period = "20 s"`). Modules parse
//! what they need with the same conversion rules sockets use, so units and the
//! nil sentinel work identically in both places.

use std::collections::BTreeMap;

use vario_core::{ConversionSettings, ModuleError, SocketValue};

/// Named setting values of one module instance.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
    conversion: ConversionSettings,
}

impl Settings {
    /// Creates an empty set using default conversion rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the conversion rules used for parsing.
    pub fn with_conversion(mut self, conversion: ConversionSettings) -> Self {
        self.conversion = conversion;
        self
    }

    /// Builder method to add a setting.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Adds or replaces a setting.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Setting names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Unparsed text of a setting.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no setting is given.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses a setting. Absent settings and the nil sentinel yield `None`.
    pub fn get<T: SocketValue>(&self, name: &str) -> Result<Option<T>, ModuleError> {
        let Some(text) = self.raw(name) else {
            return Ok(None);
        };
        if self.conversion.is_nil_text(text) {
            return Ok(None);
        }
        T::parse(text, &self.conversion)
            .map(Some)
            .map_err(|e| ModuleError::InvalidSetting {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses a setting, falling back to `default` when absent.
    pub fn get_or<T: SocketValue>(&self, name: &str, default: T) -> Result<T, ModuleError> {
        Ok(self.get(name)?.unwrap_or(default))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (k, v) in iter {
            settings.set(k, v);
        }
        settings
    }
}

/// Fails with [`ModuleError::UninitializedSettings`] naming every required
/// setting that has no value. Pairs are `(name, has_value)`.
pub fn check_required(settings: &[(&str, bool)]) -> Result<(), ModuleError> {
    let missing: Vec<String> = settings
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| (*name).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ModuleError::UninitializedSettings(missing))
    }
}
