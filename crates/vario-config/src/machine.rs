//! Machine file format and operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use vario_core::ConversionSettings;

use crate::error::ConfigError;

/// A complete machine: loop settings, module instances and their wiring.
///
/// # TOML Format
///
/// ```toml
/// name = "sim-1"
/// frequency_hz = 50.0
///
/// [conversion]
/// nil = "---"
/// preferred_units = ["ft", "kt", "hPa"]
///
/// [[modules]]
/// type = "air-sim"
/// instance = "sim"
/// [modules.settings]
/// altitude = "3000 ft"
///
/// [[modules]]
/// type = "adc"
/// instance = "adc"
///
/// [[connections]]
/// input = "/adc/static-pressure"
/// output = "/sim/static-pressure"
///
/// [[constants]]
/// input = "/adc/qnh"
/// value = "1013.25 hPa"
///
/// [[fallbacks]]
/// socket = "/adc/temperature"
/// value = "15 °C"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Machine {
    /// Name of the machine.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Processing loop frequency (defaults to 50 Hz).
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,

    /// Socket paths that drive the loop. Empty means every module runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<String>,

    /// Text conversion rules for constants, fallbacks, settings and output.
    #[serde(default)]
    pub conversion: ConversionSection,

    /// Module instances, created in order.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,

    /// Socket-to-socket connections.
    #[serde(default)]
    pub connections: Vec<Connection>,

    /// Inputs bound to constant values.
    #[serde(default)]
    pub constants: Vec<Constant>,

    /// Socket fallback values.
    #[serde(default)]
    pub fallbacks: Vec<Fallback>,
}

fn default_frequency() -> f64 {
    50.0
}

/// The `[conversion]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversionSection {
    /// Nil sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nil: Option<String>,
    /// Text for boolean `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_value: Option<String>,
    /// Text for boolean `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_value: Option<String>,
    /// Digits after the decimal point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<usize>,
    /// Unit symbols to print quantities in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_units: Vec<String>,
}

impl ConversionSection {
    /// Conversion settings with unset fields left at their defaults.
    pub fn to_settings(&self) -> ConversionSettings {
        let mut settings = ConversionSettings::default()
            .with_preferred_units(self.preferred_units.iter().cloned());
        if let Some(nil) = &self.nil {
            settings = settings.with_nil_value(nil.clone());
        }
        if let Some(t) = &self.true_value {
            settings.true_value.clone_from(t);
        }
        if let Some(f) = &self.false_value {
            settings.false_value.clone_from(f);
        }
        settings.precision = self.precision;
        settings
    }
}

/// One `[[modules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleEntry {
    /// Registry type id.
    #[serde(rename = "type")]
    pub module_type: String,
    /// Instance name, the first segment of the module's socket paths.
    pub instance: String,
    /// Setting values as text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

impl ModuleEntry {
    /// Create an entry with no settings.
    pub fn new(module_type: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            module_type: module_type.into(),
            instance: instance.into(),
            settings: BTreeMap::new(),
        }
    }

    /// Builder method to add a setting.
    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }
}

/// One `[[connections]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    /// Path of the input being connected.
    pub input: String,
    /// Path of the socket it reads from.
    pub output: String,
}

/// One `[[constants]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constant {
    /// Path of the input.
    pub input: String,
    /// Value as text.
    pub value: String,
}

/// One `[[fallbacks]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fallback {
    /// Path of the socket.
    pub socket: String,
    /// Value as text; the nil sentinel clears the fallback.
    pub value: String,
}

impl Machine {
    /// Create an empty machine running at 50 Hz.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            frequency_hz: default_frequency(),
            roots: Vec::new(),
            conversion: ConversionSection::default(),
            modules: Vec::new(),
            connections: Vec::new(),
            constants: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Builder method to set the loop frequency.
    pub fn with_frequency(mut self, hz: f64) -> Self {
        self.frequency_hz = hz;
        self
    }

    /// Builder method to add a module instance.
    pub fn with_module(mut self, module: ModuleEntry) -> Self {
        self.modules.push(module);
        self
    }

    /// Builder method to connect `input` to `output`.
    pub fn with_connection(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.connections.push(Connection {
            input: input.into(),
            output: output.into(),
        });
        self
    }

    /// Builder method to bind `input` to a constant.
    pub fn with_constant(mut self, input: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.push(Constant {
            input: input.into(),
            value: value.into(),
        });
        self
    }

    /// Builder method to set a fallback.
    pub fn with_fallback(mut self, socket: impl Into<String>, value: impl Into<String>) -> Self {
        self.fallbacks.push(Fallback {
            socket: socket.into(),
            value: value.into(),
        });
        self
    }

    /// Builder method to add a root socket.
    pub fn with_root(mut self, path: impl Into<String>) -> Self {
        self.roots.push(path.into());
        self
    }

    /// Loop period derived from the frequency, or `None` if the frequency
    /// does not give a non-zero period that fits a [`Duration`].
    pub fn period(&self) -> Option<Duration> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.frequency_hz)
            .ok()
            .filter(|period| !period.is_zero())
    }

    /// Load a machine from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let machine: Machine = toml::from_str(&content)?;
        tracing::debug!("machine_load: '{}' from {}", machine.name, path.display());
        Ok(machine)
    }

    /// Load a machine from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the machine to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the machine to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Looks up a module entry by instance name.
    pub fn module(&self, instance: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| m.instance == instance)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
