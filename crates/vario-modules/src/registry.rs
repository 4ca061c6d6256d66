//! Module registry and factory.
//!
//! The registry maps module type ids (`"adc"`, `"sine"`, ...) to a descriptor
//! and a factory that adds a configured instance to a [`ModuleGraph`]. All
//! built-in modules are registered by [`ModuleRegistry::new`]; applications can
//! register their own with [`ModuleRegistry::register`].

use thiserror::Error;
use vario_core::graph::{ModuleGraph, ModuleId};
use vario_core::{Dimension, GraphError, ModuleError, ValueKind};

use crate::settings::Settings;
use crate::{adc, air_sim, altitude_alert, lowpass, sine};

/// Category of module for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Simulated sensors and signal generators.
    Source,
    /// Computers deriving flight data from raw inputs.
    Computer,
    /// Signal conditioning.
    Filter,
    /// Crew alerting.
    Warning,
}

impl ModuleCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            ModuleCategory::Source => "Source",
            ModuleCategory::Computer => "Computer",
            ModuleCategory::Filter => "Filter",
            ModuleCategory::Warning => "Warning",
        }
    }
}

/// Describes one socket of a module type.
#[derive(Debug, Clone, Copy)]
pub struct SocketDescriptor {
    /// Socket name, relative to the instance (`/<instance>/<name>`).
    pub name: &'static str,
    /// Value type. Generic modules list their default type.
    pub kind: ValueKind,
}

/// Describes one setting of a module type.
#[derive(Debug, Clone, Copy)]
pub struct SettingDescriptor {
    /// Setting name.
    pub name: &'static str,
    /// What the setting controls.
    pub description: &'static str,
    /// True if the module cannot initialize without it.
    pub required: bool,
    /// Value used when the setting is absent.
    pub default: Option<&'static str>,
}

/// Describes a module type in the registry.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Unique type id (lowercase, dash-separated).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the module.
    pub description: &'static str,
    /// Category for organization.
    pub category: ModuleCategory,
    /// Input sockets.
    pub inputs: &'static [SocketDescriptor],
    /// Output sockets.
    pub outputs: &'static [SocketDescriptor],
    /// Accepted settings.
    pub settings: &'static [SettingDescriptor],
}

impl ModuleDescriptor {
    /// Looks up a setting descriptor by name.
    pub fn setting(&self, name: &str) -> Option<&SettingDescriptor> {
        self.settings.iter().find(|s| s.name == name)
    }
}

/// Errors raised while creating modules from the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No module type with this id is registered.
    #[error("unknown module type '{0}'")]
    UnknownType(String),

    /// A setting was given that the module type does not accept.
    #[error("module type '{module_type}' has no setting '{setting}'")]
    UnknownSetting {
        /// Module type id.
        module_type: String,
        /// Offending setting name.
        setting: String,
    },

    /// A setting value could not be used.
    #[error(transparent)]
    Setting(#[from] ModuleError),

    /// The module could not be added to the graph.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Factory function type for adding a module instance to a graph.
pub type ModuleFactory =
    fn(&mut ModuleGraph, &str, &Settings) -> Result<ModuleId, RegistryError>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: ModuleDescriptor,
    factory: ModuleFactory,
}

/// Registry of available module types.
pub struct ModuleRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Create a registry with all built-in modules registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(sine::DESCRIPTOR, sine::Sine::create);
        registry.register(air_sim::DESCRIPTOR, air_sim::AirSimulator::create);
        registry.register(adc::DESCRIPTOR, adc::AirDataComputer::create);
        registry.register(lowpass::DESCRIPTOR, lowpass::create);
        registry.register(altitude_alert::DESCRIPTOR, altitude_alert::AltitudeAlert::create);
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a module type, replacing any previous type with the same id.
    pub fn register(&mut self, descriptor: ModuleDescriptor, factory: ModuleFactory) {
        self.entries.retain(|e| e.descriptor.id != descriptor.id);
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Get all registered module descriptors.
    pub fn all_modules(&self) -> Vec<&ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Get module descriptors in a specific category.
    pub fn modules_in_category(&self, category: ModuleCategory) -> Vec<&ModuleDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a module descriptor by type id.
    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Adds an instance of module type `id` to `graph`.
    ///
    /// Settings are checked against the type's descriptor before the factory
    /// runs. Missing required settings are reported later, when the module is
    /// initialized.
    pub fn create(
        &self,
        id: &str,
        graph: &mut ModuleGraph,
        instance: &str,
        settings: &Settings,
    ) -> Result<ModuleId, RegistryError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .ok_or_else(|| RegistryError::UnknownType(id.to_string()))?;

        if let Some(unknown) = settings
            .names()
            .find(|name| entry.descriptor.setting(name).is_none())
        {
            return Err(RegistryError::UnknownSetting {
                module_type: id.to_string(),
                setting: unknown.to_string(),
            });
        }

        let module = (entry.factory)(graph, instance, settings)?;
        tracing::debug!("registry_create: '{instance}' as {id}");
        Ok(module)
    }

    /// Number of registered module types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shorthand for quantity socket kinds in descriptors.
pub(crate) const fn quantity(dimension: Dimension) -> ValueKind {
    ValueKind::Quantity(dimension)
}
