//! Machine validation.
//!
//! Checks what can be checked without building the graph: loop frequency,
//! instance names, module types and setting names. Socket paths and value
//! types are checked when the machine is built.

use std::collections::HashSet;

use thiserror::Error;
use vario_modules::ModuleRegistry;

use crate::machine::Machine;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Loop frequency does not give a usable period.
    #[error("invalid loop frequency {0} Hz")]
    InvalidFrequency(f64),

    /// Two modules share an instance name.
    #[error("duplicate module instance '{0}'")]
    DuplicateInstance(String),

    /// Unknown module type.
    #[error("unknown module type '{module_type}' for instance '{instance}'")]
    UnknownModuleType {
        /// Instance name.
        instance: String,
        /// Type id that is not registered.
        module_type: String,
    },

    /// A setting the module type does not accept.
    #[error("unknown setting '{setting}' for module '{instance}'")]
    UnknownSetting {
        /// Instance name.
        instance: String,
        /// Unrecognized setting name.
        setting: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates `machine` against `registry`, collecting every problem found.
pub fn validate_machine(machine: &Machine, registry: &ModuleRegistry) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if machine.period().is_none() {
        errors.push(ValidationError::InvalidFrequency(machine.frequency_hz));
    }

    let mut seen = HashSet::new();
    for entry in &machine.modules {
        if !seen.insert(entry.instance.as_str()) {
            errors.push(ValidationError::DuplicateInstance(entry.instance.clone()));
        }
        let Some(descriptor) = registry.get(&entry.module_type) else {
            errors.push(ValidationError::UnknownModuleType {
                instance: entry.instance.clone(),
                module_type: entry.module_type.clone(),
            });
            continue;
        };
        for name in entry.settings.keys() {
            if descriptor.setting(name).is_none() {
                errors.push(ValidationError::UnknownSetting {
                    instance: entry.instance.clone(),
                    setting: name.clone(),
                });
            }
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ModuleEntry;

    #[test]
    fn test_valid_machine() {
        let machine = Machine::new("ok")
            .with_module(ModuleEntry::new("sine", "a").with_setting("period", "1 s"))
            .with_module(ModuleEntry::new("adc", "b"));
        assert_eq!(validate_machine(&machine, &ModuleRegistry::new()), Ok(()));
    }

    #[test]
    fn test_bad_frequency() {
        let registry = ModuleRegistry::new();
        for hz in [0.0, -5.0, f64::INFINITY, f64::NAN, 1e-30, 1e300] {
            let machine = Machine::new("m").with_frequency(hz);
            assert!(matches!(
                validate_machine(&machine, &registry),
                Err(ValidationError::InvalidFrequency(_))
            ));
        }
    }

    #[test]
    fn test_single_error_is_not_wrapped() {
        let machine = Machine::new("m")
            .with_module(ModuleEntry::new("sine", "a"))
            .with_module(ModuleEntry::new("adc", "a"));
        assert_eq!(
            validate_machine(&machine, &ModuleRegistry::new()),
            Err(ValidationError::DuplicateInstance("a".to_string()))
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let machine = Machine::new("m")
            .with_frequency(0.0)
            .with_module(ModuleEntry::new("warp-drive", "w"))
            .with_module(ModuleEntry::new("sine", "s").with_setting("colour", "red"));
        let Err(ValidationError::Multiple(errors)) =
            validate_machine(&machine, &ModuleRegistry::new())
        else {
            panic!("expected multiple errors");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::UnknownSetting {
            instance: "s".to_string(),
            setting: "colour".to_string(),
        }));
    }
}
