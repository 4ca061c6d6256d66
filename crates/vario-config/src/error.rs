//! Error types for machine file operations.

use std::path::PathBuf;
use thiserror::Error;
use vario_core::GraphError;
use vario_modules::RegistryError;

/// Errors that can occur while loading, saving or building a machine.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Machine file unreadable.
    #[error("cannot read machine file '{path}': {source}")]
    ReadFile {
        /// Machine file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Machine file unwritable.
    #[error("cannot write machine file '{path}': {source}")]
    WriteFile {
        /// Machine file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Parent directory of a machine file could not be made.
    #[error("cannot create directory '{path}' for machine file: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Machine file is not valid TOML or misses required keys.
    #[error("invalid machine TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Machine could not be written as TOML.
    #[error("cannot encode machine as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The machine description is inconsistent.
    #[error("invalid machine: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    /// A module instance could not be created.
    #[error("module '{instance}': {source}")]
    Module {
        /// Instance name from the machine file.
        instance: String,
        /// Registry failure.
        #[source]
        source: RegistryError,
    },

    /// Wiring, constants, fallbacks or graph validation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ConfigError {
    /// [`ConfigError::ReadFile`] for `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::WriteFile`] for `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::CreateDir`] for `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn not_found() -> std::io::Error {
        std::io::ErrorKind::NotFound.into()
    }

    #[test]
    fn test_read_file_names_path_and_keeps_source() {
        let err = ConfigError::read_file("/m/sim.toml", not_found());
        let msg = err.to_string();
        assert!(msg.contains("cannot read machine file"), "got: {msg}");
        assert!(msg.contains("/m/sim.toml"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_write_and_create_dir_variants() {
        assert!(matches!(
            ConfigError::write_file("/out", not_found()),
            ConfigError::WriteFile { ref path, .. } if path == std::path::Path::new("/out")
        ));
        assert!(
            ConfigError::create_dir("/dir", not_found())
                .to_string()
                .contains("cannot create directory '/dir'")
        );
    }

    #[test]
    fn test_module_error_names_instance() {
        let err = ConfigError::Module {
            instance: "adc".to_string(),
            source: RegistryError::UnknownType("warp".to_string()),
        };
        assert_eq!(err.to_string(), "module 'adc': unknown module type 'warp'");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_graph_error_is_transparent() {
        let err = ConfigError::from(GraphError::PathNotFound("/x/y".to_string()));
        assert_eq!(err.to_string(), "no socket at path '/x/y'");
    }
}
