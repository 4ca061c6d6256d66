//! Error types for socket access, value conversion, graph assembly and module
//! processing.

use thiserror::Error;

use crate::graph::{ModuleId, SocketId};
use crate::si::Dimension;
use crate::value::ValueKind;

/// Errors raised when reading a socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The socket has neither a value nor a fallback.
    #[error("socket '{path}' is nil")]
    NilValue {
        /// Path of the socket that was read.
        path: String,
    },
}

/// Errors raised while converting socket values to or from text and blobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// A binary blob does not have the size required by the value type.
    #[error("invalid blob size: got {actual} bytes, expected {expected}")]
    InvalidBlobSize {
        /// Size of the rejected blob.
        actual: usize,
        /// Size the value type requires (the minimum for variable-size types).
        expected: usize,
    },

    /// Text or blob contents could not be parsed.
    #[error("cannot parse '{input}': {reason}")]
    Parse {
        /// The rejected input, rendered as text.
        input: String,
        /// What went wrong.
        reason: String,
    },

    /// A unit symbol was given that is not known at all.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// A known unit was given for a quantity of another dimension.
    #[error("unit '{unit}' is not a unit of {expected}")]
    IncompatibleUnit {
        /// The unit symbol found in the input.
        unit: String,
        /// The dimension the socket holds.
        expected: Dimension,
    },
}

impl ConversionError {
    /// Create a parse error.
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ConversionError::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while assembling or validating a module graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The module does not exist (never did, or was removed).
    #[error("module {0} not found")]
    ModuleNotFound(ModuleId),

    /// The socket does not exist (never did, or was removed).
    #[error("socket {0} not found")]
    SocketNotFound(SocketId),

    /// No registered socket has this path.
    #[error("no socket at path '{0}'")]
    PathNotFound(String),

    /// A socket with this path is already registered.
    #[error("socket path '{0}' is already registered")]
    DuplicatePath(String),

    /// Instance names must be non-empty and free of `/`.
    #[error("invalid module instance name '{0}'")]
    InvalidInstance(String),

    /// Two module instances share a name.
    #[error("module instance '{0}' already exists")]
    DuplicateInstance(String),

    /// Connecting two sockets of different value types.
    #[error("type mismatch on '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Path of the socket whose type was checked.
        path: String,
        /// Value kind the socket requires.
        expected: ValueKind,
        /// Value kind that was offered.
        found: ValueKind,
    },

    /// The connection would make a module depend on itself.
    #[error("connection would create a dependency cycle: {0}")]
    CycleDetected(String),

    /// The connection is structurally invalid.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// A value given as text could not be converted for a socket.
    #[error("cannot convert value for '{path}': {source}")]
    Conversion {
        /// Path of the target socket.
        path: String,
        /// Underlying conversion error.
        #[source]
        source: ConversionError,
    },

    /// A module failed to initialize.
    #[error("module '{instance}' failed to initialize: {source}")]
    Initialization {
        /// Instance name of the failing module.
        instance: String,
        /// Error returned by the module.
        #[source]
        source: ModuleError,
    },
}

/// Errors returned by module code.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A required input was nil.
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// A value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Required settings were never given a value.
    #[error("uninitialized settings: {}", .0.join(", "))]
    UninitializedSettings(Vec<String>),

    /// A setting was given a value the module cannot use.
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// Name of the setting.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Any other failure reported by module code.
    #[error("{0}")]
    Failed(String),
}

impl ModuleError {
    /// Create a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        ModuleError::Failed(message.into())
    }
}
