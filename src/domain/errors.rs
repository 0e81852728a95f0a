// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration crate.
//!
//! [`ConfigError`] covers everything the aggregator can report. Binding and
//! unbinding have their own [`BindError`] so the serde plumbing can carry field
//! paths without knowing about providers or extensions.

use std::fmt;
use thiserror::Error;

/// The main error type for configuration operations.
///
/// This enum is marked as `#[non_exhaustive]` to allow for future additions
/// without breaking backwards compatibility.
///
/// # Examples
///
/// ```
/// use mergecfg::domain::errors::ConfigError;
///
/// fn get_config_value() -> Result<String, ConfigError> {
///     Err(ConfigError::ConfigKeyNotFound {
///         key: "database.host".to_string(),
///     })
/// }
///
/// assert!(get_config_value().is_err());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The requested configuration key was not present.
    #[error("Configuration key not found: {key}")]
    ConfigKeyNotFound {
        /// The key that was not found
        key: String,
    },

    /// Failed to convert a configuration value to the requested type.
    #[error(
        "Failed to convert configuration value for key '{key}' to type {target_type}: {source}"
    )]
    TypeConversionError {
        /// The key being converted
        key: String,
        /// The target type name
        target_type: String,
        /// The underlying conversion error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error occurred inside a configuration source.
    #[error("Configuration source '{source_name}' error: {message}")]
    SourceError {
        /// The name of the source that encountered the error
        source_name: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to parse a configuration document.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// The error message
        message: String,
        /// The underlying parsing error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider failed while loading; the whole load was aborted.
    #[error("failed to load from provider {provider}: {source}")]
    ProviderLoadFailed {
        /// Display name of the failing provider
        provider: String,
        /// What the provider reported
        #[source]
        source: Box<ConfigError>,
    },

    /// An extension hook failed; the whole load was aborted.
    #[error("failed to execute extension {phase} hook {extension}: {source}")]
    ExtensionHookFailed {
        /// Display name of the failing extension
        extension: String,
        /// Which hook failed
        phase: HookPhase,
        /// What the hook reported
        #[source]
        source: Box<ConfigError>,
    },

    /// Default values were absent (`None` or unit).
    #[error("values cannot be nil")]
    NilValues,

    /// Default values were neither a mapping nor a record.
    #[error("defaults must be a mapping or a record, found {found}")]
    InvalidDefaults {
        /// Kind of the value that was supplied
        found: &'static str,
    },

    /// Binding the configuration onto a typed record failed.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The bound record rejected its own contents.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An I/O error occurred while reading configuration.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a `SourceError` attributed to `source_name`.
    pub fn source_error(
        source_name: impl Into<String>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ConfigError::SourceError {
            source_name: source_name.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a `ParseError` from any parser error.
    pub fn parse_error<E>(message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::ParseError {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }
}

/// The two extension hook points around the provider merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Runs before any provider is loaded.
    PreLoad,
    /// Runs after every provider has been merged.
    PostLoad,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::PreLoad => f.write_str("pre-load"),
            HookPhase::PostLoad => f.write_str("post-load"),
        }
    }
}

/// Errors raised while projecting a mapping onto a typed record or back.
///
/// Nested failures are wrapped in [`BindError::Field`], [`BindError::Element`]
/// or [`BindError::MapKey`] as they bubble up, so the rendered message reads
/// like a path: `field database: field port: integer overflows i8: 99999`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    /// The destination is not a record or map.
    #[error("bind target must be a struct or map, found {found}")]
    InvalidTarget {
        /// What serde asked for instead
        found: &'static str,
    },

    /// A field of a record failed to bind.
    #[error("field {field}: {source}")]
    Field {
        /// The declared field name
        field: String,
        /// The failure inside the field
        #[source]
        source: Box<BindError>,
    },

    /// An element of a sequence failed to bind.
    #[error("index {index}: {source}")]
    Element {
        /// Position in the sequence
        index: usize,
        /// The failure inside the element
        #[source]
        source: Box<BindError>,
    },

    /// A map entry failed to bind.
    #[error("map value for key {key}: {source}")]
    MapKey {
        /// The entry's key
        key: String,
        /// The failure inside the entry
        #[source]
        source: Box<BindError>,
    },

    /// A number does not fit the destination width.
    #[error("integer overflows {kind}: {value}")]
    IntegerOverflow {
        /// Destination type, e.g. `i8`
        kind: &'static str,
        /// The offending value as text
        value: String,
    },

    /// A negative number was bound into an unsigned destination.
    #[error("negative {source_kind} cannot convert to {kind}: {value}")]
    NegativeUnsigned {
        /// Kind of the source value, e.g. `int`, `float` or `string`
        source_kind: &'static str,
        /// Destination type, e.g. `u16`
        kind: &'static str,
        /// The offending value as text
        value: String,
    },

    /// The source value kind cannot become the destination kind.
    #[error("cannot convert {found} to {expected}")]
    InvalidType {
        /// What the destination wanted
        expected: &'static str,
        /// Kind of the source value
        found: &'static str,
    },

    /// A string could not be parsed into the destination kind.
    #[error("cannot parse {value:?} as {expected}: {message}")]
    Parse {
        /// What the destination wanted
        expected: &'static str,
        /// The offending text
        value: String,
        /// Parser diagnostic
        message: String,
    },

    /// A fixed-length destination received a sequence of another length.
    #[error("array length mismatch: dest {expected} src {actual}")]
    LengthMismatch {
        /// Length required by the destination
        expected: usize,
        /// Length of the source sequence
        actual: usize,
    },

    /// No enum variant matched the source value.
    #[error("unknown variant {variant:?}, expected one of {expected:?}")]
    UnknownVariant {
        /// The name that was supplied
        variant: String,
        /// Declared variant names
        expected: &'static [&'static str],
    },

    /// A map key could not be rendered as text during unbinding.
    #[error("unsupported map key type {0}")]
    UnsupportedKey(&'static str),

    /// A message produced by serde or a user `Deserialize` impl.
    #[error("{0}")]
    Message(String),
}

impl BindError {
    pub(crate) fn in_field(self, field: impl Into<String>) -> Self {
        BindError::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        BindError::Element {
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_key(self, key: impl Into<String>) -> Self {
        BindError::MapKey {
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping the field/element/key wrappers.
    pub fn root_cause(&self) -> &BindError {
        match self {
            BindError::Field { source, .. }
            | BindError::Element { source, .. }
            | BindError::MapKey { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl serde::de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError::Message(msg.to_string())
    }

    fn unknown_variant(variant: &str, expected: &'static [&'static str]) -> Self {
        BindError::UnknownVariant {
            variant: variant.to_string(),
            expected,
        }
    }
}

impl serde::ser::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError::Message(msg.to_string())
    }
}

/// A record rejected the values it was bound with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for field '{field}': {message}")]
pub struct ValidationError {
    /// The field that failed
    pub field: String,
    /// Why it failed
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
