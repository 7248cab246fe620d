//! Error types for environment loading and configuration binding

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while merging a dotenv file into an [`EnvStore`](crate::EnvStore).
///
/// Both variants are fatal to startup: the caller must not go on to bind
/// against a partially merged store.
#[derive(Error, Debug)]
pub enum EnvFileError {
    /// The file could not be opened or read
    #[error("Failed to read env file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A line could not be parsed as `KEY=VALUE`.
    ///
    /// Only the line number is kept so secrets never end up in logs.
    #[error("Failed to parse env file {path}: malformed entry on line {line}")]
    Parse { path: PathBuf, line: usize },
}

/// Why a single field failed to bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// Required variable is absent or binds to nothing
    Missing,
    /// Value is present but cannot be coerced to the declared kind
    InvalidFormat {
        expected: &'static str,
        value: String,
    },
}

/// One failing field, identified by its environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingError {
    pub key: String,
    pub kind: BindingErrorKind,
}

impl BindingError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: BindingErrorKind::Missing,
        }
    }

    pub fn invalid_format(
        key: impl Into<String>,
        expected: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            kind: BindingErrorKind::InvalidFormat {
                expected,
                value: value.into(),
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.kind, BindingErrorKind::Missing)
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BindingErrorKind::Missing => {
                write!(f, "Missing required environment variable {}", self.key)
            }
            BindingErrorKind::InvalidFormat { expected, value } => write!(
                f,
                "Invalid value for {}: expected {}, got {:?}",
                self.key, expected, value
            ),
        }
    }
}

/// Every binding failure found in one pass over a configuration type.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    type_name: &'static str,
    errors: Vec<BindingError>,
}

impl AggregateError {
    /// Returns `None` when `errors` is empty
    pub fn new(type_name: &'static str, errors: Vec<BindingError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { type_name, errors })
        }
    }

    pub fn errors(&self) -> &[BindingError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Environment variable keys in the order they failed
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.key.as_str())
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to bind {}: {} configuration error(s)",
            self.type_name,
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BindingError {}

impl std::error::Error for AggregateError {}

impl IntoIterator for AggregateError {
    type Item = BindingError;
    type IntoIter = std::vec::IntoIter<BindingError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Contract violations by the author of a configuration type.
///
/// These are detected when descriptors are first derived and are never
/// caused by the environment itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{type_name}.{field}: {kind} binding for {key} cannot be stored in {slot}")]
    KindMismatch {
        type_name: &'static str,
        field: &'static str,
        key: String,
        kind: &'static str,
        slot: &'static str,
    },

    #[error("{type_name}.{field}: optional binding for {key} needs an Option slot, found {slot}")]
    OptionalWithoutOption {
        type_name: &'static str,
        field: &'static str,
        key: String,
        slot: &'static str,
    },

    #[error("{type_name}: environment variable {key} is bound by both {first} and {second}")]
    DuplicateKey {
        type_name: &'static str,
        key: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("{type_name}.{field}: bound value was not produced for this field")]
    Unassembled {
        type_name: &'static str,
        field: &'static str,
    },
}

/// Result of binding a configuration type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Programming error in the configuration type declaration
    #[error("Invalid configuration declaration: {0}")]
    Registry(#[from] RegistryError),

    /// One or more environment variables are missing or malformed
    #[error(transparent)]
    Binding(#[from] AggregateError),
}
