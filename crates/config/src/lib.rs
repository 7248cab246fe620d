//! Environment driven configuration for the web starter
//!
//! This crate merges dotenv files into an explicit environment snapshot and
//! binds declared configuration shapes from it, reporting every missing or
//! malformed variable in one pass.

#[macro_use]
mod macros;

pub mod binder;
pub mod coerce;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod registry;
pub mod schema;

pub use binder::{BoundValues, ConfigBinder, EnvConfig};
pub use coerce::{split_list, Value, ValueKind, DEFAULT_LIST_DELIMITER};
pub use descriptor::{
    boolean, integer, list, string, EnvSlot, FieldDescriptor, FieldSpec, Presence, SlotInfo,
};
pub use env::{parse_env_file, EnvStore};
pub use error::{
    AggregateError, BindingError, BindingErrorKind, ConfigError, EnvFileError, RegistryError,
};
pub use registry::{descriptors, is_registered, render_example};
pub use schema::{AppEnvConfig, LoggingConfig};
