//! Configuration binding
//!
//! [`ConfigBinder`] resolves every descriptor of a configuration type against
//! an [`EnvStore`] in a single pass. Per-field problems are collected rather
//! than returned early, so one failed bind reports every misconfigured
//! variable.

use crate::coerce::Value;
use crate::descriptor::{EnvSlot, FieldDescriptor, Presence};
use crate::env::EnvStore;
use crate::error::{AggregateError, BindingError, ConfigError, RegistryError};
use crate::registry::{self, short_type_name};
use std::collections::HashMap;
use tracing::debug;

/// A configuration shape that can be bound from the environment.
///
/// Usually implemented through [`env_config!`](crate::env_config).
pub trait EnvConfig: Sized + 'static {
    /// Binding metadata, one entry per bound field, in declaration order
    fn fields() -> Vec<FieldDescriptor>;

    /// Build the instance from successfully bound values
    fn assemble(values: &mut BoundValues) -> Result<Self, RegistryError>;

    /// Bind `Self` from `env`
    fn bind(env: &EnvStore) -> Result<Self, ConfigError> {
        ConfigBinder::new(env).bind()
    }
}

/// Coerced values keyed by field name, consumed by [`EnvConfig::assemble`]
#[derive(Debug, Default)]
pub struct BoundValues {
    type_name: &'static str,
    values: HashMap<&'static str, Option<Value>>,
}

impl BoundValues {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            values: HashMap::new(),
        }
    }

    /// Move the value bound for `field` into its storage slot
    pub fn take<T: EnvSlot>(&mut self, field: &'static str) -> Result<T, RegistryError> {
        let type_name = self.type_name;
        let unassembled = || RegistryError::Unassembled { type_name, field };

        let value = self.values.remove(field).ok_or_else(unassembled)?;
        T::from_value(value).ok_or_else(unassembled)
    }
}

/// Binds configuration types against one environment snapshot.
///
/// Holds no state between calls apart from the shared descriptor cache.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBinder<'a> {
    env: &'a EnvStore,
}

impl<'a> ConfigBinder<'a> {
    pub fn new(env: &'a EnvStore) -> Self {
        Self { env }
    }

    /// Bind `T`, or fail with every missing or malformed variable at once
    pub fn bind<T: EnvConfig>(&self) -> Result<T, ConfigError> {
        let type_name = short_type_name::<T>();
        let descriptors = registry::descriptors::<T>()?;

        let mut values = BoundValues::new(type_name);
        let mut errors = Vec::new();

        for descriptor in descriptors.iter() {
            match self.resolve(descriptor) {
                Ok(value) => {
                    values.values.insert(descriptor.field, value);
                }
                Err(error) => errors.push(error),
            }
        }

        if let Some(aggregate) = AggregateError::new(type_name, errors) {
            debug!(
                config = type_name,
                failed = aggregate.len(),
                "Configuration binding failed"
            );
            return Err(aggregate.into());
        }

        let instance = T::assemble(&mut values)?;
        debug!(
            config = type_name,
            fields = descriptors.len(),
            "Configuration bound"
        );
        Ok(instance)
    }

    /// Resolve one field. `Ok(None)` leaves an optional field unset.
    fn resolve(&self, descriptor: &FieldDescriptor) -> Result<Option<Value>, BindingError> {
        let raw = match (self.env.get(&descriptor.key), &descriptor.presence) {
            (Some(raw), _) => raw,
            (None, Presence::Default(raw)) => raw.as_str(),
            (None, Presence::Optional) => return Ok(None),
            (None, Presence::Required) => return Err(BindingError::missing(&descriptor.key)),
        };

        let value = descriptor.kind.coerce(raw).map_err(|error| {
            BindingError::invalid_format(&descriptor.key, error.expected, raw)
        })?;

        if descriptor.is_required() && value.is_empty() {
            return Err(BindingError::missing(&descriptor.key));
        }

        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{boolean, integer, list, string};
    use crate::error::BindingErrorKind;

    #[derive(Debug)]
    struct Listener {
        addresses: Vec<String>,
        hostname: Option<String>,
        port: i64,
        secure: bool,
        owner: String,
    }

    impl EnvConfig for Listener {
        fn fields() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::for_slot::<Vec<String>>(
                    "addresses",
                    list("LISTEN_ADDRESSES").with_default("0.0.0.0"),
                ),
                FieldDescriptor::for_slot::<Option<String>>(
                    "hostname",
                    string("LISTEN_HOSTNAME").optional(),
                ),
                FieldDescriptor::for_slot::<i64>("port", integer("LISTEN_PORT").with_default("80")),
                FieldDescriptor::for_slot::<bool>(
                    "secure",
                    boolean("LISTEN_SECURE").with_default("false"),
                ),
                FieldDescriptor::for_slot::<String>("owner", string("LISTEN_OWNER")),
            ]
        }

        fn assemble(values: &mut BoundValues) -> Result<Self, RegistryError> {
            Ok(Self {
                addresses: values.take("addresses")?,
                hostname: values.take("hostname")?,
                port: values.take("port")?,
                secure: values.take("secure")?,
                owner: values.take("owner")?,
            })
        }
    }

    #[derive(Debug)]
    struct RequiredList {
        peers: Vec<String>,
    }

    impl EnvConfig for RequiredList {
        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::for_slot::<Vec<String>>(
                "peers",
                list("REQUIRED_PEERS").delimiter(';'),
            )]
        }

        fn assemble(values: &mut BoundValues) -> Result<Self, RegistryError> {
            Ok(Self {
                peers: values.take("peers")?,
            })
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvStore {
        pairs.iter().copied().collect()
    }

    fn binding_errors<T: EnvConfig + std::fmt::Debug>(env: &EnvStore) -> Vec<BindingError> {
        match ConfigBinder::new(env).bind::<T>() {
            Err(ConfigError::Binding(aggregate)) => aggregate.into_iter().collect(),
            other => panic!("expected binding failure, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_and_optional_fields() {
        let listener = Listener::bind(&env(&[("LISTEN_OWNER", "ops")])).unwrap();

        assert_eq!(listener.addresses, vec!["0.0.0.0".to_string()]);
        assert_eq!(listener.hostname, None);
        assert_eq!(listener.port, 80);
        assert!(!listener.secure);
        assert_eq!(listener.owner, "ops");
    }

    #[test]
    fn test_present_values_override_defaults() {
        let listener = Listener::bind(&env(&[
            ("LISTEN_ADDRESSES", "127.0.0.1, ::1"),
            ("LISTEN_HOSTNAME", "example.org"),
            ("LISTEN_PORT", "8080"),
            ("LISTEN_SECURE", "yes"),
            ("LISTEN_OWNER", "ops"),
        ]))
        .unwrap();

        assert_eq!(listener.addresses, vec!["127.0.0.1", "::1"]);
        assert_eq!(listener.hostname.as_deref(), Some("example.org"));
        assert_eq!(listener.port, 8080);
        assert!(listener.secure);
    }

    #[test]
    fn test_every_failure_is_collected() {
        let errors = binding_errors::<Listener>(&env(&[
            ("LISTEN_PORT", "eighty"),
            ("LISTEN_SECURE", "sometimes"),
        ]));

        let keys: Vec<_> = errors.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["LISTEN_PORT", "LISTEN_SECURE", "LISTEN_OWNER"]);
        assert_eq!(
            errors[0].kind,
            BindingErrorKind::InvalidFormat {
                expected: "integer",
                value: "eighty".to_string()
            }
        );
        assert!(errors[2].is_missing());
    }

    #[test]
    fn test_invalid_default_is_reported_as_invalid_format() {
        #[derive(Debug)]
        struct BadDefault;

        impl EnvConfig for BadDefault {
            fn fields() -> Vec<FieldDescriptor> {
                vec![FieldDescriptor::for_slot::<i64>(
                    "workers",
                    integer("BAD_DEFAULT_WORKERS").with_default("many"),
                )]
            }

            fn assemble(_values: &mut BoundValues) -> Result<Self, RegistryError> {
                Ok(Self)
            }
        }

        let errors = binding_errors::<BadDefault>(&EnvStore::new());
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_missing());
    }

    #[test]
    fn test_required_string_bound_to_empty_is_missing() {
        let errors = binding_errors::<Listener>(&env(&[("LISTEN_OWNER", "")]));
        assert_eq!(errors, vec![BindingError::missing("LISTEN_OWNER")]);
    }

    #[test]
    fn test_required_list_that_binds_to_nothing_is_missing() {
        let errors = binding_errors::<RequiredList>(&env(&[("REQUIRED_PEERS", " ; ;")]));
        assert_eq!(errors, vec![BindingError::missing("REQUIRED_PEERS")]);

        let bound = RequiredList::bind(&env(&[("REQUIRED_PEERS", "a;b")])).unwrap();
        assert_eq!(bound.peers, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_default_list_is_not_an_error() {
        let listener = Listener::bind(&env(&[
            ("LISTEN_ADDRESSES", "   "),
            ("LISTEN_OWNER", "ops"),
        ]))
        .unwrap();
        assert!(listener.addresses.is_empty());
    }

    #[test]
    fn test_registry_errors_are_not_aggregated() {
        #[derive(Debug)]
        struct Mismatched;

        impl EnvConfig for Mismatched {
            fn fields() -> Vec<FieldDescriptor> {
                vec![FieldDescriptor::for_slot::<i64>("port", string("MISMATCHED_PORT"))]
            }

            fn assemble(_values: &mut BoundValues) -> Result<Self, RegistryError> {
                Ok(Self)
            }
        }

        let result = Mismatched::bind(&env(&[("MISMATCHED_PORT", "80")]));
        assert!(matches!(
            result,
            Err(ConfigError::Registry(RegistryError::KindMismatch { .. }))
        ));
    }

    #[test]
    fn test_take_reports_unbound_field() {
        let mut values = BoundValues::new("Demo");
        assert!(matches!(
            values.take::<String>("ghost"),
            Err(RegistryError::Unassembled { field: "ghost", .. })
        ));
    }
}
