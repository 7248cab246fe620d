//! Descriptor registry
//!
//! Descriptors are derived once per configuration type and cached by
//! [`TypeId`]. Declaration mistakes are reported as [`RegistryError`] the
//! first time a type is registered and are never cached.

use crate::binder::EnvConfig;
use crate::descriptor::{FieldDescriptor, Presence};
use crate::error::RegistryError;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

type Descriptors = Arc<[FieldDescriptor]>;

fn cache() -> &'static RwLock<HashMap<TypeId, Descriptors>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, Descriptors>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Ordered descriptors for `T`, derived on first use
pub fn descriptors<T: EnvConfig>() -> Result<Descriptors, RegistryError> {
    let type_id = TypeId::of::<T>();

    if let Some(found) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
    {
        return Ok(Arc::clone(found));
    }

    let built: Descriptors = build::<T>()?.into();
    debug!(
        config = short_type_name::<T>(),
        fields = built.len(),
        "Registered configuration descriptors"
    );

    let mut cache = cache().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(cache.entry(type_id).or_insert(built)))
}

/// Whether descriptors for `T` are already cached
pub fn is_registered<T: EnvConfig>() -> bool {
    cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}

fn build<T: EnvConfig>() -> Result<Vec<FieldDescriptor>, RegistryError> {
    let fields = T::fields();
    validate(short_type_name::<T>(), &fields)?;
    Ok(fields)
}

fn validate(type_name: &'static str, fields: &[FieldDescriptor]) -> Result<(), RegistryError> {
    let mut seen: HashMap<&str, &'static str> = HashMap::new();

    for descriptor in fields {
        if !descriptor.slot.accepts(&descriptor.kind) {
            return Err(RegistryError::KindMismatch {
                type_name,
                field: descriptor.field,
                key: descriptor.key.clone(),
                kind: descriptor.kind.name(),
                slot: descriptor.slot.type_name,
            });
        }

        if descriptor.is_optional() && !descriptor.slot.optional {
            return Err(RegistryError::OptionalWithoutOption {
                type_name,
                field: descriptor.field,
                key: descriptor.key.clone(),
                slot: descriptor.slot.type_name,
            });
        }

        if let Some(first) = seen.insert(descriptor.key.as_str(), descriptor.field) {
            return Err(RegistryError::DuplicateKey {
                type_name,
                key: descriptor.key.clone(),
                first,
                second: descriptor.field,
            });
        }
    }

    Ok(())
}

/// Render an example dotenv file listing every variable `T` binds.
///
/// Required variables are left blank, defaults are filled in and optional
/// variables are commented out.
pub fn render_example<T: EnvConfig>() -> Result<String, RegistryError> {
    let descriptors = descriptors::<T>()?;

    let mut out = format!("# Environment variables for {}\n", short_type_name::<T>());
    for descriptor in descriptors.iter() {
        out.push_str(&render_entry(descriptor));
    }

    Ok(out)
}

fn render_entry(descriptor: &FieldDescriptor) -> String {
    let header = format!("\n# {} ({})\n", descriptor.field, descriptor.kind);
    let body = match &descriptor.presence {
        Presence::Required => format!("# required\n{}=\n", descriptor.key),
        Presence::Optional => format!("# optional\n#{}=\n", descriptor.key),
        Presence::Default(raw) => format!("{}={}\n", descriptor.key, quote(raw)),
    };
    header + &body
}

fn quote(raw: &str) -> String {
    if raw.is_empty() || raw.chars().all(|c| c.is_ascii_alphanumeric() || ".,:/_-".contains(c)) {
        raw.to_string()
    } else {
        format!("'{}'", raw)
    }
}

/// Last path segment of `T`'s type name
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
