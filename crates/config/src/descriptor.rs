//! Field descriptors and the storage slots they bind into

use crate::coerce::{Value, ValueKind, DEFAULT_LIST_DELIMITER};
use std::fmt;

/// What happens when a variable is absent.
///
/// Exactly one policy holds per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Default(String),
}

/// Binding declaration for one field, built with [`string`], [`integer`],
/// [`boolean`] or [`list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    key: String,
    kind: ValueKind,
    presence: Presence,
}

/// Bind a string field to `key`
pub fn string(key: impl Into<String>) -> FieldSpec {
    FieldSpec::new(key, ValueKind::String)
}

/// Bind a base-10 signed integer field to `key`
pub fn integer(key: impl Into<String>) -> FieldSpec {
    FieldSpec::new(key, ValueKind::Integer)
}

/// Bind a boolean field to `key`
pub fn boolean(key: impl Into<String>) -> FieldSpec {
    FieldSpec::new(key, ValueKind::Boolean)
}

/// Bind a comma separated list field to `key`
pub fn list(key: impl Into<String>) -> FieldSpec {
    FieldSpec::new(
        key,
        ValueKind::List {
            delimiter: DEFAULT_LIST_DELIMITER,
        },
    )
}

impl FieldSpec {
    fn new(key: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            key: key.into(),
            kind,
            presence: Presence::Required,
        }
    }

    /// A missing variable leaves the field empty
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Raw value used when the variable is absent
    pub fn with_default(mut self, raw: impl Into<String>) -> Self {
        self.presence = Presence::Default(raw.into());
        self
    }

    /// Separator for list fields; ignored for scalar kinds
    pub fn delimiter(mut self, delimiter: char) -> Self {
        if let ValueKind::List { .. } = self.kind {
            self.kind = ValueKind::List { delimiter };
        }
        self
    }
}

/// Static binding metadata for one field of a configuration type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust field name
    pub field: &'static str,
    /// Environment variable name, case-sensitive
    pub key: String,
    pub kind: ValueKind,
    pub presence: Presence,
    /// Storage slot the value is moved into
    pub slot: SlotInfo,
}

impl FieldDescriptor {
    /// Describe `field`, stored as `T`, bound according to `spec`
    pub fn for_slot<T: EnvSlot>(field: &'static str, spec: FieldSpec) -> Self {
        Self {
            field,
            key: spec.key,
            kind: spec.kind,
            presence: spec.presence,
            slot: SlotInfo::of::<T>(),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.presence, Presence::Optional)
    }

    pub fn default_value(&self) -> Option<&str> {
        match &self.presence {
            Presence::Default(raw) => Some(raw),
            _ => None,
        }
    }
}

/// Type-erased facts about a storage slot, checked when descriptors are registered
#[derive(Clone, Copy)]
pub struct SlotInfo {
    pub type_name: &'static str,
    pub optional: bool,
    accepts: fn(&ValueKind) -> bool,
}

impl SlotInfo {
    pub fn of<T: EnvSlot>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            optional: T::OPTIONAL,
            accepts: T::accepts,
        }
    }

    pub fn accepts(&self, kind: &ValueKind) -> bool {
        (self.accepts)(kind)
    }
}

impl fmt::Debug for SlotInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotInfo")
            .field("type_name", &self.type_name)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SlotInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.optional == other.optional
    }
}

impl Eq for SlotInfo {}

/// A Rust type that can hold a bound value
pub trait EnvSlot: Sized {
    /// Whether an absent value is representable
    const OPTIONAL: bool = false;

    /// Whether values of `kind` can be stored here
    fn accepts(kind: &ValueKind) -> bool;

    /// Move a coerced value into the slot.
    ///
    /// `None` means the field was left unset. Returns `None` when the value
    /// cannot be represented, which the registry rules out up front.
    fn from_value(value: Option<Value>) -> Option<Self>;
}

impl EnvSlot for String {
    fn accepts(kind: &ValueKind) -> bool {
        matches!(kind, ValueKind::String)
    }

    fn from_value(value: Option<Value>) -> Option<Self> {
        match value? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl EnvSlot for i64 {
    fn accepts(kind: &ValueKind) -> bool {
        matches!(kind, ValueKind::Integer)
    }

    fn from_value(value: Option<Value>) -> Option<Self> {
        match value? {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }
}

impl EnvSlot for bool {
    fn accepts(kind: &ValueKind) -> bool {
        matches!(kind, ValueKind::Boolean)
    }

    fn from_value(value: Option<Value>) -> Option<Self> {
        match value? {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

impl EnvSlot for Vec<String> {
    fn accepts(kind: &ValueKind) -> bool {
        kind.is_list()
    }

    fn from_value(value: Option<Value>) -> Option<Self> {
        match value? {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl<T: EnvSlot> EnvSlot for Option<T> {
    const OPTIONAL: bool = true;

    fn accepts(kind: &ValueKind) -> bool {
        T::accepts(kind)
    }

    fn from_value(value: Option<Value>) -> Option<Self> {
        match value {
            None => Some(None),
            Some(value) => T::from_value(Some(value)).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_to_required() {
        let descriptor = FieldDescriptor::for_slot::<String>("hostname", string("HOST"));
        assert!(descriptor.is_required());
        assert_eq!(descriptor.default_value(), None);
        assert_eq!(descriptor.key, "HOST");
    }

    #[test]
    fn test_last_presence_modifier_wins() {
        let spec = integer("PORT").optional().with_default("80");
        let descriptor = FieldDescriptor::for_slot::<i64>("port", spec);
        assert_eq!(descriptor.presence, Presence::Default("80".to_string()));
        assert!(!descriptor.is_optional());
    }

    #[test]
    fn test_delimiter_only_applies_to_lists() {
        assert_eq!(
            list("ADDRS").delimiter(';').kind,
            ValueKind::List { delimiter: ';' }
        );
        assert_eq!(string("NAME").delimiter(';').kind, ValueKind::String);
    }

    #[test]
    fn test_slot_acceptance() {
        assert!(SlotInfo::of::<Vec<String>>().accepts(&ValueKind::List { delimiter: ',' }));
        assert!(!SlotInfo::of::<String>().accepts(&ValueKind::List { delimiter: ',' }));
        assert!(!SlotInfo::of::<Vec<String>>().accepts(&ValueKind::String));
        assert!(SlotInfo::of::<Option<i64>>().accepts(&ValueKind::Integer));
        assert!(SlotInfo::of::<Option<i64>>().optional);
        assert!(!SlotInfo::of::<i64>().optional);
    }

    #[test]
    fn test_option_slot_from_value() {
        assert_eq!(<Option<String>>::from_value(None), Some(None));
        assert_eq!(
            <Option<String>>::from_value(Some(Value::String("x".into()))),
            Some(Some("x".to_string()))
        );
        assert_eq!(<String>::from_value(None), None);
        assert_eq!(<i64>::from_value(Some(Value::String("1".into()))), None);
    }
}
