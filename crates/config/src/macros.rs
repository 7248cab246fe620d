//! Declarative configuration shapes

/// Declare a configuration struct bound from environment variables.
///
/// Each field is `name: Type = spec`, where `spec` is built with
/// [`string`](crate::string), [`integer`](crate::integer),
/// [`boolean`](crate::boolean) or [`list`](crate::list). A field without
/// `= spec` is not bound and starts from `Default::default()`.
///
/// The generated struct keeps its fields private and exposes one accessor
/// per field, so a bound instance cannot be changed after construction.
///
/// ```
/// use config::{env_config, integer, list, string, EnvConfig, EnvStore};
///
/// env_config! {
///     #[derive(Debug)]
///     pub struct Listener {
///         /// Interfaces to bind
///         addresses: Vec<String> = list("LISTEN_ADDRESSES").with_default("0.0.0.0"),
///         port: i64 = integer("LISTEN_PORT").with_default("80"),
///         hostname: Option<String> = string("LISTEN_HOSTNAME").optional(),
///         connections: u32,
///     }
/// }
///
/// let env: EnvStore = [("LISTEN_PORT", "8080")].into_iter().collect();
/// let listener = Listener::bind(&env).unwrap();
/// assert_eq!(*listener.port(), 8080);
/// assert_eq!(listener.addresses(), &["0.0.0.0"]);
/// assert_eq!(*listener.connections(), 0);
/// ```
#[macro_export]
macro_rules! env_config {
    (@descriptor $field:ident, $ty:ty,) => {
        ::core::option::Option::None
    };
    (@descriptor $field:ident, $ty:ty, $spec:expr) => {
        ::core::option::Option::Some($crate::FieldDescriptor::for_slot::<$ty>(
            ::core::stringify!($field),
            $spec,
        ))
    };
    (@assemble $values:ident, $field:ident, $ty:ty,) => {
        <$ty as ::core::default::Default>::default()
    };
    (@assemble $values:ident, $field:ident, $ty:ty, $spec:expr) => {
        $values.take::<$ty>(::core::stringify!($field))?
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty $(= $spec:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($field: $ty,)*
        }

        impl $name {
            $(
                $(#[$field_meta])*
                pub fn $field(&self) -> &$ty {
                    &self.$field
                }
            )*
        }

        impl $crate::EnvConfig for $name {
            fn fields() -> ::std::vec::Vec<$crate::FieldDescriptor> {
                let mut fields = ::std::vec::Vec::new();
                $(
                    if let ::core::option::Option::Some(descriptor) =
                        $crate::env_config!(@descriptor $field, $ty, $($spec)?)
                    {
                        fields.push(descriptor);
                    }
                )*
                fields
            }

            fn assemble(
                values: &mut $crate::BoundValues,
            ) -> ::core::result::Result<Self, $crate::RegistryError> {
                ::core::result::Result::Ok(Self {
                    $($field: $crate::env_config!(@assemble values, $field, $ty, $($spec)?),)*
                })
            }
        }
    };
}
