//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are UUID newtypes. The nil UUID is their `Default` value, which
//! is exactly the value entity construction rejects.

pub use uuid::Uuid;

/// Declare a UUID-backed identifier newtype.
///
/// The generated type is `Copy + Eq + Hash + Default + Display + FromStr` and
/// serializes transparently. Callers need `serde` as a direct dependency.
///
/// ```ignore
/// vertobank_core::uuid_id!(
///     /// Identifier of an order.
///     OrderId
/// );
/// ```
#[macro_export]
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($crate::id::Uuid);

        impl $name {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self($crate::id::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: $crate::id::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &$crate::id::Uuid {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::id::Uuid> for $name {
            fn from(value: $crate::id::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $crate::id::Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::error::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = <$crate::id::Uuid as ::core::str::FromStr>::from_str(s).map_err(|e| {
                    $crate::error::DomainError::invalid_id(format!(
                        "{}: {}",
                        stringify!($name),
                        e
                    ))
                })?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_id!(
    /// Identifier of an aggregate root.
    AggregateId
);
