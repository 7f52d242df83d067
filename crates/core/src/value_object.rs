//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One component of a value object's structural identity.
///
/// Components are compared pairwise, in order. Keep the variant set small:
/// anything richer can be broken down into these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Component {
    None,
    Bool(bool),
    Int(i128),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

macro_rules! component_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Component {
            fn from(value: $t) -> Self {
                Component::Int(value as i128)
            }
        })*
    };
}

component_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<bool> for Component {
    fn from(value: bool) -> Self {
        Component::Bool(value)
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Component::Text(value.to_string())
    }
}

impl From<String> for Component {
    fn from(value: String) -> Self {
        Component::Text(value)
    }
}

impl From<Uuid> for Component {
    fn from(value: Uuid) -> Self {
        Component::Uuid(value)
    }
}

impl From<DateTime<Utc>> for Component {
    fn from(value: DateTime<Utc>) -> Self {
        Component::Timestamp(value)
    }
}

impl<T: Into<Component>> From<Option<T>> for Component {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Component::None)
    }
}

/// Value object interface.
///
/// Value objects are domain objects that are **immutable** and **compared by value**.
/// They represent concepts where identity doesn't matter - only the values matter.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// ## Equality components
///
/// `equality_components` lists the values that make up the object, in a fixed
/// order. [`values_equal`] and [`hash_components`] are defined over that list,
/// and [`impl_value_eq!`](crate::impl_value_eq) wires them into `PartialEq`,
/// `Eq` and `Hash`:
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Money {
///     minor_units: i64,
///     currency: String,
/// }
///
/// impl ValueObject for Money {
///     fn equality_components(&self) -> Vec<Component> {
///         vec![self.minor_units.into(), self.currency.clone().into()]
///     }
/// }
///
/// vertobank_core::impl_value_eq!(Money);
/// ```
pub trait ValueObject: Clone + core::fmt::Debug {
    fn equality_components(&self) -> Vec<Component>;
}

/// Structural equality: same component count and pairwise-equal components, in order.
pub fn values_equal<V: ValueObject>(left: &V, right: &V) -> bool {
    left.equality_components() == right.equality_components()
}

/// Structural hash over the ordered component list.
pub fn hash_components<V: ValueObject, H: core::hash::Hasher>(value: &V, state: &mut H) {
    core::hash::Hash::hash(&value.equality_components(), state)
}

/// Implement `PartialEq`, `Eq` and `Hash` for a value object from its components.
#[macro_export]
macro_rules! impl_value_eq {
    ($t:ty) => {
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::value_object::values_equal(self, other)
            }
        }

        impl Eq for $t {}

        impl ::core::hash::Hash for $t {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                $crate::value_object::hash_components(self, state)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone)]
    struct Address {
        street: String,
        city: String,
        unit: Option<u32>,
    }

    impl ValueObject for Address {
        fn equality_components(&self) -> Vec<Component> {
            vec![
                self.street.clone().into(),
                self.city.clone().into(),
                self.unit.into(),
            ]
        }
    }

    crate::impl_value_eq!(Address);

    /// A value object whose component list length depends on its state.
    #[derive(Debug, Clone)]
    struct Tags(Vec<String>);

    impl ValueObject for Tags {
        fn equality_components(&self) -> Vec<Component> {
            self.0.iter().map(|t| Component::from(t.as_str())).collect()
        }
    }

    crate::impl_value_eq!(Tags);

    fn address(street: &str, city: &str, unit: Option<u32>) -> Address {
        Address {
            street: street.to_string(),
            city: city.to_string(),
            unit,
        }
    }

    #[test]
    fn equal_components_compare_equal_and_hash_equal() {
        let a = address("Main St", "Springfield", Some(4));
        let b = address("Main St", "Springfield", Some(4));
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn any_differing_component_breaks_equality() {
        let a = address("Main St", "Springfield", Some(4));
        assert_ne!(a, address("Main St", "Springfield", None));
        assert_ne!(a, address("Elm St", "Springfield", Some(4)));
    }

    #[test]
    fn component_order_matters() {
        assert_ne!(
            address("Springfield", "Main St", None),
            address("Main St", "Springfield", None)
        );
        assert_ne!(
            Tags(vec!["a".into(), "b".into()]),
            Tags(vec!["b".into(), "a".into()])
        );
    }

    #[test]
    fn component_count_matters() {
        assert_ne!(Tags(vec!["a".into()]), Tags(vec!["a".into(), "a".into()]));
        assert_eq!(Tags(vec![]), Tags(vec![]));
    }
}
