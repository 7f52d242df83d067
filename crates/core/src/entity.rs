//! Entity and aggregate traits: identity + continuity across state changes.

use crate::error::{DomainError, DomainResult};
use crate::event::DomainEvent;

/// Entity marker + minimal interface.
///
/// Entities are compared by identifier only. Implement equality with
/// [`impl_identity_eq!`](crate::impl_identity_eq) rather than deriving it.
pub trait Entity {
    /// Strongly-typed entity identifier.
    ///
    /// `Default` is the "unset" value and is rejected at construction
    /// (see [`ensure_identity`]). `Display` is the storage key.
    type Id: Clone + Eq + core::hash::Hash + Default + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Validate an identifier for entity construction.
///
/// Returns the identifier back when it is not the type's default value.
pub fn ensure_identity<Id>(id: Id) -> DomainResult<Id>
where
    Id: Default + PartialEq,
{
    if id == Id::default() {
        return Err(DomainError::DefaultId);
    }
    Ok(id)
}

/// Identity equality: two entities are the same iff their identifiers are equal.
pub fn same_identity<E: Entity>(left: &E, right: &E) -> bool {
    left.id() == right.id()
}

/// Implement `PartialEq`, `Eq` and `Hash` for an entity by its identifier.
#[macro_export]
macro_rules! impl_identity_eq {
    ($t:ty) => {
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::entity::same_identity(self, other)
            }
        }

        impl Eq for $t {}

        impl ::core::hash::Hash for $t {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                ::core::hash::Hash::hash($crate::entity::Entity::id(self), state)
            }
        }
    };
}

/// Ordered queue of domain events raised by an aggregate and not yet published.
///
/// The queue is runtime-only state: aggregates mark it `#[serde(skip)]` so it
/// never reaches the store.
#[derive(Debug, Clone)]
pub struct DomainEvents<E> {
    pending: Vec<E>,
}

impl<E> DomainEvents<E> {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Append an event; order of calls is preserved.
    pub fn raise(&mut self, event: E) {
        self.pending.push(event);
    }

    pub fn as_slice(&self) -> &[E] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<E> Default for DomainEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate root: the unit of persistence and transactional consistency.
///
/// Aggregates record domain events while their behaviour runs; the persistence
/// context reads them on commit and clears them once they were dispatched.
pub trait AggregateRoot: Entity + Send + Sync + 'static {
    /// Events this aggregate raises.
    type Event: DomainEvent;

    /// Stable aggregate type name; doubles as the storage table name.
    const AGGREGATE_TYPE: &'static str;

    fn events(&self) -> &DomainEvents<Self::Event>;

    fn events_mut(&mut self) -> &mut DomainEvents<Self::Event>;

    /// Pending (unpublished) events in the order they were raised.
    fn pending_events(&self) -> &[Self::Event] {
        self.events().as_slice()
    }

    fn clear_pending_events(&mut self) {
        self.events_mut().clear();
    }
}
