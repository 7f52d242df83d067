//! `vertobank-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every module
//! (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use entity::{AggregateRoot, DomainEvents, Entity, ensure_identity, same_identity};
pub use error::{AppError, DomainError, DomainResult, ErrorKind, UseCaseResult};
pub use event::DomainEvent;
pub use id::AggregateId;
pub use value_object::{Component, ValueObject, hash_components, values_equal};
