//! Items domain: pure business rules (no IO, no HTTP, no storage).

pub mod item;
pub mod price;

pub use item::{Item, ItemEvent, ItemId, MAX_NAME_LEN};
pub use price::Price;
