use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vertobank_core::{AggregateRoot, DomainError, DomainEvent, DomainEvents, DomainResult, Entity, ensure_identity};

use super::price::Price;

/// Longest accepted item name, in characters.
pub const MAX_NAME_LEN: usize = 200;

vertobank_core::uuid_id!(
    /// Item identifier.
    ItemId
);

/// Events raised by [`Item`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEvent {
    ItemCreated {
        item_id: ItemId,
        name: String,
        price: Price,
        occurred_at: DateTime<Utc>,
    },
    ItemRepriced {
        item_id: ItemId,
        previous: Price,
        current: Price,
        occurred_at: DateTime<Utc>,
    },
    ItemRenamed {
        item_id: ItemId,
        previous: String,
        current: String,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent for ItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ItemEvent::ItemCreated { .. } => "items.item_created",
            ItemEvent::ItemRepriced { .. } => "items.item_repriced",
            ItemEvent::ItemRenamed { .. } => "items.item_renamed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ItemEvent::ItemCreated { occurred_at, .. }
            | ItemEvent::ItemRepriced { occurred_at, .. }
            | ItemEvent::ItemRenamed { occurred_at, .. } => *occurred_at,
        }
    }
}

/// Aggregate root: a sellable item with a name and a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: String,
    price: Price,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: DomainEvents<ItemEvent>,
}

vertobank_core::impl_identity_eq!(Item);

fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("item name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "item name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

impl Item {
    /// Create a new item; raises `ItemCreated`.
    pub fn create(id: ItemId, name: &str, price: Price, now: DateTime<Utc>) -> DomainResult<Self> {
        let id = ensure_identity(id)?;
        let name = normalize_name(name)?;

        let mut item = Self {
            id,
            name: name.clone(),
            price,
            created_at: now,
            events: DomainEvents::new(),
        };
        item.events.raise(ItemEvent::ItemCreated {
            item_id: id,
            name,
            price,
            occurred_at: now,
        });
        Ok(item)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Change the price; raises `ItemRepriced` unless the price is unchanged.
    pub fn reprice(&mut self, price: Price, now: DateTime<Utc>) {
        if price == self.price {
            return;
        }
        let previous = std::mem::replace(&mut self.price, price);
        self.events.raise(ItemEvent::ItemRepriced {
            item_id: self.id,
            previous,
            current: price,
            occurred_at: now,
        });
    }

    /// Change the name; raises `ItemRenamed` unless the name is unchanged.
    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let name = normalize_name(name)?;
        if name == self.name {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.name, name.clone());
        self.events.raise(ItemEvent::ItemRenamed {
            item_id: self.id,
            previous,
            current: name,
            occurred_at: now,
        });
        Ok(())
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl AggregateRoot for Item {
    type Event = ItemEvent;
    const AGGREGATE_TYPE: &'static str = "item";

    fn events(&self) -> &DomainEvents<ItemEvent> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut DomainEvents<ItemEvent> {
        &mut self.events
    }
}
