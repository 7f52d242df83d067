//! Items use cases.
//!
//! Each use case runs against one request-scoped [`PersistenceContext`]:
//! reads go through the query object, writes through the repository, and a
//! successful write commits the unit of work (which publishes the item's
//! events).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vertobank_core::{AppError, DomainError, Entity, UseCaseResult};
use vertobank_infra::{PersistenceContext, PersistenceError, QueryError};

use crate::domain::{Item, ItemId, MAX_NAME_LEN, Price};

/// Page size used when a listing asks for a page without a size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

pub mod codes {
    pub const NAME_REQUIRED: &str = "items.name_required";
    pub const NAME_TOO_LONG: &str = "items.name_too_long";
    pub const PRICE_NOT_POSITIVE: &str = "items.price_not_positive";
    pub const INVALID_PAGE: &str = "items.invalid_page";
    pub const INVALID_PRICE_RANGE: &str = "items.invalid_price_range";
    pub const NOT_FOUND: &str = "items.not_found";
    pub const INVALID_ID: &str = "items.invalid_id";
    pub const MALFORMED_REQUEST: &str = "items.malformed_request";
}

/// Why a use case did not complete.
#[derive(Debug, Error)]
pub enum ItemsError {
    /// The request was refused; the errors explain why.
    #[error("request rejected: {}", .0.iter().map(AppError::message).collect::<Vec<_>>().join(" "))]
    Rejected(Vec<AppError>),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Query(QueryError),
}

impl From<Vec<AppError>> for ItemsError {
    fn from(errors: Vec<AppError>) -> Self {
        Self::Rejected(errors)
    }
}

impl From<DomainError> for ItemsError {
    fn from(error: DomainError) -> Self {
        Self::Rejected(error.into())
    }
}

impl From<QueryError> for ItemsError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::InvalidPage { page, size } => Self::Rejected(vec![
                AppError::validation(format!(
                    "Page {page} with size {size} is not a valid page (page starts at 1, size must be positive)."
                ))
                .with_code(codes::INVALID_PAGE)
                .with_meta("page", page)
                .with_meta("size", size),
            ]),
            other => Self::Query(other),
        }
    }
}

/// Read model returned by every items use case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub name: String,
    pub price: f64,
    pub price_minor_units: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: *item.id(),
            name: item.name().to_string(),
            price: item.price().as_decimal(),
            price_minor_units: item.price().minor_units(),
            created_at: item.created_at(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItem {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSort {
    #[default]
    Name,
    Price,
    CreatedAt,
}

/// Listing criteria. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItems {
    /// Case-insensitive name fragment.
    pub name_contains: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default)]
    pub sort: ItemSort,
    #[serde(default)]
    pub descending: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

fn validate_name(name: &str) -> Option<AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Some(AppError::validation("Name is required.").with_code(codes::NAME_REQUIRED));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Some(
            AppError::validation(format!("Name must be at most {MAX_NAME_LEN} characters."))
                .with_code(codes::NAME_TOO_LONG)
                .with_meta("max_length", MAX_NAME_LEN),
        );
    }
    None
}

fn validate_price(amount: f64) -> Result<Price, AppError> {
    Price::from_decimal(amount).map_err(|_| {
        AppError::validation("Price must be a positive amount.")
            .with_code(codes::PRICE_NOT_POSITIVE)
            .with_meta("field", "price")
    })
}

/// Check a create request, reporting every problem at once.
pub fn validate_create(request: &CreateItem) -> UseCaseResult<Price> {
    let name = validate_name(&request.name);
    let price = validate_price(request.price);

    match (name, price) {
        (None, Ok(price)) => Ok(price),
        (name, price) => Err(name.into_iter().chain(price.err()).collect()),
    }
}

fn price_bound(amount: Option<f64>, field: &'static str) -> UseCaseResult<Option<i64>> {
    amount
        .map(|value| {
            validate_price(value)
                .map(|price| price.minor_units())
                .map_err(|e| vec![e.with_meta("field", field)])
        })
        .transpose()
}

fn not_found(id: ItemId) -> ItemsError {
    ItemsError::Rejected(vec![
        AppError::not_found(format!("Item '{id}' was not found."))
            .with_code(codes::NOT_FOUND)
            .with_meta("id", id.to_string()),
    ])
}

pub async fn create_item(ctx: &PersistenceContext, request: CreateItem) -> Result<ItemView, ItemsError> {
    let price = validate_create(&request)?;
    let item = Item::create(ItemId::new(), &request.name, price, Utc::now())?;
    let view = ItemView::from(&item);

    ctx.repository::<Item>().insert(item)?;
    ctx.commit().await?;

    tracing::info!(item_id = %view.id, "item created");
    Ok(view)
}

pub async fn list_items(ctx: &PersistenceContext, criteria: ListItems) -> Result<Vec<ItemView>, ItemsError> {
    let min = price_bound(criteria.min_price, "min_price")?;
    let max = price_bound(criteria.max_price, "max_price")?;
    if matches!((min, max), (Some(min), Some(max)) if min > max) {
        return Err(ItemsError::Rejected(vec![
            AppError::validation("min_price must not exceed max_price.").with_code(codes::INVALID_PRICE_RANGE),
        ]));
    }

    let mut query = ctx.query::<Item>();

    let fragment = criteria
        .name_contains
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());
    if let Some(fragment) = fragment {
        query = query.filter(move |item: &Item| item.name().to_lowercase().contains(&fragment));
    }
    if let Some(min) = min {
        query = query.filter(move |item: &Item| item.price().minor_units() >= min);
    }
    if let Some(max) = max {
        query = query.filter(move |item: &Item| item.price().minor_units() <= max);
    }

    let ascending = !criteria.descending;
    query = match criteria.sort {
        ItemSort::Name => query.order_by(|item: &Item| item.name().to_lowercase(), ascending),
        ItemSort::Price => query.order_by(|item: &Item| item.price().minor_units(), ascending),
        ItemSort::CreatedAt => query.order_by(|item: &Item| item.created_at(), ascending),
    };
    // Stable order for rows that tie on the requested key.
    query = query.order_by(|item: &Item| *item.id(), true);

    if criteria.page.is_some() || criteria.page_size.is_some() {
        query = query.page(
            criteria.page.unwrap_or(1),
            criteria.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?;
    }

    let items = query.execute().await?;
    Ok(items.iter().map(ItemView::from).collect())
}

pub async fn reprice_item(ctx: &PersistenceContext, id: ItemId, amount: f64) -> Result<ItemView, ItemsError> {
    let price = validate_price(amount).map_err(|e| vec![e])?;

    let repo = ctx.repository::<Item>();
    let mut item = repo.find(&id).await?.ok_or_else(|| not_found(id))?;
    item.reprice(price, Utc::now());
    let view = ItemView::from(&item);

    repo.update(item)?;
    repo.commit().await?;
    Ok(view)
}

pub async fn rename_item(ctx: &PersistenceContext, id: ItemId, name: &str) -> Result<ItemView, ItemsError> {
    if let Some(error) = validate_name(name) {
        return Err(ItemsError::Rejected(vec![error]));
    }

    let repo = ctx.repository::<Item>();
    let mut item = repo.find(&id).await?.ok_or_else(|| not_found(id))?;
    item.rename(name, Utc::now())?;
    let view = ItemView::from(&item);

    repo.update(item)?;
    repo.commit().await?;
    Ok(view)
}

pub async fn delete_item(ctx: &PersistenceContext, id: ItemId) -> Result<(), ItemsError> {
    let repo = ctx.repository::<Item>();
    if !repo.remove(&id).await? {
        return Err(not_found(id));
    }
    repo.commit().await?;

    tracing::info!(item_id = %id, "item deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vertobank_core::ErrorKind;
    use vertobank_events::InMemoryMessageBus;
    use vertobank_infra::{InMemoryStore, PersistenceContextFactory};

    use super::*;

    fn factory() -> (PersistenceContextFactory, Arc<InMemoryMessageBus>) {
        let bus = Arc::new(InMemoryMessageBus::new());
        (PersistenceContextFactory::new(Arc::new(InMemoryStore::new()), bus.clone()), bus)
    }

    fn create(name: &str, price: f64) -> CreateItem {
        CreateItem {
            name: name.to_string(),
            price,
        }
    }

    async fn seed(factory: &PersistenceContextFactory, items: &[(&str, f64)]) -> Vec<ItemView> {
        let mut created = Vec::new();
        for (name, price) in items {
            created.push(create_item(&factory.begin(), create(name, *price)).await.unwrap());
        }
        created
    }

    fn rejected(err: ItemsError) -> Vec<AppError> {
        match err {
            ItemsError::Rejected(errors) => errors,
            other => panic!("expected a rejection, got {other}"),
        }
    }

    fn names(views: &[ItemView]) -> Vec<&str> {
        views.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn validation_reports_every_problem_with_codes() {
        let errors = validate_create(&create("  ", -1.0)).unwrap_err();
        let codes: Vec<_> = errors.iter().map(|e| e.code().cloned()).collect();

        assert_eq!(
            codes,
            vec![
                Some(serde_json::json!(codes::NAME_REQUIRED)),
                Some(serde_json::json!(codes::PRICE_NOT_POSITIVE)),
            ]
        );
        assert!(errors.iter().all(|e| e.kind() == ErrorKind::Validation));
    }

    #[tokio::test]
    async fn create_persists_and_publishes_item_created() {
        let (factory, bus) = factory();
        let sub = bus.subscribe();

        let view = create_item(&factory.begin(), create("Widget", 12.5)).await.unwrap();
        assert_eq!(view.price_minor_units, 1250);

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "items.item_created");
        assert_eq!(events[0].aggregate_key(), view.id.to_string());

        let listed = list_items(&factory.begin(), ListItems::default()).await.unwrap();
        assert_eq!(listed, vec![view]);
    }

    #[tokio::test]
    async fn invalid_create_touches_nothing() {
        let (factory, bus) = factory();
        let sub = bus.subscribe();

        let errors = rejected(create_item(&factory.begin(), create("", 1.0)).await.unwrap_err());
        assert_eq!(errors.len(), 1);
        assert!(sub.drain().is_empty());
        assert!(list_items(&factory.begin(), ListItems::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_pages() {
        let (factory, _bus) = factory();
        seed(
            &factory,
            &[("Bolt", 1.0), ("anvil", 50.0), ("Chisel", 12.0), ("Bracket", 3.0), ("Drill", 80.0)],
        )
        .await;

        let all = list_items(&factory.begin(), ListItems::default()).await.unwrap();
        assert_eq!(names(&all), vec!["anvil", "Bolt", "Bracket", "Chisel", "Drill"]);

        let by_price_desc = list_items(
            &factory.begin(),
            ListItems {
                sort: ItemSort::Price,
                descending: true,
                min_price: Some(2.0),
                max_price: Some(60.0),
                ..ListItems::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&by_price_desc), vec!["anvil", "Chisel", "Bracket"]);

        let fragment = list_items(
            &factory.begin(),
            ListItems {
                name_contains: Some("B".to_string()),
                ..ListItems::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&fragment), vec!["Bolt", "Bracket"]);

        let second_page = list_items(
            &factory.begin(),
            ListItems {
                page: Some(2),
                page_size: Some(2),
                ..ListItems::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&second_page), vec!["Bracket", "Chisel"]);
    }

    #[tokio::test]
    async fn invalid_listing_criteria_are_validation_errors() {
        let (factory, _bus) = factory();

        let errors = rejected(
            list_items(
                &factory.begin(),
                ListItems {
                    page: Some(0),
                    ..ListItems::default()
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(errors[0].code(), Some(&serde_json::json!(codes::INVALID_PAGE)));

        let errors = rejected(
            list_items(
                &factory.begin(),
                ListItems {
                    min_price: Some(10.0),
                    max_price: Some(1.0),
                    ..ListItems::default()
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(errors[0].code(), Some(&serde_json::json!(codes::INVALID_PRICE_RANGE)));
    }

    #[tokio::test]
    async fn reprice_and_rename_publish_their_events() {
        let (factory, bus) = factory();
        let created = seed(&factory, &[("Widget", 10.0)]).await.remove(0);
        let sub = bus.subscribe();

        let repriced = reprice_item(&factory.begin(), created.id, 11.0).await.unwrap();
        assert_eq!(repriced.price_minor_units, 1100);

        let renamed = rename_item(&factory.begin(), created.id, "Gizmo").await.unwrap();
        assert_eq!(renamed.name, "Gizmo");
        assert_eq!(renamed.price_minor_units, 1100);

        let types: Vec<_> = sub.drain().iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, vec!["items.item_repriced", "items.item_renamed"]);
    }

    #[tokio::test]
    async fn missing_items_are_not_found() {
        let (factory, _bus) = factory();
        let id = ItemId::new();

        let errors = rejected(reprice_item(&factory.begin(), id, 1.0).await.unwrap_err());
        assert_eq!(errors[0].kind(), ErrorKind::NotFound);

        let errors = rejected(delete_item(&factory.begin(), id).await.unwrap_err());
        assert_eq!(errors[0].kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_removes_the_item() {
        let (factory, _bus) = factory();
        let created = seed(&factory, &[("Widget", 10.0), ("Gadget", 5.0)]).await;

        delete_item(&factory.begin(), created[0].id).await.unwrap();

        let remaining = list_items(&factory.begin(), ListItems::default()).await.unwrap();
        assert_eq!(names(&remaining), vec!["Gadget"]);

        let errors = rejected(delete_item(&factory.begin(), created[0].id).await.unwrap_err());
        assert_eq!(errors[0].kind(), ErrorKind::NotFound);
    }
}
