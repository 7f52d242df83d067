//! Query objects: accumulate criteria, then execute once.
//!
//! A [`QueryObject`] collects filters, sort criteria and a page window from as
//! many call sites as needed (access rules, pagination, business filters) and
//! only touches its [`QuerySource`] when [`QueryObject::execute`] runs.
//!
//! Execution order is fixed: filter, then sort, then page.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use super::Persistable;
use crate::store::{Store, StoreError};

/// Query construction/execution error.
#[derive(Debug, Error)]
pub enum QueryError {
    /// `page` was called with a page number below 1 or a zero page size.
    #[error("invalid page window: page {page}, size {size} (page must be >= 1, size must be > 0)")]
    InvalidPage { page: u32, size: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored document no longer matches the aggregate's shape.
    #[error("failed to deserialize document: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Where a query object reads its rows from.
#[async_trait::async_trait]
pub trait QuerySource<A>: Send + Sync {
    /// Load every row of the aggregate type, unfiltered and unordered.
    async fn load(&self) -> Result<Vec<A>, QueryError>;
}

/// In-memory rows (handy for tests and for querying already-loaded data).
#[async_trait::async_trait]
impl<A> QuerySource<A> for Vec<A>
where
    A: Clone + Send + Sync,
{
    async fn load(&self) -> Result<Vec<A>, QueryError> {
        Ok(self.clone())
    }
}

/// Rows of one aggregate table in a [`Store`].
pub struct StoreSource<A> {
    store: Arc<dyn Store>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> StoreSource<A> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _aggregate: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<A> QuerySource<A> for StoreSource<A>
where
    A: Persistable,
{
    async fn load(&self) -> Result<Vec<A>, QueryError> {
        let documents = self.store.scan(A::AGGREGATE_TYPE).await?;
        documents
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(QueryError::from))
            .collect()
    }
}

type Predicate<A> = Box<dyn Fn(&A) -> bool + Send + Sync>;
type Comparator<A> = Box<dyn Fn(&A, &A) -> Ordering + Send + Sync>;

struct SortCriterion<A> {
    compare: Comparator<A>,
    ascending: bool,
}

/// A validated 1-indexed page window.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageWindow {
    number: u32,
    size: u32,
}

impl PageWindow {
    /// Validate a window. Page numbers start at 1; sizes must be positive.
    pub fn new(number: u32, size: u32) -> Result<Self, QueryError> {
        if number < 1 || size == 0 {
            return Err(QueryError::InvalidPage { page: number, size });
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rows skipped before this page: `(number - 1) * size`.
    pub fn skip(&self) -> usize {
        (self.number as usize - 1).saturating_mul(self.size as usize)
    }
}

/// Composable read query over one aggregate type.
///
/// Builder methods consume and return the query so criteria can be chained:
///
/// ```ignore
/// let items = context
///     .query::<Item>()
///     .filter(|i| i.price().minor_units() > 0)
///     .order_by(|i| i.name().to_string(), true)
///     .order_by(|i| i.price().minor_units(), false)
///     .page(2, 10)?
///     .execute()
///     .await?;
/// ```
pub struct QueryObject<A> {
    source: Arc<dyn QuerySource<A>>,
    filters: Vec<Predicate<A>>,
    sorting: Vec<SortCriterion<A>>,
    window: Option<PageWindow>,
}

impl<A> QueryObject<A>
where
    A: Send + 'static,
{
    pub fn new(source: Arc<dyn QuerySource<A>>) -> Self {
        Self {
            source,
            filters: Vec::new(),
            sorting: Vec::new(),
            window: None,
        }
    }

    /// Narrow the result set. Repeated calls are AND-ed together.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Append a sort criterion.
    ///
    /// The first criterion is the primary sort key; each later one only breaks
    /// ties left by the criteria before it.
    pub fn order_by<K, F>(mut self, selector: F, ascending: bool) -> Self
    where
        K: Ord,
        F: Fn(&A) -> K + Send + Sync + 'static,
    {
        self.sorting.push(SortCriterion {
            compare: Box::new(move |a, b| selector(a).cmp(&selector(b))),
            ascending,
        });
        self
    }

    /// Restrict results to one 1-indexed page.
    ///
    /// Rejects `page_number < 1` and `page_size == 0` with
    /// [`QueryError::InvalidPage`]. Calling `page` again replaces the window.
    pub fn page(mut self, page_number: u32, page_size: u32) -> Result<Self, QueryError> {
        self.window = Some(PageWindow::new(page_number, page_size)?);
        Ok(self)
    }

    pub fn window(&self) -> Option<PageWindow> {
        self.window
    }

    /// Whether `item` passes every filter.
    pub fn matches(&self, item: &A) -> bool {
        self.filters.iter().all(|predicate| predicate(item))
    }

    /// The accumulated sort criteria folded into one comparison.
    pub fn compare(&self, a: &A, b: &A) -> Ordering {
        self.sorting.iter().fold(Ordering::Equal, |ordering, criterion| {
            ordering.then_with(|| {
                let ord = (criterion.compare)(a, b);
                if criterion.ascending { ord } else { ord.reverse() }
            })
        })
    }

    /// Apply the accumulated criteria to already-loaded rows.
    ///
    /// The sort is stable, so rows equal under every criterion keep their
    /// source order.
    pub fn apply(&self, rows: Vec<A>) -> Vec<A> {
        let mut rows: Vec<A> = rows.into_iter().filter(|row| self.matches(row)).collect();

        if !self.sorting.is_empty() {
            rows.sort_by(|a, b| self.compare(a, b));
        }

        match self.window {
            Some(window) => rows
                .into_iter()
                .skip(window.skip())
                .take(window.size() as usize)
                .collect(),
            None => rows,
        }
    }

    /// Load from the source and apply every accumulated criterion.
    pub async fn execute(self) -> Result<Vec<A>, QueryError> {
        let rows = self.source.load().await?;
        Ok(self.apply(rows))
    }
}
