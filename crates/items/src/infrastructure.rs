//! Items persistence wiring.

use std::sync::Arc;

use anyhow::Context;

use vertobank_events::MessagePublisher;
use vertobank_infra::{PersistenceContext, PersistenceContextFactory, store};
use vertobank_kernel::ServiceCollection;

/// The items module's unit-of-work factory, as registered in the services.
#[derive(Debug, Clone)]
pub struct ItemsPersistence(PersistenceContextFactory);

impl ItemsPersistence {
    pub fn new(factory: PersistenceContextFactory) -> Self {
        Self(factory)
    }

    /// A fresh unit of work for one request.
    pub fn begin(&self) -> PersistenceContext {
        self.0.begin()
    }
}

/// Open the module's store and register [`ItemsPersistence`].
///
/// Requires an `Arc<dyn MessagePublisher>` registered by the host.
pub fn install(services: &mut ServiceCollection, connection_string: &str) -> anyhow::Result<()> {
    let store = store::open(connection_string).context("failed to open the items store")?;
    let publisher = services.require::<Arc<dyn MessagePublisher>>()?;

    services.insert(ItemsPersistence::new(PersistenceContextFactory::new(
        store,
        publisher.as_ref().clone(),
    )));
    Ok(())
}
