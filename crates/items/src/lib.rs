//! Items module: a small catalogue of priced items.
//!
//! Layers, installed in order by [`ItemsInstaller`]:
//! - [`domain`]: the `Item` aggregate and the `Price` value object
//! - [`application`]: use cases over a request-scoped persistence context
//! - [`infrastructure`]: store + unit-of-work factory for the module
//! - [`presentation`]: HTTP endpoints under `/items`

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

use vertobank_kernel::{Module, ModuleInfo, ServiceCollection};

pub use application::{CreateItem, ItemSort, ItemView, ItemsError, ListItems};
pub use domain::{Item, ItemEvent, ItemId, Price};
pub use infrastructure::ItemsPersistence;

pub const MODULE_INFO: ModuleInfo = ModuleInfo {
    key: "items",
    title: "Items API",
    version: "v1",
};

/// Installs the items module. Reads `ItemsConnectionString`.
#[derive(Debug, Default)]
pub struct ItemsInstaller;

impl Module for ItemsInstaller {
    fn info(&self) -> ModuleInfo {
        MODULE_INFO
    }

    fn install_domain(&self, _services: &mut ServiceCollection) -> anyhow::Result<()> {
        Ok(())
    }

    fn install_application(&self, _services: &mut ServiceCollection) -> anyhow::Result<()> {
        Ok(())
    }

    fn install_infrastructure(
        &self,
        services: &mut ServiceCollection,
        connection_string: &str,
    ) -> anyhow::Result<()> {
        infrastructure::install(services, connection_string)
    }

    fn install_presentation(&self, services: &mut ServiceCollection) -> anyhow::Result<()> {
        let persistence = services.require::<ItemsPersistence>()?;
        services.add_routes(presentation::router(persistence.as_ref().clone()));
        Ok(())
    }
}
