//! Application wiring: message bus, module installation and the HTTP router.

use std::sync::Arc;

use axum::{Extension, Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use vertobank_events::{InMemoryMessageBus, MessagePublisher};
use vertobank_items::ItemsInstaller;
use vertobank_kernel::{
    AppConfig, ModuleRegistration, ModuleRegistry, ServiceCollection, Services, StartupError,
};

/// Every module composed into this host, in installation order.
pub fn registry() -> ModuleRegistry {
    ModuleRegistry::new().register(ItemsInstaller)
}

/// A fully installed host.
pub struct App {
    pub router: Router,
    /// Bus the modules publish committed domain events to.
    pub bus: Arc<InMemoryMessageBus>,
    /// Everything the modules registered while installing.
    pub services: Services,
    pub modules: Vec<ModuleRegistration>,
}

#[derive(Debug, Clone, Serialize)]
struct ModuleSummary {
    name: String,
    key: &'static str,
    title: &'static str,
    version: &'static str,
}

/// Install the default modules and build the full HTTP router (used by `main.rs`).
pub fn build_app(config: &AppConfig) -> Result<App, StartupError> {
    build_app_with(config, registry())
}

/// Install `registry`'s modules and build the full HTTP router.
pub fn build_app_with(config: &AppConfig, registry: ModuleRegistry) -> Result<App, StartupError> {
    let bus = Arc::new(InMemoryMessageBus::new());

    let mut services = ServiceCollection::new();
    let publisher: Arc<dyn MessagePublisher> = bus.clone();
    services.insert(publisher);

    let modules = registry.install(config, &mut services)?;

    let summaries: Vec<ModuleSummary> = modules
        .iter()
        .map(|registration| {
            let info = registration.info();
            ModuleSummary {
                name: registration.name().to_string(),
                key: info.key,
                title: info.title,
                version: info.version,
            }
        })
        .collect();

    let (services, module_routes) = services.into_parts();

    let router = Router::new()
        .route("/health", get(health))
        .route("/alive", get(alive))
        .route("/modules", get(list_modules))
        .layer(Extension(Arc::new(summaries)))
        .merge(module_routes);

    tracing::info!(modules = modules.len(), services = services.len(), "host assembled");

    Ok(App {
        router,
        bus,
        services,
        modules,
    })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn alive() -> StatusCode {
    StatusCode::OK
}

async fn list_modules(Extension(modules): Extension<Arc<Vec<ModuleSummary>>>) -> impl IntoResponse {
    Json(serde_json::json!({ "modules": modules.as_ref() }))
}
