//! Registration surface handed to module install phases.
//!
//! Services are keyed by their Rust type; register trait objects by wrapping
//! them in a concrete type (e.g. `Arc<dyn MessagePublisher>`) or a newtype.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use axum::Router;

type ServiceMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

fn lookup<T>(map: &ServiceMap) -> Option<Arc<T>>
where
    T: Send + Sync + 'static,
{
    map.get(&TypeId::of::<T>())
        .cloned()
        .and_then(|service| service.downcast::<T>().ok())
}

/// Mutable service and route registrations, filled during installation.
#[derive(Default)]
pub struct ServiceCollection {
    services: ServiceMap,
    routes: Vec<Router>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service`, replacing (and returning) a previous one of the same type.
    pub fn insert<T>(&mut self, service: T) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.services
            .insert(TypeId::of::<T>(), Arc::new(service))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        lookup(&self.services)
    }

    /// Like [`get`](Self::get), but a missing service is an installation error.
    pub fn require<T>(&self) -> anyhow::Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>()
            .ok_or_else(|| anyhow!("required service `{}` is not registered", type_name::<T>()))
    }

    pub fn contains<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Contribute HTTP routes; the host merges them after installation.
    pub fn add_routes(&mut self, routes: Router) {
        self.routes.push(routes);
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Freeze the registrations: read-only services plus every contributed route, merged.
    pub fn into_parts(self) -> (Services, Router) {
        let router = self
            .routes
            .into_iter()
            .fold(Router::new(), |merged, routes| merged.merge(routes));

        (
            Services {
                services: Arc::new(self.services),
            },
            router,
        )
    }
}

/// Read-only services after startup.
#[derive(Clone, Default)]
pub struct Services {
    services: Arc<ServiceMap>,
}

impl Services {
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        lookup(&self.services)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[derive(Debug, PartialEq)]
    struct Greeting(&'static str);

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct Fixed;

    impl Clock for Fixed {
        fn now(&self) -> u64 {
            42
        }
    }

    #[test]
    fn insert_get_and_replace() {
        let mut services = ServiceCollection::new();
        assert!(services.get::<Greeting>().is_none());

        assert!(services.insert(Greeting("hi")).is_none());
        assert_eq!(*services.get::<Greeting>().unwrap(), Greeting("hi"));

        let previous = services.insert(Greeting("hello")).unwrap();
        assert_eq!(*previous, Greeting("hi"));
        assert_eq!(*services.get::<Greeting>().unwrap(), Greeting("hello"));
    }

    #[test]
    fn trait_objects_are_registered_behind_arc() {
        let mut services = ServiceCollection::new();
        let clock: Arc<dyn Clock> = Arc::new(Fixed);
        services.insert(clock);

        let resolved = services.require::<Arc<dyn Clock>>().unwrap();
        assert_eq!(resolved.now(), 42);
    }

    #[test]
    fn require_names_the_missing_type() {
        let services = ServiceCollection::new();
        let err = services.require::<Greeting>().unwrap_err();
        assert!(err.to_string().contains("Greeting"));
        assert!(!services.contains::<Greeting>());
    }

    #[test]
    fn into_parts_keeps_services_and_routes() {
        let mut services = ServiceCollection::new();
        services.insert(Greeting("hi"));
        services.add_routes(Router::new().route("/a", get(|| async { "a" })));
        services.add_routes(Router::new().route("/b", get(|| async { "b" })));
        assert_eq!(services.route_count(), 2);

        let (frozen, _router) = services.into_parts();
        assert_eq!(frozen.len(), 1);
        assert_eq!(*frozen.get::<Greeting>().unwrap(), Greeting("hi"));
    }
}
