pub mod attribution;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod events;
pub mod model;
pub mod normalize;
pub mod observability;
pub mod resolver;
pub mod store;

pub use error::{EngineError, EngineResult};
pub use events::EmittedEvent;
pub use model::{Entity, EntityResolution, EntityType, ResolveContext};
pub use resolver::Resolver;
pub use store::memory::InMemoryEntityStore;
pub use store::EntityStore;

use std::sync::Arc;

/// Build a `Resolver` backed by a fresh in-memory store, wired with the
/// given settings and the observability metrics registry.
pub fn new_engine(settings: config::Settings, metrics: Arc<observability::MetricsRegistry>) -> Resolver {
	let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
	Resolver::new(store, settings).with_metrics(metrics)
}
