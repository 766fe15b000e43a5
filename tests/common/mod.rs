use std::sync::Arc;

use entity_resolution::config::Settings;
use entity_resolution::store::EntityStore;
use entity_resolution::{InMemoryEntityStore, Resolver};

/// Build a resolver over a fresh in-memory store with default settings.
pub fn fresh_resolver() -> Resolver {
	let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
	Resolver::new(store, Settings::default())
}
