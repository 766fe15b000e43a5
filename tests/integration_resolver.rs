mod common;

#[cfg(feature = "integration-tests")]
mod integration_tests {
	use crate::common::fresh_resolver;
	use entity_resolution::model::ResolveContext;

	#[test]
	fn resolve_then_add_alias_then_merge_converges_aliases() {
		let resolver = fresh_resolver();

		let a = resolver
			.resolve("email", "alice@example.com", ResolveContext::new())
			.unwrap();
		let b = resolver
			.resolve("twitter_handle", "bob", ResolveContext::new())
			.unwrap();
		assert_ne!(a.entity_id, b.entity_id);

		resolver
			.merge_entities(&b.entity_id, &a.entity_id, "same person", "test")
			.unwrap();

		let resolved_bob = resolver
			.resolve("twitter_handle", "bob", ResolveContext::new())
			.unwrap();
		assert_eq!(resolved_bob.entity_id, a.entity_id);

		let history = resolver.store().list_merge_history().unwrap();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].merge_id, 1);
	}

	#[test]
	fn events_drain_in_fixed_order_for_auto_merge_resolve() {
		let resolver = fresh_resolver();
		let a = resolver
			.resolve("email", "shared@example.com", ResolveContext::new())
			.unwrap();
		resolver.drain_events();

		resolver
			.resolve("twitter_handle", "carol", ResolveContext::new())
			.unwrap();
		resolver.drain_events();

		resolver
			.add_alias(&a.entity_id, "twitter_handle", "also_carol", 0.9, "test", None)
			.unwrap();
		let events = resolver.drain_events();
		assert_eq!(events.len(), 1);
	}

	#[test]
	fn invalid_input_rejects_empty_value() {
		let resolver = fresh_resolver();
		let err = resolver
			.resolve("email", "   ", ResolveContext::new())
			.unwrap_err();
		assert!(matches!(err, entity_resolution::EngineError::InvalidInput(_)));
	}
}
