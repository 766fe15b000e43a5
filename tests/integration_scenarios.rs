//! Literal scenarios S1-S6 from the engine's testable-properties design,
//! run end to end against a fresh in-memory store.

mod common;

#[cfg(feature = "integration-tests")]
mod integration_tests {
	use crate::common::fresh_resolver;
	use entity_resolution::model::ResolveContext;

	#[test]
	fn s1_handle_normalization() {
		let r = fresh_resolver();
		let first = r.resolve("twitter_handle", "@same", ResolveContext::new()).unwrap();
		let second = r.resolve("twitter_handle", "same", ResolveContext::new()).unwrap();
		assert_eq!(first.entity_id, second.entity_id);
		assert!(!second.created_new_entity);
	}

	#[test]
	fn s2_cross_platform_url_coalesce() {
		let r = fresh_resolver();
		let a = r
			.resolve("canonical_url", "https://example.com/u/alice/", ResolveContext::new())
			.unwrap();
		let b = r
			.resolve("canonical_url", "http://www.example.com/u/alice", ResolveContext::new())
			.unwrap();
		assert_eq!(a.entity_id, b.entity_id);
	}

	#[test]
	fn s3_auto_merge_on_shared_email() {
		let r = fresh_resolver();
		let a = r.resolve("twitter_handle", "owner_a", ResolveContext::new()).unwrap();
		let b = r.resolve("twitter_handle", "owner_b", ResolveContext::new()).unwrap();

		r.add_alias(&a.entity_id, "email", "shared@example.com", 0.9, "test", None)
			.unwrap();
		let events = r
			.add_alias(&b.entity_id, "email", "shared@example.com", 0.9, "test", None)
			.unwrap();
		assert_eq!(events.len(), 1);

		let ra = r.resolve("twitter_handle", "owner_a", ResolveContext::new()).unwrap();
		let rb = r.resolve("twitter_handle", "owner_b", ResolveContext::new()).unwrap();
		assert_eq!(ra.entity_id, rb.entity_id);
	}

	#[test]
	fn s4_confidence_bump() {
		let r = fresh_resolver();
		let first = r
			.resolve("email", "test@example.com", ResolveContext::new().with_confidence(0.7))
			.unwrap();
		let second = r
			.resolve("email", "test@example.com", ResolveContext::new().with_confidence(0.4))
			.unwrap();
		assert_eq!(first.entity_id, second.entity_id);
		assert!(second.confidence >= 0.7);
	}

	#[test]
	fn s6_undo_merge() {
		let r = fresh_resolver();
		let a = r.resolve("twitter_handle", "undo_a", ResolveContext::new()).unwrap();
		let b = r.resolve("twitter_handle", "undo_b", ResolveContext::new()).unwrap();

		r.merge_entities(&a.entity_id, &b.entity_id, "merge", "test").unwrap();
		let resolved_a = r.resolve("twitter_handle", "undo_a", ResolveContext::new()).unwrap();
		assert_eq!(resolved_a.entity_id, b.entity_id);

		r.undo_merge(&a.entity_id, &b.entity_id, "test").unwrap();
		let ra = r.resolve("twitter_handle", "undo_a", ResolveContext::new()).unwrap();
		let rb = r.resolve("twitter_handle", "undo_b", ResolveContext::new()).unwrap();
		assert_eq!(ra.entity_id, a.entity_id);
		assert_eq!(rb.entity_id, a.entity_id);
	}
}
