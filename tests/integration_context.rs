mod common;

#[cfg(feature = "integration-tests")]
mod integration_tests {
	use crate::common::fresh_resolver;
	use entity_resolution::context::build_recommendation_context;
	use entity_resolution::model::ResolveContext;

	#[test]
	fn recommendation_context_reports_continuity_counts() {
		let r = fresh_resolver();
		let res = r
			.resolve("email", "person@example.com", ResolveContext::new())
			.unwrap();
		r.add_alias(&res.entity_id, "twitter_handle", "person", 0.9, "test", None)
			.unwrap();
		r.add_alias(&res.entity_id, "github_handle", "person", 0.9, "test", None)
			.unwrap();

		let ctx = build_recommendation_context(r.store().as_ref(), &res.entity_id).unwrap();
		assert_eq!(ctx.continuity.identifier_count, 3);
		assert_eq!(ctx.continuity.alias_count, 3);
		assert_eq!(ctx.preferred_channel_hint, "email");
	}

	#[test]
	fn export_snapshot_is_sorted_and_round_trips() {
		let r = fresh_resolver();
		r.resolve("email", "b@example.com", ResolveContext::new()).unwrap();
		r.resolve("email", "a@example.com", ResolveContext::new()).unwrap();

		let snapshot = r.store().export_snapshot().unwrap();
		let values: Vec<&str> = snapshot
			.aliases
			.iter()
			.map(|a| a.normalized_value.as_str())
			.collect();
		let mut sorted = values.clone();
		sorted.sort();
		assert_eq!(values, sorted);
	}
}
