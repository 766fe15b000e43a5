mod common;

#[cfg(feature = "integration-tests")]
mod integration_tests {
	use crate::common::fresh_resolver;
	use entity_resolution::attribution::{attribute_outcome, Reference};
	use entity_resolution::model::ResolveContext;

	#[test]
	fn s5_attribution_tie_break_prefers_higher_score() {
		let r = fresh_resolver();
		let high = r
			.resolve("email", "high@example.com", ResolveContext::new().with_confidence(0.95))
			.unwrap();
		r.resolve(
			"canonical_url",
			"https://low.example.com/profile",
			ResolveContext::new().with_confidence(0.60),
		)
		.unwrap();

		let refs = vec![
			Reference::new("email", "HIGH@example.com"),
			Reference::new("canonical_url", "https://low.example.com/profile/"),
		];
		let attribution = attribute_outcome(r.store().as_ref(), &refs).unwrap();
		assert_eq!(attribution.entity_id.as_deref(), Some(high.entity_id.as_str()));
	}

	#[test]
	fn attribution_confidence_is_bounded_in_unit_interval() {
		let r = fresh_resolver();
		r.resolve("email", "a@example.com", ResolveContext::new()).unwrap();
		let refs = vec![Reference::new("email", "a@example.com")];
		let attribution = attribute_outcome(r.store().as_ref(), &refs).unwrap();
		assert!(attribution.confidence >= 0.0 && attribution.confidence <= 1.0);
	}
}
