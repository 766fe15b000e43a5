/// Example demonstrating the entity resolution engine end to end.
///
/// Walks through handle normalization, cross-platform URL coalescing,
/// auto-merge on a shared email, confidence bumps, attribution, and
/// undoing a merge.
///
/// Run with: cargo run --example resolution_demo
use std::sync::Arc;

use entity_resolution::attribution::{attribute_outcome, Reference};
use entity_resolution::config::Settings;
use entity_resolution::context::build_recommendation_context;
use entity_resolution::model::ResolveContext;
use entity_resolution::store::EntityStore;
use entity_resolution::{InMemoryEntityStore, Resolver};

fn main() {
	println!("=== Entity Resolution Demo ===\n");

	println!("Example 1: Handle Normalization");
	println!("--------------------------------");
	demo_handle_normalization();
	println!();

	println!("Example 2: Cross-Platform URL Coalescing");
	println!("-----------------------------------------");
	demo_url_coalescing();
	println!();

	println!("Example 3: Auto-Merge on Shared Email");
	println!("--------------------------------------");
	demo_auto_merge();
	println!();

	println!("Example 4: Confidence-Weighted Attribution");
	println!("-------------------------------------------");
	demo_attribution();
	println!();

	println!("Example 5: Merge and Undo");
	println!("-------------------------");
	demo_undo_merge();
	println!();

	println!("=== Demo Complete ===");
}

fn fresh_resolver() -> Resolver {
	let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
	Resolver::new(store, Settings::default())
}

fn demo_handle_normalization() {
	let resolver = fresh_resolver();

	let first = resolver
		.resolve("twitter_handle", "@same_person", ResolveContext::new())
		.unwrap();
	println!("resolve(twitter_handle, @same_person) -> {} (new: {})", first.entity_id, first.created_new_entity);

	let second = resolver
		.resolve("twitter_handle", "Same_Person", ResolveContext::new())
		.unwrap();
	println!("resolve(twitter_handle, Same_Person)  -> {} (new: {})", second.entity_id, second.created_new_entity);

	assert_eq!(first.entity_id, second.entity_id);
	println!("Both references normalize to the same entity.");
}

fn demo_url_coalescing() {
	let resolver = fresh_resolver();

	let a = resolver
		.resolve("canonical_url", "https://example.com/u/alice/", ResolveContext::new())
		.unwrap();
	println!("resolve(canonical_url, https://example.com/u/alice/)     -> {}", a.entity_id);

	let b = resolver
		.resolve("canonical_url", "http://www.example.com/u/alice", ResolveContext::new())
		.unwrap();
	println!("resolve(canonical_url, http://www.example.com/u/alice)   -> {}", b.entity_id);

	assert_eq!(a.entity_id, b.entity_id);
	println!("www-prefix and scheme/trailing-slash differences coalesce to one entity.");
}

fn demo_auto_merge() {
	let resolver = fresh_resolver();

	let owner_a = resolver.resolve("twitter_handle", "owner_a", ResolveContext::new()).unwrap();
	let owner_b = resolver.resolve("twitter_handle", "owner_b", ResolveContext::new()).unwrap();
	println!("owner_a -> {}", owner_a.entity_id);
	println!("owner_b -> {}", owner_b.entity_id);

	resolver
		.add_alias(&owner_a.entity_id, "email", "shared@example.com", 0.9, "crm-import", None)
		.unwrap();
	let events = resolver
		.add_alias(&owner_b.entity_id, "email", "shared@example.com", 0.9, "crm-import", None)
		.unwrap();
	println!("attaching shared@example.com to both owners triggered {} event(s)", events.len());

	let resolved_a = resolver.resolve("twitter_handle", "owner_a", ResolveContext::new()).unwrap();
	let resolved_b = resolver.resolve("twitter_handle", "owner_b", ResolveContext::new()).unwrap();
	assert_eq!(resolved_a.entity_id, resolved_b.entity_id);
	println!("owner_a and owner_b now resolve to the same entity: {}", resolved_a.entity_id);
}

fn demo_attribution() {
	let resolver = fresh_resolver();

	let high = resolver
		.resolve("email", "high@example.com", ResolveContext::new().with_confidence(0.95))
		.unwrap();
	resolver
		.resolve(
			"canonical_url",
			"https://low.example.com/profile",
			ResolveContext::new().with_confidence(0.60),
		)
		.unwrap();

	let refs = vec![
		Reference::new("email", "HIGH@example.com"),
		Reference::new("canonical_url", "https://low.example.com/profile/"),
	];
	let attribution = attribute_outcome(resolver.store().as_ref(), &refs).unwrap();
	println!(
		"attribute_outcome(...) -> entity {:?}, confidence {:.3}, strategy {}",
		attribution.entity_id, attribution.confidence, attribution.strategy
	);
	assert_eq!(attribution.entity_id.as_deref(), Some(high.entity_id.as_str()));

	let context = build_recommendation_context(resolver.store().as_ref(), &high.entity_id).unwrap();
	println!(
		"recommendation context: preferred_channel_hint={}, stage={:?}",
		context.preferred_channel_hint, context.relationship_stage_hint
	);
}

fn demo_undo_merge() {
	let resolver = fresh_resolver();

	let a = resolver.resolve("twitter_handle", "undo_a", ResolveContext::new()).unwrap();
	let b = resolver.resolve("twitter_handle", "undo_b", ResolveContext::new()).unwrap();
	println!("undo_a -> {}, undo_b -> {}", a.entity_id, b.entity_id);

	resolver.merge_entities(&a.entity_id, &b.entity_id, "same person", "analyst").unwrap();
	let resolved_a = resolver.resolve("twitter_handle", "undo_a", ResolveContext::new()).unwrap();
	println!("after merge(a -> b), undo_a resolves to {}", resolved_a.entity_id);
	assert_eq!(resolved_a.entity_id, b.entity_id);

	resolver.undo_merge(&a.entity_id, &b.entity_id, "analyst").unwrap();
	let ra = resolver.resolve("twitter_handle", "undo_a", ResolveContext::new()).unwrap();
	let rb = resolver.resolve("twitter_handle", "undo_b", ResolveContext::new()).unwrap();
	println!("after undo_merge, undo_a resolves to {}, undo_b resolves to {}", ra.entity_id, rb.entity_id);
	assert_eq!(ra.entity_id, rb.entity_id);

	let history = resolver.store().list_merge_history().unwrap();
	println!("merge history now has {} record(s) (append-only ledger)", history.len());
}
