//! Confidence-weighted vote across a set of identifier references, used to
//! attribute a downstream outcome (an event, a reward, a conversion) to the
//! most likely owning entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::normalize::normalize;
use crate::store::EntityStore;

pub const STRATEGY: &str = "confidence-weighted-reference-v1";

/// A single `(identifier_type, value)` reference to attribute against.
#[derive(Debug, Clone)]
pub struct Reference {
	pub identifier_type: String,
	pub value: String,
}

impl Reference {
	pub fn new(identifier_type: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			identifier_type: identifier_type.into(),
			value: value.into(),
		}
	}
}

/// Build a reference list from a type -> value map, sorted by identifier
/// type for deterministic iteration order. Entries whose value is empty or
/// whitespace-only are dropped before they ever reach `attribute_outcome`,
/// so an unfilled field doesn't dilute the confidence denominator.
pub fn references_from_map(map: &BTreeMap<String, String>) -> Vec<Reference> {
	map.iter()
		.filter(|(_, v)| !v.trim().is_empty())
		.map(|(k, v)| Reference::new(k.clone(), v.clone()))
		.collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedReference {
	pub identifier_type: String,
	pub value: String,
	pub normalized_value: String,
	pub matched_entity_id: Option<String>,
	pub reference_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeAttribution {
	pub entity_id: Option<String>,
	pub confidence: f64,
	pub matched_references: Vec<MatchedReference>,
	pub strategy: &'static str,
}

pub fn attribute_outcome(
	store: &dyn EntityStore,
	references: &[Reference],
) -> EngineResult<OutcomeAttribution> {
	let mut matched_references = Vec::with_capacity(references.len());
	let mut score: BTreeMap<String, f64> = BTreeMap::new();
	let mut hits: BTreeMap<String, usize> = BTreeMap::new();

	for reference in references {
		let (normalized_value, matched_entity_id, reference_confidence) =
			if reference.identifier_type == "entity_id" {
				match store.get_entity(&reference.value)? {
					Some(_) => {
						let canonical = store.canonicalize(&reference.value)?;
						(reference.value.clone(), Some(canonical), 0.99)
					}
					None => (reference.value.clone(), None, 0.0),
				}
			} else {
				let nval = normalize(&reference.identifier_type, &reference.value);
				match store.find_alias(&reference.identifier_type, &nval)? {
					Some(alias) => {
						let canonical = store.canonicalize(&alias.entity_id)?;
						(nval, Some(canonical), alias.confidence)
					}
					None => (nval, None, 0.0),
				}
			};

		if let Some(entity_id) = &matched_entity_id {
			*score.entry(entity_id.clone()).or_insert(0.0) += reference_confidence;
			*hits.entry(entity_id.clone()).or_insert(0) += 1;
		}

		matched_references.push(MatchedReference {
			identifier_type: reference.identifier_type.clone(),
			value: reference.value.clone(),
			normalized_value,
			matched_entity_id,
			reference_confidence,
		});
	}

	if score.is_empty() {
		return Ok(OutcomeAttribution {
			entity_id: None,
			confidence: 0.0,
			matched_references,
			strategy: STRATEGY,
		});
	}

	let best = score
		.iter()
		.max_by(|a, b| {
			a.1.partial_cmp(b.1)
				.unwrap()
				.then_with(|| hits[a.0].cmp(&hits[b.0]))
				.then_with(|| b.0.cmp(a.0))
		})
		.map(|(id, s)| (id.clone(), *s))
		.unwrap();

	let total_references = references.len().max(1) as f64;
	let normalized_confidence = ((best.1 / total_references) * 1_000_000.0).round() / 1_000_000.0;
	let normalized_confidence = normalized_confidence.min(1.0);

	Ok(OutcomeAttribution {
		entity_id: Some(best.0),
		confidence: normalized_confidence,
		matched_references,
		strategy: STRATEGY,
	})
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use crate::config::Settings;
	use crate::model::ResolveContext;
	use crate::resolver::Resolver;
	use crate::store::memory::InMemoryEntityStore;
	use std::sync::Arc;

	#[test]
	fn s5_attribution_prefers_higher_confidence_entity() {
		let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
		let resolver = Resolver::new(store.clone(), Settings::default());

		let high = resolver
			.resolve(
				"email",
				"high@example.com",
				ResolveContext::new().with_confidence(0.95),
			)
			.unwrap();
		let low = resolver
			.resolve(
				"canonical_url",
				"https://low.example.com/profile",
				ResolveContext::new().with_confidence(0.60),
			)
			.unwrap();
		assert_ne!(high.entity_id, low.entity_id);

		let refs = vec![
			Reference::new("email", "HIGH@example.com"),
			Reference::new("canonical_url", "https://low.example.com/profile/"),
		];
		let attribution = attribute_outcome(store.as_ref(), &refs).unwrap();
		assert_eq!(attribution.entity_id.as_deref(), Some(high.entity_id.as_str()));
		assert_eq!(attribution.confidence, 0.475);
	}

	#[test]
	fn attribution_bound_is_zero_when_nothing_matches() {
		let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
		let refs = vec![Reference::new("email", "nobody@example.com")];
		let attribution = attribute_outcome(store.as_ref(), &refs).unwrap();
		assert!(attribution.entity_id.is_none());
		assert_eq!(attribution.confidence, 0.0);
	}

	#[test]
	fn entity_id_reference_resolves_directly() {
		let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
		let resolver = Resolver::new(store.clone(), Settings::default());
		let res = resolver
			.resolve("email", "a@example.com", ResolveContext::new())
			.unwrap();
		let refs = vec![Reference::new("entity_id", res.entity_id.clone())];
		let attribution = attribute_outcome(store.as_ref(), &refs).unwrap();
		assert_eq!(attribution.entity_id.as_deref(), Some(res.entity_id.as_str()));
	}

	#[test]
	fn references_from_map_drops_blank_values() {
		let mut map = BTreeMap::new();
		map.insert("email".to_string(), "a@example.com".to_string());
		map.insert("player_wallet".to_string(), "   ".to_string());
		map.insert("creator_wallet".to_string(), "".to_string());

		let refs = references_from_map(&map);
		assert_eq!(refs.len(), 1);
		assert_eq!(refs[0].identifier_type, "email");
	}
}
