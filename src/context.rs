//! Deterministic read models built from store snapshots. Pure functions: no
//! mutation, no randomness, same inputs always produce the same output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::model::{Alias, Identifier};
use crate::store::EntityStore;

fn round6(value: f64) -> f64 {
	(value * 1_000_000.0).round() / 1_000_000.0
}

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
	let count = values.clone().count();
	if count == 0 {
		return 0.0;
	}
	values.sum::<f64>() / count as f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierTypeRollup {
	pub count: usize,
	pub avg_confidence: f64,
	pub max_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceSummary {
	pub identifier_avg: f64,
	pub alias_avg: f64,
	pub unique_source_count: usize,
	pub source_diversity: f64,
	pub overall: f64,
	pub by_identifier_type: BTreeMap<String, IdentifierTypeRollup>,
	pub evidence_count: usize,
}

/// Build a confidence summary over an entity's aliases, identifier records,
/// and the evidence slice a caller wants the provenance rollup computed
/// over (typically the entity's recent evidence window).
pub fn build_confidence_summary(
	aliases: &[Alias],
	identifiers: &[Identifier],
	evidence: &[Identifier],
) -> ConfidenceSummary {
	let identifier_avg = round6(mean(identifiers.iter().map(|i| i.confidence)));
	let alias_avg = round6(mean(aliases.iter().map(|a| a.confidence)));

	let unique_source_count = evidence
		.iter()
		.filter_map(|i| i.provenance.as_deref())
		.filter(|p| !p.is_empty())
		.collect::<std::collections::BTreeSet<_>>()
		.len();
	let source_diversity = round6((unique_source_count as f64 / 3.0).min(1.0));

	let overall = round6(
		(0.65 * identifier_avg + 0.25 * alias_avg + 0.10 * source_diversity).min(1.0),
	);

	let mut by_identifier_type: BTreeMap<String, Vec<f64>> = BTreeMap::new();
	for identifier in identifiers {
		by_identifier_type
			.entry(identifier.identifier_type.clone())
			.or_default()
			.push(identifier.confidence);
	}
	let by_identifier_type = by_identifier_type
		.into_iter()
		.map(|(identifier_type, confidences)| {
			let count = confidences.len();
			let avg_confidence = round6(mean(confidences.iter().copied()));
			let max_confidence = round6(confidences.iter().cloned().fold(0.0, f64::max));
			(
				identifier_type,
				IdentifierTypeRollup {
					count,
					avg_confidence,
					max_confidence,
				},
			)
		})
		.collect();

	ConfidenceSummary {
		identifier_avg,
		alias_avg,
		unique_source_count,
		source_diversity,
		overall,
		by_identifier_type,
		evidence_count: evidence.len(),
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityContext {
	pub entity_id: String,
	pub aliases: Vec<Alias>,
	pub identifiers: Vec<Identifier>,
	pub recent_evidence: Vec<Identifier>,
	pub confidence: ConfidenceSummary,
}

/// Build the full entity context for the entity canonicalized from
/// `entity_id`, with `recent_evidence` capped to the top `limit` identifiers
/// ordered by `(last_seen_at desc, identifier_type, normalized_value)`.
pub fn build_entity_context(
	store: &dyn EntityStore,
	entity_id: &str,
	limit: usize,
) -> EngineResult<EntityContext> {
	let canonical = store.canonicalize(entity_id)?;
	let aliases = store.list_aliases_for_entity(&canonical)?;
	let identifiers = store.list_identifier_records_for_entity(&canonical)?;

	let mut recent_evidence = identifiers.clone();
	recent_evidence.sort_by(|a, b| {
		b.last_seen_at
			.cmp(&a.last_seen_at)
			.then_with(|| a.identifier_type.cmp(&b.identifier_type))
			.then_with(|| a.normalized_value.cmp(&b.normalized_value))
	});
	recent_evidence.truncate(limit);

	let confidence = build_confidence_summary(&aliases, &identifiers, &recent_evidence);

	Ok(EntityContext {
		entity_id: canonical,
		aliases,
		identifiers,
		recent_evidence,
		confidence,
	})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStageHint {
	Engaged,
	Warm,
	Cold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionHistorySummary {
	pub evidence_count: usize,
	pub distinct_sources: usize,
	pub sources: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Continuity {
	pub canonical_entity_id: String,
	pub alias_count: usize,
	pub identifier_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationContext {
	pub entity_id: String,
	pub identity_confidence: f64,
	pub relationship_stage_hint: RelationshipStageHint,
	pub interaction_history_summary: InteractionHistorySummary,
	pub preferred_channel_hint: String,
	pub continuity: Continuity,
}

fn channel_weight(identifier_type: &str) -> i64 {
	match identifier_type {
		"email" => 5,
		"linkedin_handle" => 4,
		"twitter_handle" => 3,
		"github_handle" => 3,
		"canonical_url" => 2,
		"domain" => 1,
		"name" => 0,
		_ => 1,
	}
}

pub fn build_recommendation_context(
	store: &dyn EntityStore,
	entity_id: &str,
) -> EngineResult<RecommendationContext> {
	let canonical = store.canonicalize(entity_id)?;
	let aliases = store.list_aliases_for_entity(&canonical)?;
	let identifiers = store.list_identifier_records_for_entity(&canonical)?;

	let now = chrono::Utc::now();
	let activity_recency_days = identifiers
		.iter()
		.map(|i| i.last_seen_at)
		.max()
		.map(|latest| round6((now - latest).num_seconds() as f64 / 86_400.0))
		.unwrap_or(f64::INFINITY);

	let mut sources: BTreeMap<String, usize> = BTreeMap::new();
	for identifier in &identifiers {
		if let Some(provenance) = identifier.provenance.as_deref().filter(|p| !p.is_empty()) {
			*sources.entry(provenance.to_string()).or_insert(0) += 1;
		}
	}
	let interaction_history_summary = InteractionHistorySummary {
		evidence_count: identifiers.len(),
		distinct_sources: sources.len(),
		sources,
	};

	let mut weight_by_type: BTreeMap<String, i64> = BTreeMap::new();
	for identifier in &identifiers {
		*weight_by_type
			.entry(identifier.identifier_type.clone())
			.or_insert(0) += channel_weight(&identifier.identifier_type);
	}
	let preferred_channel_hint = weight_by_type
		.into_iter()
		.max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
		.map(|(identifier_type, _)| identifier_type)
		.unwrap_or_else(|| "unknown".to_string());

	let confidence = build_confidence_summary(&aliases, &identifiers, &identifiers);
	let identity_confidence = confidence.overall;

	let evidence_count = identifiers.len();
	let relationship_stage_hint = if evidence_count >= 6 && activity_recency_days <= 30.0 && identity_confidence >= 0.8 {
		RelationshipStageHint::Engaged
	} else if evidence_count >= 3 && activity_recency_days <= 90.0 && identity_confidence >= 0.65 {
		RelationshipStageHint::Warm
	} else {
		RelationshipStageHint::Cold
	};

	Ok(RecommendationContext {
		entity_id: canonical.clone(),
		identity_confidence,
		relationship_stage_hint,
		interaction_history_summary,
		preferred_channel_hint,
		continuity: Continuity {
			canonical_entity_id: canonical,
			alias_count: aliases.len(),
			identifier_count: identifiers.len(),
		},
	})
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use crate::resolver::Resolver;
	use crate::config::Settings;
	use crate::model::ResolveContext;
	use crate::store::memory::InMemoryEntityStore;
	use std::sync::Arc;

	#[test]
	fn confidence_summary_weights_identifiers_over_aliases_over_diversity() {
		let identifiers = vec![Identifier {
			identifier_type: "email".into(),
			value: "a@example.com".into(),
			normalized_value: "a@example.com".into(),
			confidence: 1.0,
			first_seen_at: chrono::Utc::now(),
			last_seen_at: chrono::Utc::now(),
			provenance: Some("crm".into()),
		}];
		let aliases = vec![Alias {
			identifier_type: "email".into(),
			normalized_value: "a@example.com".into(),
			entity_id: "ent_x".into(),
			confidence: 1.0,
			created_at: chrono::Utc::now(),
			caused_by: "test".into(),
			provenance: Some("crm".into()),
		}];
		let summary = build_confidence_summary(&aliases, &identifiers, &identifiers);
		assert_eq!(summary.unique_source_count, 1);
		assert!(summary.overall > 0.0 && summary.overall <= 1.0);
	}

	#[test]
	fn recommendation_context_prefers_email_channel() {
		let store: Arc<dyn crate::store::EntityStore> = Arc::new(InMemoryEntityStore::new());
		let resolver = Resolver::new(store.clone(), Settings::default());
		let res = resolver
			.resolve("email", "person@example.com", ResolveContext::new())
			.unwrap();
		resolver
			.add_alias(&res.entity_id, "twitter_handle", "person", 0.9, "test", None)
			.unwrap();

		let ctx = build_recommendation_context(store.as_ref(), &res.entity_id).unwrap();
		assert_eq!(ctx.preferred_channel_hint, "email");
		assert_eq!(ctx.continuity.identifier_count, 2);
	}

	#[test]
	fn entity_context_caps_recent_evidence_at_limit() {
		let store: Arc<dyn crate::store::EntityStore> = Arc::new(InMemoryEntityStore::new());
		let resolver = Resolver::new(store.clone(), Settings::default());
		let res = resolver
			.resolve("email", "person@example.com", ResolveContext::new())
			.unwrap();
		for i in 0..5 {
			resolver
				.add_alias(
					&res.entity_id,
					"handle",
					&format!("alias{i}"),
					0.8,
					"test",
					None,
				)
				.unwrap();
		}
		let ctx = build_entity_context(store.as_ref(), &res.entity_id, 3).unwrap();
		assert_eq!(ctx.recent_evidence.len(), 3);
		assert_eq!(ctx.identifiers.len(), 6);
	}
}
