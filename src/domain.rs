//! Domain helpers layered on top of the core primitives for recurring
//! caller shapes: wallet references, token/project/creator linking, and
//! season-reward attribution. None of these introduce new store state; they
//! just fix the identifier types, entity types, and confidences a given
//! caller shape always uses.

use std::collections::BTreeMap;

use crate::attribution::{attribute_outcome, references_from_map, OutcomeAttribution};
use crate::context::{build_confidence_summary, ConfidenceSummary};
use crate::error::EngineResult;
use crate::model::{EntityResolution, EntityType, MergeRecord, ResolveContext};
use crate::resolver::Resolver;

fn wallet_reference(chain: &str, wallet: &str) -> String {
	format!("{}:{}", chain.to_lowercase(), crate::normalize::normalize("wallet", wallet))
}

pub fn resolve_player_wallet(
	resolver: &Resolver,
	wallet: &str,
	chain: &str,
	caused_by: &str,
) -> EngineResult<EntityResolution> {
	resolver.resolve(
		"player_wallet",
		&wallet_reference(chain, wallet),
		ResolveContext::new()
			.with_confidence(0.97)
			.with_entity_type(EntityType::Person)
			.with_caused_by(caused_by)
			.with_provenance("season-player-wallet"),
	)
}

pub fn resolve_founder_wallet(
	resolver: &Resolver,
	wallet: &str,
	chain: &str,
	caused_by: &str,
) -> EngineResult<EntityResolution> {
	resolver.resolve(
		"founder_wallet",
		&wallet_reference(chain, wallet),
		ResolveContext::new()
			.with_confidence(0.98)
			.with_entity_type(EntityType::Person)
			.with_caused_by(caused_by)
			.with_provenance("season-founder-wallet"),
	)
}

pub fn resolve_token_entity(
	resolver: &Resolver,
	chain: &str,
	contract_address: &str,
	caused_by: &str,
) -> EngineResult<EntityResolution> {
	resolver.resolve(
		"token_contract",
		&wallet_reference(chain, contract_address),
		ResolveContext::new()
			.with_confidence(0.99)
			.with_entity_type(EntityType::Project)
			.with_caused_by(caused_by)
			.with_provenance("token-contract"),
	)
}

pub struct TokenProjectCreatorLinks {
	pub token_entity_id: String,
	pub project_entity_id: String,
	pub creator_entity_id: String,
}

pub fn link_token_to_project(
	resolver: &Resolver,
	token_entity_id: &str,
	project_identifier_type: &str,
	project_identifier_value: &str,
	caused_by: &str,
) -> EngineResult<EntityResolution> {
	let project = resolver.resolve(
		project_identifier_type,
		project_identifier_value,
		ResolveContext::new()
			.with_confidence(0.92)
			.with_entity_type(EntityType::Project)
			.with_caused_by(caused_by),
	)?;

	resolver.add_alias(
		&project.entity_id,
		"token_entity_ref",
		token_entity_id,
		0.99,
		caused_by,
		Some("token-project-link".to_string()),
	)?;

	Ok(project)
}

pub fn link_creator_wallet(
	resolver: &Resolver,
	creator_wallet: &str,
	chain: &str,
	caused_by: &str,
) -> EngineResult<EntityResolution> {
	resolver.resolve(
		"creator_wallet",
		&wallet_reference(chain, creator_wallet),
		ResolveContext::new()
			.with_confidence(0.95)
			.with_entity_type(EntityType::Person)
			.with_caused_by(caused_by)
			.with_provenance("creator-wallet"),
	)
}

#[allow(clippy::too_many_arguments)]
pub fn link_token_project_creator(
	resolver: &Resolver,
	chain: &str,
	contract_address: &str,
	project_identifier_type: &str,
	project_identifier_value: &str,
	creator_wallet: &str,
	caused_by: &str,
) -> EngineResult<TokenProjectCreatorLinks> {
	let token = resolve_token_entity(resolver, chain, contract_address, caused_by)?;
	let project = link_token_to_project(
		resolver,
		&token.entity_id,
		project_identifier_type,
		project_identifier_value,
		caused_by,
	)?;
	let creator = link_creator_wallet(resolver, creator_wallet, chain, caused_by)?;

	let store = resolver.store();
	Ok(TokenProjectCreatorLinks {
		token_entity_id: store.canonicalize(&token.entity_id)?,
		project_entity_id: store.canonicalize(&project.entity_id)?,
		creator_entity_id: store.canonicalize(&creator.entity_id)?,
	})
}

/// Remap a reward-claim-shaped reference map into the generic attribution
/// reference shape and delegate to `attribute_outcome`. Wallet references
/// not already namespaced `chain:wallet` are namespaced using the claim's
/// `chain` field, when present.
pub fn attribute_season_reward(
	resolver: &Resolver,
	reward_claim: &BTreeMap<String, String>,
) -> EngineResult<OutcomeAttribution> {
	let chain = reward_claim.get("chain").cloned();
	let mut remapped: BTreeMap<String, String> = BTreeMap::new();

	for (key, value) in reward_claim {
		match key.as_str() {
			"chain" => continue,
			"entity_id" | "player_entity_id" | "founder_entity_id" => {
				remapped.insert("entity_id".to_string(), value.clone());
			}
			"player_wallet" | "founder_wallet" | "wallet_address" | "claimer_wallet" => {
				let namespaced = namespace_if_needed(value, chain.as_deref());
				remapped.insert(key.clone(), namespaced);
			}
			"email" | "canonical_url" | "name" | "twitter_handle" => {
				remapped.insert(key.clone(), value.clone());
			}
			_ => {}
		}
	}

	let references = references_from_map(&remapped);
	attribute_outcome(resolver.store().as_ref(), &references)
}

/// Remap a token-outcome-shaped reference map (`chain`/`contract_address`,
/// creator wallet, and any entity-id variants) into the generic attribution
/// shape.
pub fn attribute_token_outcome(
	resolver: &Resolver,
	references: &BTreeMap<String, String>,
) -> EngineResult<OutcomeAttribution> {
	let chain = references.get("chain").cloned();
	let mut remapped: BTreeMap<String, String> = BTreeMap::new();

	if let (Some(chain), Some(contract)) = (chain.as_deref(), references.get("contract_address")) {
		remapped.insert("token_contract".to_string(), format!("{chain}:{contract}"));
	}

	for (key, value) in references {
		match key.as_str() {
			"chain" | "contract_address" => continue,
			"creator_wallet" => {
				remapped.insert(key.clone(), namespace_if_needed(value, chain.as_deref()));
			}
			"entity_id" | "token_entity_id" | "project_entity_id" => {
				remapped.insert("entity_id".to_string(), value.clone());
			}
			"email" | "canonical_url" | "name" => {
				remapped.insert(key.clone(), value.clone());
			}
			_ => {}
		}
	}

	let refs = references_from_map(&remapped);
	attribute_outcome(resolver.store().as_ref(), &refs)
}

fn namespace_if_needed(value: &str, chain: Option<&str>) -> String {
	if value.contains(':') {
		return value.to_string();
	}
	match chain {
		Some(chain) => wallet_reference(chain, value),
		None => value.to_string(),
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LineageSnapshot {
	pub requested_entity_id: String,
	pub canonical_entity_id: String,
	pub redirect_chain: Vec<String>,
	pub merge_count: usize,
	pub merges: Vec<MergeRecord>,
}

/// Walk the redirect chain from `entity_id` (not through `canonicalize`, so
/// the path itself is surfaced) and report every merge record that touches
/// a node on that chain or feeds into the canonical entity from elsewhere.
pub fn canonical_lineage_snapshot(resolver: &Resolver, entity_id: &str) -> EngineResult<LineageSnapshot> {
	let store = resolver.store();
	store.ensure_entity(entity_id)?;

	let mut chain = vec![entity_id.to_string()];
	let mut current = entity_id.to_string();
	loop {
		match store.get_redirect_target(&current)? {
			Some(next) => {
				chain.push(next.clone());
				current = next;
			}
			None => break,
		}
	}
	let canonical_entity_id = current;

	let all_merges = store.list_merge_history()?;
	let on_chain: std::collections::BTreeSet<&str> = chain.iter().map(|s| s.as_str()).collect();
	let merges: Vec<MergeRecord> = all_merges
		.into_iter()
		.filter(|m| {
			on_chain.contains(m.from_entity_id.as_str())
				|| on_chain.contains(m.to_entity_id.as_str())
				|| m.to_entity_id == canonical_entity_id
		})
		.collect();

	Ok(LineageSnapshot {
		requested_entity_id: entity_id.to_string(),
		canonical_entity_id,
		redirect_chain: chain,
		merge_count: merges.len(),
		merges,
	})
}

/// Thin canonicalizing wrapper around the confidence-summary context
/// builder for callers that only want the flat summary, not the full
/// entity context.
pub fn player_confidence_summary(resolver: &Resolver, entity_id: &str) -> EngineResult<ConfidenceSummary> {
	let store = resolver.store();
	let canonical = store.canonicalize(entity_id)?;
	let aliases = store.list_aliases_for_entity(&canonical)?;
	let identifiers = store.list_identifier_records_for_entity(&canonical)?;
	Ok(build_confidence_summary(&aliases, &identifiers, &identifiers))
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use crate::config::Settings;
	use crate::store::memory::InMemoryEntityStore;
	use std::sync::Arc;

	fn resolver() -> Resolver {
		Resolver::new(Arc::new(InMemoryEntityStore::new()), Settings::default())
	}

	#[test]
	fn wallet_references_are_namespaced_by_chain() {
		let r = resolver();
		let res = resolve_player_wallet(&r, "0xABC", "ethereum", "test").unwrap();
		let again = resolve_player_wallet(&r, "0xabc", "ETHEREUM", "test").unwrap();
		assert_eq!(res.entity_id, again.entity_id);
	}

	#[test]
	fn link_token_project_creator_resolves_all_three() {
		let r = resolver();
		let links = link_token_project_creator(
			&r,
			"ethereum",
			"0xcontract",
			"name",
			"Example Project",
			"0xcreator",
			"test",
		)
		.unwrap();
		assert_ne!(links.token_entity_id, links.project_entity_id);
		assert_ne!(links.project_entity_id, links.creator_entity_id);
	}

	#[test]
	fn lineage_snapshot_reports_redirect_chain_and_merges() {
		let r = resolver();
		let a = r
			.resolve("twitter_handle", "lineage_a", ResolveContext::new())
			.unwrap();
		let b = r
			.resolve("twitter_handle", "lineage_b", ResolveContext::new())
			.unwrap();
		let c = r
			.resolve("twitter_handle", "lineage_c", ResolveContext::new())
			.unwrap();
		r.merge_entities(&a.entity_id, &b.entity_id, "t", "test").unwrap();
		r.merge_entities(&b.entity_id, &c.entity_id, "t", "test").unwrap();

		let snapshot = canonical_lineage_snapshot(&r, &a.entity_id).unwrap();
		assert_eq!(snapshot.canonical_entity_id, c.entity_id);
		assert_eq!(snapshot.redirect_chain, vec![a.entity_id.clone(), b.entity_id.clone(), c.entity_id.clone()]);
		assert_eq!(snapshot.merge_count, 2);
	}

	#[test]
	fn attribute_season_reward_namespaces_bare_wallets() {
		let r = resolver();
		let player = resolve_player_wallet(&r, "0xplayer", "solana", "test").unwrap();

		let mut claim = BTreeMap::new();
		claim.insert("chain".to_string(), "solana".to_string());
		claim.insert("player_wallet".to_string(), "0xplayer".to_string());

		let attribution = attribute_season_reward(&r, &claim).unwrap();
		assert_eq!(attribution.entity_id.as_deref(), Some(player.entity_id.as_str()));
	}
}
