use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::model::{new_entity_id, Alias, Entity, EntityStatus, EntityType, Identifier, MergeRecord, Redirect};

use super::{AddAliasOutcome, EntityStore, StoreSnapshot};

type AliasKey = (String, String);

#[derive(Default)]
struct Tables {
	entities: BTreeMap<String, Entity>,
	identifiers: BTreeMap<AliasKey, Identifier>,
	aliases: BTreeMap<AliasKey, Alias>,
	redirects: BTreeMap<String, Redirect>,
	merge_records: Vec<MergeRecord>,
	next_merge_id: u64,
}

/// Process-local, single-process store. Every mutating call takes the write
/// lock for its full duration, matching the single-writer contract; reads
/// take the read lock.
pub struct InMemoryEntityStore {
	tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
	pub fn new() -> Self {
		Self {
			tables: RwLock::new(Tables {
				next_merge_id: 1,
				..Default::default()
			}),
		}
	}

	fn canonicalize_locked(tables: &Tables, entity_id: &str) -> Result<String, EngineError> {
		let mut current = entity_id.to_string();
		let mut seen = HashSet::new();
		loop {
			if !seen.insert(current.clone()) {
				tracing::error!(entity_id, "cycle detected in redirect graph");
				return Err(EngineError::CycleInRedirects(entity_id.to_string()));
			}
			match tables.redirects.get(&current) {
				Some(redirect) => current = redirect.to_entity_id.clone(),
				None => return Ok(current),
			}
		}
	}
}

impl Default for InMemoryEntityStore {
	fn default() -> Self {
		Self::new()
	}
}

impl EntityStore for InMemoryEntityStore {
	fn create_entity(&self, entity_type: EntityType) -> crate::error::EngineResult<String> {
		let mut tables = self.tables.write().unwrap();
		let entity_id = new_entity_id();
		tables.entities.insert(
			entity_id.clone(),
			Entity {
				entity_id: entity_id.clone(),
				entity_type,
				created_at: Utc::now(),
				status: EntityStatus::Active,
			},
		);
		Ok(entity_id)
	}

	fn get_entity(&self, entity_id: &str) -> crate::error::EngineResult<Option<Entity>> {
		let tables = self.tables.read().unwrap();
		Ok(tables.entities.get(entity_id).cloned())
	}

	fn ensure_entity(&self, entity_id: &str) -> crate::error::EngineResult<Entity> {
		let tables = self.tables.read().unwrap();
		tables
			.entities
			.get(entity_id)
			.cloned()
			.ok_or_else(|| EngineError::UnknownEntity(entity_id.to_string()))
	}

	fn set_entity_status(&self, entity_id: &str, status: EntityStatus) -> crate::error::EngineResult<()> {
		let mut tables = self.tables.write().unwrap();
		let entity = tables
			.entities
			.get_mut(entity_id)
			.ok_or_else(|| EngineError::UnknownEntity(entity_id.to_string()))?;
		entity.status = status;
		Ok(())
	}

	fn canonicalize(&self, entity_id: &str) -> crate::error::EngineResult<String> {
		let tables = self.tables.read().unwrap();
		Self::canonicalize_locked(&tables, entity_id)
	}

	fn get_redirect_target(&self, entity_id: &str) -> crate::error::EngineResult<Option<String>> {
		let tables = self.tables.read().unwrap();
		Ok(tables.redirects.get(entity_id).map(|r| r.to_entity_id.clone()))
	}

	fn remove_redirect(&self, entity_id: &str) -> crate::error::EngineResult<()> {
		let mut tables = self.tables.write().unwrap();
		tables.redirects.remove(entity_id);
		Ok(())
	}

	fn find_alias(&self, identifier_type: &str, normalized_value: &str) -> crate::error::EngineResult<Option<Alias>> {
		let tables = self.tables.read().unwrap();
		let key = (identifier_type.to_string(), normalized_value.to_string());
		Ok(tables.aliases.get(&key).cloned())
	}

	fn upsert_identifier(
		&self,
		identifier_type: &str,
		value: &str,
		normalized_value: &str,
		confidence: f64,
		provenance: Option<String>,
		now: DateTime<Utc>,
	) -> crate::error::EngineResult<()> {
		let mut tables = self.tables.write().unwrap();
		let key = (identifier_type.to_string(), normalized_value.to_string());
		match tables.identifiers.get_mut(&key) {
			Some(existing) => {
				existing.value = value.to_string();
				existing.confidence = existing.confidence.max(confidence);
				existing.last_seen_at = now;
				if existing.provenance.is_none() {
					existing.provenance = provenance;
				}
			}
			None => {
				tables.identifiers.insert(
					key,
					Identifier {
						identifier_type: identifier_type.to_string(),
						value: value.to_string(),
						normalized_value: normalized_value.to_string(),
						confidence,
						first_seen_at: now,
						last_seen_at: now,
						provenance,
					},
				);
			}
		}
		Ok(())
	}

	fn add_alias(
		&self,
		identifier_type: &str,
		normalized_value: &str,
		target_entity_id: &str,
		confidence: f64,
		caused_by: &str,
		provenance: Option<String>,
		now: DateTime<Utc>,
	) -> crate::error::EngineResult<AddAliasOutcome> {
		let mut tables = self.tables.write().unwrap();
		let canonical_target = Self::canonicalize_locked(&tables, target_entity_id)?;
		let key = (identifier_type.to_string(), normalized_value.to_string());

		if let Some(existing) = tables.aliases.get(&key).cloned() {
			let existing_canonical = Self::canonicalize_locked(&tables, &existing.entity_id)?;
			if existing_canonical == canonical_target {
				let alias = tables.aliases.get_mut(&key).unwrap();
				alias.confidence = alias.confidence.max(confidence);
				if alias.provenance.is_none() {
					alias.provenance = provenance;
				}
				return Ok(AddAliasOutcome {
					inserted: false,
					conflicting_entity_id: None,
				});
			}
			return Ok(AddAliasOutcome {
				inserted: false,
				conflicting_entity_id: Some(existing_canonical),
			});
		}

		tables.aliases.insert(
			key,
			Alias {
				identifier_type: identifier_type.to_string(),
				normalized_value: normalized_value.to_string(),
				entity_id: canonical_target,
				confidence,
				created_at: now,
				caused_by: caused_by.to_string(),
				provenance,
			},
		);
		Ok(AddAliasOutcome {
			inserted: true,
			conflicting_entity_id: None,
		})
	}

	fn merge_entities(
		&self,
		from: &str,
		to: &str,
		reason: &str,
		caused_by: &str,
		now: DateTime<Utc>,
	) -> crate::error::EngineResult<u64> {
		let mut tables = self.tables.write().unwrap();
		let from_canonical = Self::canonicalize_locked(&tables, from)?;
		let to_canonical = Self::canonicalize_locked(&tables, to)?;

		if from_canonical == to_canonical {
			return Err(EngineError::AlreadyMerged {
				from: from.to_string(),
				to: to.to_string(),
			});
		}

		tables.redirects.insert(
			from_canonical.clone(),
			Redirect {
				from_entity_id: from_canonical.clone(),
				to_entity_id: to_canonical.clone(),
				timestamp: now,
				reason: reason.to_string(),
				caused_by: caused_by.to_string(),
			},
		);

		if let Some(entity) = tables.entities.get_mut(&from_canonical) {
			entity.status = EntityStatus::Merged;
		}
		if let Some(entity) = tables.entities.get_mut(&to_canonical) {
			entity.status = EntityStatus::Active;
		}

		let merge_id = tables.next_merge_id;
		tables.next_merge_id += 1;
		tables.merge_records.push(MergeRecord {
			merge_id,
			from_entity_id: from_canonical,
			to_entity_id: to_canonical,
			reason: reason.to_string(),
			timestamp: now,
			caused_by: caused_by.to_string(),
		});

		Ok(merge_id)
	}

	fn list_aliases_for_entity(&self, entity_id: &str) -> crate::error::EngineResult<Vec<Alias>> {
		let tables = self.tables.read().unwrap();
		let canonical = Self::canonicalize_locked(&tables, entity_id)?;
		let mut result: Vec<Alias> = tables
			.aliases
			.values()
			.filter(|alias| {
				Self::canonicalize_locked(&tables, &alias.entity_id).as_deref() == Ok(canonical.as_str())
			})
			.cloned()
			.collect();
		result.sort_by(|a, b| {
			(a.identifier_type.as_str(), a.normalized_value.as_str())
				.cmp(&(b.identifier_type.as_str(), b.normalized_value.as_str()))
		});
		Ok(result)
	}

	fn list_identifier_records_for_entity(&self, entity_id: &str) -> crate::error::EngineResult<Vec<Identifier>> {
		let tables = self.tables.read().unwrap();
		let canonical = Self::canonicalize_locked(&tables, entity_id)?;
		let mut result: Vec<Identifier> = tables
			.aliases
			.values()
			.filter(|alias| {
				Self::canonicalize_locked(&tables, &alias.entity_id).as_deref() == Ok(canonical.as_str())
			})
			.filter_map(|alias| {
				let key = (alias.identifier_type.clone(), alias.normalized_value.clone());
				tables.identifiers.get(&key).cloned()
			})
			.collect();
		result.sort_by(|a, b| {
			(a.identifier_type.as_str(), a.normalized_value.as_str())
				.cmp(&(b.identifier_type.as_str(), b.normalized_value.as_str()))
		});
		Ok(result)
	}

	fn list_merge_history(&self) -> crate::error::EngineResult<Vec<MergeRecord>> {
		let tables = self.tables.read().unwrap();
		let mut records = tables.merge_records.clone();
		records.sort_by_key(|r| r.merge_id);
		Ok(records)
	}

	fn export_snapshot(&self) -> crate::error::EngineResult<StoreSnapshot> {
		let tables = self.tables.read().unwrap();
		let mut entities: Vec<Entity> = tables.entities.values().cloned().collect();
		entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

		let mut identifiers: Vec<Identifier> = tables.identifiers.values().cloned().collect();
		identifiers.sort_by(|a, b| {
			(a.identifier_type.as_str(), a.normalized_value.as_str())
				.cmp(&(b.identifier_type.as_str(), b.normalized_value.as_str()))
		});

		let mut aliases: Vec<Alias> = tables.aliases.values().cloned().collect();
		aliases.sort_by(|a, b| {
			(a.identifier_type.as_str(), a.normalized_value.as_str())
				.cmp(&(b.identifier_type.as_str(), b.normalized_value.as_str()))
		});

		let mut merge_records = tables.merge_records.clone();
		merge_records.sort_by_key(|r| r.merge_id);

		let mut entity_redirects: Vec<Redirect> = tables.redirects.values().cloned().collect();
		entity_redirects.sort_by(|a, b| a.from_entity_id.cmp(&b.from_entity_id));

		Ok(StoreSnapshot {
			entities,
			identifiers,
			aliases,
			merge_records,
			entity_redirects,
		})
	}

	fn import_snapshot(&self, snapshot: StoreSnapshot) -> crate::error::EngineResult<()> {
		let mut tables = self.tables.write().unwrap();

		let next_merge_id = snapshot.merge_records.iter().map(|r| r.merge_id).max().map(|m| m + 1).unwrap_or(1);

		tables.entities = snapshot
			.entities
			.into_iter()
			.map(|e| (e.entity_id.clone(), e))
			.collect();
		tables.identifiers = snapshot
			.identifiers
			.into_iter()
			.map(|i| ((i.identifier_type.clone(), i.normalized_value.clone()), i))
			.collect();
		tables.aliases = snapshot
			.aliases
			.into_iter()
			.map(|a| ((a.identifier_type.clone(), a.normalized_value.clone()), a))
			.collect();
		tables.redirects = snapshot
			.entity_redirects
			.into_iter()
			.map(|r| (r.from_entity_id.clone(), r))
			.collect();
		tables.merge_records = snapshot.merge_records;
		tables.next_merge_id = next_merge_id;

		Ok(())
	}
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;

	#[test]
	fn create_entity_then_get_roundtrips() {
		let store = InMemoryEntityStore::new();
		let id = store.create_entity(EntityType::Person).unwrap();
		let entity = store.get_entity(&id).unwrap().unwrap();
		assert_eq!(entity.entity_id, id);
		assert_eq!(entity.status, EntityStatus::Active);
	}

	#[test]
	fn ensure_entity_fails_for_unknown_id() {
		let store = InMemoryEntityStore::new();
		let err = store.ensure_entity("ent_missing").unwrap_err();
		assert!(matches!(err, EngineError::UnknownEntity(_)));
	}

	#[test]
	fn canonicalize_follows_redirect_chain() {
		let store = InMemoryEntityStore::new();
		let a = store.create_entity(EntityType::Person).unwrap();
		let b = store.create_entity(EntityType::Person).unwrap();
		let c = store.create_entity(EntityType::Person).unwrap();
		store.merge_entities(&a, &b, "t", "test", Utc::now()).unwrap();
		store.merge_entities(&b, &c, "t", "test", Utc::now()).unwrap();
		assert_eq!(store.canonicalize(&a).unwrap(), c);
	}

	#[test]
	fn merge_already_canonical_equal_fails() {
		let store = InMemoryEntityStore::new();
		let a = store.create_entity(EntityType::Person).unwrap();
		let err = store.merge_entities(&a, &a, "t", "test", Utc::now()).unwrap_err();
		assert!(matches!(err, EngineError::AlreadyMerged { .. }));
	}

	#[test]
	fn add_alias_conflict_reports_existing_canonical() {
		let store = InMemoryEntityStore::new();
		let a = store.create_entity(EntityType::Person).unwrap();
		let b = store.create_entity(EntityType::Person).unwrap();
		store
			.add_alias("email", "x@example.com", &a, 0.9, "test", None, Utc::now())
			.unwrap();
		let outcome = store
			.add_alias("email", "x@example.com", &b, 0.9, "test", None, Utc::now())
			.unwrap();
		assert!(!outcome.inserted);
		assert_eq!(outcome.conflicting_entity_id.as_deref(), Some(a.as_str()));
	}

	#[test]
	fn export_then_import_round_trips_state() {
		let store = InMemoryEntityStore::new();
		let a = store.create_entity(EntityType::Person).unwrap();
		store
			.add_alias("email", "a@example.com", &a, 0.9, "test", None, Utc::now())
			.unwrap();

		let snapshot = store.export_snapshot().unwrap();
		let restored = InMemoryEntityStore::new();
		restored.import_snapshot(snapshot).unwrap();

		let alias = restored.find_alias("email", "a@example.com").unwrap().unwrap();
		assert_eq!(alias.entity_id, a);
	}
}
