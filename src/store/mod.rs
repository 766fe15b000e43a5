//! Storage trait for the resolution engine.
//!
//! `EntityStore` is the narrow repository seam the rest of the engine talks
//! to. [`memory::InMemoryEntityStore`] is the only implementation shipped
//! here; a durable backend is a matter of implementing this trait against it
//! without touching `Resolver`, `context`, or `attribution`.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::error::EngineResult;
use crate::model::{Alias, Entity, EntityStatus, EntityType, Identifier, MergeRecord};

/// Outcome of `add_alias`: whether a new alias row was inserted, and if not,
/// which canonical entity it already belongs to (when that differs from the
/// requested target).
#[derive(Debug, Clone)]
pub struct AddAliasOutcome {
	pub inserted: bool,
	pub conflicting_entity_id: Option<String>,
}

/// A full dump of the five tables, used for `export_snapshot` and test
/// fixtures. Field order matches the snapshot file format.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoreSnapshot {
	pub entities: Vec<Entity>,
	pub identifiers: Vec<Identifier>,
	pub aliases: Vec<Alias>,
	pub merge_records: Vec<MergeRecord>,
	pub entity_redirects: Vec<crate::model::Redirect>,
}

pub trait EntityStore: Send + Sync {
	fn create_entity(&self, entity_type: EntityType) -> EngineResult<String>;
	fn get_entity(&self, entity_id: &str) -> EngineResult<Option<Entity>>;
	fn ensure_entity(&self, entity_id: &str) -> EngineResult<Entity>;
	fn set_entity_status(&self, entity_id: &str, status: EntityStatus) -> EngineResult<()>;

	/// Walk the redirect chain from `entity_id` to its terminal node. Errors
	/// with `CycleInRedirects` if a node is revisited during the walk.
	fn canonicalize(&self, entity_id: &str) -> EngineResult<String>;

	fn get_redirect_target(&self, entity_id: &str) -> EngineResult<Option<String>>;
	fn remove_redirect(&self, entity_id: &str) -> EngineResult<()>;

	fn find_alias(&self, identifier_type: &str, normalized_value: &str) -> EngineResult<Option<Alias>>;

	#[allow(clippy::too_many_arguments)]
	fn upsert_identifier(
		&self,
		identifier_type: &str,
		value: &str,
		normalized_value: &str,
		confidence: f64,
		provenance: Option<String>,
		now: DateTime<Utc>,
	) -> EngineResult<()>;

	#[allow(clippy::too_many_arguments)]
	fn add_alias(
		&self,
		identifier_type: &str,
		normalized_value: &str,
		target_entity_id: &str,
		confidence: f64,
		caused_by: &str,
		provenance: Option<String>,
		now: DateTime<Utc>,
	) -> EngineResult<AddAliasOutcome>;

	fn merge_entities(
		&self,
		from: &str,
		to: &str,
		reason: &str,
		caused_by: &str,
		now: DateTime<Utc>,
	) -> EngineResult<u64>;

	fn list_aliases_for_entity(&self, entity_id: &str) -> EngineResult<Vec<Alias>>;
	fn list_identifier_records_for_entity(&self, entity_id: &str) -> EngineResult<Vec<Identifier>>;
	fn list_merge_history(&self) -> EngineResult<Vec<MergeRecord>>;

	fn export_snapshot(&self) -> EngineResult<StoreSnapshot>;

	/// Replace all store state with the contents of `snapshot`. Used to
	/// restore a process-local store from a previously exported snapshot
	/// file; the merge id counter is restored to one past the highest
	/// `merge_id` present so monotonicity holds for subsequent merges.
	fn import_snapshot(&self, snapshot: StoreSnapshot) -> EngineResult<()>;
}
