use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an entity: `active` entities are canonical targets; `merged`
/// entities have an outbound redirect to another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
	Active,
	Merged,
}

/// Broad category an entity belongs to. Not enum-enforced beyond these three
/// because callers may eventually introduce new kinds; the engine does not
/// special-case on entity_type beyond defaulting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	Person,
	Org,
	Project,
}

impl std::fmt::Display for EntityType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			EntityType::Person => "person",
			EntityType::Org => "org",
			EntityType::Project => "project",
		};
		f.write_str(s)
	}
}

impl std::str::FromStr for EntityType {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"person" => Ok(EntityType::Person),
			"org" => Ok(EntityType::Org),
			"project" => Ok(EntityType::Project),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
	pub entity_id: String,
	pub entity_type: EntityType,
	pub created_at: DateTime<Utc>,
	pub status: EntityStatus,
}

/// An observation of a typed value for an entity. Unique on
/// `(identifier_type, normalized_value)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
	pub identifier_type: String,
	pub value: String,
	pub normalized_value: String,
	pub confidence: f64,
	pub first_seen_at: DateTime<Utc>,
	pub last_seen_at: DateTime<Utc>,
	pub provenance: Option<String>,
}

/// The resolution index row binding an identifier to an entity. `entity_id`
/// may be a non-canonical ancestor after merges; readers must re-canonicalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
	pub identifier_type: String,
	pub normalized_value: String,
	pub entity_id: String,
	pub confidence: f64,
	pub created_at: DateTime<Utc>,
	pub caused_by: String,
	pub provenance: Option<String>,
}

/// Append-only ledger entry. `merge_id` increases monotonically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRecord {
	pub merge_id: u64,
	pub from_entity_id: String,
	pub to_entity_id: String,
	pub reason: String,
	pub timestamp: DateTime<Utc>,
	pub caused_by: String,
}

/// A single outbound redirect edge. At most one per `from_entity_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redirect {
	pub from_entity_id: String,
	pub to_entity_id: String,
	pub timestamp: DateTime<Utc>,
	pub reason: String,
	pub caused_by: String,
}

/// Per-call options accepted by `resolve`/`add_alias`. Replaces a dynamic
/// context map with an explicit, typed structure; unknown keys simply don't
/// exist here. Defaults come from `Settings` when a field is left `None`.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
	pub confidence: Option<f64>,
	pub entity_type: Option<EntityType>,
	pub caused_by: Option<String>,
	pub provenance: Option<String>,
}

impl ResolveContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_confidence(mut self, confidence: f64) -> Self {
		self.confidence = Some(confidence);
		self
	}

	pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
		self.entity_type = Some(entity_type);
		self
	}

	pub fn with_caused_by(mut self, caused_by: impl Into<String>) -> Self {
		self.caused_by = Some(caused_by.into());
		self
	}

	pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
		self.provenance = Some(provenance.into());
		self
	}
}

/// Result of a `resolve` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityResolution {
	pub entity_id: String,
	pub confidence: f64,
	pub created_new_entity: bool,
	pub matched_identifiers: Vec<Identifier>,
}

/// Generate a new opaque entity id: `ent_` followed by a v4 UUID in simple
/// (hyphen-free) hex form.
pub fn new_entity_id() -> String {
	format!("ent_{}", Uuid::new_v4().simple())
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;

	#[test]
	fn entity_type_roundtrips_through_display_and_from_str() {
		for et in [EntityType::Person, EntityType::Org, EntityType::Project] {
			let s = et.to_string();
			let parsed: EntityType = s.parse().unwrap();
			assert_eq!(parsed, et);
		}
	}

	#[test]
	fn entity_ids_are_unique_and_prefixed() {
		let a = new_entity_id();
		let b = new_entity_id();
		assert_ne!(a, b);
		assert!(a.starts_with("ent_"));
		assert_eq!(a.len(), "ent_".len() + 32);
	}
}
