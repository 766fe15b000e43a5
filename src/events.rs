use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "entity-resolution.v1";

/// Domain events emitted by state-changing operations. All variants carry
/// `schema_version` so downstream consumers can decode forward-compatibly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EmittedEvent {
	EntityResolved {
		entity_id: String,
		resolver: String,
		resolved_at: DateTime<Utc>,
		confidence: f64,
		schema_version: &'static str,
	},
	EntityAliasAdded {
		entity_id: String,
		alias: String,
		alias_type: String,
		added_at: DateTime<Utc>,
		schema_version: &'static str,
	},
	EntityMerged {
		entity_id: String,
		merged_from: Vec<String>,
		merged_at: DateTime<Utc>,
		reason: Option<String>,
		schema_version: &'static str,
	},
}

impl EmittedEvent {
	pub fn resolved(entity_id: String, resolver: String, confidence: f64, at: DateTime<Utc>) -> Self {
		EmittedEvent::EntityResolved {
			entity_id,
			resolver,
			resolved_at: at,
			confidence,
			schema_version: SCHEMA_VERSION,
		}
	}

	pub fn alias_added(entity_id: String, alias: String, alias_type: String, at: DateTime<Utc>) -> Self {
		EmittedEvent::EntityAliasAdded {
			entity_id,
			alias,
			alias_type,
			added_at: at,
			schema_version: SCHEMA_VERSION,
		}
	}

	pub fn merged(entity_id: String, merged_from: Vec<String>, reason: Option<String>, at: DateTime<Utc>) -> Self {
		EmittedEvent::EntityMerged {
			entity_id,
			merged_from,
			merged_at: at,
			reason,
			schema_version: SCHEMA_VERSION,
		}
	}
}

/// Ordered buffer of events emitted by a single resolver instance. Owned
/// exclusively by that instance and mutated only while the caller holds its
/// write path; `drain` atomically returns and clears the contents.
#[derive(Debug, Default)]
pub struct EventBuffer {
	events: Vec<EmittedEvent>,
}

impl EventBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, event: EmittedEvent) {
		self.events.push(event);
	}

	pub fn drain(&mut self) -> Vec<EmittedEvent> {
		std::mem::take(&mut self.events)
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;

	#[test]
	fn drain_returns_events_in_order_and_clears_buffer() {
		let mut buffer = EventBuffer::new();
		let now = Utc::now();
		buffer.push(EmittedEvent::resolved("ent_a".into(), "resolver".into(), 0.9, now));
		buffer.push(EmittedEvent::alias_added(
			"ent_a".into(),
			"x@example.com".into(),
			"email".into(),
			now,
		));

		let drained = buffer.drain();
		assert_eq!(drained.len(), 2);
		assert!(matches!(drained[0], EmittedEvent::EntityResolved { .. }));
		assert!(matches!(drained[1], EmittedEvent::EntityAliasAdded { .. }));
		assert!(buffer.is_empty());
	}
}
