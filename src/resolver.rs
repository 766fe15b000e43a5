use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::config::Settings;
use crate::error::{EngineError, EngineResult};
use crate::events::{EmittedEvent, EventBuffer};
use crate::model::{EntityResolution, EntityType, ResolveContext};
use crate::normalize::{is_auto_merge_type, normalize};
use crate::observability::MetricsRegistry;
use crate::store::EntityStore;

struct ResolverInner {
	events: EventBuffer,
}

/// The engine's central write path. Holds the store, an owned event buffer,
/// and the defaults to fall back on when a `ResolveContext` leaves a field
/// unset. All mutating methods serialize on a single internal mutex so the
/// composite lookup-decide-mutate-emit sequence is atomic, matching the
/// single-writer contract even when the backing store's own per-call
/// locking wouldn't guarantee it on its own.
pub struct Resolver {
	store: Arc<dyn EntityStore>,
	settings: Settings,
	metrics: Option<Arc<MetricsRegistry>>,
	inner: Mutex<ResolverInner>,
}

impl Resolver {
	pub fn new(store: Arc<dyn EntityStore>, settings: Settings) -> Self {
		Self {
			store,
			settings,
			metrics: None,
			inner: Mutex::new(ResolverInner {
				events: EventBuffer::new(),
			}),
		}
	}

	pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
		self.metrics = Some(metrics);
		self
	}

	pub fn store(&self) -> &Arc<dyn EntityStore> {
		&self.store
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Atomically return and clear the event buffer.
	pub fn drain_events(&self) -> Vec<EmittedEvent> {
		self.inner.lock().unwrap().events.drain()
	}

	fn default_entity_type(&self, ctx: &ResolveContext) -> EntityType {
		ctx.entity_type.clone().unwrap_or_else(|| {
			self.settings
				.default_entity_type
				.parse()
				.unwrap_or(EntityType::Person)
		})
	}

	fn default_confidence(&self, ctx: &ResolveContext) -> f64 {
		ctx.confidence.unwrap_or(self.settings.default_confidence)
	}

	fn default_caused_by(&self, ctx: &ResolveContext) -> String {
		ctx.caused_by
			.clone()
			.unwrap_or_else(|| self.settings.default_caused_by.clone())
	}

	pub fn resolve(
		&self,
		identifier_type: &str,
		raw: &str,
		ctx: ResolveContext,
	) -> EngineResult<EntityResolution> {
		if raw.trim().is_empty() {
			return Err(EngineError::InvalidInput(format!(
				"empty value for identifier type {identifier_type}"
			)));
		}

		let nval = normalize(identifier_type, raw);
		if nval.is_empty() {
			return Err(EngineError::InvalidInput(format!(
				"normalized value for {identifier_type} is empty"
			)));
		}

		let confidence = self.default_confidence(&ctx);
		let entity_type = self.default_entity_type(&ctx);
		let caused_by = self.default_caused_by(&ctx);
		let provenance = ctx.provenance.clone();
		let now = Utc::now();

		let mut inner = self.inner.lock().unwrap();
		if let Some(metrics) = &self.metrics {
			metrics.resolves_total.inc();
		}

		self.store
			.upsert_identifier(identifier_type, raw, &nval, confidence, provenance.clone(), now)?;

		if let Some(alias) = self.store.find_alias(identifier_type, &nval)? {
			let canonical = self.store.canonicalize(&alias.entity_id)?;
			let resolution_confidence = alias.confidence.max(confidence);
			let matched = self.store.list_identifier_records_for_entity(&canonical)?;

			inner.events.push(EmittedEvent::resolved(
				canonical.clone(),
				caused_by,
				resolution_confidence,
				now,
			));
			if let Some(metrics) = &self.metrics {
				metrics.resolves_hit_total.inc();
			}

			return Ok(EntityResolution {
				entity_id: canonical,
				confidence: resolution_confidence,
				created_new_entity: false,
				matched_identifiers: matched,
			});
		}

		let fresh = self.store.create_entity(entity_type)?;
		let outcome = self.store.add_alias(
			identifier_type,
			&nval,
			&fresh,
			confidence,
			&caused_by,
			provenance.clone(),
			now,
		)?;

		let mut final_entity = fresh.clone();
		if let Some(conflict) = &outcome.conflicting_entity_id {
			if is_auto_merge_type(identifier_type) {
				let reason = format!("auto-merge on {identifier_type}:{nval}");
				self.store
					.merge_entities(&fresh, conflict, &reason, "auto-merge", now)?;
				final_entity = self.store.canonicalize(conflict)?;
				inner.events.push(EmittedEvent::merged(
					final_entity.clone(),
					vec![fresh.clone()],
					Some(reason),
					now,
				));
				if let Some(metrics) = &self.metrics {
					metrics.auto_merges_total.inc();
				}
			}
		}

		if outcome.inserted {
			inner.events.push(EmittedEvent::alias_added(
				final_entity.clone(),
				nval,
				identifier_type.to_string(),
				now,
			));
		}

		let resolution_confidence = if outcome.inserted { confidence } else { 0.6 };
		let matched = self.store.list_identifier_records_for_entity(&final_entity)?;

		inner.events.push(EmittedEvent::resolved(
			final_entity.clone(),
			caused_by,
			resolution_confidence,
			now,
		));
		if let Some(metrics) = &self.metrics {
			metrics.resolves_new_entity_total.inc();
		}

		Ok(EntityResolution {
			entity_id: final_entity,
			confidence: resolution_confidence,
			created_new_entity: true,
			matched_identifiers: matched,
		})
	}

	pub fn add_alias(
		&self,
		entity_id: &str,
		identifier_type: &str,
		raw: &str,
		confidence: f64,
		caused_by: &str,
		provenance: Option<String>,
	) -> EngineResult<Vec<EmittedEvent>> {
		let now = Utc::now();
		let mut inner = self.inner.lock().unwrap();

		self.store.ensure_entity(entity_id)?;
		let canonical = self.store.canonicalize(entity_id)?;

		let nval = normalize(identifier_type, raw);
		self.store
			.upsert_identifier(identifier_type, raw, &nval, confidence, provenance.clone(), now)?;

		let outcome = self
			.store
			.add_alias(identifier_type, &nval, &canonical, confidence, caused_by, provenance, now)?;

		if let Some(conflict) = &outcome.conflicting_entity_id {
			if is_auto_merge_type(identifier_type) {
				let reason = format!("auto-merge on {identifier_type}:{nval}");
				self.store
					.merge_entities(&canonical, conflict, &reason, "auto-merge", now)?;
				let survivor = self.store.canonicalize(conflict)?;
				if let Some(metrics) = &self.metrics {
					metrics.auto_merges_total.inc();
				}
				let event = EmittedEvent::merged(survivor, vec![canonical], Some(reason), now);
				inner.events.push(event.clone());
				return Ok(vec![event]);
			}
			if let Some(metrics) = &self.metrics {
				metrics.alias_conflicts_total.inc();
			}
			return Err(EngineError::AliasBoundElsewhere {
				identifier_type: identifier_type.to_string(),
				normalized_value: nval,
				existing_entity_id: conflict.clone(),
			});
		}

		if !outcome.inserted {
			return Ok(vec![]);
		}

		let event = EmittedEvent::alias_added(canonical, nval, identifier_type.to_string(), now);
		inner.events.push(event.clone());
		Ok(vec![event])
	}

	pub fn merge_entities(
		&self,
		from: &str,
		to: &str,
		reason: &str,
		caused_by: &str,
	) -> EngineResult<EmittedEvent> {
		let now = Utc::now();
		let mut inner = self.inner.lock().unwrap();

		self.store.ensure_entity(from)?;
		self.store.ensure_entity(to)?;

		self.store.merge_entities(from, to, reason, caused_by, now)?;
		let survivor = self.store.canonicalize(to)?;
		if let Some(metrics) = &self.metrics {
			metrics.manual_merges_total.inc();
		}

		let event = EmittedEvent::merged(survivor, vec![from.to_string()], Some(reason.to_string()), now);
		inner.events.push(event.clone());
		Ok(event)
	}

	/// Undoes a prior merge of `from` into `to`: if `from -> to` is still the
	/// current redirect, it is removed and `from` reactivated. A *new* merge
	/// in the opposite direction (`to -> from`) is then recorded; undo does
	/// not erase history, it appends to it.
	pub fn undo_merge(&self, from: &str, to: &str, caused_by: &str) -> EngineResult<EmittedEvent> {
		let now = Utc::now();
		let mut inner = self.inner.lock().unwrap();

		self.store.ensure_entity(from)?;
		self.store.ensure_entity(to)?;

		if self.store.get_redirect_target(from)?.as_deref() == Some(to) {
			self.store.remove_redirect(from)?;
			self.store
				.set_entity_status(from, crate::model::EntityStatus::Active)?;
		}

		let reason = format!("undo merge {from}->{to}");
		self.store.merge_entities(to, from, &reason, caused_by, now)?;
		let survivor = self.store.canonicalize(from)?;
		if let Some(metrics) = &self.metrics {
			metrics.undo_merges_total.inc();
		}

		let event = EmittedEvent::merged(survivor, vec![to.to_string()], Some(reason), now);
		inner.events.push(event.clone());
		Ok(event)
	}
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use crate::store::memory::InMemoryEntityStore;

	fn resolver() -> Resolver {
		Resolver::new(Arc::new(InMemoryEntityStore::new()), Settings::default())
	}

	#[test]
	fn s1_handle_normalization_converges() {
		let r = resolver();
		let first = r
			.resolve("twitter_handle", "@same", ResolveContext::new())
			.unwrap();
		let second = r
			.resolve("twitter_handle", "same", ResolveContext::new())
			.unwrap();
		assert_eq!(first.entity_id, second.entity_id);
		assert!(!second.created_new_entity);
	}

	#[test]
	fn s2_cross_platform_url_coalesce() {
		let r = resolver();
		let a = r
			.resolve("canonical_url", "https://example.com/u/alice/", ResolveContext::new())
			.unwrap();
		let b = r
			.resolve("canonical_url", "http://www.example.com/u/alice", ResolveContext::new())
			.unwrap();
		assert_eq!(a.entity_id, b.entity_id);
	}

	#[test]
	fn s3_auto_merge_on_email() {
		let r = resolver();
		let a = r
			.resolve("twitter_handle", "owner_a", ResolveContext::new())
			.unwrap();
		let b = r
			.resolve("twitter_handle", "owner_b", ResolveContext::new())
			.unwrap();
		assert_ne!(a.entity_id, b.entity_id);

		r.add_alias(&a.entity_id, "email", "shared@example.com", 0.9, "test", None)
			.unwrap();
		let events = r
			.add_alias(&b.entity_id, "email", "shared@example.com", 0.9, "test", None)
			.unwrap();
		assert_eq!(events.len(), 1);
		assert!(matches!(events[0], EmittedEvent::EntityMerged { .. }));

		let ra = r
			.resolve("twitter_handle", "owner_a", ResolveContext::new())
			.unwrap();
		let rb = r
			.resolve("twitter_handle", "owner_b", ResolveContext::new())
			.unwrap();
		assert_eq!(ra.entity_id, rb.entity_id);
	}

	#[test]
	fn s4_confidence_bump_keeps_entity_and_raises_floor() {
		let r = resolver();
		let first = r
			.resolve(
				"email",
				"test@example.com",
				ResolveContext::new().with_confidence(0.7),
			)
			.unwrap();
		let second = r
			.resolve(
				"email",
				"test@example.com",
				ResolveContext::new().with_confidence(0.4),
			)
			.unwrap();
		assert_eq!(first.entity_id, second.entity_id);
		assert!(second.confidence >= 0.7);
	}

	#[test]
	fn s6_undo_merge_routes_both_identifiers_to_original_entity() {
		let r = resolver();
		let a = r
			.resolve("twitter_handle", "undo_a", ResolveContext::new())
			.unwrap();
		let b = r
			.resolve("twitter_handle", "undo_b", ResolveContext::new())
			.unwrap();

		r.merge_entities(&a.entity_id, &b.entity_id, "manual", "test").unwrap();
		let after_merge = r
			.resolve("twitter_handle", "undo_a", ResolveContext::new())
			.unwrap();
		assert_eq!(after_merge.entity_id, b.entity_id);

		r.undo_merge(&a.entity_id, &b.entity_id, "test").unwrap();
		let ra = r
			.resolve("twitter_handle", "undo_a", ResolveContext::new())
			.unwrap();
		let rb = r
			.resolve("twitter_handle", "undo_b", ResolveContext::new())
			.unwrap();
		assert_eq!(ra.entity_id, a.entity_id);
		assert_eq!(rb.entity_id, a.entity_id);
	}

	#[test]
	fn add_alias_non_auto_merge_conflict_is_rejected() {
		let r = resolver();
		let a = r.resolve("name", "alice a", ResolveContext::new()).unwrap();
		let b = r.resolve("name", "bob b", ResolveContext::new()).unwrap();
		let err = r
			.add_alias(&b.entity_id, "name", "alice a", 0.9, "test", None)
			.unwrap_err();
		assert!(matches!(err, EngineError::AliasBoundElsewhere { .. }));
		// no mutation: a's name alias is untouched
		let still_a = r.resolve("name", "alice a", ResolveContext::new()).unwrap();
		assert_eq!(still_a.entity_id, a.entity_id);
	}

	#[test]
	fn merge_already_canonical_fails() {
		let r = resolver();
		let a = r.resolve("name", "solo", ResolveContext::new()).unwrap();
		let err = r
			.merge_entities(&a.entity_id, &a.entity_id, "noop", "test")
			.unwrap_err();
		assert!(matches!(err, EngineError::AlreadyMerged { .. }));
	}
}
