use prometheus::{IntCounter, Opts, Registry, TextEncoder};

/// Central registry for the engine's Prometheus metrics.
pub struct MetricsRegistry {
	registry: Registry,

	pub resolves_total: IntCounter,
	pub resolves_hit_total: IntCounter,
	pub resolves_new_entity_total: IntCounter,
	pub auto_merges_total: IntCounter,
	pub manual_merges_total: IntCounter,
	pub undo_merges_total: IntCounter,
	pub alias_conflicts_total: IntCounter,
	pub attributions_total: IntCounter,
	pub store_failures_total: IntCounter,
}

impl MetricsRegistry {
	pub fn new() -> Self {
		let registry = Registry::new();

		let resolves_total = IntCounter::with_opts(
			Opts::new("resolves_total", "Total resolve() calls").namespace("entity_resolution"),
		)
		.unwrap();
		let resolves_hit_total = IntCounter::with_opts(
			Opts::new(
				"resolves_hit_total",
				"Resolve calls that matched an existing alias",
			)
			.namespace("entity_resolution"),
		)
		.unwrap();
		let resolves_new_entity_total = IntCounter::with_opts(
			Opts::new(
				"resolves_new_entity_total",
				"Resolve calls that created a new entity",
			)
			.namespace("entity_resolution"),
		)
		.unwrap();
		let auto_merges_total = IntCounter::with_opts(
			Opts::new(
				"auto_merges_total",
				"Merges triggered automatically by a strong-identifier conflict",
			)
			.namespace("entity_resolution"),
		)
		.unwrap();
		let manual_merges_total = IntCounter::with_opts(
			Opts::new("manual_merges_total", "Merges requested explicitly")
				.namespace("entity_resolution"),
		)
		.unwrap();
		let undo_merges_total = IntCounter::with_opts(
			Opts::new("undo_merges_total", "Undo-merge calls").namespace("entity_resolution"),
		)
		.unwrap();
		let alias_conflicts_total = IntCounter::with_opts(
			Opts::new(
				"alias_conflicts_total",
				"addAlias calls rejected as AliasBoundElsewhere",
			)
			.namespace("entity_resolution"),
		)
		.unwrap();
		let attributions_total = IntCounter::with_opts(
			Opts::new("attributions_total", "attributeOutcome calls")
				.namespace("entity_resolution"),
		)
		.unwrap();
		let store_failures_total = IntCounter::with_opts(
			Opts::new("store_failures_total", "Store operations that failed")
				.namespace("entity_resolution"),
		)
		.unwrap();

		registry.register(Box::new(resolves_total.clone())).unwrap();
		registry
			.register(Box::new(resolves_hit_total.clone()))
			.unwrap();
		registry
			.register(Box::new(resolves_new_entity_total.clone()))
			.unwrap();
		registry
			.register(Box::new(auto_merges_total.clone()))
			.unwrap();
		registry
			.register(Box::new(manual_merges_total.clone()))
			.unwrap();
		registry
			.register(Box::new(undo_merges_total.clone()))
			.unwrap();
		registry
			.register(Box::new(alias_conflicts_total.clone()))
			.unwrap();
		registry
			.register(Box::new(attributions_total.clone()))
			.unwrap();
		registry
			.register(Box::new(store_failures_total.clone()))
			.unwrap();

		Self {
			registry,
			resolves_total,
			resolves_hit_total,
			resolves_new_entity_total,
			auto_merges_total,
			manual_merges_total,
			undo_merges_total,
			alias_conflicts_total,
			attributions_total,
			store_failures_total,
		}
	}

	/// Encode metrics in Prometheus text format.
	pub fn encode(&self) -> String {
		let encoder = TextEncoder::new();
		let metric_families = self.registry.gather();
		match encoder.encode_to_string(&metric_families) {
			Ok(s) => s,
			Err(e) => {
				eprintln!("failed to encode metrics: {}", e);
				String::new()
			}
		}
	}
}

impl Default for MetricsRegistry {
	fn default() -> Self {
		Self::new()
	}
}

/// Initialize the metrics registry.
pub fn init_metrics() -> anyhow::Result<std::sync::Arc<MetricsRegistry>> {
	Ok(std::sync::Arc::new(MetricsRegistry::new()))
}

#[cfg(feature = "unit-tests")]
mod tests {
	#[test]
	fn metrics_registry_creation() {
		let registry = super::MetricsRegistry::new();
		assert!(!registry.encode().is_empty());
	}

	#[test]
	fn metrics_increment() {
		let registry = super::MetricsRegistry::new();
		registry.resolves_total.inc();
		registry.auto_merges_total.inc_by(2);
		assert!(!registry.encode().is_empty());
	}
}
