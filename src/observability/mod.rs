pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{MetricsRegistry, init_metrics};

use std::sync::Arc;

/// Global observability state.
pub struct ObservabilityState {
	pub metrics: Arc<MetricsRegistry>,
}

impl ObservabilityState {
	pub fn new() -> Self {
		Self {
			metrics: Arc::new(MetricsRegistry::new()),
		}
	}
}

impl Default for ObservabilityState {
	fn default() -> Self {
		Self::new()
	}
}

/// Initialize structured logging and the metrics registry.
pub fn init_observability() -> anyhow::Result<ObservabilityState> {
	init_logging()?;
	let metrics = init_metrics()?;

	tracing::info!(
		component = "observability",
		"observability initialized: structured logging and metrics enabled"
	);

	Ok(ObservabilityState { metrics })
}

#[cfg(feature = "unit-tests")]
mod tests {
	#[test]
	fn observability_state_creation() {
		let state = super::ObservabilityState::new();
		assert!(!state.metrics.encode().is_empty());
	}
}
