use thiserror::Error;

/// Domain-level errors raised by the resolution engine.
///
/// These are the engine's own failure modes, not transport-layer concerns.
/// `StoreFailure` wraps whatever the backing `EntityStore` implementation
/// returns.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("unknown entity: {0}")]
	UnknownEntity(String),

	#[error("identifier {identifier_type}:{normalized_value} is already bound to entity {existing_entity_id}")]
	AliasBoundElsewhere {
		identifier_type: String,
		normalized_value: String,
		existing_entity_id: String,
	},

	#[error("entities {from} and {to} are already merged")]
	AlreadyMerged { from: String, to: String },

	#[error("cycle detected in redirect graph starting at {0}")]
	CycleInRedirects(String),

	#[error("store failure: {0}")]
	StoreFailure(#[source] anyhow::Error),
}

impl From<anyhow::Error> for EngineError {
	fn from(err: anyhow::Error) -> Self {
		tracing::error!(error = %err, "store failure");
		EngineError::StoreFailure(err)
	}
}

pub type EngineResult<T> = Result<T, EngineError>;
