use anyhow::Result;
use serde::Deserialize;

/// Runtime configuration for the entity resolution engine.
///
/// Values are loaded from (in order): `config` file (optional) and environment variables
/// prefixed with `ER_` (e.g. `ER_DEFAULT_CONFIDENCE`). This is a small, intentionally
/// conservative bootstrap for the project's configuration system.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Settings {
	pub log_level: Option<String>,
	pub default_confidence: f64,
	pub default_entity_type: String,
	pub default_caused_by: String,
	pub recent_evidence_limit: usize,
	pub snapshot_path: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			log_level: Some("info".to_string()),
			default_confidence: 0.95,
			default_entity_type: "person".to_string(),
			default_caused_by: "resolver".to_string(),
			recent_evidence_limit: 10,
			snapshot_path: None,
		}
	}
}

/// Partial settings used to overlay environment/file values on top of defaults.
#[derive(Debug, Deserialize)]
struct PartialSettings {
	log_level: Option<String>,
	default_confidence: Option<f64>,
	default_entity_type: Option<String>,
	default_caused_by: Option<String>,
	recent_evidence_limit: Option<usize>,
	snapshot_path: Option<String>,
}

/// Load settings from config file (optional) and environment variables.
pub fn load() -> Result<Settings> {
	let builder = config::Config::builder()
		.add_source(config::File::with_name("config").required(false))
		// Use a double-underscore separator so single-underscore env names like
		// `ER_DEFAULT_CONFIDENCE` map to `default_confidence` instead of nesting.
		.add_source(config::Environment::with_prefix("ER").separator("__"));

	let cfg = builder.build()?;

	let partial: PartialSettings = cfg.try_deserialize()?;

	let mut s = Settings::default();
	if let Some(level) = partial.log_level {
		s.log_level = Some(level);
	}
	if let Some(conf) = partial.default_confidence {
		s.default_confidence = conf;
	}
	if let Some(et) = partial.default_entity_type {
		s.default_entity_type = et;
	}
	if let Some(cb) = partial.default_caused_by {
		s.default_caused_by = cb;
	}
	if let Some(limit) = partial.recent_evidence_limit {
		s.recent_evidence_limit = limit;
	}
	if let Some(path) = partial.snapshot_path {
		s.snapshot_path = Some(path);
	}

	// Explicitly prefer direct environment variables when present. Some
	// environments (CI, test harnesses) may set env vars in ways that the
	// `config` crate doesn't map as expected; read them directly to ensure
	// explicit overrides take effect.
	if let Ok(l) = std::env::var("ER_LOG_LEVEL") {
		if !l.is_empty() {
			s.log_level = Some(l);
		}
	}
	if let Ok(c) = std::env::var("ER_DEFAULT_CONFIDENCE") {
		if let Ok(cn) = c.parse::<f64>() {
			s.default_confidence = cn;
		}
	}
	if let Ok(et) = std::env::var("ER_DEFAULT_ENTITY_TYPE") {
		if !et.is_empty() {
			s.default_entity_type = et;
		}
	}
	if let Ok(cb) = std::env::var("ER_DEFAULT_CAUSED_BY") {
		if !cb.is_empty() {
			s.default_caused_by = cb;
		}
	}
	if let Ok(lim) = std::env::var("ER_RECENT_EVIDENCE_LIMIT") {
		if let Ok(ln) = lim.parse::<usize>() {
			s.recent_evidence_limit = ln;
		}
	}
	if let Ok(p) = std::env::var("ER_SNAPSHOT_PATH") {
		if !p.is_empty() {
			s.snapshot_path = Some(p);
		}
	}

	Ok(s)
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use std::env;

	#[test]
	fn test_load_defaults_and_env_overlay() {
		let orig_level = env::var_os("ER_LOG_LEVEL");
		let orig_conf = env::var_os("ER_DEFAULT_CONFIDENCE");
		let orig_et = env::var_os("ER_DEFAULT_ENTITY_TYPE");
		let orig_cb = env::var_os("ER_DEFAULT_CAUSED_BY");
		let orig_lim = env::var_os("ER_RECENT_EVIDENCE_LIMIT");
		let orig_path = env::var_os("ER_SNAPSHOT_PATH");

		unsafe { env::remove_var("ER_LOG_LEVEL") };
		unsafe { env::remove_var("ER_DEFAULT_CONFIDENCE") };
		unsafe { env::remove_var("ER_DEFAULT_ENTITY_TYPE") };
		unsafe { env::remove_var("ER_DEFAULT_CAUSED_BY") };
		unsafe { env::remove_var("ER_RECENT_EVIDENCE_LIMIT") };
		unsafe { env::remove_var("ER_SNAPSHOT_PATH") };

		let s = load().expect("load should succeed with defaults");
		let d = Settings::default();
		assert_eq!(s.log_level, d.log_level);
		assert_eq!(s.default_confidence, d.default_confidence);
		assert_eq!(s.recent_evidence_limit, d.recent_evidence_limit);

		unsafe { env::set_var("ER_LOG_LEVEL", "debug") };
		unsafe { env::set_var("ER_DEFAULT_CONFIDENCE", "0.8") };
		unsafe { env::set_var("ER_DEFAULT_ENTITY_TYPE", "org") };
		unsafe { env::set_var("ER_DEFAULT_CAUSED_BY", "ingest") };
		unsafe { env::set_var("ER_RECENT_EVIDENCE_LIMIT", "25") };
		unsafe { env::set_var("ER_SNAPSHOT_PATH", "/tmp/snapshot.json") };

		let s2 = load().expect("load should succeed with env");
		assert_eq!(s2.log_level.as_deref(), Some("debug"));
		assert_eq!(s2.default_confidence, 0.8);
		assert_eq!(s2.default_entity_type, "org");
		assert_eq!(s2.default_caused_by, "ingest");
		assert_eq!(s2.recent_evidence_limit, 25);
		assert_eq!(s2.snapshot_path.as_deref(), Some("/tmp/snapshot.json"));

		match orig_level {
			Some(v) => unsafe { env::set_var("ER_LOG_LEVEL", v) },
			None => unsafe { env::remove_var("ER_LOG_LEVEL") },
		}
		match orig_conf {
			Some(v) => unsafe { env::set_var("ER_DEFAULT_CONFIDENCE", v) },
			None => unsafe { env::remove_var("ER_DEFAULT_CONFIDENCE") },
		}
		match orig_et {
			Some(v) => unsafe { env::set_var("ER_DEFAULT_ENTITY_TYPE", v) },
			None => unsafe { env::remove_var("ER_DEFAULT_ENTITY_TYPE") },
		}
		match orig_cb {
			Some(v) => unsafe { env::set_var("ER_DEFAULT_CAUSED_BY", v) },
			None => unsafe { env::remove_var("ER_DEFAULT_CAUSED_BY") },
		}
		match orig_lim {
			Some(v) => unsafe { env::set_var("ER_RECENT_EVIDENCE_LIMIT", v) },
			None => unsafe { env::remove_var("ER_RECENT_EVIDENCE_LIMIT") },
		}
		match orig_path {
			Some(v) => unsafe { env::set_var("ER_SNAPSHOT_PATH", v) },
			None => unsafe { env::remove_var("ER_SNAPSHOT_PATH") },
		}
	}
}
