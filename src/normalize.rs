//! Deterministic identifier normalization.
//!
//! `normalize` is a pure, total function: every input produces some output,
//! including inputs that don't parse as the shape their declared type
//! implies (normalization never fails; unparsable URL-shaped values simply
//! fall back to the generic rule). This keeps identity resolution
//! deterministic and replayable.
//!
//! ## Versioning and stability
//!
//! Changing a rule here changes which past observations collide, so rule
//! changes are backward-incompatible by nature. Current version: v1.

use url::Url;

/// Identifier types whose re-observation under a different entity triggers
/// an automatic merge, because they are strong enough to assume identity.
pub const AUTO_MERGE_IDENTIFIER_TYPES: &[&str] = &["email", "canonical_url", "url"];

pub fn is_auto_merge_type(identifier_type: &str) -> bool {
	AUTO_MERGE_IDENTIFIER_TYPES.contains(&identifier_type)
}

/// Normalize a raw value for the given identifier type.
pub fn normalize(identifier_type: &str, value: &str) -> String {
	let identifier_type = identifier_type.trim().to_lowercase();
	let value = value.trim();

	match identifier_type.as_str() {
		"twitter_handle" | "github_handle" | "handle" => {
			value.strip_prefix('@').unwrap_or(value).to_lowercase()
		}
		"email" => value.to_lowercase(),
		"domain" => normalize_domain(value),
		"linkedin_url" | "url" | "canonical_url" => normalize_url_like(value),
		"name" => value.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" "),
		_ => value.to_lowercase(),
	}
}

fn strip_www(host: &str) -> &str {
	// Strip one literal "www." prefix, not a run of 'w'/'.' characters. The
	// system this was distilled from used a character-class strip here,
	// which would mangle inputs like "wwww.example.com".
	host.strip_prefix("www.").unwrap_or(host)
}

fn normalize_domain(value: &str) -> String {
	let lowered = value.to_lowercase();
	if lowered.starts_with("http://") || lowered.starts_with("https://") {
		if let Ok(parsed) = Url::parse(&lowered) {
			if let Some(host) = parsed.host_str() {
				return strip_www(host).to_string();
			}
		}
		return lowered;
	}
	strip_www(&lowered).to_string()
}

fn normalize_url_like(value: &str) -> String {
	let has_scheme = value.contains("://");
	if has_scheme {
		if let Ok(parsed) = Url::parse(value) {
			let host = strip_www(&parsed.host_str().unwrap_or("").to_lowercase()).to_string();
			let path = parsed.path().trim_end_matches('/');
			return format!("{host}{path}").to_lowercase();
		}
	}
	value.to_lowercase().trim_end_matches('/').to_string()
}

#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;

	#[test]
	fn handle_strips_at_and_lowercases() {
		assert_eq!(normalize("twitter_handle", "@Alice"), "alice");
		assert_eq!(normalize("handle", "Bob"), "bob");
	}

	#[test]
	fn email_lowercases_only() {
		assert_eq!(normalize("email", "  Test@Example.com "), "test@example.com");
	}

	#[test]
	fn domain_strips_scheme_and_single_www_prefix() {
		assert_eq!(normalize("domain", "https://www.example.com"), "example.com");
		assert_eq!(normalize("domain", "WWW.Example.com"), "example.com");
		// only one literal "www." prefix is removed, unlike a character-class strip
		assert_eq!(normalize("domain", "wwww.example.com"), "ww.example.com");
	}

	#[test]
	fn canonical_url_coalesces_scheme_and_www_variants() {
		let a = normalize("canonical_url", "https://example.com/u/alice/");
		let b = normalize("canonical_url", "http://www.example.com/u/alice");
		assert_eq!(a, b);
		assert_eq!(a, "example.com/u/alice");
	}

	#[test]
	fn url_like_without_scheme_falls_back_to_trim_lowercase() {
		assert_eq!(normalize("url", "Example.COM/Path/"), "example.com/path");
	}

	#[test]
	fn name_collapses_internal_whitespace() {
		assert_eq!(normalize("name", "  Ada   Lovelace "), "ada lovelace");
	}

	#[test]
	fn unknown_type_falls_back_to_trim_lowercase() {
		assert_eq!(normalize("WalletChain", " 0xABC "), "0xabc");
	}

	#[test]
	fn normalize_is_idempotent() {
		for (t, v) in [
			("email", "Test@EXAMPLE.com"),
			("domain", "https://www.example.com"),
			("canonical_url", "https://www.example.com/a/b/"),
			("twitter_handle", "@Foo"),
			("name", "  Jane   Doe  "),
		] {
			let once = normalize(t, v);
			let twice = normalize(t, &once);
			assert_eq!(once, twice, "not idempotent for {t}");
		}
	}

	#[test]
	fn auto_merge_set_has_expected_types() {
		assert!(is_auto_merge_type("email"));
		assert!(is_auto_merge_type("canonical_url"));
		assert!(is_auto_merge_type("url"));
		assert!(!is_auto_merge_type("domain"));
		assert!(!is_auto_merge_type("twitter_handle"));
	}
}
