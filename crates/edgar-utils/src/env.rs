//! Environment variable helpers
//!
//! Blank values are treated the same as unset ones.

use std::str::FromStr;
use tracing::warn;

/// Read a non-empty variable
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable or fall back to `default`
pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset or unparsable
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable value for {}: {:?}", key, raw);
            default
        }),
        None => default,
    }
}
