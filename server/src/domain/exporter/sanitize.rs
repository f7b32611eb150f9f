//! Exposition-safe names
//!
//! CloudWatch namespaces, metric names and dimension names may contain
//! characters the exposition format does not allow (`/`, `.`, `-`, spaces).
//! Those become `_`, then the result is converted to snake_case.

use std::sync::OnceLock;

use heck::ToSnakeCase;
use regex::Regex;

static RE_INVALID: OnceLock<Regex> = OnceLock::new();

/// Map an arbitrary catalog name to a snake_case identifier
///
/// Dimension values are never passed through here.
pub fn sanitize(raw: &str) -> String {
    let re = RE_INVALID.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_:]").expect("Invalid regex"));
    re.replace_all(raw, "_").to_snake_case()
}
