//! Contract identity resolution from raw source text.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;

use crate::core::types::ContractIdentity;

/// Prefix of identities synthesized when no declaration is found.
pub const SYNTHETIC_PREFIX: &str = "Contract_";

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"contract (\w+)\s*\{").expect("declaration pattern should be valid")
});

/// Resolve the identity of `source` using the current local time for the fallback.
pub fn resolve_identity(source: &str) -> ContractIdentity {
    resolve_identity_at(source, Local::now())
}

/// Resolve the identity of `source`.
///
/// Returns the identifier of the first `contract <Name> {` occurrence. The match is
/// textual: commented-out or nested declarations are accepted as-is. Without a
/// match the name is `Contract_<YYYYmmddHHMMSS>` taken from `now`.
pub fn resolve_identity_at<Tz>(source: &str, now: DateTime<Tz>) -> ContractIdentity
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let name = match DECLARATION_RE.captures(source).and_then(|caps| caps.get(1)) {
        Some(ident) => ident.as_str().to_string(),
        None => format!("{SYNTHETIC_PREFIX}{}", now.format("%Y%m%d%H%M%S")),
    };
    ContractIdentity { name }
}
