//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Trim trailing `*` wildcards to a plain prefix
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - A directory prefix (`/api/v1/menu/`) also matches its bare form (`/api/v1/menu`)

/// Strip a trailing wildcard from a route pattern.
pub fn normalize_prefix(pattern: &str) -> &str {
    pattern.trim_end_matches('*')
}

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher from a route pattern.
    pub fn new(pattern: impl AsRef<str>) -> Self {
        Self {
            prefix: normalize_prefix(pattern.as_ref()).to_string(),
        }
    }

    /// The effective prefix after wildcard trimming.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the path falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if path.starts_with(&self.prefix) {
            return true;
        }
        match self.prefix.strip_suffix('/') {
            Some(bare) if !bare.is_empty() => path == bare,
            _ => false,
        }
    }
}
