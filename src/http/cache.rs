//! Entity tags for static files
//!
//! Revalidation only: the server never caches content itself, it lets the
//! browser skip a download when a file is unchanged.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strong `ETag` derived from file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag(String);

impl ETag {
    pub fn for_content(content: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Self(format!("\"{:x}-{:x}\"", content.len(), hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Weak comparison against an `If-None-Match` header value
    ///
    /// Accepts `*`, comma-separated lists and `W/`-prefixed tags.
    pub fn matches(&self, if_none_match: Option<&str>) -> bool {
        if_none_match.is_some_and(|header| {
            header.split(',').map(str::trim).any(|candidate| {
                candidate == "*" || candidate.trim_start_matches("W/") == self.0
            })
        })
    }
}
