//! Exempt-identity allowlist.
//!
//! Identities on this list may hold multiple concurrent sessions and are
//! never pruned for chronic non-voting. Patterns support `*` wildcards
//! (`*@ops.example.org`) and are NFKC-normalized and lowercased so that
//! visually equivalent identities match consistently.

use std::env;

use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Default)]
pub struct IdentityAllowlist {
    patterns: Vec<String>,
}

impl IdentityAllowlist {
    pub fn new<I>(patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// Load a comma-separated allowlist from `var`. Missing or empty means
    /// an empty allowlist (nobody exempt).
    pub fn from_env(var: &str) -> Self {
        match env::var(var) {
            Ok(raw) => Self::new(raw.split(',')),
            Err(_) => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        let identity = normalize(identity);
        self.patterns.iter().any(|p| matches(&identity, p))
    }
}

fn normalize(value: &str) -> String {
    value.trim().nfkc().collect::<String>().to_lowercase()
}

/// Match `candidate` against `pattern`, where `*` spans any run of
/// characters. The first segment anchors at the start, the last at the
/// end, and middle segments must appear in order.
fn matches(candidate: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return candidate == pattern;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let last_idx = segments.len() - 1;

    let Some(mut rest) = candidate.strip_prefix(segments[0]) else {
        return false;
    };
    for segment in &segments[1..last_idx] {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(segments[last_idx])
}
