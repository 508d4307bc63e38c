// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Runtime identifier matching.

/// Selects this adapter for runtime identifiers such as `nodejs18.x` or `node20`.
#[derive(Debug, Clone)]
pub struct RuntimeMatcher {
    prefix: String,
}

impl RuntimeMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Case-sensitive prefix match.
    pub fn matches(&self, identifier: &str) -> bool {
        identifier.starts_with(&self.prefix)
    }
}

impl Default for RuntimeMatcher {
    fn default() -> Self {
        Self::new("node")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_node_family() {
        let matcher = RuntimeMatcher::default();
        assert!(matcher.matches("node18"));
        assert!(matcher.matches("nodejs20.x"));
        assert!(!matcher.matches("python3.11"));
        assert!(!matcher.matches("Node18"));
        assert!(!matcher.matches(""));
    }

    #[test]
    fn test_custom_prefix() {
        let matcher = RuntimeMatcher::new("nodejs");
        assert!(matcher.matches("nodejs22.x"));
        assert!(!matcher.matches("node18"));
    }
}
