//! Parse options

use serde::{Deserialize, Serialize};

/// Bounds on the work the parser does for ambiguity and error recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Maximum number of stack versions kept alive at once
    pub max_versions: usize,
    /// Maximum number of tokens one recovery may skip
    pub max_skipped_tokens: usize,
    /// Maximum number of stack entries one recovery may pop
    pub max_pop_depth: usize,
    /// Maximum number of reductions a version may perform on one lookahead
    pub max_reductions_per_token: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_versions: 6,
            max_skipped_tokens: 32,
            max_pop_depth: 16,
            max_reductions_per_token: 1024,
        }
    }
}

impl ParseOptions {
    /// Options from a JSON object; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    pub fn with_max_skipped_tokens(mut self, max_skipped_tokens: usize) -> Self {
        self.max_skipped_tokens = max_skipped_tokens;
        self
    }

    pub fn with_max_pop_depth(mut self, max_pop_depth: usize) -> Self {
        self.max_pop_depth = max_pop_depth;
        self
    }

    pub fn with_max_reductions_per_token(mut self, max_reductions_per_token: usize) -> Self {
        self.max_reductions_per_token = max_reductions_per_token.max(1);
        self
    }
}
