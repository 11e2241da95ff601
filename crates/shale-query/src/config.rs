use serde::{Deserialize, Serialize};

/// Limits applied while evaluating filters and sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of keys in a sort specification.
    pub max_sort_keys: usize,
    /// Upper bound, in bytes, on a compiled `$regex` program.
    pub regex_size_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_sort_keys: 32,
            regex_size_limit: 10 * (1 << 20),
        }
    }
}
