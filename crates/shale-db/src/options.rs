use bson::Document;
use serde::{Deserialize, Serialize};

/// Arguments of a `find` as the command layer receives them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: u64,
    /// `0` means no limit.
    pub limit: u64,
}

/// Arguments of a `distinct`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistinctOptions {
    pub key: String,
    pub filter: Document,
}

/// Batch-level settings of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Stop at the first failed statement.
    pub ordered: bool,
    /// Insert a document when a statement matches nothing.
    pub upsert: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            ordered: true,
            upsert: false,
        }
    }
}
