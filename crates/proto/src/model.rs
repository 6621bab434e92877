//! Catalog value types. Immutable once produced by the catalog adapter.

use chrono::{DateTime, Utc};

/// One entry of a remote search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModel {
    /// Repository identifier, e.g. `namespace/model-GGUF`.
    pub id: String,
    pub downloads: u64,
    pub likes: u64,
    /// Task tag such as `text-generation`.
    pub pipeline_tag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl RemoteModel {
    /// Creates an entry with only the identifier populated.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            downloads: 0,
            likes: 0,
            pipeline_tag: None,
            last_modified: None,
        }
    }
}

/// GGUF header summary published by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GgufInfo {
    pub architecture: Option<String>,
    pub context_length: Option<u64>,
    /// Total parameter bytes across the repository's weights.
    pub total: Option<u64>,
}

/// Full metadata for a single remote model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDetails {
    pub id: String,
    pub downloads: u64,
    pub likes: u64,
    pub pipeline_tag: Option<String>,
    pub license: Option<String>,
    pub gguf: Option<GgufInfo>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Repository file names.
    pub files: Vec<String>,
    /// Quantization labels extracted from `files`.
    pub quantizations: Vec<String>,
}
