//! Bulk write requests and responses.
//!
//! A bulk request is newline-delimited JSON: one action header line followed
//! by one document line per record, in insertion order.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;

/// Content type the store expects for bulk bodies.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Bulk operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Insert, failing per document if the id already exists.
    Create,
    /// Insert or overwrite.
    Index,
}

impl BulkAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Index => "index",
        }
    }
}

/// Target of one bulk operation.
#[derive(Debug, Clone)]
pub struct BulkTarget<'a> {
    /// Destination index.
    pub index: &'a str,
    /// Destination type.
    pub doc_type: &'a str,
    /// Explicit document id; the store generates one when absent.
    pub id: Option<&'a str>,
}

/// An NDJSON bulk request under construction.
#[derive(Debug, Default, Clone)]
pub struct BulkRequest {
    body: String,
    operations: usize,
}

impl BulkRequest {
    /// Creates an empty bulk request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one header/document pair.
    pub fn push(&mut self, action: BulkAction, target: &BulkTarget<'_>, doc: &Value) -> Result<()> {
        let mut meta = serde_json::Map::new();
        meta.insert("_index".to_string(), json!(target.index));
        meta.insert("_type".to_string(), json!(target.doc_type));
        if let Some(id) = target.id {
            meta.insert("_id".to_string(), json!(id));
        }

        let mut header = serde_json::Map::new();
        header.insert(action.as_str().to_string(), Value::Object(meta));
        self.body.push_str(&serde_json::to_string(&header)?);
        self.body.push('\n');
        self.body.push_str(&serde_json::to_string(doc)?);
        self.body.push('\n');
        self.operations += 1;
        Ok(())
    }

    /// Number of operations in the request.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations
    }

    /// Whether no operation was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations == 0
    }

    /// The encoded body.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Consumes the request, returning the encoded body.
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Bulk response from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Time taken in milliseconds.
    #[serde(default)]
    pub took: Option<u64>,
    /// Whether any item failed.
    #[serde(default)]
    pub errors: bool,
    /// Per-operation results, in request order.
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// Items the store rejected.
    pub fn failed_items(&self) -> impl Iterator<Item = &BulkItemStatus> {
        self.items
            .iter()
            .map(BulkItem::status)
            .filter(|status| !status.is_success())
    }
}

/// One bulk item result, keyed by its operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItem {
    /// Index result.
    Index(BulkItemStatus),
    /// Create result.
    Create(BulkItemStatus),
    /// Update result.
    Update(BulkItemStatus),
    /// Delete result.
    Delete(BulkItemStatus),
}

impl BulkItem {
    /// The status regardless of operation kind.
    #[must_use]
    pub fn status(&self) -> &BulkItemStatus {
        match self {
            Self::Index(s) | Self::Create(s) | Self::Update(s) | Self::Delete(s) => s,
        }
    }
}

/// Status of a bulk item operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemStatus {
    /// Index name.
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    /// Document type.
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    /// Document ID.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Result status, e.g. "created".
    #[serde(default)]
    pub result: Option<String>,
    /// HTTP status code of this item.
    pub status: u16,
    /// Error details as reported by the store.
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItemStatus {
    /// Check if the operation was successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}
