use serde::{Deserialize, Serialize};

/// A single result row as returned by the warehouse, pass-through JSON.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Metadata for a table in the warehouse dataset listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableMeta {
    /// Table id within the dataset (e.g. `events_20240115`)
    pub id: String,
    /// Warehouse table kind, when reported (e.g. `TABLE`, `VIEW`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TableMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }
}

/// Public description of a registered report, served by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDescriptor {
    pub name: String,
    pub label: String,
    /// `snapshot` (pins the latest resolved shard) or `wildcard`
    /// (aggregates across all event shards)
    pub scope: String,
}
