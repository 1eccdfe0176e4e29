//! # Error Contexts
//!
//! Structured metadata for errors to enable programmatic analysis by
//! dashboard clients and operators.

use serde::{Deserialize, Serialize};

/// Structured context attached to a [`crate::SightlineError`].
///
/// Each variant provides specific fields relevant to that error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for SIGHTLINE-2002 (TableNotFound)
    TableNotFound {
        table: String,
        selector: Option<String>,
        available_tables: Vec<String>,
    },

    /// Context for SIGHTLINE-2003 (UnknownReport)
    UnknownReport {
        report: String,
        available_reports: Vec<String>,
    },

    /// Context for SIGHTLINE-2004 (DatasetEmpty)
    DatasetEmpty { dataset: String, prefix: String },

    /// Context for warehouse errors (SIGHTLINE-1001, 1002, 2001)
    Warehouse {
        endpoint: String,
        status: Option<u16>,
    },

    /// Context for SIGHTLINE-3001/3002 (config errors)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}
