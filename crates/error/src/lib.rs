//! # sightline-error
//!
//! Unified error types for the Sightline KPI gateway.
//!
//! All errors carry:
//! - Numeric error codes (SIGHTLINE-XXXX)
//! - Structured JSON context
//! - Actionable hints for dashboard operators

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;
pub use convert::find_closest_match;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all Sightline operations.
///
/// Serialized verbatim as the HTTP error body by the route layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightlineError {
    /// Numeric error code (e.g., "SIGHTLINE-2002")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Actionable suggestion for the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl SightlineError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add an actionable hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Serialize to JSON for API responses
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize SightlineError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for SightlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for SightlineError {}

/// Result type alias for Sightline operations
pub type Result<T> = std::result::Result<T, SightlineError>;
