use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following SIGHTLINE-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Warehouse connection errors
/// - **2000-2999**: Report/query errors
/// - **3000-3999**: Configuration errors
/// - **4000-4999**: Warehouse credential errors
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions (semver contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Connection Errors (1000-1999) ===
    /// SIGHTLINE-1001: Warehouse unreachable (network/connect failure)
    WarehouseUnavailable = 1001,
    /// SIGHTLINE-1002: Warehouse call exceeded its timeout
    ConnectionTimeout = 1002,

    // === Report/Query Errors (2000-2999) ===
    /// SIGHTLINE-2001: Warehouse rejected or failed to execute the query
    QueryExecution = 2001,
    /// SIGHTLINE-2002: Requested dated table absent from the warehouse listing
    TableNotFound = 2002,
    /// SIGHTLINE-2003: Report name not registered in the catalog
    UnknownReport = 2003,
    /// SIGHTLINE-2004: No tables match the configured prefix
    DatasetEmpty = 2004,

    // === Configuration Errors (3000-3999) ===
    /// SIGHTLINE-3001: Configuration unreadable or invalid
    InvalidConfig = 3001,
    /// SIGHTLINE-3002: Service-account key file unreadable or malformed
    MissingCredentials = 3002,

    // === Credential Errors (4000-4999) ===
    /// SIGHTLINE-4001: Token exchange refused by the identity provider
    CredentialRejected = 4001,

    // === Internal Errors (5000-5999) ===
    /// SIGHTLINE-5001: Serialization/deserialization failed
    SerializationFailed = 5001,

    /// SIGHTLINE-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "SIGHTLINE-2002")
    pub fn as_str(&self) -> String {
        format!("SIGHTLINE-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Report,
            3000..=3999 => ErrorCategory::Config,
            4000..=4999 => ErrorCategory::Credential,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        // Parse "SIGHTLINE-XXXX" format
        let num: u16 = s
            .strip_prefix("SIGHTLINE-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::WarehouseUnavailable),
            1002 => Ok(Self::ConnectionTimeout),
            2001 => Ok(Self::QueryExecution),
            2002 => Ok(Self::TableNotFound),
            2003 => Ok(Self::UnknownReport),
            2004 => Ok(Self::DatasetEmpty),
            3001 => Ok(Self::InvalidConfig),
            3002 => Ok(Self::MissingCredentials),
            4001 => Ok(Self::CredentialRejected),
            5001 => Ok(Self::SerializationFailed),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, used by the route layer for status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Connection,
    Report,
    Config,
    Credential,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_formatting() {
        assert_eq!(ErrorCode::WarehouseUnavailable.as_str(), "SIGHTLINE-1001");
        assert_eq!(ErrorCode::TableNotFound.as_str(), "SIGHTLINE-2002");
        assert_eq!(ErrorCode::Unknown.as_str(), "SIGHTLINE-9999");
    }

    #[test]
    fn test_error_code_parsing() {
        assert_eq!(
            ErrorCode::try_from("SIGHTLINE-2003".to_string()).unwrap(),
            ErrorCode::UnknownReport
        );
        assert_eq!(
            ErrorCode::try_from("SIGHTLINE-9999".to_string()).unwrap(),
            ErrorCode::Unknown
        );
    }

    #[test]
    fn test_error_code_parsing_errors() {
        assert!(ErrorCode::try_from("INVALID".to_string()).is_err());
        assert!(ErrorCode::try_from("SIGHTLINE-0000".to_string()).is_err());
        assert!(ErrorCode::try_from("SIGHTLINE-ABC".to_string()).is_err());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ErrorCode::WarehouseUnavailable.category(),
            ErrorCategory::Connection
        );
        assert_eq!(ErrorCode::QueryExecution.category(), ErrorCategory::Report);
        assert_eq!(ErrorCode::InvalidConfig.category(), ErrorCategory::Config);
        assert_eq!(
            ErrorCode::CredentialRejected.category(),
            ErrorCategory::Credential
        );
        assert_eq!(ErrorCode::Unknown.category(), ErrorCategory::Internal);
    }
}
