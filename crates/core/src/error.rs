//! Unified error types for the analytics pipeline.
//!
//! Error codes:
//! - VALID_001-002: Ingestion payload errors
//! - PARAM_001-002: Dashboard query parameter errors
//! - SESSION_001: Session persistence errors
//! - STORE_001-002: Store Adapter errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes exposed in the JSON error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// VALID_001: Payload is not a JSON object of the expected shape
    MalformedPayload,
    /// VALID_002: Event type is not in the recognized set
    InvalidEventType,
    /// PARAM_001: Detail view called without its identifying key
    MissingParameter,
    /// PARAM_002: Numeric query parameter outside its allowed range
    ParameterOutOfRange,
    /// SESSION_001: Session or projection write failed
    SessionPersist,
    /// STORE_001: Backing store unreachable or rejected the operation
    StoreUnavailable,
    /// STORE_002: Stored item could not be decoded into a record
    MalformedRecord,
}

impl ErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "VALID_001",
            Self::InvalidEventType => "VALID_002",
            Self::MissingParameter => "PARAM_001",
            Self::ParameterOutOfRange => "PARAM_002",
            Self::SessionPersist => "SESSION_001",
            Self::StoreUnavailable => "STORE_001",
            Self::MalformedRecord => "STORE_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedPayload
            | Self::InvalidEventType
            | Self::MissingParameter
            | Self::ParameterOutOfRange => 400,
            Self::SessionPersist | Self::MalformedRecord => 500,
            Self::StoreUnavailable => 503,
        }
    }
}

/// Unified error type for the analytics pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid event type '{value}', expected one of: {}", allowed.join(", "))]
    InvalidEventType {
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("parameter '{name}' = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("failed to persist session {session_id}: {message}")]
    SessionPersist { session_id: String, message: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn malformed_record(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a session persistence error for the given session.
    pub fn session_persist(session_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SessionPersist {
            session_id: session_id.into(),
            message: msg.into(),
        }
    }

    /// Get the coded classification, if this error has one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::MalformedPayload(_) => Some(ErrorCode::MalformedPayload),
            Self::InvalidEventType { .. } => Some(ErrorCode::InvalidEventType),
            Self::MissingParameter(_) => Some(ErrorCode::MissingParameter),
            Self::ParameterOutOfRange { .. } => Some(ErrorCode::ParameterOutOfRange),
            Self::SessionPersist { .. } => Some(ErrorCode::SessionPersist),
            Self::StoreUnavailable(_) => Some(ErrorCode::StoreUnavailable),
            Self::MalformedRecord(_) => Some(ErrorCode::MalformedRecord),
            Self::Serialization(_) | Self::Internal(_) => None,
        }
    }

    /// Get the error code string for the JSON envelope.
    pub fn code(&self) -> &'static str {
        match self.error_code() {
            Some(code) => code.code(),
            None => match self {
                Self::Serialization(_) => "VALID_001",
                _ => "INTERNAL",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self.error_code() {
            Some(code) => code.http_status(),
            None => match self {
                Self::Serialization(_) => 400,
                _ => 500,
            },
        }
    }

    /// Whether the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}
