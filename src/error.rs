//! # Error Handling
//!
//! This module defines the application's error taxonomy and how errors are
//! converted to HTTP responses on the server side.
//!
//! ## Error Categories:
//! - **Connection**: transport-level failure during connect/send/receive.
//!   Terminal for the session; there is no retry or reconnect policy.
//! - **Protocol**: a decodable control frame with an unrecognized or missing
//!   `type`. Terminal for that connection only, signaled with an abnormal
//!   close code.
//! - **Config**: invalid encoding name, missing input file, or invalid
//!   configuration values. Detected before any connection or bind attempt.
//! - **Persistence**: a storage write failed while flushing a capture.
//! - **Internal**: everything else (the catch-all for wrapped errors).
//!
//! ## Scoping:
//! Streamer-side errors abort the single in-flight session. Server-side
//! errors are scoped to the offending connection; only an unrecoverable
//! startup failure (e.g. the listening port is already bound) takes the
//! whole process down.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// Each variant holds a human-readable message with enough context (which
/// stage, which file or connection) to diagnose a failure from the logs.
#[derive(Debug)]
pub enum AppError {
    /// Transport-level failure during connect, send, or receive
    Connection(String),

    /// A decodable control frame carried an unrecognized or missing type
    Protocol(String),

    /// Invalid configuration, encoding name, or source payload path
    Config(String),

    /// Storage write failure while flushing captured audio
    Persistence(String),

    /// Internal errors that don't fit the other categories
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Connection(msg) => write!(f, "Connection error: {}", msg),
            AppError::Protocol(msg) => write!(f, "Protocol violation: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts application errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - Protocol → 400 (Bad Request)
/// - Connection → 502 (Bad Gateway)
/// - Config/Persistence/Internal → 500 (Internal Server Error)
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "protocol_violation",
///     "message": "unrecognized control message",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Connection(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "connection_error",
                msg.clone(),
            ),
            AppError::Protocol(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "protocol_violation",
                msg.clone(),
            ),
            AppError::Config(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::Persistence(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_error",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON decode failures on control frames are protocol violations: the frame
/// was structured enough to parse but didn't match any defined shape.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Protocol(format!("control message decode failed: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// WebSocket transport errors from the streamer's client connection.
impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::Connection(err.to_string())
    }
}

/// I/O failures surface while writing captures to disk.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = AppError::Config("unsupported encoding 'mp3'".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: unsupported encoding 'mp3'"
        );

        let err = AppError::Protocol("unexpected type 'Bogus'".to_string());
        assert!(err.to_string().contains("Bogus"));
    }

    #[test]
    fn test_json_error_maps_to_protocol() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let app_err: AppError = parse_err.into();
        assert!(matches!(app_err, AppError::Protocol(_)));
    }

    #[test]
    fn test_io_error_maps_to_persistence() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Persistence(_)));
    }
}
