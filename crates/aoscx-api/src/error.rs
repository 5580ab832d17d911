use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Top-level error type for the `aoscx-api` crate.
///
/// Splits failures into the four classes callers need to react to
/// differently: input rejected before any network call (`Validation`),
/// unexpected device responses (`Remote`), unresolved dependencies between
/// resources (`Reconciliation`), and undecodable bodies (`Decode`).
/// Transport faults are ordinary recoverable values, never fatal.
#[derive(Debug, Error)]
pub enum Error {
    // ── Input ───────────────────────────────────────────────────────
    /// Malformed input caught before any request was issued
    /// (bad interface name, bad admin state, bad IP syntax, missing
    /// required identity field).
    #[error("validation failed: {message}")]
    Validation { message: String },

    // ── Device responses ────────────────────────────────────────────
    /// Unexpected HTTP status from a read or write. Carries the literal
    /// status text plus any structured error detail the device reported.
    #[error("unexpected switch response ({status}): {detail}")]
    Remote { status: String, detail: String },

    /// A dependency (VLAN or interface) could not be resolved or
    /// auto-created before the dependent resource was committed.
    #[error("dependency could not be resolved: {message}")]
    Reconciliation { message: String },

    /// Response body was not valid JSON where JSON was expected.
    /// Keeps the raw body for debugging.
    #[error("failed to decode response body: {message}")]
    Decode { message: String, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Login or logout rejected by the switch.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Local I/O ───────────────────────────────────────────────────
    /// A configuration file could not be read or written.
    #[error("config file error for {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Build a `Validation` error from any displayable message.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build a `Remote` error preserving the literal status text
    /// (e.g. `"404 Not Found"`).
    pub(crate) fn remote(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Remote {
            status: status_text(status),
            detail: detail.into(),
        }
    }

    /// Build a `Reconciliation` error from any displayable message.
    pub(crate) fn reconciliation(message: impl Into<String>) -> Self {
        Self::Reconciliation {
            message: message.into(),
        }
    }

    /// Returns `true` if this error came from a 404 response.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Remote { status, .. } => status.starts_with("404"),
            Self::Transport(e) => e.status() == Some(StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Literal status text for a response, e.g. `"204 No Content"`.
pub(crate) fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}
