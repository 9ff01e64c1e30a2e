//! Error types for the API client.
//!
//! # Design
//! Two failure kinds reach callers. `CantConnect` means no exchange with the
//! server took place at all (bad target URL, DNS, refused connection).
//! `Transfer` means the server was reached but the exchange failed at the
//! application layer: it rejected the request, or its answer could not be
//! read or parsed. `InvalidHeader` covers the one request the client refuses
//! to send: a header that cannot be written. No retries happen here; callers
//! decide.

use std::io;

use thiserror::Error;

/// Boxed low-level cause carried by `ApiError::CantConnect`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by request construction and dispatch.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The connection could not be created or opened.
    #[error("cannot connect to {target}")]
    CantConnect {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A header name or value cannot be written on the wire (control
    /// characters, empty name). Detected before any connection is made.
    #[error("header {name:?} cannot be sent")]
    InvalidHeader { name: String },

    /// The server was reached but the exchange failed.
    #[error(transparent)]
    Transfer(#[from] TransferIssue),
}

impl ApiError {
    pub(crate) fn cant_connect(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ApiError::CantConnect {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn is_cant_connect(&self) -> bool {
        matches!(self, ApiError::CantConnect { .. })
    }

    pub fn transfer_issue(&self) -> Option<&TransferIssue> {
        match self {
            ApiError::Transfer(issue) => Some(issue),
            ApiError::CantConnect { .. } | ApiError::InvalidHeader { .. } => None,
        }
    }
}

/// Failures of an exchange that did reach the server.
#[derive(Debug, Error)]
pub enum TransferIssue {
    /// Non-success status. `error_body` is the server's error stream, drained;
    /// it is empty when the server sent none.
    #[error("server rejected the request with HTTP {status}")]
    Rejected { status: u16, error_body: Vec<u8> },

    /// Reading the response stream failed midway.
    #[error("I/O error while reading the response")]
    Io(#[source] io::Error),

    /// The response is not well-formed JSON. `text` is everything received.
    #[error("response is not valid JSON ({length} characters received): {text}")]
    NotJson {
        text: String,
        length: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl TransferIssue {
    /// Raw error payload of a rejected request.
    pub fn error_body(&self) -> Option<&[u8]> {
        match self {
            TransferIssue::Rejected { error_body, .. } => Some(error_body),
            _ => None,
        }
    }

    /// Error payload of a rejected request, parsed, when the server sent JSON.
    pub fn error_json(&self) -> Option<serde_json::Value> {
        self.error_body()
            .and_then(|body| serde_json::from_slice(body).ok())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransferIssue::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors loading `ApiConfig` from the process environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown environment {0:?}, expected \"production\" or \"testing\"")]
    UnknownEnvironment(String),

    #[error("invalid test port {value:?}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
