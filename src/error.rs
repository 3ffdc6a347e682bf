//! Error types for the linode-api crate.

use thiserror::Error;

/// Errors surfaced by operation dispatch and client construction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("API spec unavailable")]
    SpecUnavailable(#[source] SpecError),

    #[error("no API key set for {operation}; call user_getapikey or set a key first")]
    MissingCredential { operation: String },

    #[error("{name} is a required argument for {operation}")]
    MissingArgument { operation: String, name: String },

    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("transport failure")]
    Transport(#[from] TransportError),

    #[error("{message} ({code})")]
    Api { code: i64, message: String },
}

/// Why the API spec could not be turned into an operation table.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpecError {
    #[error("failed to fetch API spec")]
    Transport(#[from] TransportError),

    #[error("API spec is missing {field}")]
    MissingField { field: &'static str },

    #[error("API spec field {field} has an unexpected shape")]
    InvalidField { field: String },
}

/// Failures of a single HTTP round trip.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("HTTP request failed")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to read response body")]
    ResponseRead(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpError {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid JSON in response body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("unexpected response payload: {reason}")]
    UnexpectedPayload { reason: String },
}
