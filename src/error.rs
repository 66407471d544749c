//! Error types for the Kennwort client.

use thiserror::Error;

/// Errors that can occur during Kennwort API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The client could not be configured from the given settings.
    ///
    /// Raised only while building a [`Client`](crate::Client); a client that
    /// fails here is never handed out.
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// The HTTP exchange failed: connection, TLS, timeout or reading the body.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("Response is not valid JSON: {source} (body: {snippet})")]
    Decode {
        #[source]
        source: serde_json::Error,
        /// Leading part of the offending body.
        snippet: String,
    },

    /// Template params could not be encoded as JSON.
    #[error("Failed to encode template params: {0}")]
    Params(#[source] serde_json::Error),
}
