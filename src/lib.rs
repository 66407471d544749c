//! # Kennwort Client
//! Asynchronous wrapper around the Kennwort transactional email HTTP API: send template or
//! raw-body emails, check delivery status, and list senders and templates using [`Client`]
//! and [`ClientBuilder`].
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest`.
//!
//! ## Responses
//! Every operation returns the decoded JSON body as a [`serde_json::Value`] without checking
//! it against a schema. The HTTP status code is not inspected, so error payloads from the
//! service are returned like any other value; look at the body to tell them apart.
//!
//! ## Errors
//! An empty token fails at construction with [`Error::Config`]. Network failures surface as
//! [`Error::Transport`] and bodies that are not JSON as [`Error::Decode`]. Nothing is
//! retried. The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Logging
//! Requests and responses are reported through `tracing` at `debug` level, non-success
//! statuses at `warn`. The token is never logged.
//!
//! ## Example
//! ```no_run
//! use kennwort_client::{Client, Page};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kennwort_client::Error> {
//!     let client = Client::new("my-token")?;
//!
//!     let sent = client
//!         .send_template_email("welcome", "anna@example.com", &json!({ "name": "Anna" }))
//!         .await?;
//!     println!("Sent: {sent}");
//!
//!     let templates = client.list_templates(Page::default()).await?;
//!     println!("Templates: {templates}");
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod models;

pub use client::{Client, ClientBuilder};
pub use error::Error;
pub use models::{Page, Recipient};

/// Result type alias for Kennwort operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
