//! # nav-query
//!
//! Concurrent batch client for the Hungarian tax authority's bulk
//! tax-number lookup.
//!
//! The authority publishes no API for the lookup, only an HTML page with an
//! upload form. This crate drives that page the way a browser would:
//!
//! 1. **Discovery** - fetch the start page, follow its iframe to the upload
//!    form and scrape the form's fields (once per client, cached)
//! 2. **Upload** - post the identifiers as a multipart file upload
//! 3. **Download** - follow the result link and parse the `;`-delimited
//!    result file, decoding the legacy 8-bit encoding the service uses
//!
//! Identifiers failing the local checksum are answered without any network
//! traffic. Large inputs can be streamed: [`NavClient::lookup_stream`] cuts
//! a line-oriented reader into chunks and runs them through a worker pool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nav_query::{CallContext, Config, NavClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NavClient::new(Config::default())?;
//!     let ctx = CallContext::with_timeout(Duration::from_secs(60));
//!
//!     match client.lookup(&ctx, &["12345676", "13895459"]).await {
//!         Ok(records) => {
//!             for record in records {
//!                 println!("{record}");
//!             }
//!         }
//!         Err(failure) => {
//!             eprintln!("lookup failed: {}", failure.error);
//!             for record in failure.partial {
//!                 println!("{record}");
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber. Pass
//! a span to [`NavClient::with_span`] to parent every call's span under it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Lookup client (decomposed into workflow-step submodules)
pub mod client;
/// Configuration types
pub mod config;
/// Per-call cancellation and deadlines
pub mod context;
/// Error types
pub mod error;
/// Start-tag scanning over service pages
pub mod markup;
/// Core types and limits
pub mod types;
/// Local checksum validation
pub mod validation;

// Re-export commonly used types
pub use client::NavClient;
pub use config::{Config, DEFAULT_START_URL};
pub use context::CallContext;
pub use error::{Error, LookupFailure, Result};
pub use types::{
    BASE_LEN, DEFAULT_BATCH_SIZE, FULL_LEN, MAX_RECORD_COUNT, SessionParams, TaxRecord, unanswered,
};
pub use validation::{checksum, is_valid, partition};
