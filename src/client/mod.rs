//! Lookup client split into focused submodules.
//!
//! The `NavClient` struct and its methods are organized by workflow step:
//! - [`discovery`] - Start page → iframe → form scan, memoized per client
//! - [`upload`] - Multipart upload and download-link scan
//! - [`download`] - Result file fetch, charset handling, line parsing
//! - [`stream`] - Chunked multi-worker lookups over a line-oriented reader

mod discovery;
mod download;
mod stream;
mod upload;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::context::CallContext;
use crate::error::{Error, LookupFailure, Result};
use crate::types::{MAX_RECORD_COUNT, SessionParams, TaxRecord};
use crate::validation;
use std::sync::Arc;
use tracing::Instrument;

/// Client for the bulk tax-number lookup (cloneable - all fields are shared)
///
/// Construct once and reuse: the upload session scraped from the service's
/// pages is cached for the client's lifetime after the first successful
/// discovery. A failed discovery is not cached and is retried by the next call.
#[derive(Clone)]
pub struct NavClient {
    /// Configuration (wrapped in Arc for sharing across workers)
    pub(crate) config: Arc<Config>,
    /// HTTP client (internally reference-counted and pooled)
    pub(crate) http: reqwest::Client,
    /// Session parameters, written once by the first successful discovery
    pub(crate) session: Arc<tokio::sync::OnceCell<SessionParams>>,
    /// Parent span for every call made through this client
    pub(crate) span: tracing::Span,
}

impl std::fmt::Debug for NavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavClient")
            .field("start_url", &self.config.start_url)
            .field("batch_size", &self.batch_size())
            .field("session_ready", &self.session.initialized())
            .finish()
    }
}

impl NavClient {
    /// Create a new client
    ///
    /// No network traffic happens here; discovery runs on the first lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nav_query::{CallContext, Config, NavClient};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = NavClient::new(Config::default())?;
    ///     let records = client
    ///         .lookup(&CallContext::new(), &["12345676", "13895459"])
    ///         .await?;
    ///     for record in records {
    ///         println!("{record}");
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
            session: Arc::new(tokio::sync::OnceCell::new()),
            span: tracing::Span::none(),
        })
    }

    /// Use `span` as the parent of the spans this client opens per call
    #[must_use]
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// The client's configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Identifiers per chunk in streaming lookups
    pub fn batch_size(&self) -> usize {
        self.config.effective_batch_size()
    }

    /// Look up a list of tax numbers in one upload
    ///
    /// Identifiers failing the local checksum are answered with
    /// `valid = false` records without touching the network. The rest are
    /// uploaded together; each one the service knows comes back as a
    /// `valid = true` record. Identifiers the service does not return get no
    /// record at all; see [`unanswered`](crate::types::unanswered).
    ///
    /// Records for invalid identifiers come first, then the service's records
    /// in result-file order.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupFailure`] carrying the invalid-identifier records
    /// gathered so far when more than [`MAX_RECORD_COUNT`] identifiers remain
    /// after validation, or when discovery, upload or download fails.
    pub async fn lookup<S>(
        &self,
        ctx: &CallContext,
        tax_numbers: &[S],
    ) -> std::result::Result<Vec<TaxRecord>, LookupFailure>
    where
        S: AsRef<str> + Sync,
    {
        let span = tracing::info_span!(
            parent: &self.span,
            "nav_lookup",
            requested = tax_numbers.len()
        );
        self.query(ctx, tax_numbers).instrument(span).await
    }

    /// Validate, then upload and download one batch; shared by the bulk and streaming calls
    pub(crate) async fn query<S>(
        &self,
        ctx: &CallContext,
        tax_numbers: &[S],
    ) -> std::result::Result<Vec<TaxRecord>, LookupFailure>
    where
        S: AsRef<str> + Sync,
    {
        let parts = validation::partition(tax_numbers);
        let mut records: Vec<TaxRecord> = parts
            .invalid
            .iter()
            .map(|id| TaxRecord::invalid(*id))
            .collect();
        if !records.is_empty() {
            tracing::debug!(invalid = records.len(), "Rejected tax numbers failing the checksum");
        }

        if parts.to_query.is_empty() {
            return Ok(records);
        }
        if parts.to_query.len() > MAX_RECORD_COUNT {
            let count = parts.to_query.len();
            tracing::warn!(count, max = MAX_RECORD_COUNT, "Too many tax numbers for one upload");
            return Err(LookupFailure::new(
                records,
                Error::TooManyRecords {
                    count,
                    max: MAX_RECORD_COUNT,
                },
            ));
        }

        match self.fetch_records(ctx, &parts.to_query).await {
            Ok(found) => {
                records.extend(found);
                Ok(records)
            }
            Err(error) => Err(LookupFailure::new(records, error)),
        }
    }

    /// Session → upload → download for identifiers that passed validation
    async fn fetch_records(&self, ctx: &CallContext, tax_numbers: &[&str]) -> Result<Vec<TaxRecord>> {
        let session = self.session(ctx).await?;
        let download_url = self.upload_batch(ctx, session, tax_numbers).await?;
        self.download_results(ctx, &download_url).await
    }
}
