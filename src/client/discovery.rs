//! Session discovery: start page → iframe target → upload form fields.

use std::collections::BTreeMap;

use tracing::{debug, info};
use url::Url;

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::markup::TagScanner;
use crate::types::SessionParams;

use super::NavClient;
use super::download::read_text;

/// Fields collected from the upload form
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ScannedForm {
    pub(super) fields: BTreeMap<String, Vec<String>>,
    pub(super) upload_field: String,
}

/// `src` of the first iframe that has one
pub(super) fn find_iframe_src(markup: &str) -> Option<String> {
    TagScanner::new(markup)
        .filter(|tag| tag.is("iframe"))
        .find_map(|tag| tag.attr("src").map(str::to_string))
}

/// Collect every `input` after the first `form` tag.
///
/// The page does not reliably close its form before the last inputs, so the
/// scan runs to the end of the document instead of stopping at `</form>`.
pub(super) fn scan_form(markup: &str) -> ScannedForm {
    let mut scanner = TagScanner::new(markup);
    let mut form = ScannedForm::default();
    if scanner.skip_to("form").is_none() {
        return form;
    }

    for input in scanner.filter(|tag| tag.is("input")) {
        let Some(name) = input.attr("name") else {
            continue;
        };
        let kind = input.attr("type").unwrap_or_default();
        if kind.eq_ignore_ascii_case("file") {
            form.upload_field = name.to_string();
        } else {
            form.fields
                .entry(name.to_string())
                .or_default()
                .push(input.attr("value").unwrap_or_default().to_string());
        }
    }
    form
}

impl NavClient {
    /// Session parameters, discovering them on first use.
    ///
    /// Concurrent callers wait for a single in-flight discovery. Only a
    /// successful result is cached; after a failure the next caller retries.
    pub(crate) async fn session(&self, ctx: &CallContext) -> Result<&SessionParams> {
        self.session.get_or_try_init(|| self.discover(ctx)).await
    }

    /// Scrape the start page and the upload form
    pub(crate) async fn discover(&self, ctx: &CallContext) -> Result<SessionParams> {
        let start = self.config.start_url.as_str();
        info!(url = start, "Discovering upload session");

        let (page_url, page) = self
            .fetch_page(ctx, start)
            .await
            .map_err(|e| Error::discovery(start, e))?;
        let src = find_iframe_src(&page).ok_or_else(|| {
            Error::discovery(
                start,
                Error::IframeNotFound {
                    page: page_url.to_string(),
                },
            )
        })?;
        let form_url = page_url.join(&src).map_err(|source| {
            Error::discovery(
                start,
                Error::InvalidUrl {
                    url: src.clone(),
                    source,
                },
            )
        })?;
        debug!(url = %form_url, "Found upload iframe");

        let (_, form_page) = self
            .fetch_page(ctx, form_url.as_str())
            .await
            .map_err(|e| Error::discovery(form_url.as_str(), e))?;
        let form = scan_form(&form_page);
        if form.upload_field.is_empty() {
            return Err(Error::discovery(
                form_url.as_str(),
                Error::UploadFieldMissing {
                    page: form_url.to_string(),
                },
            ));
        }

        let params = SessionParams {
            url: form_url.to_string(),
            fields: form.fields,
            upload_field: form.upload_field,
        };
        info!(
            url = %params.url,
            fields = params.fields.len(),
            upload_field = %params.upload_field,
            "Resolved upload session"
        );
        Ok(params)
    }

    /// GET a page, returning its final URL (after redirects) and decoded body
    async fn fetch_page(&self, ctx: &CallContext, url: &str) -> Result<(Url, String)> {
        ctx.checkpoint()?;
        let response = ctx
            .bound(self.http.get(url), self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ctx.classify(e))?;
        ctx.checkpoint()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                method: "GET",
                url: url.to_string(),
                status: status.to_string(),
            });
        }
        let final_url = response.url().clone();
        let body = read_text(ctx, response).await?;
        Ok((final_url, body))
    }
}
