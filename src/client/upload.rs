//! Batch upload: multipart form with the scraped fields plus the identifier file.

use reqwest::multipart::{Form, Part};
use tracing::debug;
use url::Url;

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::markup::TagScanner;
use crate::types::{SessionParams, base_of};

use super::NavClient;
use super::download::read_text;

/// File name the service expects for the uploaded list
pub(crate) const UPLOAD_FILE_NAME: &str = "adoszamok.txt";

/// `name` of the button whose `onclick` holds the result link
pub(crate) const DOWNLOAD_BUTTON: &str = "letolt";

/// Every upload endpoint the service has used is a PHP script
const SCRIPT_SUFFIX: &str = ".php";

/// Refuse session parameters that cannot come from a correct discovery
pub(super) fn ensure_uploadable(session: &SessionParams) -> Result<()> {
    if session.upload_field.is_empty() {
        return Err(Error::InvalidSession("empty upload field name".to_string()));
    }
    let is_script = Url::parse(&session.url)
        .map(|url| url.path().ends_with(SCRIPT_SUFFIX))
        .unwrap_or(false);
    if !is_script {
        return Err(Error::InvalidSession(format!(
            "upload URL {} is not a {} script",
            session.url, SCRIPT_SUFFIX
        )));
    }
    Ok(())
}

/// One line per identifier, cut to the 8-character base form
pub(super) fn upload_file_body(tax_numbers: &[&str]) -> Vec<u8> {
    let mut body = Vec::with_capacity(tax_numbers.len() * 9);
    for id in tax_numbers {
        body.extend_from_slice(base_of(id).as_bytes());
        body.push(b'\n');
    }
    body
}

/// Form fields (repeated for multi-valued names) followed by the file part
pub(super) fn build_form(session: &SessionParams, tax_numbers: &[&str]) -> Result<Form> {
    let mut form = Form::new();
    for (name, values) in &session.fields {
        for value in values {
            form = form.text(name.clone(), value.clone());
        }
    }
    let file = Part::bytes(upload_file_body(tax_numbers))
        .file_name(UPLOAD_FILE_NAME)
        .mime_str("application/octet-stream")
        .map_err(|e| Error::Multipart(e.to_string()))?;
    Ok(form.part(session.upload_field.clone(), file))
}

/// Text between the first quote character and the last occurrence of the same quote
fn quoted_argument(onclick: &str) -> &str {
    let Some(start) = onclick.find(['\'', '"']) else {
        return onclick;
    };
    let quote = char::from(onclick.as_bytes()[start]);
    let rest = &onclick[start + 1..];
    match rest.rfind(quote) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Resolve the download button's link against the page it was found on
pub(super) fn find_download_url(page: &Url, markup: &str) -> Result<Url> {
    let onclick = TagScanner::new(markup)
        .filter(|tag| tag.is("input") && tag.attr("name") == Some(DOWNLOAD_BUTTON))
        .find_map(|tag| tag.attr("onclick").map(str::to_string))
        .ok_or_else(|| Error::DownloadUrlNotFound {
            page: page.to_string(),
        })?;
    let target = quoted_argument(&onclick);
    page.join(target).map_err(|source| Error::InvalidUrl {
        url: target.to_string(),
        source,
    })
}

impl NavClient {
    /// Upload one batch and return the absolute link to its result file
    pub(crate) async fn upload_batch(
        &self,
        ctx: &CallContext,
        session: &SessionParams,
        tax_numbers: &[&str],
    ) -> Result<Url> {
        ensure_uploadable(session)?;
        let form = build_form(session, tax_numbers)?;

        ctx.checkpoint()?;
        debug!(url = %session.url, count = tax_numbers.len(), "Uploading tax numbers");
        let response = ctx
            .bound(
                self.http.post(&session.url).multipart(form),
                self.config.request_timeout,
            )
            .send()
            .await
            .map_err(|e| ctx.classify(e))?;
        ctx.checkpoint()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                method: "POST",
                url: session.url.clone(),
                status: status.to_string(),
            });
        }

        let page = response.url().clone();
        let body = read_text(ctx, response).await?;
        let download_url = find_download_url(&page, &body)?;
        debug!(url = %download_url, "Found result link");
        Ok(download_url)
    }
}
