//! Result download and parsing of the `;`-delimited result file.

use encoding_rs::{Encoding, ISO_8859_2};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};
use url::Url;

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::types::TaxRecord;

use super::NavClient;

/// `charset` parameter of a `Content-Type` value, unquoted
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Encoding named by a `Content-Type` header.
///
/// Without a known `charset` the body is taken as ISO-8859-2: the service
/// serves Hungarian text in Latin-2 and rarely says so.
pub(crate) fn response_encoding(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(ISO_8859_2)
}

/// Read a response body and decode it; undecodable bytes become U+FFFD
pub(crate) async fn read_text(ctx: &CallContext, response: reqwest::Response) -> Result<String> {
    let encoding = response_encoding(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
    );
    let bytes = response.bytes().await.map_err(|e| ctx.classify(e))?;
    let (text, _, malformed) = encoding.decode(&bytes);
    if malformed {
        debug!(encoding = encoding.name(), "Body contained bytes invalid for its encoding");
    }
    Ok(text.into_owned())
}

/// Parse one result line: `<tax number>;<owner>[;...]`
fn parse_result_line(line: &str) -> Option<TaxRecord> {
    let (tax_number, rest) = line.trim().split_once(';')?;
    let owner = rest.split(';').next().unwrap_or_default();
    Some(TaxRecord::found(tax_number.trim_end_matches(' '), owner))
}

/// Every line with at least one `;` becomes a record, in file order
pub(crate) fn parse_result_document(text: &str) -> Vec<TaxRecord> {
    text.lines().filter_map(parse_result_line).collect()
}

impl NavClient {
    /// Fetch and parse the result file of one upload
    pub(crate) async fn download_results(
        &self,
        ctx: &CallContext,
        url: &Url,
    ) -> Result<Vec<TaxRecord>> {
        ctx.checkpoint()?;
        debug!(url = %url, "Downloading result file");
        let response = ctx
            .bound(self.http.get(url.clone()), self.config.request_timeout)
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
        debug!(
            content_type = ?response.headers().get(CONTENT_TYPE),
            "Decoding result file"
        );

        let text = read_text(ctx, response).await?;
        let records = parse_result_document(&text);
        info!(count = records.len(), "Download finished");
        Ok(records)
    }
}
