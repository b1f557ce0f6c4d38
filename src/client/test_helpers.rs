//! Shared test helpers: a wiremock stand-in for the lookup service.
//!
//! The mock answers the same four requests the real service does:
//! start page, upload form, upload, result file. Uploaded identifiers are
//! echoed into the result link so every upload gets its own result file.

use crate::client::NavClient;
use crate::config::Config;
use crate::validation::checksum;
use std::collections::{HashMap, HashSet};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub(crate) const START_PATH: &str = "/nav/afaalanyok_csoportos";
pub(crate) const FORM_PATH: &str = "/cgi-bin/afaalany/afaalany.php";
pub(crate) const RESULT_PATH: &str = "/cgi-bin/afaalany/ktmp/result.txt";
pub(crate) const UPLOAD_FIELD: &str = "adoszamfile";

/// A checksum-valid 8-character identifier built from `n`
pub(crate) fn valid_id(n: u32) -> String {
    let prefix = format!("{:07}", n % 10_000_000);
    let check = checksum(&prefix);
    format!("{prefix}{check}")
}

/// Encode test text as ISO-8859-2.
///
/// Covers ASCII plus the Hungarian letters; Latin-1 and Latin-2 agree on
/// all of them except the double-acute vowels.
pub(crate) fn latin2(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            'ő' => 0xF5,
            'ű' => 0xFB,
            'Ő' => 0xD5,
            'Ű' => 0xDB,
            'á' | 'é' | 'í' | 'ó' | 'ö' | 'ú' | 'ü' | 'Á' | 'É' | 'Í' | 'Ó' | 'Ö' | 'Ú' | 'Ü' => {
                u8::try_from(u32::from(c)).unwrap()
            }
            c if c.is_ascii() => c as u8,
            c => panic!("{c:?} has no ISO-8859-2 mapping in the test encoder"),
        })
        .collect()
}

/// What the mock authority knows: base id → (returned id, owner)
#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<String, (String, String)>,
    poison: HashSet<String>,
}

impl Registry {
    /// Register an owner; the service answers with `returned` (8 or 11 characters)
    pub(crate) fn with(mut self, returned: &str, owner: &str) -> Self {
        let base = returned.get(..8).unwrap_or(returned).to_string();
        self.entries
            .insert(base, (returned.to_string(), owner.to_string()));
        self
    }

    /// Uploads containing this base id are rejected with 500
    pub(crate) fn failing_on(mut self, base: &str) -> Self {
        self.poison.insert(base.to_string());
        self
    }

    fn result_file(&self, ids: &[&str]) -> Vec<u8> {
        let mut body = latin2("Lekérdezés eredménye\n\n");
        for id in ids {
            if let Some((returned, owner)) = self.entries.get(*id) {
                body.extend(latin2(&format!("{returned};{owner};1051 Budapest\n")));
            }
        }
        body
    }
}

/// Lines of the uploaded file: the 8-digit lines of the multipart body
pub(crate) fn uploaded_ids(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body)
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.len() == 8 && line.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

struct UploadResponder {
    registry: Registry,
}

impl Respond for UploadResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = uploaded_ids(&request.body);
        if ids.iter().any(|id| self.registry.poison.contains(id)) {
            return ResponseTemplate::new(500);
        }
        // Only known ids go into the link, unknown ones would be dropped anyway
        let known: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| self.registry.entries.contains_key(*id))
            .collect();
        let page = format!(
            r#"<html><body>
            <p>Feltöltve: {count}</p>
            <input type="button" name="vissza" value="Vissza" onclick="history.back()">
            <input type="button" name="letolt" value="Letöltés"
                   onclick="location.href='ktmp/result.txt?ids={ids}'">
            </body></html>"#,
            count = ids.len(),
            ids = known.join(","),
        );
        ResponseTemplate::new(200).set_body_raw(latin2(&page), "text/html")
    }
}

struct ResultResponder {
    registry: Registry,
}

impl Respond for ResultResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids: String = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "ids")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let ids: Vec<&str> = ids.split(',').filter(|id| !id.is_empty()).collect();
        ResponseTemplate::new(200).set_body_raw(self.registry.result_file(&ids), "text/plain")
    }
}

pub(crate) fn start_page(iframe_src: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
        <html><head><title>Csoportos lekérdezés</title></head>
        <body>
          <div id="menu"><a href="/nav">NAV</a></div>
          <iframe width="600" height="400" src="{iframe_src}"></iframe>
        </body></html>"#
    )
}

/// Upload form with two hidden fields, a repeated field and a file input
/// sitting after an unclosed table
pub(crate) fn form_page() -> String {
    format!(
        r#"<html><body>
        <input type="hidden" name="outside" value="ignored">
        <form method="post" enctype="multipart/form-data" action="afaalany.php">
          <table><tr><td>
          <input type="hidden" name="lang" value="hu">
          <input type="hidden" name="sid" value="a1b2c3">
          <input type="checkbox" name="mezok" value="nev">
          <input type="checkbox" name="mezok" value="cim">
          <input type="file" name="{UPLOAD_FIELD}">
          <input type="submit" value="Küldés">
        </body></html>"#
    )
}

/// Mount the start page pointing at the form
pub(crate) async fn mount_start_page(server: &MockServer, iframe_src: &str) {
    Mock::given(method("GET"))
        .and(path(START_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(latin2(&start_page(iframe_src)), "text/html"),
        )
        .mount(server)
        .await;
}

pub(crate) async fn mount_form_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(latin2(&form_page()), "text/html"))
        .mount(server)
        .await;
}

/// Mount the upload endpoint and the result files it links to
pub(crate) async fn mount_lookup(server: &MockServer, registry: Registry) {
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(UploadResponder {
            registry: registry.clone(),
        })
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESULT_PATH))
        .respond_with(ResultResponder { registry })
        .mount(server)
        .await;
}

/// A mock service with every page mounted
pub(crate) async fn start_mock_service(registry: Registry) -> MockServer {
    let server = MockServer::start().await;
    mount_start_page(&server, FORM_PATH).await;
    mount_form_page(&server).await;
    mount_lookup(&server, registry).await;
    server
}

pub(crate) fn test_config(server: &MockServer) -> Config {
    Config {
        start_url: format!("{}{}", server.uri(), START_PATH),
        ..Default::default()
    }
}

/// Client pointed at the mock service
pub(crate) fn create_test_client(server: &MockServer) -> NavClient {
    NavClient::new(test_config(server)).unwrap()
}

/// Client pointed at the mock service with a custom chunk size
pub(crate) fn create_test_client_with_batch(server: &MockServer, batch_size: usize) -> NavClient {
    NavClient::new(Config {
        batch_size,
        ..test_config(server)
    })
    .unwrap()
}

/// Number of requests the server saw with this method and path
pub(crate) async fn request_count(server: &MockServer, http_method: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
        .count()
}
