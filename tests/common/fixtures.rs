//! Mock lookup service and sample identifiers

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const START_PATH: &str = "/afaalanyok_csoportos";
pub const FORM_PATH: &str = "/cgi-bin/afaalany.php";
pub const RESULT_PATH: &str = "/ktmp/eredmeny.txt";

/// Checksum-valid tax numbers
pub const VALID_IDS: [&str; 3] = ["12345676", "13895459", "88888888"];

/// Fails the checksum
pub const INVALID_ID: &str = "12345678";

pub const START_PAGE: &str = r#"<html><body>
<h1>Csoportos lekerdezes</h1>
<iframe src="/cgi-bin/afaalany.php" width="100%"></iframe>
</body></html>"#;

pub const FORM_PAGE: &str = r#"<html><body>
<form action="afaalany.php" method="post" enctype="multipart/form-data">
<input type="hidden" name="lang" value="hu">
<input type="hidden" name="sid" value="f00d">
<input type="file" name="adoszamfile">
<input type="submit" value="OK">
</body></html>"#;

/// Result line for an uploaded base id, if the mock registry knows it.
///
/// Owners are Latin-2 encoded: `0xF5` is `ő`, `0xE1` is `á`.
fn registry_line(id: &str) -> Option<&'static [u8]> {
    match id {
        "12345676" => Some(b"12345676242;Sz\xf5l\xf5sk\xe1rt Kft.;Eger\n"),
        "13895459" => Some(b"13895459;Kis P\xe1l;Szeged\n"),
        _ => None,
    }
}

/// The 8-digit lines of an uploaded multipart body
pub fn uploaded_ids(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body)
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.len() == 8 && line.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Answers an upload with a link carrying the uploaded ids
struct EchoUpload;

impl Respond for EchoUpload {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = uploaded_ids(&request.body).join(",");
        let page = format!(
            r#"<html><body><input type="button" name="letolt" onclick="location.href='{RESULT_PATH}?ids={ids}'"></body></html>"#
        );
        ResponseTemplate::new(200).set_body_string(page)
    }
}

/// Serves the result file for the ids in the link
struct ResultFile;

impl Respond for ResultFile {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body = Vec::new();
        if let Some((_, ids)) = request.url.query_pairs().find(|(k, _)| k == "ids") {
            for id in ids.split(',') {
                if let Some(line) = registry_line(id) {
                    body.extend_from_slice(line);
                }
            }
        }
        ResponseTemplate::new(200).set_body_raw(body, "text/plain")
    }
}

/// Mount the start page, the form and the upload/result pair
pub async fn start_mock_service() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(START_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(START_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FORM_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(EchoUpload)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESULT_PATH))
        .respond_with(ResultFile)
        .mount(&server)
        .await;
    server
}
