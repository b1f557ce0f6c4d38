//! Client construction for mock and live tests

use nav_query::{Config, NavClient};
use wiremock::MockServer;

use super::fixtures::START_PATH;

/// Configuration pointing at a mock service
pub fn mock_config(server: &MockServer) -> Config {
    Config {
        start_url: format!("{}{}", server.uri(), START_PATH),
        ..Default::default()
    }
}

/// Client pointing at a mock service
pub fn mock_client(server: &MockServer) -> NavClient {
    NavClient::new(mock_config(server)).expect("mock config is valid")
}

/// Configuration for the real service
///
/// Optional environment variables (a `.env` file is read too):
/// - `NAV_QUERY_URL` - start page (default: the public page)
/// - `NAV_QUERY_BATCH_SIZE` - chunk size for streaming tests
pub fn live_config() -> Config {
    dotenvy::dotenv().ok();

    let mut config = Config::default();
    if let Ok(url) = std::env::var("NAV_QUERY_URL") {
        config.start_url = url;
    }
    if let Some(batch_size) = std::env::var("NAV_QUERY_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        config.batch_size = batch_size;
    }
    config
}

/// Client for the real service
pub fn live_client() -> NavClient {
    NavClient::new(live_config()).expect("live config is valid")
}
