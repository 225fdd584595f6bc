use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;

use super::source::MatchSource;
use crate::config::settings::ApiSettings;
use crate::domain::{MatchBlob, MatchPage};
use crate::errors::ApiError;
use crate::http::RetryingClient;

/// aoe2.net match API client
pub struct Aoe2NetClient {
    client: RetryingClient,
    base_url: String,
    game: String,
}

impl Aoe2NetClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = RetryingClient::new(settings)?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            game: settings.game.clone(),
        })
    }

    async fn fetch_matches(&self, url: &str) -> Result<MatchPage> {
        debug!("GET {url}");
        let body = self.client.get_json(url).await?;
        Self::parse_page(url, body).with_context(|| format!("Failed to read match page from {url}"))
    }

    // --- Helper Methods ---

    fn build_matches_url(&self, since: i64, count: usize) -> String {
        format!(
            "{}/matches?game={}&count={}&since={}",
            self.base_url, self.game, count, since
        )
    }

    fn build_player_matches_url(&self, profile_id: i64, offset: usize, count: usize) -> String {
        format!(
            "{}/player/matches?game={}&profile_ids={}&count={}&start={}",
            self.base_url, self.game, profile_id, count, offset
        )
    }

    fn parse_page(url: &str, body: Value) -> Result<MatchPage, ApiError> {
        let Value::Array(items) = body else {
            return Err(ApiError::Body {
                url: url.to_string(),
                reason: "expected a JSON array of matches".to_string(),
            });
        };

        let received = items.len();
        let blobs = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<MatchBlob>(item) {
                Ok(blob) => Some(blob),
                Err(e) => {
                    warn!("Skipping undecodable match from {url}: {e}");
                    None
                }
            })
            .collect();

        Ok(MatchPage { received, blobs })
    }
}

impl MatchSource for Aoe2NetClient {
    async fn fetch_page(&mut self, since: i64, count: usize) -> Result<MatchPage> {
        let url = self.build_matches_url(since, count);
        self.fetch_matches(&url).await
    }

    async fn fetch_player_history(
        &mut self,
        profile_id: i64,
        offset: usize,
        count: usize,
    ) -> Result<MatchPage> {
        let url = self.build_player_matches_url(profile_id, offset, count);
        self.fetch_matches(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str) -> ApiSettings {
        ApiSettings {
            base_url: base_url.to_string(),
            max_retries: 2,
            backoff_factor_secs: 0,
            ..ApiSettings::default()
        }
    }

    fn client(server: &MockServer) -> Aoe2NetClient {
        Aoe2NetClient::new(&settings(&format!("{}/api", server.uri()))).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = Aoe2NetClient::new(&settings("https://aoe2.net/api/")).unwrap();
        assert_eq!(
            client.build_matches_url(1_606_329_267, 1000),
            "https://aoe2.net/api/matches?game=aoe2de&count=1000&since=1606329267"
        );
        assert_eq!(
            client.build_player_matches_url(199325, 2000, 1000),
            "https://aoe2.net/api/player/matches?game=aoe2de&profile_ids=199325&count=1000&start=2000"
        );
    }

    #[tokio::test]
    async fn test_fetch_page_decodes_matches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .and(query_param("since", "100"))
            .and(query_param("count", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "match_id": "1", "started": 100, "players": [] },
                { "match_id": 2, "started": 150, "players": null },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).fetch_page(100, 2).await.unwrap();

        assert_eq!(page.received, 2);
        assert_eq!(page.blobs.len(), 2);
        assert_eq!(page.blobs[1].match_id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_undecodable_items_still_count_as_received() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/player/matches"))
            .and(query_param("profile_ids", "42"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "match_id": "1", "started": 100 },
                { "match_id": "2", "started": "yesterday" },
                "garbage",
            ])))
            .mount(&server)
            .await;

        let page = client(&server).fetch_player_history(42, 0, 1000).await.unwrap();

        assert_eq!(page.received, 3);
        assert_eq!(page.blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).fetch_page(0, 1000).await.unwrap();
        assert_eq!(page.received, 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).fetch_page(0, 1000).await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch_page(0, 1000).await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_non_array_body_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "busy" })))
            .mount(&server)
            .await;

        let result = client(&server).fetch_page(0, 1000).await;
        assert!(result.is_err());
    }
}
