//! Concurrent feed fetching.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_retry::RetryIf;

use crate::catalog::FeedSource;
use crate::error_handling::{
    categorize_feed_error, get_retry_strategy, is_retriable_feed_error, FeedError, FeedStats,
    InfoType,
};

/// A feed document that was fetched and parsed, tagged with its catalog position.
#[derive(Debug)]
pub struct FetchedFeed {
    pub index: usize,
    pub document: Map<String, Value>,
}

/// Fetches feed documents with a per-feed timeout and a batch deadline.
pub struct FeedFetcher {
    client: Arc<reqwest::Client>,
    feed_timeout: Duration,
    batch_timeout: Duration,
}

impl FeedFetcher {
    pub fn new(client: Arc<reqwest::Client>, feed_timeout: Duration, batch_timeout: Duration) -> Self {
        Self {
            client,
            feed_timeout,
            batch_timeout,
        }
    }

    /// Fetches one feed, retrying transient failures within the feed timeout.
    pub async fn fetch_feed(&self, url: &str) -> Result<Map<String, Value>, FeedError> {
        let client = self.client.as_ref();
        let attempts = RetryIf::spawn(
            get_retry_strategy(),
            || fetch_once(client, url),
            is_retriable_feed_error,
        );

        match tokio::time::timeout(self.feed_timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::UpstreamTimeout {
                url: url.to_string(),
                timeout_ms: self.feed_timeout.as_millis(),
            }),
        }
    }

    /// Fetches every feed concurrently and returns the ones that succeeded,
    /// in catalog order.
    ///
    /// A failed feed never fails the batch. Feeds still pending when the batch
    /// deadline passes are abandoned and the batch completes with what it has.
    pub async fn fetch_all(&self, feeds: &[FeedSource], stats: &FeedStats) -> Vec<FetchedFeed> {
        let deadline = Instant::now() + self.batch_timeout;
        let mut pending: FuturesUnordered<_> = feeds
            .iter()
            .enumerate()
            .map(|(index, feed)| async move { (index, self.fetch_feed(&feed.url).await) })
            .collect();

        let mut fetched = Vec::with_capacity(feeds.len());
        loop {
            let next = tokio::time::timeout_at(deadline, pending.next()).await;
            match next {
                Ok(Some((index, Ok(document)))) => {
                    debug!("Fetched feed {} ({} entries)", feeds[index].url, document.len());
                    stats.increment_info(InfoType::FeedFetched);
                    fetched.push(FetchedFeed { index, document });
                }
                Ok(Some((_, Err(e)))) => {
                    let error_type = categorize_feed_error(&e);
                    warn!("Skipping feed {} [{}]: {e}", e.url(), error_type);
                    stats.increment_error(error_type);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Batch deadline of {:?} reached with {} feed(s) pending; continuing with partial results",
                        self.batch_timeout,
                        pending.len()
                    );
                    stats.increment_info(InfoType::BatchTimeout);
                    break;
                }
            }
        }

        fetched.sort_by_key(|feed| feed.index);
        fetched
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<Map<String, Value>, FeedError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FeedError::UpstreamFetchFailure {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::UpstreamStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FeedError::UpstreamFetchFailure {
            url: url.to_string(),
            source,
        })?;
    let document: Value =
        serde_json::from_slice(&body).map_err(|source| FeedError::UpstreamDecode {
            url: url.to_string(),
            source,
        })?;

    match document {
        Value::Object(map) => Ok(map),
        other => Err(FeedError::MalformedFeedShape {
            url: url.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorType;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(feed_timeout: Duration, batch_timeout: Duration) -> FeedFetcher {
        FeedFetcher::new(Arc::new(reqwest::Client::new()), feed_timeout, batch_timeout)
    }

    fn source(server: &MockServer, route: &str) -> FeedSource {
        FeedSource {
            site: "Test".to_string(),
            url: format!("{}{route}", server.uri()),
        }
    }

    #[tokio::test]
    async fn test_fetch_feed_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Shop": {}})))
            .mount(&server)
            .await;

        let doc = fetcher(Duration::from_secs(5), Duration::from_secs(5))
            .fetch_feed(&format!("{}/feed.json", server.uri()))
            .await
            .unwrap();
        assert!(doc.contains_key("Shop"));
    }

    #[tokio::test]
    async fn test_fetch_feed_rejects_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(5), Duration::from_secs(5))
            .fetch_feed(&format!("{}/feed.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::MalformedFeedShape { .. }));
    }

    #[tokio::test]
    async fn test_fetch_feed_invalid_json_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(5), Duration::from_secs(5))
            .fetch_feed(&format!("{}/feed.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UpstreamDecode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_feed_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(5), Duration::from_secs(5))
            .fetch_feed(&format!("{}/feed.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UpstreamStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_feed_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1 + crate::config::RETRY_MAX_ATTEMPTS as u64)
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(10), Duration::from_secs(10))
            .fetch_feed(&format!("{}/feed.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UpstreamStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_feed_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_millis(200), Duration::from_secs(5))
            .fetch_feed(&format!("{}/slow.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UpstreamTimeout { .. }));
    }

    #[tokio::test]
    async fn test_fetch_all_settles_every_feed_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"A": {}}))
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"C": {}})))
            .mount(&server)
            .await;

        let stats = FeedStats::new();
        let feeds = vec![
            source(&server, "/a.json"),
            source(&server, "/b.json"),
            source(&server, "/c.json"),
        ];
        let fetched = fetcher(Duration::from_secs(5), Duration::from_secs(5))
            .fetch_all(&feeds, &stats)
            .await;

        let indices: Vec<usize> = fetched.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(stats.get_info_count(InfoType::FeedFetched), 2);
        assert_eq!(stats.get_error_count(ErrorType::FeedClientError), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_partial_results_at_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fast.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Fast": {}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/slow.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Slow": {}}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let stats = FeedStats::new();
        let feeds = vec![source(&server, "/slow.json"), source(&server, "/fast.json")];
        let started = std::time::Instant::now();
        let fetched = fetcher(Duration::from_secs(10), Duration::from_millis(500))
            .fetch_all(&feeds, &stats)
            .await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].index, 1);
        assert_eq!(stats.get_info_count(InfoType::BatchTimeout), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_empty() {
        let stats = FeedStats::new();
        let fetched = fetcher(Duration::from_secs(1), Duration::from_secs(1))
            .fetch_all(&[], &stats)
            .await;
        assert!(fetched.is_empty());
    }
}
