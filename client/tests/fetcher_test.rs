//! Integration tests for the HTTP fetcher against a mock remote.

use quotesync_client::{HttpTransport, PushOutcome, RemoteFetcher, SyncError};
use quotesync_engine::QuoteRecord;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn fetcher_for(server: &MockServer) -> RemoteFetcher<HttpTransport> {
    let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
    RemoteFetcher::new(transport, format!("{}/posts", server.uri()), "ServerData")
}

#[cfg(test)]
mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_maps_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit\nrest"},
                {"userId": 1, "id": 2, "title": "qui est esse", "body": "est rerum tempore"},
                {"title": "dropped, no id"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let records = fetcher_for(&server).await.fetch_remote().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].text, "sunt aut facere");
        assert_eq!(records[0].author, "quia et suscipit");
        assert_eq!(records[1].category, "ServerData");
        assert!(records.iter().all(|r| r.synced));
    }

    #[tokio::test]
    async fn test_non_array_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch_remote().await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteProtocol(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch_remote().await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteProtocol(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_server_error_is_network_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch_remote().await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }

    #[tokio::test]
    async fn test_not_found_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch_remote().await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteProtocol(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_timeout_is_network_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let fetcher = RemoteFetcher::new(transport, server.uri(), "ServerData");

        let err = fetcher.fetch_remote().await.unwrap_err();
        assert!(matches!(err, SyncError::NetworkUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_unavailable() {
        let transport = HttpTransport::new(Duration::from_secs(1)).unwrap();
        let fetcher = RemoteFetcher::new(transport, "http://127.0.0.1:1/posts", "ServerData");

        let err = fetcher.fetch_remote().await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}

#[cfg(test)]
mod push_tests {
    use super::*;

    #[tokio::test]
    async fn test_push_posts_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts"))
            .and(body_partial_json(json!({
                "id": "local-1-0",
                "title": "Stay hungry.",
                "body": "Steve Jobs",
                "version": 1
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 101})))
            .expect(1)
            .mount(&server)
            .await;

        let record = QuoteRecord::new("local-1-0", "Stay hungry.", "Steve Jobs", "Life");
        let outcome = fetcher_for(&server).await.push_record(&record).await;

        assert_eq!(outcome, PushOutcome::Acknowledged);
    }

    #[tokio::test]
    async fn test_push_failure_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let record = QuoteRecord::new("local-1-0", "Stay hungry.", "Steve Jobs", "Life");
        let outcome = fetcher_for(&server).await.push_record(&record).await;

        assert!(matches!(outcome, PushOutcome::Rejected(_)));
    }
}
