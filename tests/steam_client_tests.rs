//! Integration tests for the Steam Web API client
//!
//! These tests use wiremock to stand in for the friend-list endpoint.

use steamer::config::ApiConfig;
use steamer::crawler::{FetchResult, GraphClient, SteamClient};
use steamer::FetchError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FRIEND_LIST: &str = "/ISteamUser/GetFriendList/v1/";

fn client_for(base_url: &str) -> SteamClient {
    let api = ApiConfig {
        key: Some("TESTKEY".to_string()),
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        connect_timeout_secs: 5,
        ..ApiConfig::default()
    };
    SteamClient::from_config(&api, None).unwrap()
}

#[tokio::test]
async fn test_fetch_friend_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FRIEND_LIST))
        .and(query_param("key", "TESTKEY"))
        .and(query_param("steamid", "76561197960287930"))
        .and(query_param("relationship", "friend"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(
                    r#"{"friendslist":{"friends":[
                        {"steamid":"76561197960265731","relationship":"friend","friend_since":1600000000},
                        {"steamid":"76561197960265732","relationship":"friend","friend_since":0}
                    ]}}"#,
                ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let result = client.fetch_edges(76561197960287930).await.unwrap();

    let FetchResult::Edges(edges) = result else {
        panic!("expected edges, got {:?}", result);
    };
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].target_id, "76561197960265731");
    assert_eq!(edges[0].established_at.timestamp(), 1_600_000_000);
    assert_eq!(edges[1].target_id, "76561197960265732");
    assert_eq!(edges[1].established_at.timestamp(), 0);
}

#[tokio::test]
async fn test_empty_friend_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FRIEND_LIST))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let result = client.fetch_edges(42).await.unwrap();
    assert_eq!(result, FetchResult::Edges(vec![]));
}

#[tokio::test]
async fn test_unauthorized_means_restricted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FRIEND_LIST))
        .respond_with(ResponseTemplate::new(401).set_body_string("<html>Unauthorized</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let result = client.fetch_edges(42).await.unwrap();
    assert_eq!(result, FetchResult::Restricted);
}

#[tokio::test]
async fn test_server_error_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FRIEND_LIST))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client.fetch_edges(42).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Status {
            node_id: 42,
            status: 500
        }
    ));
}

#[tokio::test]
async fn test_rate_limited_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FRIEND_LIST))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client.fetch_edges(42).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 429, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FRIEND_LIST))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let err = client.fetch_edges(42).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { node_id: 42, .. }));
}

#[tokio::test]
async fn test_transport_error_does_not_leak_key() {
    // Nothing listens on port 1
    let client = client_for("http://127.0.0.1:1");
    let err = client.fetch_edges(42).await.unwrap_err();

    assert!(matches!(err, FetchError::Http { node_id: 42, .. }));
    assert!(!err.to_string().contains("TESTKEY"));
}
