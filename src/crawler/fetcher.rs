//! Remote graph client
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with timeouts and optional proxy
//! - Fetching a node's friend list from the Steam Web API
//! - Distinguishing restricted nodes from transport failures

use crate::config::{ApiConfig, ProxyConfig};
use crate::{ConfigError, CrawlError, FetchError, NodeId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Proxy, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Path of the friend-list endpoint, relative to the API base URL
pub const FRIEND_LIST_PATH: &str = "ISteamUser/GetFriendList/v1/";

/// One edge as reported by the remote source
///
/// The target identifier is kept as the raw string the API returned; it is
/// parsed into a [`NodeId`] when the edge is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEdge {
    pub target_id: String,
    pub established_at: DateTime<Utc>,
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The node's outgoing edges
    Edges(Vec<RemoteEdge>),

    /// The remote source refuses to disclose this node's edges
    Restricted,
}

/// Source of a node's outgoing edges
///
/// Implementations hold whatever credentials the remote source needs and
/// enforce their own request timeouts.
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn fetch_edges(&self, node_id: NodeId) -> Result<FetchResult, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Idle connections are not kept, so every request opens a fresh
/// connection (and, behind a rotating proxy, a fresh exit address).
///
/// # Arguments
///
/// * `api` - Timeouts and certificate policy
/// * `proxy` - Optional outbound HTTP proxy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    api: &ApiConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(concat!("steamer/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(api.request_timeout_secs))
        .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
        .pool_max_idle_per_host(0)
        .danger_accept_invalid_certs(api.accept_invalid_certs)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        let mut outbound = Proxy::all(proxy.url())?;
        if let (Some(username), Some(password)) = (&proxy.username, &proxy.password) {
            outbound = outbound.basic_auth(username, password);
        }
        builder = builder.proxy(outbound);
    }

    builder.build()
}

#[derive(Debug, Deserialize)]
struct FriendListResponse {
    #[serde(default)]
    friendslist: FriendList,
}

#[derive(Debug, Default, Deserialize)]
struct FriendList {
    #[serde(default)]
    friends: Vec<Friend>,
}

#[derive(Debug, Deserialize)]
struct Friend {
    steamid: String,
    #[serde(default)]
    friend_since: i64,
}

/// Steam Web API friend-list client
pub struct SteamClient {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl SteamClient {
    /// Creates a client for the API rooted at `base_url`
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(FRIEND_LIST_PATH)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint,
        })
    }

    /// Builds the HTTP client and API client from configuration
    pub fn from_config(api: &ApiConfig, proxy: Option<&ProxyConfig>) -> Result<Self, CrawlError> {
        let api_key = api
            .key
            .clone()
            .ok_or_else(|| ConfigError::Validation("API key is not set".to_string()))?;
        let client = build_http_client(api, proxy)?;

        Self::new(client, &api.base_url, api_key)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)).into())
    }

    /// The friend-list endpoint requests are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GraphClient for SteamClient {
    async fn fetch_edges(&self, node_id: NodeId) -> Result<FetchResult, FetchError> {
        let steam_id = node_id.to_string();

        // Errors drop the URL: it carries the API key.
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("steamid", steam_id.as_str()),
                ("relationship", "friend"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Http {
                node_id,
                source: e.without_url(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(FetchResult::Restricted);
        }

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                node_id,
                status: status.as_u16(),
            });
        }

        let body: FriendListResponse =
            response.json().await.map_err(|e| FetchError::Decode {
                node_id,
                source: e.without_url(),
            })?;

        let edges = body
            .friendslist
            .friends
            .into_iter()
            .map(|friend| RemoteEdge {
                target_id: friend.steamid,
                established_at: DateTime::<Utc>::from_timestamp(friend.friend_since, 0)
                    .unwrap_or_default(),
            })
            .collect();

        Ok(FetchResult::Edges(edges))
    }
}
