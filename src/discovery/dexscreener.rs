//! Dexscreener `token-pairs` client.
//!
//! `GET {base}/{chain}/{token}` returns a JSON array of pools. Some deployments wrap it as
//! `{"pairs": [...]}` and answer `{"pairs": null}` for unknown tokens; both are accepted.

use alloy::primitives::Address;
use anyhow::{Result, anyhow};
use serde_json::Value;
use url::Url;

use super::DiscoveryFeed;

/// Public `token-pairs/v1` endpoint.
pub const DEFAULT_FEED_URL: &str = "https://api.dexscreener.com/token-pairs/v1";

/// HTTP client for the Dexscreener feed.
pub struct Client {
    http_client: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Creates a client for the public endpoint sharing `http_client`'s connection pool.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url: default_url(),
        }
    }

    /// Points the client at another base URL.
    pub fn with_url(self, base_url: Url) -> Self {
        Self { base_url, ..self }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn pools_url(&self, chain: &str, token: Address) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} cannot be a base URL", self.base_url))?
            .pop_if_empty()
            .push(chain)
            .push(&format!("{token:#x}"));
        Ok(url)
    }
}

impl DiscoveryFeed for Client {
    async fn token_pools(&self, chain: &str, token: Address) -> Result<Vec<Value>> {
        let response = self
            .http_client
            .get(self.pools_url(chain, token)?)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("dexscreener answered {status}"));
        }

        let body: Value = response.json().await.map_err(reqwest::Error::without_url)?;
        pools_from_body(body)
    }
}

/// Unwraps the pool list from a response body.
pub fn pools_from_body(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(pools) => Ok(pools),
        Value::Object(mut object) => match object.remove("pairs") {
            Some(Value::Array(pools)) => Ok(pools),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(anyhow!("unexpected `pairs` payload: {other}")),
        },
        other => Err(anyhow!("unexpected response body: {other}")),
    }
}

/// Returns [`DEFAULT_FEED_URL`] as a [`Url`].
pub fn default_url() -> Url {
    DEFAULT_FEED_URL.parse().unwrap()
}
