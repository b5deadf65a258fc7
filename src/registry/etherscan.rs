//! Etherscan-family `getabi` client (BscScan, Etherscan, ...).
//!
//! The endpoint answers `200 OK` even when it refuses a request; the real outcome is the
//! `status` field, `"1"` meaning `result` holds the ABI as a JSON string. Anything else
//! (`"0"` with `NOTOK`, rate limit notices, unverified sources) is a rejection.

use alloy::primitives::Address;
use anyhow::Result;
use serde::Deserialize;
use url::Url;

use super::{ApiKey, InterfaceRegistry, RegistryReply};

/// BscScan API endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "https://api.bscscan.com/api";

/// Raw `getabi` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GetAbiResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

impl GetAbiResponse {
    /// Maps the envelope to a [`RegistryReply`].
    pub fn interpret(self) -> RegistryReply {
        match (self.status.as_str(), self.result) {
            ("1", serde_json::Value::String(abi)) => RegistryReply::Found(abi),
            ("1", other) => RegistryReply::Rejected(format!("unexpected result payload: {other}")),
            (_, serde_json::Value::String(reason)) if !reason.is_empty() => {
                RegistryReply::Rejected(format!("{}: {reason}", self.message))
            }
            (status, _) => RegistryReply::Rejected(format!("status {status}: {}", self.message)),
        }
    }
}

/// HTTP client for an Etherscan-compatible registry.
pub struct Client {
    http_client: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Creates a client for BscScan sharing `http_client`'s connection pool.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url: default_url(),
        }
    }

    /// Points the client at another Etherscan-compatible endpoint.
    pub fn with_url(self, base_url: Url) -> Self {
        Self { base_url, ..self }
    }

    /// Returns the endpoint.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn abi_url(&self, address: Address, key: &ApiKey) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("module", "contract")
            .append_pair("action", "getabi")
            .append_pair("address", &format!("{address:#x}"))
            .append_pair("apikey", key.expose());
        url
    }
}

impl InterfaceRegistry for Client {
    /// Errors never carry the request URL, which holds the key.
    async fn contract_abi(&self, address: Address, key: &ApiKey) -> Result<RegistryReply> {
        let response: GetAbiResponse = self
            .http_client
            .get(self.abi_url(address, key))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(reqwest::Error::without_url)?
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        Ok(response.interpret())
    }
}

/// Returns [`DEFAULT_REGISTRY_URL`] as a [`Url`].
pub fn default_url() -> Url {
    DEFAULT_REGISTRY_URL.parse().unwrap()
}
