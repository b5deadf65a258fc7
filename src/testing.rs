//! In-memory stand-ins for the chain, the interface registry and the discovery feed.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use alloy::primitives::{Address, U256};
use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::{
    discovery::DiscoveryFeed,
    evm::reader::{ContractReader, FeeAccessor},
    registry::{ApiKey, InterfaceRegistry, RegistryReply},
};

/// ABI of a constant-product pair.
pub const V2_PAIR_ABI: &str = r#"[
    {"type":"function","name":"token0","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"},
    {"type":"function","name":"token1","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"},
    {"type":"function","name":"getReserves","inputs":[],"outputs":[{"name":"_reserve0","type":"uint112"},{"name":"_reserve1","type":"uint112"},{"name":"_blockTimestampLast","type":"uint32"}],"stateMutability":"view"},
    {"type":"event","name":"Sync","inputs":[{"name":"reserve0","type":"uint112","indexed":false},{"name":"reserve1","type":"uint112","indexed":false}],"anonymous":false}
]"#;

/// ABI of a concentrated-liquidity pool.
pub const V3_POOL_ABI: &str = r#"[
    {"type":"function","name":"token0","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"},
    {"type":"function","name":"token1","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"},
    {"type":"function","name":"fee","inputs":[],"outputs":[{"name":"","type":"uint24"}],"stateMutability":"view"},
    {"type":"function","name":"slot0","inputs":[],"outputs":[{"name":"sqrtPriceX96","type":"uint160"},{"name":"tick","type":"int24"},{"name":"observationIndex","type":"uint16"},{"name":"observationCardinality","type":"uint16"},{"name":"observationCardinalityNext","type":"uint16"},{"name":"feeProtocol","type":"uint32"},{"name":"unlocked","type":"bool"}],"stateMutability":"view"}
]"#;

pub fn pair_addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xaa;
    bytes[19] = n;
    Address::from(bytes)
}

pub fn token_addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xbb;
    bytes[19] = n;
    Address::from(bytes)
}

/// A Dexscreener-shaped pool record.
pub fn pool_json(dex_id: &str, pair: Address, liquidity: f64, volume: f64) -> Value {
    serde_json::json!({
        "chainId": "bsc",
        "dexId": dex_id,
        "pairAddress": pair.to_checksum(None),
        "liquidity": { "usd": liquidity, "base": 1, "quote": 1 },
        "volume": { "h24": volume, "h6": 0 },
    })
}

#[derive(Debug, Clone)]
pub struct FakeToken {
    symbol: Option<String>,
    decimals: Option<u8>,
}

impl FakeToken {
    pub fn new(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: Some(symbol.to_owned()),
            decimals: Some(decimals),
        }
    }

    pub fn without_symbol(decimals: u8) -> Self {
        Self {
            symbol: None,
            decimals: Some(decimals),
        }
    }

    pub fn without_decimals(symbol: &str) -> Self {
        Self {
            symbol: Some(symbol.to_owned()),
            decimals: None,
        }
    }
}

#[derive(Default)]
pub struct FakeChain {
    pairs: HashMap<Address, (Address, Address)>,
    tokens: HashMap<Address, FakeToken>,
    fees: HashMap<(Address, FeeAccessor), U256>,
    fee_calls: Mutex<Vec<FeeAccessor>>,
}

impl FakeChain {
    pub fn with_pair(mut self, pair: Address, token0: Address, token1: Address) -> Self {
        self.pairs.insert(pair, (token0, token1));
        self
    }

    pub fn with_token(mut self, token: Address, fake: FakeToken) -> Self {
        self.tokens.insert(token, fake);
        self
    }

    pub fn with_fee(mut self, pair: Address, accessor: FeeAccessor, raw: u64) -> Self {
        self.fees.insert((pair, accessor), U256::from(raw));
        self
    }

    /// Fee accessors called so far, in order.
    pub fn fee_calls(&self) -> Vec<FeeAccessor> {
        self.fee_calls.lock().unwrap().clone()
    }
}

impl ContractReader for FakeChain {
    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)> {
        self.pairs
            .get(&pair)
            .copied()
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        self.tokens
            .get(&token)
            .and_then(|token| token.decimals)
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn symbol(&self, token: Address) -> Result<String> {
        self.tokens
            .get(&token)
            .and_then(|token| token.symbol.clone())
            .ok_or_else(|| anyhow!("could not decode output"))
    }

    async fn fee(&self, pair: Address, accessor: FeeAccessor) -> Result<U256> {
        self.fee_calls.lock().unwrap().push(accessor);
        self.fees
            .get(&(pair, accessor))
            .copied()
            .ok_or_else(|| anyhow!("function selector was not recognized"))
    }
}

/// How the fake registry answers for a given key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBehavior {
    /// Returns the stored ABI, or rejects unknown contracts.
    Serve,
    /// Answers `NOTOK`.
    Reject,
    /// Transport error.
    Fail,
    /// Claims success but returns something that is not an ABI.
    Malformed,
}

#[derive(Default)]
pub struct FakeRegistry {
    abis: HashMap<Address, String>,
    keys: HashMap<String, KeyBehavior>,
    attempts: Mutex<Vec<String>>,
    lookups: AtomicUsize,
}

impl FakeRegistry {
    pub fn with_abi(mut self, address: Address, abi: &str) -> Self {
        self.abis.insert(address, abi.to_owned());
        self
    }

    pub fn with_key(mut self, key: &str, behavior: KeyBehavior) -> Self {
        self.keys.insert(key.to_owned(), behavior);
        self
    }

    /// Keys used so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Number of requests served.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl InterfaceRegistry for FakeRegistry {
    async fn contract_abi(&self, address: Address, key: &ApiKey) -> Result<RegistryReply> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.attempts.lock().unwrap().push(key.expose().to_owned());

        let behavior = self
            .keys
            .get(key.expose())
            .copied()
            .unwrap_or(KeyBehavior::Reject);
        match behavior {
            KeyBehavior::Serve => Ok(match self.abis.get(&address) {
                Some(abi) => RegistryReply::Found(abi.clone()),
                None => RegistryReply::Rejected("Contract source code not verified".into()),
            }),
            KeyBehavior::Reject => Ok(RegistryReply::Rejected("Max rate limit reached".into())),
            KeyBehavior::Fail => Err(anyhow!("connection reset by peer")),
            KeyBehavior::Malformed => Ok(RegistryReply::Found("Invalid API Key".into())),
        }
    }
}

#[derive(Default)]
pub struct FakeFeed {
    responses: HashMap<Address, std::result::Result<Vec<Value>, String>>,
    calls: Mutex<Vec<(Address, tokio::time::Instant)>>,
}

impl FakeFeed {
    pub fn with_pools(mut self, token: Address, pools: Vec<Value>) -> Self {
        self.responses.insert(token, Ok(pools));
        self
    }

    pub fn with_failure(mut self, token: Address, reason: &str) -> Self {
        self.responses.insert(token, Err(reason.to_owned()));
        self
    }

    /// Tokens requested so far with the (tokio) time of each request.
    pub fn calls(&self) -> Vec<(Address, tokio::time::Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DiscoveryFeed for FakeFeed {
    async fn token_pools(&self, _chain: &str, token: Address) -> Result<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .push((token, tokio::time::Instant::now()));
        match self.responses.get(&token) {
            Some(Ok(pools)) => Ok(pools.clone()),
            Some(Err(reason)) => Err(anyhow!("{reason}")),
            None => Ok(Vec::new()),
        }
    }
}

/// Serves every connection on a local port with one canned HTTP response.
pub async fn http_stub(status: u16, body: &'static str) -> url::Url {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/").parse().unwrap()
}

/// URL of a local port nothing listens on.
pub async fn closed_port_url() -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api").parse().unwrap()
}
