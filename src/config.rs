//! Run-time settings of a scan.
//!
//! Defaults reproduce the BSC setup the catalog was first built for: WBNB and USDT as
//! target tokens, a one million USD liquidity floor and a quarter second between
//! discovery requests.

use std::{fmt, str::FromStr, time::Duration};

use alloy::primitives::{Address, address};

/// Chain identifier understood by the discovery feed.
pub const DEFAULT_CHAIN: &str = "bsc";

/// Minimum USD liquidity a pool needs to be resolved.
pub const DEFAULT_LIQUIDITY_THRESHOLD: f64 = 1_000_000.0;

/// Pause between discovery requests for distinct tokens.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(250);

/// SQLite file holding the catalog.
pub const DEFAULT_CATALOG_PATH: &str = "token_pairs.db";

/// File the optional liquidity report is written to.
pub const DEFAULT_REPORT_PATH: &str = "liquidity_report.txt";

/// WBNB on BSC.
pub const WBNB_ADDRESS: Address = address!("0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c");

/// Binance-Peg USDT on BSC.
pub const USDT_ADDRESS: Address = address!("0x55d398326f99059fF775485246999027B3197955");

/// A token whose pools are pulled from the discovery feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetToken {
    /// Label used in logs.
    pub symbol: String,
    pub address: Address,
}

impl TargetToken {
    pub fn new(symbol: impl Into<String>, address: Address) -> Self {
        Self {
            symbol: symbol.into(),
            address,
        }
    }
}

impl fmt::Display for TargetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Parses `SYMBOL=0xADDRESS`, or a bare address labelled by itself.
impl FromStr for TargetToken {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, address) = match s.split_once('=') {
            Some((symbol, address)) => (symbol.trim().to_owned(), address.trim()),
            None => (s.trim().to_owned(), s.trim()),
        };
        anyhow::ensure!(!symbol.is_empty(), "empty token label in {s:?}");
        let address = address
            .parse::<Address>()
            .map_err(|err| anyhow::anyhow!("invalid token address in {s:?}: {err}"))?;
        Ok(Self { symbol, address })
    }
}

/// Tokens scanned when none are configured.
pub fn default_tokens() -> Vec<TargetToken> {
    vec![
        TargetToken::new("WBNB", WBNB_ADDRESS),
        TargetToken::new("USDT", USDT_ADDRESS),
    ]
}

/// What to do with a v3 pair whose fee no accessor could provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::IsVariant)]
pub enum UnresolvedFeePolicy {
    /// Store the pair with an absent fee.
    #[default]
    StoreAbsent,
    /// Fail the pair like a missing `decimals`.
    Reject,
}

/// Settings of one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Chain identifier passed to the discovery feed.
    pub chain: String,
    pub tokens: Vec<TargetToken>,
    /// Inclusive lower bound on `liquidity.usd`.
    pub liquidity_threshold: f64,
    pub request_delay: Duration,
    pub unresolved_fee: UnresolvedFeePolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chain: DEFAULT_CHAIN.to_owned(),
            tokens: default_tokens(),
            liquidity_threshold: DEFAULT_LIQUIDITY_THRESHOLD,
            request_delay: DEFAULT_REQUEST_DELAY,
            unresolved_fee: UnresolvedFeePolicy::default(),
        }
    }
}
