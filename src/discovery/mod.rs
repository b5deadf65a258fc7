//! Candidate pool discovery.
//!
//! A [`DiscoveryFeed`] lists the pools trading a token. [`collect_candidates`] queries it
//! once per configured target token, pausing between requests, and keeps the pools that
//! meet the liquidity threshold.
//!
//! Feed records are handled as raw JSON: entries without a usable `dexId`, `pairAddress`
//! or `liquidity.usd` are counted and dropped, never treated as errors.

pub mod dexscreener;

use std::{collections::HashSet, future::Future};

use alloy::primitives::Address;
use anyhow::Result;
use serde_json::Value;

use crate::{Error, config::ScanConfig};

/// Source of raw pool records.
pub trait DiscoveryFeed {
    /// Returns the pools trading `token` on `chain`, in feed order.
    fn token_pools(
        &self,
        chain: &str,
        token: Address,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;
}

/// A pool reported by the discovery feed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool {
    /// Exchange identifier as reported, e.g. `pancakeswap`.
    pub dex_id: String,
    pub pair_address: Address,
    pub liquidity_usd: f64,
    /// 24h volume; 0 when the feed omits it.
    pub volume_usd_24h: f64,
}

impl CandidatePool {
    /// Extracts a candidate from a raw feed record.
    ///
    /// Returns `None` for malformed records.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let dex_id = raw.get("dexId")?.as_str()?.trim();
        if dex_id.is_empty() {
            return None;
        }
        let pair_address = raw.get("pairAddress")?.as_str()?.trim().parse().ok()?;
        let liquidity_usd = lenient_number(raw.get("liquidity")?.get("usd")?)?;
        let volume_usd_24h = match raw.get("volume").and_then(|volume| volume.get("h24")) {
            Some(value) => lenient_number(value)?,
            None => 0.0,
        };

        Some(Self {
            dex_id: dex_id.to_owned(),
            pair_address,
            liquidity_usd,
            volume_usd_24h,
        })
    }
}

/// Reads a JSON number or a numeric string.
fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Inclusive liquidity filter.
pub fn passes_threshold(candidate: &CandidatePool, threshold: f64) -> bool {
    candidate.liquidity_usd >= threshold
}

/// Counters of one discovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Raw records returned by the feed.
    pub discovered: usize,
    pub malformed: usize,
    /// Well-formed records below the threshold.
    pub filtered_out: usize,
    /// Records of a pool already collected for an earlier token.
    pub duplicates: usize,
    /// Tokens whose feed request failed.
    pub failed_tokens: usize,
}

/// Result of [`collect_candidates`].
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Pools at or above the threshold, in feed order, unique by address.
    pub candidates: Vec<CandidatePool>,
    pub stats: DiscoveryStats,
}

/// Queries `feed` for every target token and filters the result.
///
/// A failed request is logged and contributes no candidates. `config.request_delay` is
/// awaited between consecutive requests.
pub async fn collect_candidates<F>(feed: &F, config: &ScanConfig) -> Discovery
where
    F: DiscoveryFeed,
{
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();

    for (index, token) in config.tokens.iter().enumerate() {
        if index > 0 && !config.request_delay.is_zero() {
            tokio::time::sleep(config.request_delay).await;
        }

        log::info!("fetching pools for {token}");
        let pools = match feed.token_pools(&config.chain, token.address).await {
            Ok(pools) => pools,
            Err(source) => {
                let err = Error::Discovery {
                    token: token.address,
                    source,
                };
                log::error!("{}", err.display_chain());
                discovery.stats.failed_tokens += 1;
                continue;
            }
        };

        let stats = &mut discovery.stats;
        stats.discovered += pools.len();
        for raw in &pools {
            let Some(candidate) = CandidatePool::from_raw(raw) else {
                stats.malformed += 1;
                continue;
            };
            if !passes_threshold(&candidate, config.liquidity_threshold) {
                stats.filtered_out += 1;
                continue;
            }
            if !seen.insert(candidate.pair_address) {
                stats.duplicates += 1;
                continue;
            }
            discovery.candidates.push(candidate);
        }
    }

    log::info!(
        "{} candidate pool(s) at or above {} USD",
        discovery.candidates.len(),
        config.liquidity_threshold
    );
    discovery
}
