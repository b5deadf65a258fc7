//! Protocol family detection.
//!
//! Concentrated-liquidity pools expose `slot0()`, constant-product pairs never do. Only
//! functions count: an event or error called `slot0` does not make a pool v3.

use alloy::json_abi::JsonAbi;

/// Marker function of concentrated-liquidity pools.
pub const V3_MARKER: &str = "slot0";

/// Exchange protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProtocolVersion {
    /// Constant-product pair.
    #[display("v2")]
    V2,
    /// Concentrated-liquidity pool.
    #[display("v3")]
    V3,
}

/// Classifies a pool from its interface.
pub fn classify(abi: &JsonAbi) -> ProtocolVersion {
    if abi.functions.contains_key(V3_MARKER) {
        ProtocolVersion::V3
    } else {
        ProtocolVersion::V2
    }
}

/// Builds the catalog exchange tag, e.g. `pancakeswap` + v2 → `pancakeswapv2`.
pub fn exchange_tag(dex_id: &str, version: ProtocolVersion) -> String {
    format!("{}{version}", dex_id.trim().to_lowercase())
}
