//! # pairscan
//!
//! Builds a catalog of liquid DEX pairs on an EVM chain (BSC by default).
//!
//! A scan pulls the pools trading a few target tokens from a discovery feed, keeps those
//! above a USD liquidity threshold, and resolves each one: its ABI from an Etherscan-style
//! registry, its tokens, decimals and symbols over JSON-RPC, its protocol family and its
//! swap fee. Every resolved pair is upserted into a SQLite table keyed by pair address,
//! ready for arbitrage or analytics tooling.
//!
//! ## Quick Navigation
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`discovery`] | Feed seam, candidate parsing, liquidity filter |
//! | [`discovery::dexscreener`] | Dexscreener `token-pairs` client |
//! | [`registry`] | ABI resolution with rotating API keys |
//! | [`registry::etherscan`] | BscScan/Etherscan `getabi` client |
//! | [`evm`] | Alloy provider, contract bindings, metadata reads |
//! | [`classify`] | v2 / v3 detection and exchange tags |
//! | [`fee`] | Static fee table and on-chain fee accessors |
//! | [`pipeline`] | Per-pair state machine and the batch run |
//! | [`catalog`] | SQLite `token_pairs` table |
//! | [`report`] | Liquidity report export |
//!
//! ## Running a scan
//!
//! ```no_run
//! use pairscan::{
//!     Scanner,
//!     catalog::CatalogStore,
//!     config::ScanConfig,
//!     discovery::dexscreener,
//!     evm::reader::RpcReader,
//!     fee::FeeTable,
//!     registry::{AbiResolver, ApiKey, etherscan},
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let http = reqwest::Client::new();
//! let store = CatalogStore::open("token_pairs.db")?;
//!
//! let mut scanner = Scanner::new(
//!     dexscreener::Client::new(http.clone()),
//!     AbiResolver::new(etherscan::Client::new(http), [ApiKey::new("YOUR_KEY")]),
//!     RpcReader::with_url("https://bsc-dataseed.bnbchain.org").await?,
//!     FeeTable::default(),
//!     ScanConfig::default(),
//! );
//!
//! let outcome = scanner.run(&store).await?;
//! println!("{}", outcome.summary);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod classify;
pub mod config;
pub mod discovery;
mod error;
pub mod evm;
pub mod fee;
pub mod pipeline;
pub mod registry;
pub mod report;

#[cfg(test)]
mod testing;

pub use error::{Error, MetadataField};
pub use pipeline::Scanner;

/// Re-exported Ethereum address type from Alloy.
pub use alloy::primitives::{Address, U256, address};
