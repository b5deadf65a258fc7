//! EVM access for pair resolution.
//!
//! Everything the scanner reads from the chain goes through an Alloy provider connected
//! to a single configured RPC endpoint. Reads are plain `eth_call`s; nothing here signs
//! or sends transactions.
//!
//! # Submodules
//!
//! - [`contracts`]: `sol!` bindings for pairs, ERC-20 metadata and fee accessors
//! - [`reader`]: the [`ContractReader`](reader::ContractReader) seam and its RPC implementation
//!
//! # Example
//!
//! ```no_run
//! use pairscan::evm::{self, reader::RpcReader};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = evm::connect("https://bsc-dataseed.bnbchain.org").await?;
//! let reader = RpcReader::new(provider);
//! # Ok(())
//! # }
//! ```

pub mod contracts;
pub mod reader;

use alloy::{network::Ethereum, providers::ProviderBuilder, transports::TransportError};
/// reimport primitives
pub use alloy::primitives::{Address, U256, address};
use rust_decimal::Decimal;

/// Provider trait for pair resolution.
///
/// Implemented by every Alloy provider that can be shared across the sequential
/// reads of one run.
pub trait Provider: alloy::providers::Provider<Ethereum> + Send + Sync + Clone + 'static {}

/// Dynamic provider type.
///
/// Use this when you need type erasure for providers.
pub type DynProvider = alloy::providers::DynProvider<Ethereum>;

impl<T> Provider for T where T: alloy::providers::Provider<Ethereum> + Send + Sync + Clone + 'static {}

/// Creates a type-erased provider for the given RPC URL.
///
/// Connecting does not perform any request; use [`chain_id`] to check the endpoint.
#[inline(always)]
pub async fn connect(url: &str) -> Result<DynProvider, TransportError> {
    let provider = ProviderBuilder::new().connect(url).await?;
    Ok(DynProvider::new(provider))
}

/// Returns the chain id reported by the endpoint.
///
/// The scanner calls this once at start-up; an unreachable endpoint is fatal for the run.
pub async fn chain_id<P: Provider>(provider: &P) -> Result<u64, TransportError> {
    alloy::providers::Provider::get_chain_id(provider).await
}

/// Converts a raw on-chain integer into a decimal with `decimals` fractional digits.
///
/// Returns `None` when the value does not fit in an `i128` mantissa.
///
/// # Example
///
/// ```
/// use pairscan::evm::{U256, from_wei};
/// use rust_decimal::Decimal;
///
/// // 2500 parts per million
/// let fee = from_wei(U256::from(2_500u64), 6).unwrap();
/// assert_eq!(fee, Decimal::new(25, 4));
/// ```
#[must_use]
#[inline]
pub fn from_wei(wei: U256, decimals: u32) -> Option<Decimal> {
    let mantissa = i128::try_from(wei).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, decimals).ok()
}
