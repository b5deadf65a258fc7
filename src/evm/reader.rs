//! Contract metadata reads.
//!
//! [`ContractReader`] is the narrow surface the pipeline needs from the chain. The RPC
//! implementation, [`RpcReader`], wraps an Alloy provider the same way the DEX clients
//! wrap theirs: it owns the provider and hands out typed contract instances.
//!
//! [`read_metadata`] applies the degradation policy on top of the raw reads:
//! `token0`/`token1` and `decimals` are required, `symbol` falls back to [`UNKNOWN_SYMBOL`].

use std::future::Future;

use alloy::primitives::{Address, U256};
use anyhow::Result;

use crate::{
    Error, MetadataField,
    evm::{
        DynProvider, Provider,
        contracts::{
            IDynamicFee::{self, IDynamicFeeInstance},
            IERC20Metadata::{self, IERC20MetadataInstance},
            IPair::{self, IPairInstance},
        },
    },
};

/// Symbol recorded when a token's `symbol()` cannot be read or decoded.
///
/// Many tokens return `bytes32` or revert; the catalog still needs a row for them.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// One way of asking a pool for its current fee.
///
/// Forks expose the same capability under different names. They are tried in
/// [`FeeAccessor::PRIORITY`] order and the first answer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum FeeAccessor {
    /// `swapFee()`
    #[display("swapFee")]
    SwapFee,
    /// `getSwapFee()`
    #[display("getSwapFee")]
    GetSwapFee,
    /// `fee()`, the Uniswap V3 accessor.
    #[display("fee")]
    Fee,
}

impl FeeAccessor {
    /// Order in which accessors are tried.
    pub const PRIORITY: [FeeAccessor; 3] = [Self::SwapFee, Self::GetSwapFee, Self::Fee];
}

/// Read-only view of pair and token contracts.
pub trait ContractReader {
    /// Returns `(token0, token1)` of a pair.
    fn pair_tokens(&self, pair: Address) -> impl Future<Output = Result<(Address, Address)>> + Send;

    /// Returns the token's `decimals()`.
    fn decimals(&self, token: Address) -> impl Future<Output = Result<u8>> + Send;

    /// Returns the token's `symbol()`.
    fn symbol(&self, token: Address) -> impl Future<Output = Result<String>> + Send;

    /// Calls one fee accessor on a pair and returns its raw integer.
    fn fee(&self, pair: Address, accessor: FeeAccessor) -> impl Future<Output = Result<U256>> + Send;
}

/// Token-level metadata of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMetadata {
    pub token0: Address,
    pub token1: Address,
    pub decimals0: u8,
    pub decimals1: u8,
    pub symbol0: String,
    pub symbol1: String,
}

impl PairMetadata {
    /// Returns `"symbol0/symbol1"`.
    #[must_use]
    pub fn pair_symbol(&self) -> String {
        format!("{}/{}", self.symbol0, self.symbol1)
    }
}

/// Reads the tokens, decimals and symbols of a pair.
///
/// Fails with [`Error::Metadata`] when `token0`/`token1` or either `decimals` cannot be
/// read. Symbol failures are logged and replaced by [`UNKNOWN_SYMBOL`].
pub async fn read_metadata<C>(reader: &C, pair: Address) -> Result<PairMetadata, Error>
where
    C: ContractReader,
{
    let (token0, token1) = reader
        .pair_tokens(pair)
        .await
        .map_err(|source| Error::Metadata {
            contract: pair,
            field: MetadataField::Tokens,
            source,
        })?;

    let decimals0 = required_decimals(reader, token0).await?;
    let decimals1 = required_decimals(reader, token1).await?;

    let symbol0 = symbol_or_unknown(reader, token0).await;
    let symbol1 = symbol_or_unknown(reader, token1).await;

    Ok(PairMetadata {
        token0,
        token1,
        decimals0,
        decimals1,
        symbol0,
        symbol1,
    })
}

async fn required_decimals<C: ContractReader>(reader: &C, token: Address) -> Result<u8, Error> {
    reader
        .decimals(token)
        .await
        .map_err(|source| Error::Metadata {
            contract: token,
            field: MetadataField::Decimals,
            source,
        })
}

async fn symbol_or_unknown<C: ContractReader>(reader: &C, token: Address) -> String {
    match reader.symbol(token).await {
        Ok(symbol) => symbol,
        Err(err) => {
            log::warn!("symbol() of {token} unreadable, using {UNKNOWN_SYMBOL}: {err:#}");
            UNKNOWN_SYMBOL.to_owned()
        }
    }
}

/// [`ContractReader`] backed by JSON-RPC `eth_call`s.
pub struct RpcReader<P>
where
    P: Provider,
{
    provider: P,
}

impl RpcReader<DynProvider> {
    /// Connects to `url` and creates a reader over it.
    pub async fn with_url(url: &str) -> Result<Self, alloy::transports::TransportError> {
        let provider = super::connect(url).await?;
        Ok(Self::new(provider))
    }
}

impl<P> RpcReader<P>
where
    P: Provider,
{
    /// Create a reader.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the root provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the pair contract.
    pub fn pair(&self, address: Address) -> IPairInstance<P> {
        IPair::new(address, self.provider.clone())
    }

    /// Returns the token contract.
    pub fn token(&self, address: Address) -> IERC20MetadataInstance<P> {
        IERC20Metadata::new(address, self.provider.clone())
    }

    /// Returns the pair seen through its possible fee accessors.
    pub fn fee_accessors(&self, address: Address) -> IDynamicFeeInstance<P> {
        IDynamicFee::new(address, self.provider.clone())
    }
}

impl<P> ContractReader for RpcReader<P>
where
    P: Provider,
{
    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)> {
        let pair = self.pair(pair);
        let (token0, token1) = self
            .provider
            .multicall()
            .add(pair.token0())
            .add(pair.token1())
            .aggregate()
            .await?;
        Ok((token0, token1))
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        let decimals = self.token(token).decimals().call().await?;
        Ok(decimals)
    }

    async fn symbol(&self, token: Address) -> Result<String> {
        let symbol = self.token(token).symbol().call().await?;
        Ok(symbol)
    }

    async fn fee(&self, pair: Address, accessor: FeeAccessor) -> Result<U256> {
        let pool = self.fee_accessors(pair);
        let raw = match accessor {
            FeeAccessor::SwapFee => pool.swapFee().call().await?,
            FeeAccessor::GetSwapFee => pool.getSwapFee().call().await?,
            FeeAccessor::Fee => pool.fee().call().await?,
        };
        Ok(raw)
    }
}
