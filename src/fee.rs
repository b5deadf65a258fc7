//! Swap fee resolution.
//!
//! v2 pairs have a fixed fee per exchange, looked up in a [`FeeTable`] by exchange tag and
//! defaulting to [`DEFAULT_V2_FEE`]. v3 pools carry their fee on-chain; it is read through
//! the first answering [`FeeAccessor`] and scaled from hundredths of a basis point.
//! A v3 pool no accessor answers for has no fee rather than a guessed one.

use std::{collections::BTreeMap, path::Path};

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;

use crate::{
    classify::ProtocolVersion,
    evm::{
        from_wei,
        reader::{ContractReader, FeeAccessor},
    },
};

/// Fee assumed for v2 exchanges missing from the table.
pub const DEFAULT_V2_FEE: f64 = 0.003;

/// Decimals of on-chain v3 fees (`3000` = 0.3%).
pub const DYNAMIC_FEE_DECIMALS: u32 = 6;

/// Static v2 fees keyed by exchange tag (`pancakeswapv2`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTable {
    fees: BTreeMap<String, f64>,
}

impl Default for FeeTable {
    /// Fees of the common BSC v2 forks.
    fn default() -> Self {
        let fees = [
            ("uniswapv2", 0.003),
            ("pancakeswapv2", 0.0025),
            ("biswapv2", 0.002),
            ("apeswapv2", 0.002),
            ("thenav2", 0.0001),
            ("swychv2", 0.0025),
        ];
        Self {
            fees: fees
                .into_iter()
                .map(|(tag, fee)| (tag.to_owned(), fee))
                .collect(),
        }
    }
}

impl FeeTable {
    /// A table without entries; every v2 lookup defaults.
    pub fn empty() -> Self {
        Self {
            fees: BTreeMap::new(),
        }
    }

    /// Adds or replaces the fee of `exchange`.
    ///
    /// Tags are case-insensitive. Fails unless `0 <= fee < 1`.
    pub fn insert(&mut self, exchange: &str, fee: f64) -> Result<()> {
        anyhow::ensure!(
            (0.0..1.0).contains(&fee),
            "fee {fee} for {exchange} outside [0, 1)"
        );
        self.fees.insert(exchange.trim().to_lowercase(), fee);
        Ok(())
    }

    /// Returns the fee of `exchange`, if listed.
    pub fn get(&self, exchange: &str) -> Option<f64> {
        self.fees.get(&exchange.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.fees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fees.is_empty()
    }

    /// Overlays every entry of `other` on this table.
    pub fn extend(&mut self, other: FeeTable) {
        self.fees.extend(other.fees);
    }

    /// Parses a JSON object of `tag -> fraction`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, f64> =
            serde_json::from_str(json).context("fee table must be a JSON object of numbers")?;
        let mut table = Self::empty();
        for (exchange, fee) in raw {
            table.insert(&exchange, fee)?;
        }
        Ok(table)
    }

    /// Reads a JSON fee table from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read fee table {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid fee table {}", path.display()))
    }
}

/// Where a fee came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum FeeSource {
    /// Read on-chain through the given accessor.
    Dynamic(FeeAccessor),
    /// Listed in the fee table.
    Table,
    /// v2 exchange missing from the table; [`DEFAULT_V2_FEE`] assumed.
    Defaulted,
    /// v3 pool for which no accessor answered.
    Unresolved,
}

/// A resolved fee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFee {
    /// Fraction of the swapped amount; `None` only when unresolved.
    pub fee: Option<f64>,
    pub source: FeeSource,
}

impl ResolvedFee {
    pub fn is_defaulted(&self) -> bool {
        self.source.is_defaulted()
    }

    pub fn is_unresolved(&self) -> bool {
        self.source.is_unresolved()
    }
}

/// Scales a raw on-chain fee to a fraction.
///
/// Returns `None` for values that do not describe a fee (`>= 100%`).
pub fn scale_dynamic_fee(raw: U256) -> Option<f64> {
    let fee = from_wei(raw, DYNAMIC_FEE_DECIMALS)?.to_f64()?;
    (fee < 1.0).then_some(fee)
}

/// Resolves the fee of `pair`.
///
/// `exchange` is the full tag (`pancakeswapv2`) used for table lookups.
pub async fn resolve_fee<C>(
    reader: &C,
    pair: Address,
    version: ProtocolVersion,
    exchange: &str,
    table: &FeeTable,
) -> ResolvedFee
where
    C: ContractReader,
{
    match version {
        ProtocolVersion::V3 => {
            for accessor in FeeAccessor::PRIORITY {
                match reader.fee(pair, accessor).await {
                    Ok(raw) => match scale_dynamic_fee(raw) {
                        Some(fee) => {
                            return ResolvedFee {
                                fee: Some(fee),
                                source: FeeSource::Dynamic(accessor),
                            };
                        }
                        None => log::debug!("{accessor}() of {pair} returned {raw}, ignored"),
                    },
                    Err(err) => log::debug!("{accessor}() of {pair} failed: {err:#}"),
                }
            }
            log::warn!("no fee accessor answered for {exchange} pool {pair}");
            ResolvedFee {
                fee: None,
                source: FeeSource::Unresolved,
            }
        }
        ProtocolVersion::V2 => match table.get(exchange) {
            Some(fee) => ResolvedFee {
                fee: Some(fee),
                source: FeeSource::Table,
            },
            None => {
                log::warn!("{exchange} not in fee table, assuming {DEFAULT_V2_FEE} for {pair}");
                ResolvedFee {
                    fee: Some(DEFAULT_V2_FEE),
                    source: FeeSource::Defaulted,
                }
            }
        },
    }
}
