//! Contract interface (ABI) resolution.
//!
//! ABIs come from an external source-code registry such as BscScan. The registry is
//! rate limited per key, so the resolver holds an ordered list of equivalent keys and
//! walks it once per contract: any rejection, transport error or malformed answer moves
//! on to the next key, and only an exhausted list is reported as
//! [`Error::Resolution`](crate::Error::Resolution).
//!
//! Resolved interfaces are cached per address for the lifetime of the resolver.
//!
//! # Example
//!
//! ```no_run
//! use pairscan::registry::{AbiResolver, ApiKey, etherscan};
//! use pairscan::Address;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = etherscan::Client::new(reqwest::Client::new());
//! let mut resolver = AbiResolver::new(registry, [ApiKey::new("key-1"), ApiKey::new("key-2")]);
//!
//! let pair: Address = "0x16b9a82891338f9bA80E2D6970FddA79D1eb0daE".parse()?;
//! let interface = resolver.resolve(pair).await?;
//! println!("{} functions", interface.abi.functions.len());
//! # Ok(())
//! # }
//! ```

pub mod etherscan;

use std::{collections::HashMap, fmt, future::Future, str::FromStr, sync::Arc};

use alloy::{json_abi::JsonAbi, primitives::Address};
use anyhow::Result;

use crate::Error;

/// Registry credential.
///
/// `Debug` never prints the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key, for building requests.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl FromStr for ApiKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        anyhow::ensure!(!key.is_empty(), "empty API key");
        Ok(Self(key.to_owned()))
    }
}

/// Answer of a registry for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryReply {
    /// The raw ABI JSON.
    Found(String),
    /// The registry refused or has nothing for this contract.
    Rejected(String),
}

/// External source of contract ABIs.
pub trait InterfaceRegistry {
    /// Looks up the ABI of `address` using `key`.
    fn contract_abi(
        &self,
        address: Address,
        key: &ApiKey,
    ) -> impl Future<Output = Result<RegistryReply>> + Send;
}

/// A contract's interface: the text as served plus its parsed form.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractInterface {
    /// ABI JSON exactly as the registry returned it; persisted with the pair.
    pub raw: String,
    pub abi: JsonAbi,
}

impl ContractInterface {
    /// Parses a raw ABI JSON document.
    pub fn parse(raw: impl Into<String>) -> Result<Self, serde_json::Error> {
        let raw = raw.into();
        let abi = serde_json::from_str(&raw)?;
        Ok(Self { raw, abi })
    }

    /// Returns whether a function called `name` is declared.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.abi.functions.contains_key(name)
    }
}

/// Resolves ABIs by walking the key list once per contract.
pub struct AbiResolver<R> {
    registry: R,
    keys: Vec<ApiKey>,
    cache: HashMap<Address, Arc<ContractInterface>>,
}

impl<R> AbiResolver<R>
where
    R: InterfaceRegistry,
{
    /// Creates a resolver trying `keys` in the given order.
    pub fn new(registry: R, keys: impl IntoIterator<Item = ApiKey>) -> Self {
        Self {
            registry,
            keys: keys.into_iter().collect(),
            cache: HashMap::default(),
        }
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Number of configured keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the interface of `address`, from cache or from the registry.
    pub async fn resolve(&mut self, address: Address) -> Result<Arc<ContractInterface>, Error> {
        if let Some(interface) = self.cache.get(&address) {
            return Ok(interface.clone());
        }

        for (index, key) in self.keys.iter().enumerate() {
            let attempt = index + 1;
            match self.registry.contract_abi(address, key).await {
                Ok(RegistryReply::Found(raw)) => match ContractInterface::parse(raw) {
                    Ok(interface) => {
                        let interface = Arc::new(interface);
                        self.cache.insert(address, interface.clone());
                        return Ok(interface);
                    }
                    Err(err) => {
                        log::debug!("key #{attempt}: malformed ABI for {address}: {err}");
                    }
                },
                Ok(RegistryReply::Rejected(reason)) => {
                    log::debug!("key #{attempt}: registry rejected {address}: {reason}");
                }
                Err(err) => {
                    log::debug!("key #{attempt}: registry request for {address} failed: {err:#}");
                }
            }
        }

        Err(Error::Resolution {
            address,
            attempts: self.keys.len(),
        })
    }
}
