//! Error taxonomy of a scan.
//!
//! Every variant is scoped to one token or one pair; none of them stops the batch.
//! Resource-level failures (catalog cannot be opened, RPC endpoint unreachable) are
//! plain [`anyhow::Error`]s raised outside the per-pair flow.

use alloy::primitives::Address;

/// Which required read failed while collecting pair metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum MetadataField {
    /// `token0()` / `token1()` on the pair.
    #[display("token0/token1")]
    Tokens,
    /// `decimals()` on one of the tokens.
    #[display("decimals")]
    Decimals,
}

/// Pair- or token-scoped failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The discovery feed was unreachable or answered with a non-success status.
    #[error("discovery feed failed for token {token}")]
    Discovery {
        token: Address,
        #[source]
        source: anyhow::Error,
    },
    /// Every registry credential was tried without a definitive answer.
    #[error("interface registry gave no ABI for {address} after {attempts} attempt(s)")]
    Resolution { address: Address, attempts: usize },
    /// A required contract read errored.
    #[error("failed to read {field} from {contract}")]
    Metadata {
        contract: Address,
        field: MetadataField,
        #[source]
        source: anyhow::Error,
    },
    /// No fee accessor answered for a v3 pair and the run requires a fee.
    #[error("no fee accessor answered for v3 pair {pair}")]
    FeeUnresolved { pair: Address },
}

impl Error {
    /// Renders the error followed by its whole source chain, `outer: inner: root`.
    pub fn display_chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_display_chain() {
        let token = address!("0x55d398326f99059fF775485246999027B3197955");
        let err = Error::Metadata {
            contract: token,
            field: MetadataField::Decimals,
            source: anyhow::anyhow!("execution reverted"),
        };
        let text = err.display_chain();
        assert!(text.starts_with("failed to read decimals from 0x55d3"), "{text}");
        assert!(text.ends_with(": execution reverted"), "{text}");
    }

    #[test]
    fn test_resolution_message() {
        let pair = address!("0x16b9a82891338f9bA80E2D6970FddA79D1eb0daE");
        let err = Error::Resolution {
            address: pair,
            attempts: 3,
        };
        assert_eq!(err.display_chain(), err.to_string());
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }
}
