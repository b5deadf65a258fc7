//! Scan orchestration.
//!
//! [`Scanner::run`] performs one full scan: discovery, then each surviving candidate is
//! normalized and upserted before the next one starts. A pair moves through
//!
//! ```text
//! Filtered → AbiResolved → MetadataResolved → Classified → FeeResolved → Normalized
//! ```
//!
//! and may leave for `Failed` at any step. A failed pair is logged and skipped; only a
//! catalog write error ends the run early.

use std::fmt;

use alloy::primitives::Address;
use anyhow::Result;

use crate::{
    Error,
    catalog::{CatalogEntry, CatalogStore},
    classify::{ProtocolVersion, classify, exchange_tag},
    config::ScanConfig,
    discovery::{CandidatePool, DiscoveryFeed, DiscoveryStats, collect_candidates},
    evm::reader::{ContractReader, read_metadata},
    fee::{FeeTable, ResolvedFee, resolve_fee},
    registry::{AbiResolver, InterfaceRegistry},
    report::{Report, ReportRow},
};

/// Last step a pair completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PairState {
    /// Passed the liquidity filter.
    #[display("filtered")]
    Filtered,
    #[display("ABI resolved")]
    AbiResolved,
    #[display("metadata resolved")]
    MetadataResolved,
    #[display("classified")]
    Classified,
    #[display("fee resolved")]
    FeeResolved,
    /// Ready to be stored.
    #[display("normalized")]
    Normalized,
}

/// A pair that could not be normalized.
#[derive(Debug)]
pub struct PairFailure {
    pub pair: Address,
    /// Last step completed before the failure.
    pub reached: PairState,
    pub error: Error,
}

impl fmt::Display for PairFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pair {} failed after {}: {}",
            self.pair,
            self.reached,
            self.error.display_chain()
        )
    }
}

/// A pair ready for the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPair {
    pub entry: CatalogEntry,
    pub version: ProtocolVersion,
    pub fee: ResolvedFee,
    /// Always [`PairState::Normalized`].
    pub state: PairState,
}

/// Counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub discovered: usize,
    pub malformed: usize,
    pub filtered_out: usize,
    pub duplicates: usize,
    pub failed_discovery: usize,
    /// Candidates that entered normalization.
    pub candidates: usize,
    pub inserted: usize,
    pub failed: usize,
    /// v2 pairs stored with the default fee.
    pub defaulted_fees: usize,
    /// v3 pairs stored without a fee.
    pub unresolved_fees: usize,
}

impl ScanSummary {
    fn from_discovery(stats: DiscoveryStats, candidates: usize) -> Self {
        Self {
            discovered: stats.discovered,
            malformed: stats.malformed,
            filtered_out: stats.filtered_out,
            duplicates: stats.duplicates,
            failed_discovery: stats.failed_tokens,
            candidates,
            ..Self::default()
        }
    }

    /// Feed records that did not end up in the catalog. Duplicates are not counted.
    pub fn not_inserted(&self) -> usize {
        self.malformed + self.filtered_out + self.failed
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pair(s) inserted, {} not inserted ({} below threshold, {} malformed, {} failed); \
             {} defaulted fee(s), {} unresolved fee(s); {} pool record(s) discovered, \
             {} duplicate(s), {} failed discovery call(s)",
            self.inserted,
            self.not_inserted(),
            self.filtered_out,
            self.malformed,
            self.failed,
            self.defaulted_fees,
            self.unresolved_fees,
            self.discovered,
            self.duplicates,
            self.failed_discovery,
        )
    }
}

/// Result of [`Scanner::run`].
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub summary: ScanSummary,
    /// One row per candidate, unsorted.
    pub report: Report,
}

/// Drives a scan over its collaborators.
pub struct Scanner<F, R, C> {
    feed: F,
    resolver: AbiResolver<R>,
    reader: C,
    fees: FeeTable,
    config: ScanConfig,
}

impl<F, R, C> Scanner<F, R, C>
where
    F: DiscoveryFeed,
    R: InterfaceRegistry,
    C: ContractReader,
{
    pub fn new(
        feed: F,
        resolver: AbiResolver<R>,
        reader: C,
        fees: FeeTable,
        config: ScanConfig,
    ) -> Self {
        Self {
            feed,
            resolver,
            reader,
            fees,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AbiResolver<R> {
        &self.resolver
    }

    pub fn reader(&self) -> &C {
        &self.reader
    }

    /// Runs discovery and normalizes every candidate into `store`.
    ///
    /// Fails only when the catalog cannot be written.
    pub async fn run(&mut self, store: &CatalogStore) -> Result<ScanOutcome> {
        let discovery = collect_candidates(&self.feed, &self.config).await;
        let mut outcome = ScanOutcome {
            summary: ScanSummary::from_discovery(discovery.stats, discovery.candidates.len()),
            report: Report::default(),
        };

        for candidate in &discovery.candidates {
            log::info!(
                "processing {} from {}",
                candidate.pair_address,
                candidate.dex_id
            );

            match self.normalize(candidate).await {
                Ok(normalized) => {
                    store.upsert(&normalized.entry)?;

                    let summary = &mut outcome.summary;
                    summary.inserted += 1;
                    if normalized.fee.is_defaulted() {
                        summary.defaulted_fees += 1;
                    }
                    if normalized.fee.is_unresolved() {
                        summary.unresolved_fees += 1;
                    }
                    outcome
                        .report
                        .push(ReportRow::resolved(candidate, &normalized.entry));

                    log::info!(
                        "stored {} {} as {} (fee {})",
                        normalized.entry.pair_symbol,
                        normalized.entry.pair_address,
                        normalized.entry.exchange,
                        fee_label(&normalized.fee),
                    );
                }
                Err(failure) => {
                    log::error!("{failure}");
                    outcome.summary.failed += 1;
                    outcome.report.push(ReportRow::unresolved(candidate));
                }
            }
        }

        log::info!("{}", outcome.summary);
        Ok(outcome)
    }

    /// Resolves one candidate into a catalog entry.
    pub async fn normalize(
        &mut self,
        candidate: &CandidatePool,
    ) -> Result<NormalizedPair, PairFailure> {
        let pair = candidate.pair_address;
        let mut state = PairState::Filtered;
        let fail = move |reached, error| PairFailure {
            pair,
            reached,
            error,
        };

        let interface = self
            .resolver
            .resolve(pair)
            .await
            .map_err(|err| fail(state, err))?;
        advance(pair, &mut state, PairState::AbiResolved);

        let metadata = read_metadata(&self.reader, pair)
            .await
            .map_err(|err| fail(state, err))?;
        advance(pair, &mut state, PairState::MetadataResolved);

        let version = classify(&interface.abi);
        let exchange = exchange_tag(&candidate.dex_id, version);
        log::debug!("{pair} classified as {exchange}");
        advance(pair, &mut state, PairState::Classified);

        let fee = resolve_fee(&self.reader, pair, version, &exchange, &self.fees).await;
        if fee.is_unresolved() && self.config.unresolved_fee.is_reject() {
            return Err(fail(state, Error::FeeUnresolved { pair }));
        }
        advance(pair, &mut state, PairState::FeeResolved);

        let pair_symbol = metadata.pair_symbol();
        let entry = CatalogEntry {
            exchange,
            pair_address: pair,
            token0: metadata.token0,
            token1: metadata.token1,
            symbol0: metadata.symbol0,
            symbol1: metadata.symbol1,
            pair_symbol,
            fee: fee.fee,
            decimals0: metadata.decimals0,
            decimals1: metadata.decimals1,
            abi_data: interface.raw.clone(),
        };

        advance(pair, &mut state, PairState::Normalized);
        Ok(NormalizedPair {
            entry,
            version,
            fee,
            state,
        })
    }
}

fn advance(pair: Address, state: &mut PairState, next: PairState) {
    log::debug!("{pair}: {state} -> {next}");
    *state = next;
}

fn fee_label(fee: &ResolvedFee) -> String {
    match fee.fee {
        Some(value) if fee.is_defaulted() => format!("{value}, defaulted"),
        Some(value) => value.to_string(),
        None => "unresolved".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::{TargetToken, UnresolvedFeePolicy},
        evm::reader::{FeeAccessor, UNKNOWN_SYMBOL},
        fee::{DEFAULT_V2_FEE, FeeSource},
        registry::ApiKey,
        testing::{
            FakeChain, FakeFeed, FakeRegistry, FakeToken, KeyBehavior, V2_PAIR_ABI, V3_POOL_ABI,
            pair_addr, pool_json, token_addr,
        },
    };

    type TestScanner = Scanner<FakeFeed, FakeRegistry, FakeChain>;

    fn config() -> ScanConfig {
        ScanConfig {
            tokens: vec![TargetToken::new("WBNB", token_addr(1))],
            request_delay: Duration::ZERO,
            ..ScanConfig::default()
        }
    }

    fn chain_with_pair(pair: Address) -> FakeChain {
        FakeChain::default()
            .with_pair(pair, token_addr(1), token_addr(2))
            .with_token(token_addr(1), FakeToken::new("WBNB", 18))
            .with_token(token_addr(2), FakeToken::new("USDT", 18))
    }

    fn scanner(feed: FakeFeed, registry: FakeRegistry, chain: FakeChain) -> TestScanner {
        let registry = registry.with_key("k1", KeyBehavior::Serve);
        let resolver = AbiResolver::new(registry, [ApiKey::new("k1")]);
        Scanner::new(feed, resolver, chain, FeeTable::default(), config())
    }

    #[tokio::test]
    async fn test_pancakeswap_pair_is_cataloged() {
        let pair = pair_addr(1);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![pool_json("pancakeswap", pair, 2_000_000.0, 500_000.0)],
        );
        let registry = FakeRegistry::default().with_abi(pair, V2_PAIR_ABI);
        let mut scanner = scanner(feed, registry, chain_with_pair(pair));
        let store = CatalogStore::open_in_memory().unwrap();

        let outcome = scanner.run(&store).await.unwrap();
        assert_eq!(outcome.summary.inserted, 1);
        assert_eq!(outcome.summary.not_inserted(), 0);

        let entry = store.get(pair).unwrap().unwrap();
        assert_eq!(
            entry,
            CatalogEntry {
                exchange: "pancakeswapv2".into(),
                pair_address: pair,
                token0: token_addr(1),
                token1: token_addr(2),
                symbol0: "WBNB".into(),
                symbol1: "USDT".into(),
                pair_symbol: "WBNB/USDT".into(),
                fee: Some(0.0025),
                decimals0: 18,
                decimals1: 18,
                abi_data: V2_PAIR_ABI.into(),
            }
        );

        let rows = outcome.report.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].exchange, "pancakeswapv2");
        assert_eq!(rows[0].volume_usd, 500_000.0);
    }

    #[tokio::test]
    async fn test_filtered_out_pair_is_never_resolved() {
        let pair = pair_addr(1);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![pool_json("pancakeswap", pair, 999_999.0, 500_000.0)],
        );
        let registry = FakeRegistry::default().with_abi(pair, V2_PAIR_ABI);
        let mut scanner = scanner(feed, registry, chain_with_pair(pair));
        let store = CatalogStore::open_in_memory().unwrap();

        let outcome = scanner.run(&store).await.unwrap();
        assert_eq!(scanner.resolver().registry().lookups(), 0);
        assert!(store.is_empty().unwrap());
        assert_eq!(outcome.summary.filtered_out, 1);
        assert_eq!(outcome.summary.not_inserted(), 1);
        assert!(outcome.report.is_empty());
    }

    #[tokio::test]
    async fn test_failed_pair_does_not_stop_the_batch() {
        let unverified = pair_addr(1);
        let broken = pair_addr(2);
        let good = pair_addr(3);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![
                pool_json("pancakeswap", unverified, 5_000_000.0, 1.0),
                pool_json("pancakeswap", broken, 4_000_000.0, 1.0),
                pool_json("pancakeswap", good, 3_000_000.0, 1.0),
            ],
        );
        let registry = FakeRegistry::default()
            .with_abi(broken, V2_PAIR_ABI)
            .with_abi(good, V2_PAIR_ABI);
        // `broken` has an ABI but no readable tokens
        let mut scanner = scanner(feed, registry, chain_with_pair(good));
        let store = CatalogStore::open_in_memory().unwrap();

        let outcome = scanner.run(&store).await.unwrap();
        assert_eq!(outcome.summary.inserted, 1);
        assert_eq!(outcome.summary.failed, 2);
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get(good).unwrap().is_some());

        let symbols: Vec<_> = outcome
            .report
            .rows()
            .iter()
            .map(|row| row.pair_symbol.as_str())
            .collect();
        assert_eq!(symbols, ["-", "-", "WBNB/USDT"]);
    }

    #[tokio::test]
    async fn test_failure_states() {
        let unverified = pair_addr(1);
        let broken = pair_addr(2);
        let registry = FakeRegistry::default().with_abi(broken, V2_PAIR_ABI);
        let mut scanner = scanner(FakeFeed::default(), registry, FakeChain::default());

        let candidate = |pair| CandidatePool {
            dex_id: "pancakeswap".into(),
            pair_address: pair,
            liquidity_usd: 2_000_000.0,
            volume_usd_24h: 0.0,
        };

        let failure = scanner.normalize(&candidate(unverified)).await.unwrap_err();
        assert_eq!(failure.reached, PairState::Filtered);
        assert!(matches!(failure.error, Error::Resolution { attempts: 1, .. }));

        let failure = scanner.normalize(&candidate(broken)).await.unwrap_err();
        assert_eq!(failure.reached, PairState::AbiResolved);
        assert!(matches!(failure.error, Error::Metadata { .. }));
        assert!(failure.to_string().contains("failed after ABI resolved"));
    }

    #[test]
    fn test_state_labels() {
        let cases = [
            (PairState::Filtered, "filtered"),
            (PairState::AbiResolved, "ABI resolved"),
            (PairState::MetadataResolved, "metadata resolved"),
            (PairState::Classified, "classified"),
            (PairState::FeeResolved, "fee resolved"),
            (PairState::Normalized, "normalized"),
        ];

        for (index, (state, label)) in cases.into_iter().enumerate() {
            assert_eq!(state.to_string(), label, "failed at {index}");
        }
    }

    #[tokio::test]
    async fn test_v3_pool_reads_dynamic_fee() {
        let pair = pair_addr(1);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![pool_json("PancakeSwap", pair, 2_000_000.0, 0.0)],
        );
        let registry = FakeRegistry::default().with_abi(pair, V3_POOL_ABI);
        let chain = chain_with_pair(pair).with_fee(pair, FeeAccessor::Fee, 500);
        let mut scanner = scanner(feed, registry, chain);
        let store = CatalogStore::open_in_memory().unwrap();

        scanner.run(&store).await.unwrap();
        let entry = store.get(pair).unwrap().unwrap();
        assert_eq!(entry.exchange, "pancakeswapv3");
        assert_eq!(entry.fee, Some(0.0005));
    }

    #[tokio::test]
    async fn test_unresolved_v3_fee_is_stored_absent() {
        let pair = pair_addr(1);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![pool_json("uniswap", pair, 2_000_000.0, 0.0)],
        );
        let registry = FakeRegistry::default().with_abi(pair, V3_POOL_ABI);
        let mut scanner = scanner(feed, registry, chain_with_pair(pair));
        let store = CatalogStore::open_in_memory().unwrap();

        let outcome = scanner.run(&store).await.unwrap();
        assert_eq!(outcome.summary.unresolved_fees, 1);
        assert_eq!(outcome.summary.inserted, 1);
        assert_eq!(store.get(pair).unwrap().unwrap().fee, None);
    }

    #[tokio::test]
    async fn test_unresolved_v3_fee_rejected_when_strict() {
        let pair = pair_addr(1);
        let registry = FakeRegistry::default().with_abi(pair, V3_POOL_ABI);
        let mut scanner = scanner(FakeFeed::default(), registry, chain_with_pair(pair));
        scanner.config.unresolved_fee = UnresolvedFeePolicy::Reject;

        let candidate = CandidatePool {
            dex_id: "uniswap".into(),
            pair_address: pair,
            liquidity_usd: 2_000_000.0,
            volume_usd_24h: 0.0,
        };
        let failure = scanner.normalize(&candidate).await.unwrap_err();
        assert_eq!(failure.reached, PairState::Classified);
        assert!(matches!(failure.error, Error::FeeUnresolved { pair: p } if p == pair));
    }

    #[tokio::test]
    async fn test_unknown_exchange_and_symbol_degrade() {
        let pair = pair_addr(1);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![pool_json("mdex", pair, 2_000_000.0, 0.0)],
        );
        let registry = FakeRegistry::default().with_abi(pair, V2_PAIR_ABI);
        let chain = FakeChain::default()
            .with_pair(pair, token_addr(1), token_addr(3))
            .with_token(token_addr(1), FakeToken::new("WBNB", 18))
            .with_token(token_addr(3), FakeToken::without_symbol(9));
        let mut scanner = scanner(feed, registry, chain);
        let store = CatalogStore::open_in_memory().unwrap();

        let outcome = scanner.run(&store).await.unwrap();
        assert_eq!(outcome.summary.defaulted_fees, 1);

        let entry = store.get(pair).unwrap().unwrap();
        assert_eq!(entry.exchange, "mdexv2");
        assert_eq!(entry.fee, Some(DEFAULT_V2_FEE));
        assert_eq!(entry.symbol1, UNKNOWN_SYMBOL);
        assert_eq!(entry.pair_symbol, "WBNB/UNKNOWN");
        assert_eq!(entry.decimals1, 9);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let pair = pair_addr(1);
        let other = pair_addr(2);
        let feed = FakeFeed::default().with_pools(
            token_addr(1),
            vec![
                pool_json("pancakeswap", pair, 2_000_000.0, 0.0),
                pool_json("pancakeswap", other, 1_000_000.0, 0.0),
            ],
        );
        let registry = FakeRegistry::default()
            .with_abi(pair, V2_PAIR_ABI)
            .with_abi(other, V2_PAIR_ABI);
        let chain = chain_with_pair(pair).with_pair(other, token_addr(2), token_addr(1));
        let mut scanner = scanner(feed, registry, chain);
        let store = CatalogStore::open_in_memory().unwrap();

        scanner.run(&store).await.unwrap();
        let first = store.entries().unwrap();
        scanner.run(&store).await.unwrap();
        let second = store.entries().unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_normalized_fee_source() {
        let pair = pair_addr(1);
        let registry = FakeRegistry::default().with_abi(pair, V2_PAIR_ABI);
        let mut scanner = scanner(FakeFeed::default(), registry, chain_with_pair(pair));

        let candidate = CandidatePool {
            dex_id: "biswap".into(),
            pair_address: pair,
            liquidity_usd: 2_000_000.0,
            volume_usd_24h: 0.0,
        };
        let normalized = scanner.normalize(&candidate).await.unwrap();
        assert_eq!(normalized.state, PairState::Normalized);
        assert_eq!(normalized.version, ProtocolVersion::V2);
        assert_eq!(normalized.fee.source, FeeSource::Table);
        assert_eq!(normalized.entry.fee, Some(0.002));
    }

    #[test]
    fn test_summary_display() {
        let summary = ScanSummary {
            discovered: 10,
            malformed: 1,
            filtered_out: 5,
            duplicates: 1,
            candidates: 3,
            inserted: 2,
            failed: 1,
            ..ScanSummary::default()
        };
        assert_eq!(summary.not_inserted(), 7);
        assert!(summary.to_string().starts_with("2 pair(s) inserted, 7 not inserted"));
    }
}
