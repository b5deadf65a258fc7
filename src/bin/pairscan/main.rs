use std::{
    io::{BufRead, Write, stdin, stdout},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use pairscan::{
    Scanner,
    catalog::CatalogStore,
    config::{
        self, DEFAULT_CATALOG_PATH, DEFAULT_CHAIN, DEFAULT_REPORT_PATH, ScanConfig, TargetToken,
        UnresolvedFeePolicy,
    },
    discovery::dexscreener,
    evm::{self, reader::RpcReader},
    fee::FeeTable,
    registry::{AbiResolver, ApiKey, etherscan},
};
use url::Url;

/// Legacy single-key variables, tried when no key list is configured.
const LEGACY_KEY_VARS: [&str; 3] = ["BSCSCAN_API_KEY", "BSCSCAN_API_KEY_2", "BSCSCAN_API_KEY_3"];

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// JSON-RPC endpoint of the chain.
    #[arg(long, env = "BSC_RPC_URL")]
    rpc_url: String,
    /// Registry API keys, tried in order. Comma separated in the environment.
    #[arg(long = "api-key", env = "BSCSCAN_API_KEYS", value_delimiter = ',')]
    api_keys: Vec<ApiKey>,
    /// Chain identifier used by the discovery feed.
    #[arg(long, default_value = DEFAULT_CHAIN)]
    chain: String,
    /// Target token as SYMBOL=0xADDRESS. Repeatable; defaults to WBNB and USDT.
    #[arg(long = "token")]
    tokens: Vec<TargetToken>,
    /// Minimum pool liquidity in USD, inclusive.
    #[arg(long, env = "LIQUIDITY_THRESHOLD", default_value_t = config::DEFAULT_LIQUIDITY_THRESHOLD)]
    min_liquidity: f64,
    /// Pause between discovery requests, in milliseconds.
    #[arg(long, default_value_t = 250)]
    delay_ms: u64,
    /// Catalog database.
    #[arg(long, default_value = DEFAULT_CATALOG_PATH)]
    db: PathBuf,
    /// Where the liquidity report is written.
    #[arg(long, default_value = DEFAULT_REPORT_PATH)]
    report: PathBuf,
    /// Write the liquidity report without asking.
    #[arg(long)]
    export: Option<bool>,
    /// JSON object of exchange tag to fee, merged over the built-in table.
    #[arg(long)]
    fee_table: Option<PathBuf>,
    /// Fail v3 pools whose fee cannot be read instead of storing them without one.
    #[arg(long)]
    strict_fees: bool,
    /// Discovery feed base URL.
    #[arg(long)]
    feed_url: Option<Url>,
    /// Interface registry endpoint.
    #[arg(long)]
    registry_url: Option<Url>,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            chain: self.chain.clone(),
            tokens: if self.tokens.is_empty() {
                config::default_tokens()
            } else {
                self.tokens.clone()
            },
            liquidity_threshold: self.min_liquidity,
            request_delay: Duration::from_millis(self.delay_ms),
            unresolved_fee: if self.strict_fees {
                UnresolvedFeePolicy::Reject
            } else {
                UnresolvedFeePolicy::StoreAbsent
            },
        }
    }

    fn registry_keys(&self) -> anyhow::Result<Vec<ApiKey>> {
        let keys = if self.api_keys.is_empty() {
            LEGACY_KEY_VARS
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .filter_map(|value| value.parse().ok())
                .collect()
        } else {
            self.api_keys.clone()
        };
        anyhow::ensure!(
            !keys.is_empty(),
            "no registry API key configured (BSCSCAN_API_KEYS or --api-key)"
        );
        Ok(keys)
    }

    fn fee_table(&self) -> anyhow::Result<FeeTable> {
        let mut table = FeeTable::default();
        if let Some(path) = &self.fee_table {
            table.extend(FeeTable::load(path)?);
        }
        Ok(table)
    }
}

fn ask_export(report: &Path) -> anyhow::Result<bool> {
    print!(
        "Export the liquidity report to {} after scanning? (Y/N): ",
        report.display()
    );
    stdout().flush()?;

    let mut answer = String::new();
    stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let keys = args.registry_keys()?;
    let fees = args.fee_table()?;
    let config = args.scan_config();

    let export = match args.export {
        Some(export) => export,
        None => ask_export(&args.report)?,
    };

    let store = CatalogStore::open(&args.db)?;

    let provider = evm::connect(&args.rpc_url)
        .await
        .context("invalid RPC endpoint")?;
    let chain_id = evm::chain_id(&provider)
        .await
        .context("RPC endpoint unreachable")?;
    log::info!("connected to chain {chain_id}");

    let http_client = reqwest::Client::builder().tcp_nodelay(true).build()?;
    let mut feed = dexscreener::Client::new(http_client.clone());
    if let Some(url) = args.feed_url.clone() {
        feed = feed.with_url(url);
    }
    let mut registry = etherscan::Client::new(http_client);
    if let Some(url) = args.registry_url.clone() {
        registry = registry.with_url(url);
    }
    log::info!(
        "scanning {} token(s) with {} registry key(s)",
        config.tokens.len(),
        keys.len()
    );

    let mut scanner = Scanner::new(
        feed,
        AbiResolver::new(registry, keys),
        RpcReader::new(provider),
        fees,
        config,
    );
    let mut outcome = scanner.run(&store).await?;

    if export {
        outcome.report.export(&args.report)?;
    }

    println!("{}", outcome.summary);

    Ok(())
}
