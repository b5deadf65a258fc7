//! SQLite catalog of resolved pairs.
//!
//! One table, `token_pairs`, keyed by pair address. Writes are `INSERT OR REPLACE`, so
//! re-resolving a pair overwrites its row and running a scan twice over the same inputs
//! leaves the same contents. Addresses are stored in EIP-55 checksum form.
//!
//! The database runs in WAL mode with `synchronous=FULL`: an upsert that returned is on
//! disk even if the process or the machine dies right after.

use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A resolved pair as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Exchange tag with protocol suffix, e.g. `pancakeswapv2`.
    pub exchange: String,
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
    pub symbol0: String,
    pub symbol1: String,
    /// `symbol0/symbol1`.
    pub pair_symbol: String,
    /// Swap fee as a fraction; absent for v3 pools whose fee could not be read.
    pub fee: Option<f64>,
    pub decimals0: u8,
    pub decimals1: u8,
    /// ABI JSON as served by the interface registry.
    pub abi_data: String,
}

const SELECT_COLUMNS: &str = "exchange, pair_address, token0, token1, symbol0, symbol1, \
                              pair_symbol, fee, decimals0, decimals1, abi_data";

/// Handle on the catalog database.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Opens (or creates) the catalog at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("unable to open catalog {}", path.display()))?;
        Self::init(conn)
    }

    /// Opens a private in-memory catalog.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=FULL;
             PRAGMA busy_timeout=5000;",
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS token_pairs (
                exchange TEXT,
                pair_address TEXT PRIMARY KEY,
                token0 TEXT,
                token1 TEXT,
                symbol0 TEXT,
                symbol1 TEXT,
                pair_symbol TEXT,
                fee REAL,
                decimals0 INTEGER,
                decimals1 INTEGER,
                abi_data TEXT
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Inserts `entry`, replacing any row with the same pair address.
    ///
    /// Each call commits on its own.
    pub fn upsert(&self, entry: &CatalogEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO token_pairs (
                    exchange, pair_address, token0, token1,
                    symbol0, symbol1, pair_symbol, fee,
                    decimals0, decimals1, abi_data
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    entry.exchange,
                    entry.pair_address.to_checksum(None),
                    entry.token0.to_checksum(None),
                    entry.token1.to_checksum(None),
                    entry.symbol0,
                    entry.symbol1,
                    entry.pair_symbol,
                    entry.fee,
                    entry.decimals0,
                    entry.decimals1,
                    entry.abi_data,
                ],
            )
            .with_context(|| format!("unable to store pair {}", entry.pair_address))?;
        Ok(())
    }

    /// Returns the entry of `pair`, if stored.
    pub fn get(&self, pair: Address) -> Result<Option<CatalogEntry>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM token_pairs WHERE pair_address = ?1");
        let raw = self
            .conn
            .query_row(&sql, params![pair.to_checksum(None)], RawEntry::from_row)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM token_pairs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All entries ordered by pair address.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM token_pairs ORDER BY lower(pair_address)");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], RawEntry::from_row)?;

        let mut entries = Vec::new();
        for raw in rows {
            entries.push(raw?.into_entry()?);
        }
        Ok(entries)
    }
}

/// Row as stored, addresses still text.
struct RawEntry {
    exchange: String,
    pair_address: String,
    token0: String,
    token1: String,
    symbol0: String,
    symbol1: String,
    pair_symbol: String,
    fee: Option<f64>,
    decimals0: u8,
    decimals1: u8,
    abi_data: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            exchange: row.get(0)?,
            pair_address: row.get(1)?,
            token0: row.get(2)?,
            token1: row.get(3)?,
            symbol0: row.get(4)?,
            symbol1: row.get(5)?,
            pair_symbol: row.get(6)?,
            fee: row.get(7)?,
            decimals0: row.get(8)?,
            decimals1: row.get(9)?,
            abi_data: row.get(10)?,
        })
    }

    fn into_entry(self) -> Result<CatalogEntry> {
        let address = |text: &str| {
            text.parse::<Address>()
                .with_context(|| format!("invalid address {text:?} in catalog"))
        };
        Ok(CatalogEntry {
            pair_address: address(&self.pair_address)?,
            token0: address(&self.token0)?,
            token1: address(&self.token1)?,
            exchange: self.exchange,
            symbol0: self.symbol0,
            symbol1: self.symbol1,
            pair_symbol: self.pair_symbol,
            fee: self.fee,
            decimals0: self.decimals0,
            decimals1: self.decimals1,
            abi_data: self.abi_data,
        })
    }
}
