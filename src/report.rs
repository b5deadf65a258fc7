//! Liquidity report.
//!
//! Lists every candidate that passed the liquidity filter, whether or not it could be
//! resolved, highest liquidity first. Unresolved rows keep the feed's exchange id and show
//! `-` as pair symbol.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use alloy::primitives::Address;
use anyhow::{Context, Result};

use crate::{catalog::CatalogEntry, discovery::CandidatePool};

/// Pair symbol shown for candidates that could not be resolved.
pub const UNRESOLVED_SYMBOL: &str = "-";

/// One line of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub exchange: String,
    pub pair_symbol: String,
    pub pair_address: Address,
    pub volume_usd: f64,
    pub liquidity_usd: f64,
}

impl ReportRow {
    /// Row of a candidate stored as `entry`.
    pub fn resolved(candidate: &CandidatePool, entry: &CatalogEntry) -> Self {
        Self {
            exchange: entry.exchange.clone(),
            pair_symbol: entry.pair_symbol.clone(),
            pair_address: candidate.pair_address,
            volume_usd: candidate.volume_usd_24h,
            liquidity_usd: candidate.liquidity_usd,
        }
    }

    /// Row of a candidate that failed resolution.
    pub fn unresolved(candidate: &CandidatePool) -> Self {
        Self {
            exchange: candidate.dex_id.trim().to_lowercase(),
            pair_symbol: UNRESOLVED_SYMBOL.to_owned(),
            pair_address: candidate.pair_address,
            volume_usd: candidate.volume_usd_24h,
            liquidity_usd: candidate.liquidity_usd,
        }
    }
}

/// Collected report rows.
#[derive(Debug, Clone, Default)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Orders rows by liquidity, highest first. Ties keep discovery order.
    pub fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| b.liquidity_usd.total_cmp(&a.liquidity_usd));
    }

    /// Writes the report as an aligned table.
    pub fn write_to<W: Write>(&self, out: W) -> std::io::Result<()> {
        let mut writer = tabwriter::TabWriter::new(out);

        writeln!(
            &mut writer,
            "exchange\tpair\taddress\tvolume (USD)\tliquidity (USD)"
        )?;
        for row in &self.rows {
            writeln!(
                &mut writer,
                "{}\t{}\t{}\t{:.2}\t{:.2}",
                row.exchange, row.pair_symbol, row.pair_address, row.volume_usd, row.liquidity_usd,
            )?;
        }

        writer.flush()
    }

    /// Sorts the report and writes it to `path`.
    pub fn export(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.sort();
        let file = File::create(path)
            .with_context(|| format!("unable to create report {}", path.display()))?;
        self.write_to(BufWriter::new(file))
            .with_context(|| format!("unable to write report {}", path.display()))?;
        log::info!("report with {} row(s) written to {}", self.len(), path.display());
        Ok(())
    }
}
