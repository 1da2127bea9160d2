use std::path::Path;

use anyhow::{Context, Result};
use metrics_core::PriceRecord;

use crate::csv_io::{read_table, write_table, PRICE_COLUMNS};
use crate::yaml_etl::{RawPriceRow, RAW_PRICE_COLUMNS};

/// Uppercase the symbol and clip negative volume to zero.
pub fn clean_row(row: RawPriceRow) -> PriceRecord {
    PriceRecord {
        symbol: row.symbol.trim().to_uppercase(),
        trade_date: row.trade_date,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        volume: u64::try_from(row.volume).unwrap_or(0),
    }
}

/// Read the flattened YAML output and write the cleaned price master.
pub fn build_prices_master(prices_all: &Path, out: &Path) -> Result<Vec<PriceRecord>> {
    let raw: Vec<RawPriceRow> = read_table(prices_all, RAW_PRICE_COLUMNS)
        .with_context(|| format!("reading {}", prices_all.display()))?;

    let clipped = raw.iter().filter(|r| r.volume < 0).count();
    if clipped > 0 {
        tracing::warn!("Clipped negative volume to 0 on {} rows", clipped);
    }

    let prices: Vec<PriceRecord> = raw.into_iter().map(clean_row).collect();
    write_table(out, PRICE_COLUMNS, &prices)?;
    tracing::info!("Price master saved to {} ({} rows)", out.display(), prices.len());
    Ok(prices)
}
