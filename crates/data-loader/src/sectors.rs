use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use metrics_core::{MetricsError, SymbolSector};

use crate::csv_io::{write_table, SYMBOL_COLUMNS};

/// Lowercase, trim and underscore a header cell: `" Sector Name "` → `"sector_name"`.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Extract the ticker from cells like `"ASIAN PAINTS: ASIANPAINT"`; plain tickers pass
/// through. Always trimmed and uppercased.
pub fn extract_ticker(cell: &str) -> Option<String> {
    let ticker = match cell.rsplit_once(':') {
        Some((_, tail)) => tail,
        None => cell,
    }
    .trim()
    .to_uppercase();

    (!ticker.is_empty()).then_some(ticker)
}

/// Parse a raw sector mapping file into a symbol-unique lookup sorted by symbol.
///
/// Rows with an empty symbol, company or sector are dropped, exact duplicates are
/// removed, and when one symbol maps to several rows only the first is kept.
pub fn normalize_sector_csv(text: &str, source: &Path) -> Result<Vec<SymbolSector>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| MetricsError::MissingColumn {
                column: name.to_string(),
                source_name: source.display().to_string(),
            })
    };
    let (symbol_col, company_col, sector_col) = (column("symbol")?, column("company")?, column("sector")?);

    let mut rows = Vec::new();
    let mut seen_rows = HashSet::new();
    let mut seen_symbols = HashSet::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record?;
        let symbol = record.get(symbol_col).and_then(extract_ticker);
        let company = record.get(company_col).map(str::trim).filter(|s| !s.is_empty());
        let sector = record
            .get(sector_col)
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());

        let (Some(symbol), Some(company), Some(sector)) = (symbol, company, sector) else {
            dropped += 1;
            continue;
        };

        let row = SymbolSector {
            symbol,
            company: company.to_string(),
            sector,
        };
        if !seen_rows.insert(row.clone()) {
            continue;
        }
        if !seen_symbols.insert(row.symbol.clone()) {
            tracing::warn!("Symbol {} mapped more than once; keeping the first entry", row.symbol);
            continue;
        }
        rows.push(row);
    }

    if dropped > 0 {
        tracing::warn!("Dropped {} incomplete sector rows from {}", dropped, source.display());
    }

    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(rows)
}

/// Normalize `sector_csv` and write the symbol master.
pub fn build_symbols_master(sector_csv: &Path, out: &Path) -> Result<Vec<SymbolSector>> {
    let text = std::fs::read_to_string(sector_csv)
        .with_context(|| format!("reading sector mapping {}", sector_csv.display()))?;
    let symbols = normalize_sector_csv(&text, sector_csv)?;
    write_table(out, SYMBOL_COLUMNS, &symbols)?;
    tracing::info!("Sector-symbol mapping saved to {} ({} symbols)", out.display(), symbols.len());
    Ok(symbols)
}
