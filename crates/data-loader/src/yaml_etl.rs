use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::csv_io::write_table;

pub const RAW_PRICE_COLUMNS: &[&str] = &["trade_date", "symbol", "open", "high", "low", "close", "volume"];

/// One flattened YAML entry, before symbol and volume cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EtlSummary {
    pub files_found: usize,
    pub files_skipped: usize,
    pub records_skipped: usize,
    pub rows: usize,
    pub symbols: usize,
}

/// Every `*.yaml` file below `root`, at any depth, sorted by path.
pub fn discover_yaml_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "yaml") {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Flatten one YAML document: a list of daily entries for one or more tickers.
///
/// Returns `None` when the document is not a list. Entries that fail to convert are
/// logged and counted in the second tuple field.
pub fn parse_document(text: &str, origin: &Path) -> Result<Option<(Vec<RawPriceRow>, usize)>> {
    let doc: Value = serde_yaml::from_str(text).with_context(|| format!("parsing {}", origin.display()))?;
    let Value::Sequence(entries) = doc else {
        return Ok(None);
    };

    let mut rows = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in &entries {
        match entry_to_row(entry) {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping record in {}: {}", origin.display(), e);
            }
        }
    }

    Ok(Some((rows, skipped)))
}

fn entry_to_row(entry: &Value) -> Result<RawPriceRow> {
    let date = entry.get("date").ok_or_else(|| anyhow!("missing date"))?;
    let symbol = match entry.get("Ticker") {
        Some(Value::String(s)) => s.trim().to_uppercase(),
        Some(other) => scalar_text(other)?.trim().to_uppercase(),
        None => String::new(),
    };
    if symbol.is_empty() {
        bail!("missing Ticker");
    }

    Ok(RawPriceRow {
        trade_date: parse_trade_date(date)?,
        symbol,
        open: number_or_zero(entry, "open")?,
        high: number_or_zero(entry, "high")?,
        low: number_or_zero(entry, "low")?,
        close: number_or_zero(entry, "close")?,
        volume: integer_or_zero(entry, "volume")?,
    })
}

fn scalar_text(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => bail!("expected a scalar, found {:?}", other),
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn parse_trade_date(value: &Value) -> Result<NaiveDate> {
    let text = scalar_text(value)?;
    let day = text
        .trim()
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").with_context(|| format!("invalid date '{}'", text))
}

fn number_or_zero(entry: &Value, key: &str) -> Result<f64> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| anyhow!("{} is not a number", key)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .with_context(|| format!("{} '{}' is not a number", key, s)),
        Some(other) => bail!("{} has unexpected value {:?}", key, other),
    }
}

fn integer_or_zero(entry: &Value, key: &str) -> Result<i64> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| anyhow!("{} is not an integer", key)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .with_context(|| format!("{} '{}' is not an integer", key, s)),
        Some(other) => bail!("{} has unexpected value {:?}", key, other),
    }
}

/// Flatten every YAML file under `raw_dir` into `prices_all`, sorted by
/// (symbol, trade_date). With `split_dir`, also write one CSV per symbol there.
pub fn run_etl(raw_dir: &Path, prices_all: &Path, split_dir: Option<&Path>) -> Result<EtlSummary> {
    let files = discover_yaml_files(raw_dir)?;
    tracing::info!("Found {} YAML files under {}", files.len(), raw_dir.display());

    let mut summary = EtlSummary {
        files_found: files.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();

    for file in &files {
        let parsed = fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))
            .and_then(|text| parse_document(&text, file));

        match parsed {
            Ok(Some((mut file_rows, skipped))) => {
                summary.records_skipped += skipped;
                rows.append(&mut file_rows);
            }
            Ok(None) => {
                summary.files_skipped += 1;
                tracing::debug!("{} is not a list of entries", file.display());
            }
            Err(e) => {
                summary.files_skipped += 1;
                tracing::warn!("Error reading {}: {:#}", file.display(), e);
            }
        }
    }

    if rows.is_empty() {
        tracing::warn!("No data extracted from {}", raw_dir.display());
        return Ok(summary);
    }

    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.trade_date.cmp(&b.trade_date)));
    write_table(prices_all, RAW_PRICE_COLUMNS, &rows)?;
    summary.rows = rows.len();
    tracing::info!("Combined data saved to {} ({} rows)", prices_all.display(), rows.len());

    let mut by_symbol: BTreeMap<&str, Vec<&RawPriceRow>> = BTreeMap::new();
    for row in &rows {
        by_symbol.entry(row.symbol.as_str()).or_default().push(row);
    }
    summary.symbols = by_symbol.len();

    if let Some(dir) = split_dir {
        for (symbol, group) in &by_symbol {
            write_table(&dir.join(format!("{symbol}.csv")), RAW_PRICE_COLUMNS, group)?;
        }
        tracing::info!("Created {} symbol files in {}", by_symbol.len(), dir.display());
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DAY_ONE: &str = r#"
- Ticker: sbin
  close: 602.95
  date: '2023-10-03 05:30:00'
  high: 604.9
  low: 589.6
  month: 2023-10
  open: 596.6
  volume: 15322196
- Ticker: TCS
  close: 3513.85
  date: '2023-10-03 05:30:00'
  high: 3534.2
  low: 3480.1
  open: 3530.0
  volume: 1948663
- Ticker: TCS
  date: 'not a date'
"#;

    const DAY_TWO: &str = r#"
- Ticker: TCS
  close: 3518.5
  date: 2023-10-04
  open: 3510
  volume: "2000000"
"#;

    #[test]
    fn test_parse_document_skips_bad_entries() {
        let (rows, skipped) = parse_document(DAY_ONE, Path::new("day1.yaml")).unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(rows[0].symbol, "SBIN");
        assert_eq!(rows[0].trade_date, NaiveDate::from_ymd_opt(2023, 10, 3).unwrap());
        assert_eq!(rows[0].volume, 15_322_196);
    }

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let (rows, _) = parse_document(DAY_TWO, Path::new("day2.yaml")).unwrap().unwrap();
        assert_eq!(rows[0].high, 0.0);
        assert_eq!(rows[0].open, 3510.0);
        assert_eq!(rows[0].volume, 2_000_000);
    }

    #[test]
    fn test_non_list_document_is_ignored() {
        assert!(parse_document("ticker: TCS", Path::new("x.yaml")).unwrap().is_none());
    }

    #[test]
    fn test_run_etl_recurses_sorts_and_splits() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("raw_yaml");
        fs::create_dir_all(raw.join("2023-10")).unwrap();
        fs::write(raw.join("2023-10").join("2023-10-04.yaml"), DAY_TWO).unwrap();
        fs::write(raw.join("2023-10").join("2023-10-03.yaml"), DAY_ONE).unwrap();
        fs::write(raw.join("notes.txt"), "ignored").unwrap();
        fs::write(raw.join("broken.yaml"), "- [unclosed").unwrap();

        let prices_all = dir.path().join("interim").join("prices_all.csv");
        let split = dir.path().join("processed");
        let summary = run_etl(&raw, &prices_all, Some(&split)).unwrap();

        assert_eq!(summary.files_found, 3);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.records_skipped, 1);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.symbols, 2);

        let written = fs::read_to_string(&prices_all).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "trade_date,symbol,open,high,low,close,volume");
        assert!(lines[1].starts_with("2023-10-03,SBIN"));
        assert!(lines[2].starts_with("2023-10-03,TCS"));
        assert!(lines[3].starts_with("2023-10-04,TCS"));

        assert!(split.join("TCS.csv").exists());
        assert!(split.join("SBIN.csv").exists());
    }

    #[test]
    fn test_empty_extraction_writes_nothing() {
        let dir = tempdir().unwrap();
        let prices_all = dir.path().join("prices_all.csv");
        let summary = run_etl(dir.path(), &prices_all, None).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(!prices_all.exists());
    }
}
