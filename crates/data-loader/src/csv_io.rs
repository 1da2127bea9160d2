use std::fs;
use std::path::{Path, PathBuf};

use metrics_core::{
    ArtifactSink, CorrelationMatrix, MetricsError, MetricsReport, MetricsResult, PriceRecord,
    PriceSource, SymbolSector,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const PRICE_COLUMNS: &[&str] = &["symbol", "trade_date", "open", "high", "low", "close", "volume"];
pub const SYMBOL_COLUMNS: &[&str] = &["symbol", "company", "sector"];

pub const TOP_GAINERS_FILE: &str = "top10_gainers.csv";
pub const TOP_LOSERS_FILE: &str = "top10_losers.csv";
pub const TOP_VOLATILITY_FILE: &str = "top10_volatility.csv";
pub const CUMULATIVE_FILE: &str = "cumulative_returns.csv";
pub const MARKET_SUMMARY_FILE: &str = "market_summary.csv";
pub const SECTOR_FILE: &str = "sector_performance.csv";
pub const CORRELATION_FILE: &str = "close_corr_matrix.csv";
pub const MOVERS_FILE: &str = "monthly_movers_top5_bottom5.csv";
pub const SYMBOL_METRICS_FILE: &str = "metrics_per_symbol.csv";

pub(crate) fn csv_error(err: csv::Error) -> MetricsError {
    if err.is_io_error() {
        MetricsError::Io(err.to_string())
    } else {
        MetricsError::Parse(err.to_string())
    }
}

/// Fail unless every `required` column is present in `headers`.
pub fn require_columns(headers: &csv::StringRecord, required: &[&str], source: &Path) -> MetricsResult<()> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(MetricsError::MissingColumn {
                column: column.to_string(),
                source_name: source.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Read a header-validated CSV file into typed rows.
pub fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> MetricsResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    require_columns(&headers, required, path)?;

    reader
        .deserialize()
        .map(|row| row.map_err(csv_error))
        .collect()
}

pub fn read_prices(path: &Path) -> MetricsResult<Vec<PriceRecord>> {
    read_table(path, PRICE_COLUMNS)
}

pub fn read_symbols(path: &Path) -> MetricsResult<Vec<SymbolSector>> {
    read_table(path, SYMBOL_COLUMNS)
}

/// Write `rows` under an explicit header, so empty relations still carry their columns.
pub fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> MetricsResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;
    writer.write_record(header).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Correlation matrix as a labelled square table; undefined cells are empty.
pub fn write_correlation(path: &Path, matrix: &CorrelationMatrix) -> MetricsResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;

    let mut header = vec!["symbol".to_string()];
    header.extend(matrix.symbols.iter().cloned());
    writer.write_record(&header).map_err(csv_error)?;

    for (symbol, row) in matrix.symbols.iter().zip(matrix.values.iter()) {
        let mut record = vec![symbol.clone()];
        record.extend(row.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        writer.write_record(&record).map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads the interim price and symbol masters.
pub struct CsvMasterSource {
    pub prices_path: PathBuf,
    pub symbols_path: PathBuf,
}

impl PriceSource for CsvMasterSource {
    fn load_prices(&self) -> MetricsResult<Vec<PriceRecord>> {
        read_prices(&self.prices_path)
    }

    fn load_symbols(&self) -> MetricsResult<Vec<SymbolSector>> {
        read_symbols(&self.symbols_path)
    }
}

/// Writes every report relation as a CSV file in one directory.
pub struct CsvArtifactWriter {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvArtifactWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far, in write order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn table<T: Serialize>(&mut self, name: &str, header: &[&str], rows: &[T]) -> MetricsResult<()> {
        let path = self.out_dir.join(name);
        write_table(&path, header, rows)?;
        tracing::debug!("wrote {} rows to {}", rows.len(), path.display());
        self.written.push(path);
        Ok(())
    }
}

impl ArtifactSink for CsvArtifactWriter {
    fn write_report(&mut self, report: &MetricsReport) -> MetricsResult<usize> {
        fs::create_dir_all(&self.out_dir)?;
        let before = self.written.len();

        self.table(TOP_GAINERS_FILE, &["symbol", "yearly_return"], &report.top_gainers)?;
        self.table(TOP_LOSERS_FILE, &["symbol", "yearly_return"], &report.top_losers)?;
        self.table(TOP_VOLATILITY_FILE, &["symbol", "volatility"], &report.top_volatility)?;
        self.table(CUMULATIVE_FILE, &["trade_date", "symbol", "cumret"], &report.cumulative_returns)?;
        self.table(
            MARKET_SUMMARY_FILE,
            &["green_count", "red_count", "avg_price", "avg_volume"],
            std::slice::from_ref(&report.market_summary),
        )?;
        self.table(SECTOR_FILE, &["sector", "yearly_return"], &report.sector_performance)?;

        let corr_path = self.out_dir.join(CORRELATION_FILE);
        write_correlation(&corr_path, &report.correlation)?;
        self.written.push(corr_path);

        self.table(
            MOVERS_FILE,
            &["symbol", "month", "monthly_return", "direction"],
            &report.monthly_movers,
        )?;
        self.table(
            SYMBOL_METRICS_FILE,
            &["symbol", "company", "sector", "yearly_return", "volatility", "avg_close", "avg_volume"],
            &report.symbol_metrics,
        )?;

        Ok(self.written.len() - before)
    }
}
