use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metrics_core::{ArtifactSink, MetricsReport, PriceSource};
use metrics_engine::MetricsEngine;

use crate::config::PipelineConfig;
use crate::csv_io::{CsvArtifactWriter, CsvMasterSource};
use crate::master::build_prices_master;
use crate::sectors::build_symbols_master;
use crate::yaml_etl::{run_etl, EtlSummary};

pub struct ComputeOutcome {
    pub report: MetricsReport,
    pub artifacts: Vec<PathBuf>,
}

/// Flatten the raw YAML tree into the interim price file.
pub fn etl(config: &PipelineConfig) -> Result<EtlSummary> {
    let split_dir = config.split_per_symbol.then_some(config.processed_dir.as_path());
    run_etl(&config.raw_yaml_dir, &config.prices_all_path(), split_dir)
}

/// Build both master tables from the interim price file and the sector mapping.
pub fn masters(config: &PipelineConfig) -> Result<()> {
    build_symbols_master(&config.sector_csv, &config.symbols_master_path())?;
    build_prices_master(&config.prices_all_path(), &config.prices_master_path())?;
    Ok(())
}

/// Load from `source`, run the engine and write every artifact to `out_dir`.
pub fn compute<S: PriceSource>(source: &S, engine: &MetricsEngine, out_dir: &Path) -> Result<ComputeOutcome> {
    let prices = source.load_prices().context("loading price master")?;
    let symbols = source.load_symbols().context("loading symbol master")?;
    tracing::info!("Loaded {} price rows and {} symbols", prices.len(), symbols.len());

    let report = engine.run(&prices, &symbols)?;

    let mut writer = CsvArtifactWriter::new(out_dir);
    let count = writer
        .write_report(&report)
        .with_context(|| format!("writing artifacts to {}", out_dir.display()))?;
    tracing::info!("Wrote {} artifacts to {}", count, out_dir.display());

    Ok(ComputeOutcome {
        report,
        artifacts: writer.written().to_vec(),
    })
}

pub fn master_source(config: &PipelineConfig) -> CsvMasterSource {
    CsvMasterSource {
        prices_path: config.prices_master_path(),
        symbols_path: config.symbols_master_path(),
    }
}

/// etl → masters → compute, writing artifacts to the configured processed directory.
pub fn run_all(config: &PipelineConfig) -> Result<ComputeOutcome> {
    let summary = etl(config)?;
    if summary.rows == 0 {
        anyhow::bail!("no price rows extracted from {}", config.raw_yaml_dir.display());
    }
    masters(config)?;
    let engine = MetricsEngine::new(config.engine_config());
    compute(&master_source(config), &engine, &config.processed_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn day(date: &str, entries: &[(&str, f64)]) -> String {
        entries
            .iter()
            .map(|(ticker, close)| {
                format!(
                    "- Ticker: {ticker}\n  date: '{date} 05:30:00'\n  open: {close}\n  high: {close}\n  low: {close}\n  close: {close}\n  volume: 100\n"
                )
            })
            .collect()
    }

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            raw_yaml_dir: root.join("raw"),
            interim_dir: root.join("interim"),
            processed_dir: root.join("processed"),
            sector_csv: root.join("sector_mapping.csv"),
            split_per_symbol: false,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_run_all_end_to_end() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let month = config.raw_yaml_dir.join("2023-10");
        fs::create_dir_all(&month).unwrap();
        fs::write(month.join("a.yaml"), day("2023-10-03", &[("TCS", 100.0), ("SBIN", 50.0)])).unwrap();
        fs::write(month.join("b.yaml"), day("2023-10-04", &[("TCS", 110.0), ("SBIN", 45.0)])).unwrap();
        fs::write(month.join("c.yaml"), day("2023-10-05", &[("TCS", 104.5), ("SBIN", 47.25)])).unwrap();
        fs::write(
            &config.sector_csv,
            "Company,Sector,Symbol\nTata Consultancy,it,TCS: TCS\nState Bank,banking,SBI: SBIN\n",
        )
        .unwrap();

        let outcome = run_all(&config).unwrap();

        assert_eq!(outcome.artifacts.len(), 9);
        assert_eq!(outcome.report.market_summary.green_count, 1);
        assert_eq!(outcome.report.market_summary.red_count, 1);
        assert_eq!(outcome.report.top_gainers[0].symbol, "TCS");
        assert!(config.symbols_master_path().exists());
        assert!(config.prices_master_path().exists());

        let corr = outcome.report.correlation.get("TCS", "SBIN").unwrap();
        assert!((corr - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_run_all_without_input_fails() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.raw_yaml_dir).unwrap();
        assert!(run_all(&config).is_err());
    }
}
