use anyhow::{bail, Context, Result};
use metrics_engine::EngineConfig;
use std::env;
use std::path::PathBuf;

/// File locations and pipeline knobs, read from the environment (after `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub raw_yaml_dir: PathBuf,
    pub interim_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub sector_csv: PathBuf,
    pub database_url: String,
    pub top_n: usize,
    pub movers_per_month: usize,
    pub split_per_symbol: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_yaml_dir: PathBuf::from("data/raw_yaml"),
            interim_dir: PathBuf::from("data/interim"),
            processed_dir: PathBuf::from("data/processed"),
            sector_csv: PathBuf::from("sector_mapping.csv"),
            database_url: "sqlite:stockdb.sqlite".to_string(),
            top_n: 10,
            movers_per_month: 5,
            split_per_symbol: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            raw_yaml_dir: lookup("RAW_YAML_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.raw_yaml_dir),
            interim_dir: lookup("INTERIM_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.interim_dir),
            processed_dir: lookup("PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            sector_csv: lookup("SECTOR_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.sector_csv),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            top_n: lookup("TOP_N")
                .unwrap_or_else(|| defaults.top_n.to_string())
                .parse()
                .context("TOP_N must be a positive integer")?,
            movers_per_month: lookup("MOVERS_PER_MONTH")
                .unwrap_or_else(|| defaults.movers_per_month.to_string())
                .parse()
                .context("MOVERS_PER_MONTH must be a positive integer")?,
            split_per_symbol: lookup("SPLIT_PER_SYMBOL")
                .unwrap_or_else(|| defaults.split_per_symbol.to_string())
                .parse()
                .context("SPLIT_PER_SYMBOL must be true or false")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            bail!("TOP_N must be greater than zero");
        }
        if self.movers_per_month == 0 {
            bail!("MOVERS_PER_MONTH must be greater than zero");
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            top_n: self.top_n,
            movers_per_month: self.movers_per_month,
        }
    }

    /// Flattened YAML output.
    pub fn prices_all_path(&self) -> PathBuf {
        self.interim_dir.join("prices_all.csv")
    }

    pub fn prices_master_path(&self) -> PathBuf {
        self.interim_dir.join("prices_master.csv")
    }

    pub fn symbols_master_path(&self) -> PathBuf {
        self.interim_dir.join("symbols_master.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(
            config.prices_master_path(),
            PathBuf::from("data/interim/prices_master.csv")
        );
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("INTERIM_DIR", "/tmp/interim"),
            ("TOP_N", "3"),
            ("SPLIT_PER_SYMBOL", "false"),
        ]))
        .unwrap();
        assert_eq!(config.top_n, 3);
        assert!(!config.split_per_symbol);
        assert_eq!(
            config.symbols_master_path(),
            PathBuf::from("/tmp/interim/symbols_master.csv")
        );
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(PipelineConfig::from_lookup(lookup(&[("TOP_N", "ten")])).is_err());
        assert!(PipelineConfig::from_lookup(lookup(&[("MOVERS_PER_MONTH", "0")])).is_err());
    }
}
