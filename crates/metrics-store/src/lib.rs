//! SQLite persistence for the symbol master, price master and per-symbol metrics.
//!
//! Every `replace_*` call drops and recreates its table, then bulk inserts inside a
//! single transaction, so a failed load leaves the previous contents in place.

use anyhow::Result;
use metrics_core::{PriceRecord, SymbolMetricsSummary, SymbolSector};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SYMBOLS_DDL: &str = r#"
    CREATE TABLE symbols (
        symbol TEXT PRIMARY KEY,
        company TEXT NOT NULL,
        sector TEXT NOT NULL
    )
"#;

const PRICES_DDL: &str = r#"
    CREATE TABLE prices (
        symbol TEXT NOT NULL,
        trade_date DATE NOT NULL,
        open REAL NOT NULL,
        high REAL NOT NULL,
        low REAL NOT NULL,
        close REAL NOT NULL,
        volume INTEGER NOT NULL,
        PRIMARY KEY (symbol, trade_date)
    )
"#;

const SYMBOL_METRICS_DDL: &str = r#"
    CREATE TABLE symbol_metrics (
        symbol TEXT PRIMARY KEY,
        company TEXT,
        sector TEXT,
        yearly_return REAL,
        volatility REAL,
        avg_close REAL NOT NULL,
        avg_volume REAL NOT NULL
    )
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Symbols,
    Prices,
    SymbolMetrics,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Symbols => "symbols",
            Table::Prices => "prices",
            Table::SymbolMetrics => "symbol_metrics",
        }
    }

    fn ddl(&self) -> &'static str {
        match self {
            Table::Symbols => SYMBOLS_DDL,
            Table::Prices => PRICES_DDL,
            Table::SymbolMetrics => SYMBOL_METRICS_DDL,
        }
    }
}

#[derive(Clone)]
pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Open the database, creating the file if it does not exist.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn replace_symbols(&self, rows: &[SymbolSector]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        recreate(&mut tx, Table::Symbols).await?;

        for row in rows {
            sqlx::query("INSERT INTO symbols (symbol, company, sector) VALUES (?, ?, ?)")
                .bind(&row.symbol)
                .bind(&row.company)
                .bind(&row.sector)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!("Loaded {} rows into symbols", rows.len());
        Ok(rows.len() as u64)
    }

    pub async fn replace_prices(&self, rows: &[PriceRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        recreate(&mut tx, Table::Prices).await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO prices (symbol, trade_date, open, high, low, close, volume)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.symbol)
            .bind(row.trade_date)
            .bind(row.open)
            .bind(row.high)
            .bind(row.low)
            .bind(row.close)
            .bind(i64::try_from(row.volume)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Loaded {} rows into prices", rows.len());
        Ok(rows.len() as u64)
    }

    pub async fn replace_symbol_metrics(&self, rows: &[SymbolMetricsSummary]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        recreate(&mut tx, Table::SymbolMetrics).await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO symbol_metrics
                    (symbol, company, sector, yearly_return, volatility, avg_close, avg_volume)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.symbol)
            .bind(&row.company)
            .bind(&row.sector)
            .bind(row.yearly_return)
            .bind(row.volatility)
            .bind(row.avg_close)
            .bind(row.avg_volume)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Loaded {} rows into symbol_metrics", rows.len());
        Ok(rows.len() as u64)
    }

    /// Number of rows currently in `table`.
    pub async fn count(&self, table: Table) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

async fn recreate(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, table: Table) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.name()))
        .execute(&mut **tx)
        .await?;
    sqlx::query(table.ddl()).execute(&mut **tx).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    async fn store() -> (TempDir, MetricsStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("stockdb.sqlite").display());
        let store = MetricsStore::new(&url).await.unwrap();
        (dir, store)
    }

    fn price(symbol: &str, day: u32, close: f64) -> PriceRecord {
        PriceRecord {
            symbol: symbol.to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    #[tokio::test]
    async fn test_db_creation() {
        let (_dir, store) = store().await;
        assert!(store.pool().acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_prices_overwrites() {
        let (_dir, store) = store().await;

        let first = vec![price("TCS", 2, 10.0), price("TCS", 3, 11.0), price("SBIN", 2, 5.0)];
        assert_eq!(store.replace_prices(&first).await.unwrap(), 3);
        assert_eq!(store.count(Table::Prices).await.unwrap(), 3);

        store.replace_prices(&first[..1]).await.unwrap();
        assert_eq!(store.count(Table::Prices).await.unwrap(), 1);

        let close: f64 = sqlx::query_scalar("SELECT close FROM prices WHERE symbol = ?")
            .bind("TCS")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(close, 10.0);
    }

    #[tokio::test]
    async fn test_duplicate_key_rolls_back() {
        let (_dir, store) = store().await;
        store.replace_prices(&[price("TCS", 2, 10.0)]).await.unwrap();

        let dupes = vec![price("SBIN", 2, 5.0), price("SBIN", 2, 6.0)];
        assert!(store.replace_prices(&dupes).await.is_err());

        let symbol: String = sqlx::query_scalar("SELECT symbol FROM prices")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(symbol, "TCS");
    }

    #[tokio::test]
    async fn test_symbols_and_metrics() {
        let (_dir, store) = store().await;

        let symbols = vec![SymbolSector {
            symbol: "TCS".into(),
            company: "Tata Consultancy Services".into(),
            sector: "SOFTWARE".into(),
        }];
        assert_eq!(store.replace_symbols(&symbols).await.unwrap(), 1);

        let metrics = vec![
            SymbolMetricsSummary {
                symbol: "TCS".into(),
                company: Some("Tata Consultancy Services".into()),
                sector: Some("SOFTWARE".into()),
                yearly_return: Some(12.5),
                volatility: Some(1.1),
                avg_close: 3500.0,
                avg_volume: 2_000_000.0,
            },
            SymbolMetricsSummary {
                symbol: "XYZ".into(),
                company: None,
                sector: None,
                yearly_return: None,
                volatility: None,
                avg_close: 10.0,
                avg_volume: 50.0,
            },
        ];
        assert_eq!(store.replace_symbol_metrics(&metrics).await.unwrap(), 2);
        assert_eq!(store.count(Table::SymbolMetrics).await.unwrap(), 2);

        let missing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM symbol_metrics WHERE sector IS NULL")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(missing, 1);
    }
}
