use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

/// One daily OHLCV observation for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A price record augmented with its previous close and simple daily return.
///
/// Both fields are `None` on the first observation of a symbol; `daily_ret` is also
/// `None` when the previous close is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnRecord {
    pub price: PriceRecord,
    pub prev_close: Option<f64>,
    pub daily_ret: Option<f64>,
}

impl ReturnRecord {
    pub fn symbol(&self) -> &str {
        &self.price.symbol
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.price.trade_date
    }
}

/// Row of the symbol → (company, sector) lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolSector {
    pub symbol: String,
    pub company: String,
    pub sector: String,
}

/// Close-to-close return over the whole observed window of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReturn {
    pub symbol: String,
    pub yearly_return: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityRecord {
    pub symbol: String,
    pub volatility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeReturnPoint {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub cumret: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub green_count: usize,
    pub red_count: usize,
    pub avg_price: f64,
    pub avg_volume: f64,
}

/// Mean yearly return of a sector. `sector` is `None` for the group of symbols
/// that had no entry in the sector lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPerformance {
    pub sector: Option<String>,
    pub yearly_return: Option<f64>,
}

/// Symmetric symbol × symbol correlation of daily close changes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        self.values[i][j]
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Calendar month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoverDirection {
    Gainer,
    Loser,
}

impl fmt::Display for MoverDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoverDirection::Gainer => write!(f, "gainer"),
            MoverDirection::Loser => write!(f, "loser"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMover {
    pub symbol: String,
    pub month: MonthKey,
    pub monthly_return: Option<f64>,
    pub direction: MoverDirection,
}

/// Consolidated per-symbol reporting row.
///
/// `yearly_return` and `volatility` are percentages (×100) and `yearly_return` is
/// measured from the first open, unlike [`YearlyReturn`] which is close-to-close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMetricsSummary {
    pub symbol: String,
    pub company: Option<String>,
    pub sector: Option<String>,
    pub yearly_return: Option<f64>,
    pub volatility: Option<f64>,
    pub avg_close: f64,
    pub avg_volume: f64,
}

/// Every derived relation produced by one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub yearly_returns: Vec<YearlyReturn>,
    pub top_gainers: Vec<YearlyReturn>,
    pub top_losers: Vec<YearlyReturn>,
    pub top_volatility: Vec<VolatilityRecord>,
    pub cumulative_returns: Vec<CumulativeReturnPoint>,
    pub market_summary: MarketSummary,
    pub sector_performance: Vec<SectorPerformance>,
    pub correlation: CorrelationMatrix,
    pub monthly_movers: Vec<MonthlyMover>,
    pub symbol_metrics: Vec<SymbolMetricsSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_display() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(MonthKey::of(date).to_string(), "2024-03");
        assert!(MonthKey::new(2023, 12) < MonthKey::new(2024, 1));
    }

    #[test]
    fn test_correlation_lookup() {
        let m = CorrelationMatrix {
            symbols: vec!["A".into(), "B".into()],
            values: vec![vec![Some(1.0), Some(0.5)], vec![Some(0.5), Some(1.0)]],
        };
        assert_eq!(m.get("A", "B"), Some(0.5));
        assert_eq!(m.get("A", "Z"), None);
        assert_eq!(m.len(), 2);
    }
}
