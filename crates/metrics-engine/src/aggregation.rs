use metrics_core::{
    MarketSummary, MetricsError, MetricsResult, ReturnRecord, VolatilityRecord, YearlyReturn,
};

use crate::returns::by_symbol;
use crate::stats;

pub struct AggregationEngine;

impl AggregationEngine {
    /// Last close over first close minus one, per symbol, across the whole observed
    /// series. Output is ordered by symbol.
    pub fn yearly_returns(records: &[ReturnRecord]) -> Vec<YearlyReturn> {
        by_symbol(records)
            .into_iter()
            .filter_map(|(symbol, series)| {
                let first = series.first()?;
                let last = series.last()?;
                Some(YearlyReturn {
                    symbol: symbol.to_string(),
                    yearly_return: stats::simple_return(first.price.close, last.price.close),
                })
            })
            .collect()
    }

    /// Sample standard deviation of the defined daily returns, most volatile first.
    /// Symbols with fewer than two defined returns sort last with no value.
    pub fn volatility(records: &[ReturnRecord]) -> Vec<VolatilityRecord> {
        let mut out: Vec<VolatilityRecord> = by_symbol(records)
            .into_iter()
            .map(|(symbol, series)| {
                let rets: Vec<f64> = series.iter().filter_map(|r| r.daily_ret).collect();
                VolatilityRecord {
                    symbol: symbol.to_string(),
                    volatility: stats::sample_std(&rets),
                }
            })
            .collect();

        out.sort_by(|a, b| stats::cmp_defined_first(a.volatility, b.volatility, true));
        out
    }

    /// Green/red split over per-symbol yearly returns plus flat row-level means of
    /// close and volume.
    pub fn market_summary(records: &[ReturnRecord]) -> MetricsResult<MarketSummary> {
        if records.is_empty() {
            return Err(MetricsError::InsufficientData(
                "market summary needs at least one price record".to_string(),
            ));
        }

        let yearly = Self::yearly_returns(records);
        let green_count = yearly
            .iter()
            .filter(|y| matches!(y.yearly_return, Some(r) if r > 0.0))
            .count();
        let red_count = yearly
            .iter()
            .filter(|y| matches!(y.yearly_return, Some(r) if r <= 0.0))
            .count();

        let closes: Vec<f64> = records.iter().map(|r| r.price.close).collect();
        let volumes: Vec<f64> = records.iter().map(|r| r.price.volume as f64).collect();

        Ok(MarketSummary {
            green_count,
            red_count,
            avg_price: stats::round_to(stats::mean(&closes).unwrap_or_default(), 2),
            avg_volume: stats::round_to(stats::mean(&volumes).unwrap_or_default(), 0),
        })
    }

    /// The `n` largest defined yearly returns, ties in symbol order.
    pub fn top_gainers(yearly: &[YearlyReturn], n: usize) -> Vec<YearlyReturn> {
        Self::ranked(yearly, n, true)
    }

    /// The `n` smallest defined yearly returns, ties in symbol order.
    pub fn top_losers(yearly: &[YearlyReturn], n: usize) -> Vec<YearlyReturn> {
        Self::ranked(yearly, n, false)
    }

    fn ranked(yearly: &[YearlyReturn], n: usize, descending: bool) -> Vec<YearlyReturn> {
        let mut defined: Vec<YearlyReturn> = yearly
            .iter()
            .filter(|y| y.yearly_return.is_some())
            .cloned()
            .collect();
        defined.sort_by(|a, b| stats::cmp_defined_first(a.yearly_return, b.yearly_return, descending));
        defined.truncate(n);
        defined
    }
}
