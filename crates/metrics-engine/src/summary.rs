use metrics_core::{MetricsResult, ReturnRecord, SymbolMetricsSummary, SymbolSector};

use crate::returns::by_symbol;
use crate::sector::sector_lookup;
use crate::stats;

pub struct SymbolMetricsSummarizer;

impl SymbolMetricsSummarizer {
    /// One reporting row per symbol, ordered by symbol.
    ///
    /// The yearly return here runs from the first *open* to the last close and, like
    /// the volatility, is expressed in percent. Symbols absent from the lookup keep
    /// their row with no company or sector.
    pub fn summarize(
        records: &[ReturnRecord],
        symbols: &[SymbolSector],
    ) -> MetricsResult<Vec<SymbolMetricsSummary>> {
        let lookup = sector_lookup(symbols)?;

        let rows = by_symbol(records)
            .into_iter()
            .filter_map(|(symbol, series)| {
                let first = series.first()?;
                let last = series.last()?;

                let closes: Vec<f64> = series.iter().map(|r| r.price.close).collect();
                let volumes: Vec<f64> = series.iter().map(|r| r.price.volume as f64).collect();
                let rets: Vec<f64> = series.iter().filter_map(|r| r.daily_ret).collect();

                let entry = lookup.get(symbol);
                Some(SymbolMetricsSummary {
                    symbol: symbol.to_string(),
                    company: entry.map(|e| e.company.clone()),
                    sector: entry.map(|e| e.sector.clone()),
                    yearly_return: open_to_close_return(first.price.open, last.price.close)
                        .map(|r| r * 100.0),
                    volatility: stats::sample_std(&rets).map(|v| v * 100.0),
                    avg_close: stats::mean(&closes).unwrap_or_default(),
                    avg_volume: stats::mean(&volumes).unwrap_or_default(),
                })
            })
            .collect();

        Ok(rows)
    }
}

/// (last_close - first_open) / first_open. Undefined for a zero open.
fn open_to_close_return(first_open: f64, last_close: f64) -> Option<f64> {
    if first_open == 0.0 {
        return None;
    }
    Some((last_close - first_open) / first_open)
}
