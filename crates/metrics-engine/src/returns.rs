use std::collections::BTreeMap;

use metrics_core::{MetricsError, MetricsResult, PriceRecord, ReturnRecord};

use crate::stats;

pub struct ReturnsEngine;

impl ReturnsEngine {
    /// Compute previous close and simple daily return for every record.
    ///
    /// Records are grouped by symbol and ordered by trade date; the output holds one
    /// record per input record, grouped by symbol (ascending) and dated ascending
    /// within a symbol. A repeated (symbol, trade_date) is rejected.
    pub fn compute(prices: &[PriceRecord]) -> MetricsResult<Vec<ReturnRecord>> {
        let mut groups: BTreeMap<&str, Vec<&PriceRecord>> = BTreeMap::new();
        for record in prices {
            groups.entry(record.symbol.as_str()).or_default().push(record);
        }

        let mut out = Vec::with_capacity(prices.len());
        for (symbol, mut series) in groups {
            series.sort_by_key(|r| r.trade_date);
            if let Some(dup) = series
                .windows(2)
                .find(|w| w[0].trade_date == w[1].trade_date)
            {
                return Err(MetricsError::DuplicateTradeDate {
                    symbol: symbol.to_string(),
                    date: dup[1].trade_date,
                });
            }

            let mut prev_close: Option<f64> = None;
            for record in series {
                let daily_ret = prev_close.and_then(|prev| stats::simple_return(prev, record.close));
                out.push(ReturnRecord {
                    price: record.clone(),
                    prev_close,
                    daily_ret,
                });
                prev_close = Some(record.close);
            }
        }

        Ok(out)
    }
}

/// Group return records by symbol, each group ordered by trade date.
pub fn by_symbol(records: &[ReturnRecord]) -> BTreeMap<&str, Vec<&ReturnRecord>> {
    let mut groups: BTreeMap<&str, Vec<&ReturnRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.symbol()).or_default().push(record);
    }
    for series in groups.values_mut() {
        series.sort_by_key(|r| r.trade_date());
    }
    groups
}
