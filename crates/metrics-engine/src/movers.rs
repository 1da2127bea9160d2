use std::collections::BTreeMap;

use metrics_core::{MonthKey, MonthlyMover, MoverDirection, ReturnRecord};

use crate::returns::by_symbol;
use crate::stats;

/// Close-to-close return of one symbol within one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturn {
    pub symbol: String,
    pub month: MonthKey,
    pub monthly_return: Option<f64>,
}

pub struct MonthlyMoversRanker;

impl MonthlyMoversRanker {
    /// Per (symbol, month): last close over first close minus one. A month with a
    /// single observation yields 0. Ordered by symbol, then month.
    pub fn monthly_returns(records: &[ReturnRecord]) -> Vec<MonthlyReturn> {
        let mut out = Vec::new();

        for (symbol, series) in by_symbol(records) {
            let mut months: BTreeMap<MonthKey, (f64, f64)> = BTreeMap::new();
            for record in series {
                let close = record.price.close;
                months
                    .entry(MonthKey::of(record.trade_date()))
                    .and_modify(|(_, last)| *last = close)
                    .or_insert((close, close));
            }

            out.extend(months.into_iter().map(|(month, (first, last))| MonthlyReturn {
                symbol: symbol.to_string(),
                month,
                monthly_return: stats::simple_return(first, last),
            }));
        }

        out
    }

    /// Top `per_month` gainers and bottom `per_month` losers of every month.
    ///
    /// Gainer rows for all months come first, then loser rows; months ascend within each
    /// block. Ties keep symbol order. When fewer than `2 * per_month` symbols traded in
    /// a month the same symbol can be listed under both directions.
    pub fn rank(records: &[ReturnRecord], per_month: usize) -> Vec<MonthlyMover> {
        let mut by_month: BTreeMap<MonthKey, Vec<MonthlyReturn>> = BTreeMap::new();
        for m in Self::monthly_returns(records) {
            by_month.entry(m.month).or_default().push(m);
        }

        let mut gainers = Vec::new();
        let mut losers = Vec::new();

        for candidates in by_month.values() {
            gainers.extend(Self::pick(candidates, per_month, MoverDirection::Gainer));
            losers.extend(Self::pick(candidates, per_month, MoverDirection::Loser));
        }

        tracing::debug!(
            "ranked movers over {} months: {} gainer rows, {} loser rows",
            by_month.len(),
            gainers.len(),
            losers.len()
        );

        gainers.extend(losers);
        gainers
    }

    fn pick(candidates: &[MonthlyReturn], n: usize, direction: MoverDirection) -> Vec<MonthlyMover> {
        let descending = direction == MoverDirection::Gainer;
        let mut ordered: Vec<&MonthlyReturn> = candidates.iter().collect();
        ordered.sort_by(|a, b| stats::cmp_defined_first(a.monthly_return, b.monthly_return, descending));

        ordered
            .into_iter()
            .take(n)
            .map(|m| MonthlyMover {
                symbol: m.symbol.clone(),
                month: m.month,
                monthly_return: m.monthly_return,
                direction,
            })
            .collect()
    }
}
