use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use metrics_core::{CorrelationMatrix, MetricsError, MetricsResult, PriceRecord};
use rayon::prelude::*;

use crate::stats;

pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Pairwise-complete Pearson correlation of daily close changes.
    ///
    /// Closes are pivoted to a date × symbol grid. A symbol's change on a date is
    /// measured against its last observed close; dates where it has no close carry no
    /// change. Each pair is correlated over the dates where both changes exist.
    pub fn compute(prices: &[PriceRecord]) -> MetricsResult<CorrelationMatrix> {
        let (symbols, grid) = Self::pivot_closes(prices)?;
        let columns = Self::pct_change(&grid, symbols.len());

        let n = symbols.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let correlations: Vec<(usize, usize, Option<f64>)> = pairs
            .par_iter()
            .map(|&(i, j)| {
                let observed: Vec<(f64, f64)> = columns[i]
                    .iter()
                    .zip(columns[j].iter())
                    .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                    .collect();
                (i, j, stats::pearson(&observed))
            })
            .collect();

        let mut values = vec![vec![None; n]; n];
        for (i, column) in columns.iter().enumerate() {
            if column.iter().any(Option::is_some) {
                values[i][i] = Some(1.0);
            }
        }
        for (i, j, corr) in correlations {
            values[i][j] = corr;
            values[j][i] = corr;
        }

        tracing::debug!("correlated {} symbols over {} pairs", n, pairs.len());

        Ok(CorrelationMatrix { symbols, values })
    }

    /// Dense close grid: rows are trade dates ascending, columns are symbols ascending.
    fn pivot_closes(prices: &[PriceRecord]) -> MetricsResult<(Vec<String>, Vec<Vec<Option<f64>>>)> {
        let symbols: Vec<String> = prices
            .iter()
            .map(|p| p.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let dates: Vec<NaiveDate> = prices
            .iter()
            .map(|p| p.trade_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let col_of: HashMap<&str, usize> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut grid = vec![vec![None; symbols.len()]; dates.len()];
        for p in prices {
            let cell = &mut grid[row_of[&p.trade_date]][col_of[p.symbol.as_str()]];
            if cell.is_some() {
                return Err(MetricsError::DuplicateTradeDate {
                    symbol: p.symbol.clone(),
                    date: p.trade_date,
                });
            }
            *cell = Some(p.close);
        }

        Ok((symbols, grid))
    }

    /// Row-over-row percentage change per column, dropping rows where no column has a
    /// defined change. Returned column-major.
    fn pct_change(grid: &[Vec<Option<f64>>], width: usize) -> Vec<Vec<Option<f64>>> {
        let mut last_close: Vec<Option<f64>> = vec![None; width];
        let mut rows: Vec<Vec<Option<f64>>> = Vec::with_capacity(grid.len());

        for row in grid {
            let mut changes = vec![None; width];
            for (col, close) in row.iter().enumerate() {
                if let Some(close) = close {
                    changes[col] = last_close[col].and_then(|prev| stats::simple_return(prev, *close));
                    last_close[col] = Some(*close);
                }
            }
            if changes.iter().any(Option::is_some) {
                rows.push(changes);
            }
        }

        (0..width)
            .map(|col| rows.iter().map(|row| row[col]).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{price, series};

    #[test]
    fn test_symmetric_with_unit_diagonal() {
        let mut prices = series("A", &[10.0, 11.0, 10.5, 12.0, 11.0]);
        prices.extend(series("B", &[20.0, 22.5, 21.0, 23.0, 22.0]));
        prices.extend(series("C", &[5.0, 4.8, 5.1, 4.7, 5.2]));

        let m = CorrelationEngine::compute(&prices).unwrap();
        assert_eq!(m.symbols, vec!["A", "B", "C"]);
        for i in 0..3 {
            assert_eq!(m.values[i][i], Some(1.0));
            for j in 0..3 {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
        let ab = m.get("A", "B").unwrap();
        assert!(ab > 0.9 && ab <= 1.0);
    }

    #[test]
    fn test_perfectly_inverse_moves() {
        let mut prices = series("UP", &[100.0, 110.0, 99.0, 108.9]);
        prices.extend(series("DOWN", &[100.0, 90.0, 99.0, 89.1]));
        let m = CorrelationEngine::compute(&prices).unwrap();
        assert!((m.get("UP", "DOWN").unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_complete_ignores_other_gaps() {
        // C only trades on two dates; A/B must still use all their shared changes.
        let mut prices = series("A", &[10.0, 11.0, 12.0, 11.0, 13.0]);
        prices.extend(series("B", &[10.0, 11.0, 12.0, 11.0, 13.0]));
        prices.push(price("C", "2024-01-02", 1.0));
        prices.push(price("C", "2024-01-06", 2.0));

        let m = CorrelationEngine::compute(&prices).unwrap();
        assert!((m.get("A", "B").unwrap() - 1.0).abs() < 1e-12);
        // C has a single change: defined diagonal, undefined pairs.
        assert_eq!(m.get("C", "C"), Some(1.0));
        assert_eq!(m.get("A", "C"), None);
    }

    #[test]
    fn test_symbol_without_changes_has_undefined_diagonal() {
        let mut prices = series("A", &[10.0, 11.0, 12.0]);
        prices.push(price("ONE", "2024-01-03", 7.0));
        let m = CorrelationEngine::compute(&prices).unwrap();
        assert_eq!(m.get("ONE", "ONE"), None);
        assert_eq!(m.get("A", "A"), Some(1.0));
    }

    #[test]
    fn test_duplicate_cell_is_rejected() {
        let prices = vec![
            price("A", "2024-01-02", 10.0),
            price("A", "2024-01-02", 10.5),
        ];
        assert!(CorrelationEngine::compute(&prices).is_err());
    }
}
