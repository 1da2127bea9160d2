use metrics_core::{CumulativeReturnPoint, ReturnRecord};

use crate::returns::by_symbol;

pub struct CumulativeSeriesBuilder;

impl CumulativeSeriesBuilder {
    /// Compounded return since the start of each symbol's series.
    ///
    /// An undefined daily return contributes nothing, so the first point of every
    /// symbol is 0. Points are ordered by symbol, then date.
    pub fn build(records: &[ReturnRecord]) -> Vec<CumulativeReturnPoint> {
        let mut out = Vec::with_capacity(records.len());

        for (symbol, series) in by_symbol(records) {
            let mut growth = 1.0;
            for record in series {
                growth *= 1.0 + record.daily_ret.unwrap_or(0.0);
                out.push(CumulativeReturnPoint {
                    trade_date: record.trade_date(),
                    symbol: symbol.to_string(),
                    cumret: growth - 1.0,
                });
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::ReturnsEngine;
    use crate::tests::series;

    #[test]
    fn test_cumulative_compounds_and_resets() {
        let mut prices = series("A", &[10.0, 11.0, 12.1]);
        prices.extend(series("B", &[20.0, 10.0]));
        let returns = ReturnsEngine::compute(&prices).unwrap();

        let points = CumulativeSeriesBuilder::build(&returns);
        assert_eq!(points.len(), 5);

        let a: Vec<f64> = points.iter().filter(|p| p.symbol == "A").map(|p| p.cumret).collect();
        assert_eq!(a[0], 0.0);
        assert!((a[1] - 0.1).abs() < 1e-12);
        assert!((a[2] - 0.21).abs() < 1e-12);

        let b: Vec<f64> = points.iter().filter(|p| p.symbol == "B").map(|p| p.cumret).collect();
        assert_eq!(b[0], 0.0);
        assert!((b[1] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_return_holds_level() {
        let prices = series("Z", &[0.0, 5.0, 10.0]);
        let returns = ReturnsEngine::compute(&prices).unwrap();
        let points = CumulativeSeriesBuilder::build(&returns);

        assert_eq!(points[1].cumret, 0.0);
        assert!((points[2].cumret - 1.0).abs() < 1e-12);
    }
}
