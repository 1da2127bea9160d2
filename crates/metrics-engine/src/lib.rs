//! Derived analytics over a daily equity price history.
//!
//! Every component is a pure function of its inputs. [`MetricsEngine`] runs them in
//! order and bundles the results into a [`MetricsReport`].

pub mod aggregation;
pub mod correlation;
pub mod cumulative;
pub mod movers;
pub mod returns;
pub mod sector;
pub mod stats;
pub mod summary;


pub use aggregation::AggregationEngine;
pub use correlation::CorrelationEngine;
pub use cumulative::CumulativeSeriesBuilder;
pub use movers::{MonthlyMoversRanker, MonthlyReturn};
pub use returns::ReturnsEngine;
pub use sector::SectorAggregator;
pub use summary::SymbolMetricsSummarizer;

use metrics_core::{MetricsError, MetricsReport, MetricsResult, PriceRecord, SymbolSector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Length of the gainer, loser and volatility leaderboards.
    pub top_n: usize,
    /// Gainers and losers kept per calendar month.
    pub movers_per_month: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            movers_per_month: 5,
        }
    }
}

pub struct MetricsEngine {
    config: EngineConfig,
}

impl MetricsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Run every component over one price relation and sector lookup.
    pub fn run(&self, prices: &[PriceRecord], symbols: &[SymbolSector]) -> MetricsResult<MetricsReport> {
        if prices.is_empty() {
            return Err(MetricsError::InsufficientData(
                "price relation is empty".to_string(),
            ));
        }

        tracing::info!("Computing daily returns for {} price rows", prices.len());
        let returns = ReturnsEngine::compute(prices)?;

        let yearly_returns = AggregationEngine::yearly_returns(&returns);
        let top_gainers = AggregationEngine::top_gainers(&yearly_returns, self.config.top_n);
        let top_losers = AggregationEngine::top_losers(&yearly_returns, self.config.top_n);

        let mut top_volatility = AggregationEngine::volatility(&returns);
        top_volatility.truncate(self.config.top_n);

        let market_summary = AggregationEngine::market_summary(&returns)?;
        tracing::info!(
            "Market summary: {} green, {} red, avg price {}, avg volume {}",
            market_summary.green_count,
            market_summary.red_count,
            market_summary.avg_price,
            market_summary.avg_volume
        );

        let cumulative_returns = CumulativeSeriesBuilder::build(&returns);
        let sector_performance = SectorAggregator::aggregate(&yearly_returns, symbols)?;

        tracing::info!("Computing correlation matrix over {} symbols", yearly_returns.len());
        let correlation = CorrelationEngine::compute(prices)?;

        let monthly_movers = MonthlyMoversRanker::rank(&returns, self.config.movers_per_month);
        let symbol_metrics = SymbolMetricsSummarizer::summarize(&returns, symbols)?;

        Ok(MetricsReport {
            yearly_returns,
            top_gainers,
            top_losers,
            top_volatility,
            cumulative_returns,
            market_summary,
            sector_performance,
            correlation,
            monthly_movers,
            symbol_metrics,
        })
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
