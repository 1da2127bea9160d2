use crate::{MetricsReport, MetricsResult, PriceRecord, SymbolSector};

/// Supplies the two input relations of a pipeline run.
pub trait PriceSource {
    fn load_prices(&self) -> MetricsResult<Vec<PriceRecord>>;
    fn load_symbols(&self) -> MetricsResult<Vec<SymbolSector>>;
}

/// Persists the derived relations of a pipeline run.
///
/// Artifacts are written independently; a failure part-way leaves earlier ones in place.
pub trait ArtifactSink {
    /// Returns the number of artifacts written.
    fn write_report(&mut self, report: &MetricsReport) -> MetricsResult<usize>;
}
