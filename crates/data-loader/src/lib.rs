//! File-side stages of the stock metrics pipeline: YAML flattening, master tables,
//! CSV artifacts, and the glue that runs them in order.

pub mod config;
pub mod csv_io;
pub mod master;
pub mod pipeline;
pub mod sectors;
pub mod yaml_etl;

pub use config::PipelineConfig;
pub use csv_io::{CsvArtifactWriter, CsvMasterSource};
pub use pipeline::{compute, ComputeOutcome};
pub use yaml_etl::{run_etl, EtlSummary};
