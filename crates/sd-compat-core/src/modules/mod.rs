pub mod comparator;
pub mod corpus;
pub mod dataset;
pub mod regression;
pub mod runner;

pub use comparator::{
    ComparisonOutcome, CompareError, MismatchEvent, MismatchKind, compare_datasets, values_match,
};
pub use corpus::{CorpusError, CorpusLayout, CorpusScan, discover_models};
pub use dataset::{Dataset, DatasetFormat, LoadError, canonical_series_name};
pub use regression::{
    DEFAULT_EXECUTABLE, HarnessConfig, HarnessReport, ModelReport, ModelStatus, RegressionError,
    render_human_summary, run_harness, test_model,
};
pub use runner::{
    DEFAULT_SIMULATOR_TIMEOUT, ProcessRunner, RunnerError, SimulationOutput, SimulationRunner,
};
