//! Compatibility harness for system-dynamics simulators.
//!
//! Runs a simulator over a corpus of models and checks each run's tabular
//! output against the model's reference data within a numeric tolerance.

pub mod domain;
pub mod modules;
pub mod numerics;

pub use domain::{CompatError, CompatErrorCategory, CompatResult, ModelEntry, Severity};
pub use numerics::{Tolerance, ToleranceMethod, isclose};
