use super::comparator::{ComparisonOutcome, MismatchEvent, compare_datasets};
use super::corpus::{CorpusLayout, discover_models};
use super::dataset::{Dataset, DatasetFormat};
use super::runner::{DEFAULT_SIMULATOR_TIMEOUT, ProcessRunner, SimulationRunner};
use crate::domain::{CompatError, CompatResult, ModelEntry, Severity};
use crate::numerics::Tolerance;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

pub const DEFAULT_EXECUTABLE: &str = "./mdl";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub executable: PathBuf,
    pub corpus: CorpusLayout,
    pub tolerance: Tolerance,
    /// `None` waits for the simulator indefinitely.
    pub timeout: Option<Duration>,
    pub report_path: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            corpus: CorpusLayout::default(),
            tolerance: Tolerance::default(),
            timeout: Some(DEFAULT_SIMULATOR_TIMEOUT),
            report_path: None,
        }
    }
}

impl HarnessConfig {
    pub fn process_runner(&self) -> ProcessRunner {
        ProcessRunner::new(&self.executable).with_timeout(self.timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Passed,
    Mismatched,
    SimulatorFailed,
    OutputError,
    ReferenceError,
}

impl ModelStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Mismatched => "mismatched",
            Self::SimulatorFailed => "simulator_failed",
            Self::OutputError => "output_error",
            Self::ReferenceError => "reference_error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub model: String,
    pub model_path: String,
    pub reference_path: String,
    pub status: ModelStatus,
    pub passed: bool,
    pub reason: Option<String>,
    pub error_count: usize,
    pub comparison: Option<ComparisonOutcome>,
}

impl ModelReport {
    fn failed(model: &ModelEntry, status: ModelStatus, reason: String) -> Self {
        Self {
            model: model.name.clone(),
            model_path: normalize_path(&model.model_path),
            reference_path: normalize_path(&model.reference_path),
            status,
            passed: false,
            reason: Some(reason),
            error_count: 1,
            comparison: None,
        }
    }

    fn compared(model: &ModelEntry, comparison: ComparisonOutcome) -> Self {
        let error_count = comparison.error_count();
        let passed = error_count == 0;
        let reason = comparison
            .events
            .iter()
            .find(|event| event.severity == Severity::Error)
            .map(|event| event.message.clone());

        Self {
            model: model.name.clone(),
            model_path: normalize_path(&model.model_path),
            reference_path: normalize_path(&model.reference_path),
            status: if passed {
                ModelStatus::Passed
            } else {
                ModelStatus::Mismatched
            },
            passed,
            reason,
            error_count,
            comparison: Some(comparison),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub corpus_root: String,
    pub simulator: String,
    pub tolerance: Tolerance,
    pub model_count: usize,
    pub passed_model_count: usize,
    pub failed_model_count: usize,
    pub skipped: Vec<String>,
    pub models: Vec<ModelReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegressionError {
    #[error("failed to create report directory '{}': {source}", path.display())]
    ReportDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    SerializeReport {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<RegressionError> for CompatError {
    fn from(error: RegressionError) -> Self {
        let message = error.to_string();
        match error {
            RegressionError::ReportDirectory { .. } | RegressionError::WriteReport { .. } => {
                CompatError::io_system("IO.REGRESSION_REPORT", message)
            }
            RegressionError::SerializeReport { .. } => {
                CompatError::internal("SYS.REGRESSION_REPORT", message)
            }
        }
    }
}

/// Tests every model of the corpus in turn. Per-model failures are recorded
/// in the report and never stop the run; only corpus discovery and report
/// writing errors are returned.
pub fn run_harness(
    config: &HarnessConfig,
    runner: &dyn SimulationRunner,
) -> CompatResult<HarnessReport> {
    let scan = discover_models(&config.corpus)?;
    for name in &scan.skipped {
        debug!("skipping {}", name);
    }

    let mut models = Vec::with_capacity(scan.models.len());
    for model in &scan.models {
        models.push(test_model(model, &config.tolerance, runner));
    }

    let model_count = models.len();
    let passed_model_count = models.iter().filter(|model| model.passed).count();
    let failed_model_count = model_count.saturating_sub(passed_model_count);

    let report = HarnessReport {
        generated_at_unix_seconds: current_unix_timestamp_seconds(),
        passed: failed_model_count == 0,
        corpus_root: normalize_path(&config.corpus.root),
        simulator: runner.describe(),
        tolerance: config.tolerance,
        model_count,
        passed_model_count,
        failed_model_count,
        skipped: scan.skipped,
        models,
    };
    info!(
        "{} of {} models passed",
        report.passed_model_count, report.model_count
    );

    if let Some(report_path) = &config.report_path {
        write_report_file(report_path, &report)?;
    }
    Ok(report)
}

/// Runs the simulator for one model and diffs its output against the
/// model's reference data.
pub fn test_model(
    model: &ModelEntry,
    tolerance: &Tolerance,
    runner: &dyn SimulationRunner,
) -> ModelReport {
    debug!("testing {}", model.name);

    let output = match runner.run(&model.model_path) {
        Ok(output) => output,
        Err(source) => {
            error!(model = %model.name, "{} failed: {}", runner.describe(), source);
            return ModelReport::failed(model, ModelStatus::SimulatorFailed, source.to_string());
        }
    };
    if !output.success() {
        let stderr = output.stderr.trim_end();
        error!(model = %model.name, "{} failed: {}", runner.describe(), stderr);
        return ModelReport::failed(
            model,
            ModelStatus::SimulatorFailed,
            format!("simulator failed with {}: {}", output.status_text(), stderr),
        );
    }

    let simulated = match Dataset::from_output(&output.stdout, DatasetFormat::Simulated) {
        Ok(dataset) => dataset,
        Err(source) => {
            error!(model = %model.name, "{}", source);
            return ModelReport::failed(model, ModelStatus::OutputError, source.to_string());
        }
    };

    let reference = match read_reference(&model.reference_path) {
        Ok(dataset) => dataset,
        Err(reason) => {
            error!(model = %model.name, "{}", reason);
            return ModelReport::failed(model, ModelStatus::ReferenceError, reason);
        }
    };

    match compare_datasets(&reference, &simulated, tolerance) {
        Ok(outcome) => {
            for event in &outcome.events {
                log_event(&model.name, event);
            }
            ModelReport::compared(model, outcome)
        }
        Err(source) => {
            error!(model = %model.name, "{}", source);
            ModelReport::failed(model, ModelStatus::ReferenceError, source.to_string())
        }
    }
}

pub fn render_human_summary(report: &HarnessReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Regression status: {}", status));
    lines.push(format!(
        "Models: {} total ({} passed, {} failed, {} skipped)",
        report.model_count,
        report.passed_model_count,
        report.failed_model_count,
        report.skipped.len()
    ));

    for model in &report.models {
        let model_status = if model.passed { "PASS" } else { "FAIL" };
        let values = model.comparison.as_ref().map_or_else(String::new, |comparison| {
            format!(
                ", {}/{} values matched",
                comparison.compared_values - comparison.failing_values,
                comparison.compared_values
            )
        });
        lines.push(format!(
            "Model {}: {} ({}, {} errors{})",
            model.model,
            model_status,
            model.status.as_str(),
            model.error_count,
            values
        ));

        if let Some(reason) = model.reason.as_deref().filter(|_| !model.passed) {
            lines.push(format!("  first failure: {}", reason));
        }
    }

    lines.join("\n")
}

fn log_event(model: &str, event: &MismatchEvent) {
    match event.severity {
        Severity::Error => error!(model = %model, "{}", event),
        Severity::Warn => warn!(model = %model, "{}", event),
        Severity::Info => info!(model = %model, "{}", event),
        Severity::Debug => debug!(model = %model, "{}", event),
    }
}

fn read_reference(path: &Path) -> Result<Dataset, String> {
    let text = fs::read_to_string(path).map_err(|source| {
        format!(
            "failed to read reference data '{}': {}",
            path.display(),
            source
        )
    })?;
    Dataset::from_output(&text, DatasetFormat::Reference).map_err(|source| source.to_string())
}

fn write_report_file(report_path: &Path, report: &HarnessReport) -> Result<(), RegressionError> {
    if let Some(parent_dir) = report_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir).map_err(|source| RegressionError::ReportDirectory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| RegressionError::SerializeReport {
            path: report_path.to_path_buf(),
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| RegressionError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::{HarnessConfig, ModelStatus, render_human_summary, run_harness};
    use crate::modules::corpus::CorpusLayout;
    use crate::modules::runner::{RunnerError, SimulationOutput, SimulationRunner};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Replays canned simulator results keyed by model directory name.
    struct CannedRunner {
        outputs: HashMap<String, SimulationOutput>,
    }

    impl CannedRunner {
        fn new() -> Self {
            Self {
                outputs: HashMap::new(),
            }
        }

        fn with(mut self, model: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
            self.outputs.insert(
                model.to_string(),
                SimulationOutput {
                    exit_code: Some(exit_code),
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                },
            );
            self
        }
    }

    impl SimulationRunner for CannedRunner {
        fn run(&self, model_path: &Path) -> Result<SimulationOutput, RunnerError> {
            let model = model_path
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.outputs
                .get(&model)
                .cloned()
                .ok_or_else(|| RunnerError::TimedOut {
                    program: PathBuf::from("canned"),
                    timeout: Duration::from_secs(1),
                })
        }

        fn describe(&self) -> String {
            "./mdl".to_string()
        }
    }

    fn write_model(root: &Path, name: &str, reference: Option<&str>) {
        let directory = root.join(name);
        fs::create_dir_all(&directory).expect("model dir should be created");
        fs::write(directory.join("model.xmile"), "<xmile/>").expect("model should be written");
        if let Some(reference) = reference {
            fs::write(directory.join("data.csv"), reference).expect("reference should be written");
        }
    }

    fn config(root: &Path, report_path: Option<PathBuf>) -> HarnessConfig {
        HarnessConfig {
            corpus: CorpusLayout {
                root: root.to_path_buf(),
                ..CorpusLayout::default()
            },
            report_path,
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn every_model_is_tested_and_failures_do_not_stop_the_run() {
        let temp = TempDir::new().expect("tempdir should be created");
        let corpus = temp.path().join("corpus");
        write_model(&corpus, "a_pass", Some("Time,Stock\n0,1.0\n1,2.0\n"));
        write_model(&corpus, "b_crash", Some("time,x\n0,1\n"));
        write_model(&corpus, "c_mismatch", Some("time,x\n0,1\n1,2\n"));
        write_model(&corpus, "d_no_reference", None);
        write_model(&corpus, "e_timeout", Some("time,x\n0,1\n"));

        let runner = CannedRunner::new()
            .with("a_pass", 0, "time\tstock\n0\t1.0\n1\t2.0\n", "")
            .with("b_crash", 1, "", "unknown builtin\n")
            .with("c_mismatch", 0, "time\tx\n0\t1\n1\t3\n", "")
            .with("d_no_reference", 0, "time\tx\n0\t1\n", "");

        let report_path = temp.path().join("reports/report.json");
        let report = run_harness(&config(&corpus, Some(report_path.clone())), &runner)
            .expect("harness should run");

        assert!(!report.passed);
        assert_eq!(report.model_count, 5);
        assert_eq!(report.passed_model_count, 1);
        assert_eq!(report.failed_model_count, 4);

        let statuses = report
            .models
            .iter()
            .map(|model| (model.model.as_str(), model.status))
            .collect::<Vec<_>>();
        assert_eq!(
            statuses,
            [
                ("a_pass", ModelStatus::Passed),
                ("b_crash", ModelStatus::SimulatorFailed),
                ("c_mismatch", ModelStatus::Mismatched),
                ("d_no_reference", ModelStatus::ReferenceError),
                ("e_timeout", ModelStatus::SimulatorFailed),
            ]
        );
        assert_eq!(
            report.models[1].reason.as_deref(),
            Some("simulator failed with exit code 1: unknown builtin")
        );
        assert_eq!(
            report.models[2].reason.as_deref(),
            Some("time 1 mismatch in x (2 != 3)")
        );
        assert!(
            report.models[3]
                .reason
                .as_deref()
                .is_some_and(|reason| reason.starts_with("failed to read reference data"))
        );

        let parsed: Value = serde_json::from_str(
            &fs::read_to_string(&report_path).expect("report should be readable"),
        )
        .expect("report should parse");
        assert_eq!(parsed["passed"], Value::Bool(false));
        assert_eq!(parsed["tolerance"]["method"], Value::from("weak"));
        assert_eq!(
            parsed["models"][2]["comparison"]["events"][0]["kind"],
            Value::from("value_mismatch")
        );
    }

    #[test]
    fn summary_lists_each_model() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_model(temp.path(), "teacup", Some("time,temp\n0,180\n1,170.5\n"));
        write_model(temp.path(), "sir", Some("time,infected\n0,1\n1,2\n"));

        let runner = CannedRunner::new()
            .with("teacup", 0, "time\ttemp\n0\t180\n1\t170.5\n", "")
            .with("sir", 0, "time\tinfected\n0\t1\n", "");

        let report = run_harness(&config(temp.path(), None), &runner).expect("harness should run");
        let summary = render_human_summary(&report);

        assert!(summary.contains("Regression status: FAIL"));
        assert!(summary.contains("Models: 2 total (1 passed, 1 failed, 0 skipped)"));
        assert!(summary.contains("Model teacup: PASS (passed, 0 errors, 4/4 values matched)"));
        assert!(summary.contains("Model sir: FAIL (mismatched, 2 errors, 0/0 values matched)"));
        assert!(summary.contains("  first failure: len mismatch for time (2 vs 1)"));
    }

    #[test]
    fn default_config_uses_harness_conventions() {
        let config = HarnessConfig::default();
        assert_eq!(config.executable, PathBuf::from("./mdl"));
        assert_eq!(config.corpus.root, PathBuf::from("test/compat"));
        assert_eq!(config.corpus.extensions, ["xmile"]);
        assert_eq!(config.corpus.reference_file, "data.csv");
        assert_eq!(config.timeout, Some(Duration::from_secs(300)));

        let runner = config.process_runner();
        assert_eq!(runner.program(), Path::new("./mdl"));
        assert_eq!(runner.timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn empty_corpus_passes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let report = run_harness(&config(temp.path(), None), &CannedRunner::new())
            .expect("harness should run");
        assert!(report.passed);
        assert_eq!(report.model_count, 0);
    }
}
