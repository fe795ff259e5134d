use super::CliError;
use super::logging::{LogConfig, init_logging};
use clap::builder::PossibleValuesParser;
use sd_compat_core::domain::{CompatError, CompatErrorCategory};
use sd_compat_core::modules::corpus::{CorpusLayout, DEFAULT_REFERENCE_FILE, KNOWN_MODEL_EXTENSIONS};
use sd_compat_core::modules::regression::{
    DEFAULT_EXECUTABLE, HarnessConfig, render_human_summary, run_harness,
};
use sd_compat_core::numerics::{DEFAULT_ABS_TOL, DEFAULT_REL_TOL, Tolerance, ToleranceMethod};
use std::path::PathBuf;
use std::time::Duration;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Directory holding one subdirectory per model
    #[arg(long, default_value = "test/compat")]
    corpus: PathBuf,

    /// Simulator executable, invoked as `<executable> <model-path>`
    #[arg(long, default_value = DEFAULT_EXECUTABLE)]
    executable: PathBuf,

    /// Model file extension, repeat to try several in order
    #[arg(
        long = "ext",
        value_name = "EXT",
        default_value = "xmile",
        value_parser = PossibleValuesParser::new(KNOWN_MODEL_EXTENSIONS)
    )]
    extensions: Vec<String>,

    /// Reference data file name inside each model directory
    #[arg(long, default_value = DEFAULT_REFERENCE_FILE)]
    reference_file: String,

    /// Only test model directories matching this glob (repeatable)
    #[arg(long = "filter", value_name = "GLOB")]
    filters: Vec<String>,

    /// Relative tolerance
    #[arg(long, default_value_t = DEFAULT_REL_TOL, allow_negative_numbers = true)]
    rel_tol: f64,

    /// Absolute tolerance
    #[arg(long, default_value_t = DEFAULT_ABS_TOL, allow_negative_numbers = true)]
    abs_tol: f64,

    /// How the relative tolerance is scaled: asymmetric, strong, weak or average
    #[arg(long, default_value = "weak")]
    method: ToleranceMethod,

    /// Seconds to wait for one simulator run, 0 waits forever
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log verbosity: 0 errors, 1 warnings, 2 info, 3 debug
    #[arg(
        short = 'v',
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    verbosity: u8,

    /// Suppress all log output and the summary
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl RunArgs {
    fn log_config(&self) -> LogConfig {
        LogConfig {
            verbosity: self.verbosity,
            quiet: self.quiet,
        }
    }

    fn into_config(self) -> Result<HarnessConfig, CliError> {
        let tolerance = Tolerance::new(self.rel_tol, self.abs_tol, self.method)
            .map_err(|error| CliError::Compute(CompatError::from(error)))?;

        Ok(HarnessConfig {
            executable: self.executable,
            corpus: CorpusLayout {
                root: self.corpus,
                extensions: self.extensions,
                reference_file: self.reference_file,
                filters: self.filters,
            },
            tolerance,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            report_path: self.report,
        })
    }
}

pub(super) fn run_harness_command(args: RunArgs) -> Result<i32, CliError> {
    let log_config = args.log_config();
    let config = args.into_config()?;
    init_logging(&log_config)?;

    let runner = config.process_runner();
    tracing::debug!(
        "scanning {} with {}",
        config.corpus.root.display(),
        config.executable.display()
    );
    let report = run_harness(&config, &runner).map_err(CliError::Compute)?;
    if !log_config.quiet {
        println!("{}", render_human_summary(&report));
        if let Some(report_path) = &config.report_path {
            println!("JSON report: {}", report_path.display());
        }
    }

    let category = if report.passed {
        CompatErrorCategory::Success
    } else {
        CompatErrorCategory::RegressionFailure
    };
    Ok(category.exit_code())
}
