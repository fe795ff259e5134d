use sd_compat_core::domain::Severity;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Log settings for one CLI invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LogConfig {
    /// 0 errors only, 1 adds warnings, 2 adds info, 3 adds debug.
    pub verbosity: u8,
    pub quiet: bool,
}

impl LogConfig {
    pub fn level_filter(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::OFF;
        }
        match Severity::from_verbosity(self.verbosity) {
            Severity::Error => LevelFilter::ERROR,
            Severity::Warn => LevelFilter::WARN,
            Severity::Info => LevelFilter::INFO,
            Severity::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the verbosity
/// unless output is quiet.
pub(super) fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let level = config.level_filter();
    let filter = if config.quiet {
        EnvFilter::new(level.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))
}
