pub mod errors;

pub use errors::{CompatError, CompatErrorCategory, CompatResult, ExitStatusMapping};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Severity levels of the harness log, ordered from most to least severe.
///
/// The numeric value doubles as the verbosity threshold: an event is shown
/// when `severity as u8 <= verbosity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    pub const fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => Self::Error,
            1 => Self::Warn,
            2 => Self::Info,
            _ => Self::Debug,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One test case of the corpus: a directory holding a model description and
/// its reference dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    pub model_path: PathBuf,
    pub reference_path: PathBuf,
}

impl ModelEntry {
    pub fn new(
        name: impl Into<String>,
        model_path: impl Into<PathBuf>,
        reference_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            model_path: model_path.into(),
            reference_path: reference_path.into(),
        }
    }
}
