use crate::domain::{CompatError, ModelEntry};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_STEM: &str = "model";
pub const DEFAULT_REFERENCE_FILE: &str = "data.csv";

/// Model-description formats the simulator understands, in lookup order.
/// Only XMILE is enabled by default.
pub const KNOWN_MODEL_EXTENSIONS: [&str; 7] =
    ["xmile", "stmx", "itmx", "STMX", "ITMX", "mdl", "MDL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub reference_file: String,
    pub filters: Vec<String>,
}

impl Default for CorpusLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("test/compat"),
            extensions: vec!["xmile".to_string()],
            reference_file: DEFAULT_REFERENCE_FILE.to_string(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorpusScan {
    pub models: Vec<ModelEntry>,
    /// Directories with no readable model file, or excluded by a filter.
    pub skipped: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus directory '{}': {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        source: globset::Error,
    },
    #[error("no model extensions configured")]
    NoExtensions,
}

impl From<CorpusError> for CompatError {
    fn from(error: CorpusError) -> Self {
        let message = error.to_string();
        match error {
            CorpusError::ReadDirectory { .. } => CompatError::io_system("IO.CORPUS", message),
            CorpusError::InvalidFilter { .. } | CorpusError::NoExtensions => {
                CompatError::input_validation("INPUT.CORPUS", message)
            }
        }
    }
}

/// Lists model directories under `layout.root` in name order.
///
/// A directory is a model when `model.<ext>` is readable for one of the
/// configured extensions; the first one in configured order wins.
pub fn discover_models(layout: &CorpusLayout) -> Result<CorpusScan, CorpusError> {
    if layout.extensions.is_empty() {
        return Err(CorpusError::NoExtensions);
    }
    let filter = compile_filters(&layout.filters)?;

    let mut directories = Vec::new();
    let entries = fs::read_dir(&layout.root).map_err(|source| CorpusError::ReadDirectory {
        path: layout.root.clone(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| CorpusError::ReadDirectory {
            path: layout.root.clone(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            directories.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    directories.sort_by(|left, right| left.0.cmp(&right.0));

    let mut scan = CorpusScan::default();
    for (name, directory) in directories {
        if let Some(filter) = &filter {
            if !filter.is_match(&name) {
                scan.skipped.push(name);
                continue;
            }
        }

        match find_model_file(&directory, &layout.extensions) {
            Some(model_path) => scan.models.push(ModelEntry::new(
                name,
                model_path,
                directory.join(&layout.reference_file),
            )),
            None => scan.skipped.push(name),
        }
    }

    Ok(scan)
}

fn find_model_file(directory: &Path, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|extension| directory.join(format!("{}.{}", DEFAULT_MODEL_STEM, extension)))
        .find(|candidate| is_readable_file(candidate))
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && fs::File::open(path).is_ok()
}

fn compile_filters(patterns: &[String]) -> Result<Option<GlobSet>, CorpusError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| CorpusError::InvalidFilter {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| CorpusError::InvalidFilter {
            pattern: patterns.join(","),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::{CorpusError, CorpusLayout, discover_models};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be created");
        }
        fs::write(path, "").expect("file should be written");
    }

    fn layout(root: &Path) -> CorpusLayout {
        CorpusLayout {
            root: root.to_path_buf(),
            ..CorpusLayout::default()
        }
    }

    #[test]
    fn discovers_models_in_name_order() {
        let temp = TempDir::new().expect("tempdir should be created");
        touch(&temp.path().join("teacup/model.xmile"));
        touch(&temp.path().join("sir/model.xmile"));
        touch(&temp.path().join("notes/readme.txt"));
        touch(&temp.path().join("stray-file.xmile"));

        let scan = discover_models(&layout(temp.path())).expect("corpus should scan");
        let names = scan
            .models
            .iter()
            .map(|model| model.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["sir", "teacup"]);
        assert_eq!(scan.skipped, ["notes"]);
        assert_eq!(
            scan.models[1].reference_path,
            temp.path().join("teacup/data.csv")
        );
    }

    #[test]
    fn first_configured_extension_wins() {
        let temp = TempDir::new().expect("tempdir should be created");
        touch(&temp.path().join("fishbanks/model.mdl"));
        touch(&temp.path().join("fishbanks/model.stmx"));

        let mut layout = layout(temp.path());
        layout.extensions = vec!["xmile".into(), "stmx".into(), "mdl".into()];
        let scan = discover_models(&layout).expect("corpus should scan");
        assert_eq!(scan.models.len(), 1);
        assert_eq!(
            scan.models[0].model_path,
            temp.path().join("fishbanks/model.stmx")
        );
    }

    #[test]
    fn filters_select_model_directories() {
        let temp = TempDir::new().expect("tempdir should be created");
        touch(&temp.path().join("delay_1/model.xmile"));
        touch(&temp.path().join("delay_2/model.xmile"));
        touch(&temp.path().join("smooth/model.xmile"));

        let mut layout = layout(temp.path());
        layout.filters = vec!["delay_*".to_string()];
        let scan = discover_models(&layout).expect("corpus should scan");
        assert_eq!(scan.models.len(), 2);
        assert_eq!(scan.skipped, ["smooth"]);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");

        let mut bad_filter = layout(temp.path());
        bad_filter.filters = vec!["[".to_string()];
        assert!(matches!(
            discover_models(&bad_filter),
            Err(CorpusError::InvalidFilter { .. })
        ));

        let mut no_extensions = layout(temp.path());
        no_extensions.extensions.clear();
        assert!(matches!(
            discover_models(&no_extensions),
            Err(CorpusError::NoExtensions)
        ));

        assert!(matches!(
            discover_models(&layout(&temp.path().join("missing"))),
            Err(CorpusError::ReadDirectory { .. })
        ));
    }
}
