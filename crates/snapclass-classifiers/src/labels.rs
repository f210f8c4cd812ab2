//! Class index to label resolution
//!
//! The label table is loaded once at startup. A missing or malformed label
//! file never aborts startup: callers use [`LabelTable::load_or_fallback`],
//! which logs the failure and switches to a small embedded table.

use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Number of labels in a complete ImageNet-1k table
pub const IMAGENET_CLASS_COUNT: usize = 1000;

/// Embedded labels used when the label file cannot be loaded
const FALLBACK_LABELS: &[&str] = &[
    "goldfish",
    "great white shark",
    "tiger shark",
    "cock",
    "hen",
    "elephant",
    "koala",
    "snail",
    "beetle",
    "ladybug",
    "car",
    "taxi",
    "bus",
    "ambulance",
    "fire truck",
    "airplane",
    "helicopter",
    "cat",
    "dog",
    "horse",
];

/// Errors raised while reading a label file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read label file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("label file {path} is not a JSON array of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("label file {path} contains no labels")]
    Empty { path: PathBuf },
}

/// Where a label table came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "lowercase")]
pub enum LabelSource {
    File(PathBuf),
    Fallback,
}

impl std::fmt::Display for LabelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Fallback => f.write_str("built-in fallback"),
        }
    }
}

/// Immutable, index-addressable list of class labels
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<String>,
    source: LabelSource,
}

impl LabelTable {
    /// Build a table from in-memory labels
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self {
            labels,
            source: LabelSource::Fallback,
        }
    }

    /// Embedded table; never empty
    pub fn fallback() -> Self {
        Self {
            labels: FALLBACK_LABELS.iter().map(|s| s.to_string()).collect(),
            source: LabelSource::Fallback,
        }
    }

    /// Load labels from disk.
    ///
    /// `.json` files must hold an array of strings. Anything else is read as
    /// plain text with one label per non-empty line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let labels: Vec<String> = if is_json {
            serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        };

        if labels.is_empty() {
            return Err(LoadError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            labels,
            source: LabelSource::File(path.to_path_buf()),
        })
    }

    /// Load labels from disk, switching to the embedded table on failure
    pub fn load_or_fallback(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(table) => {
                if table.len() < IMAGENET_CLASS_COUNT {
                    warn!(
                        "Loaded only {} labels from {}, expected {}",
                        table.len(),
                        path.as_ref().display(),
                        IMAGENET_CLASS_COUNT
                    );
                } else {
                    info!("Loaded {} labels from {}", table.len(), path.as_ref().display());
                }
                table
            }
            Err(e) => {
                let table = Self::fallback();
                warn!("{}; using {} built-in fallback labels", e, table.len());
                table
            }
        }
    }

    /// Label for `index`, or a placeholder naming the index when out of range
    pub fn resolve(&self, index: usize) -> Cow<'_, str> {
        match self.labels.get(index) {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(format!("unknown class (index: {})", index)),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn source(&self) -> &LabelSource {
        &self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == LabelSource::Fallback
    }
}
