use serde::{Deserialize, Serialize};

/// ReaderOptions tunes how a record file is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Map the file into memory instead of reading it through a buffered handle.
    pub use_mmap: bool,

    /// Rebuild the chunk index by scanning every section when the index block
    /// is missing, e.g. for a record whose producer stopped before finishing it.
    /// When disabled such a file fails to open.
    pub rebuild_missing_index: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            use_mmap: false,
            rebuild_missing_index: true,
        }
    }
}
