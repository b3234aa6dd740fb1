use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PatchError>;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("search still running; wait for it to finish before committing")]
    SearchInProgress,
    #[error("no search results for {0}")]
    UnknownFile(String),
}

impl PatchError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PatchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub path: PathBuf,
    pub applied: usize,
    pub skipped: usize,
}
