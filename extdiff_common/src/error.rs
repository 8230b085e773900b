use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtdiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{file} is a file but {dir} is a directory")]
    RootKindMismatch { file: PathBuf, dir: PathBuf },

    #[error("Comparison error: {0}")]
    Comparison(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Sync-back failed for {} file(s): {}", .failures.len(), format_failures(.failures))]
    SyncBack { failures: Vec<SyncBackFailure> },

    #[error("Cleanup error: {0}")]
    Cleanup(String),
}

/// A single file that could not be copied back from staging.
#[derive(Debug, Clone)]
pub struct SyncBackFailure {
    pub original: PathBuf,
    pub cause: String,
}

fn format_failures(failures: &[SyncBackFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.original.display(), f.cause))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ExtdiffError>;
