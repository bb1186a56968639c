//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to write export file {path}: {source}")]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize export data: {0}")]
    ExportSerialize(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
