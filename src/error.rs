//! Failure taxonomy shared by the store, workspace, and filler.
//!
//! Functions return `anyhow::Result`; these variants are the root causes a
//! caller can recover with `err.downcast_ref::<SweepError>()`.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweepError {
    /// A project or parameter study with the same identifying path exists.
    #[error("{0} already exists")]
    Conflict(String),

    /// A project, study, case, or object key is absent from the store.
    #[error("{0} does not exist")]
    NotFound(String),

    /// Input that fails validation or a record that fails to parse.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// A file could not be read, written, or replaced.
    #[error("I/O failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template target is not valid UTF-8 text.
    #[error("{} is not valid UTF-8 text", path.display())]
    Decode { path: PathBuf },
}

impl SweepError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SweepError::Io {
            path: path.into(),
            source,
        }
    }
}
