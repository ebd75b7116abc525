use crate::models::RecordError;
use std::path::PathBuf;
use thiserror::Error;

// DbError is the lowest level error type, wrapping failures of the durable stores. It does not wrap
// any higher level errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be decoded
    #[error("corrupt record in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: RecordError,
    },
}

impl DbError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| DbError::Io { path, source }
    }
}
