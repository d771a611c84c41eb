use std::path::PathBuf;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO Error {error} at {0}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("CSV Error {error} at {0}", path.display())]
    Csv { path: PathBuf, error: csv::Error },
    #[error("Parse Error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("Degenerate Trace: {count} record(s) is not enough to derive an acquisition interval")]
    DegenerateTrace { count: usize },
    #[error("Insufficient Data: smoothing window {window} exceeds the {available} available samples")]
    InsufficientData { window: usize, available: usize },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |error| Self::Io { path, error }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>) -> impl FnOnce(csv::Error) -> Self {
        let path = path.into();
        move |error| Self::Csv { path, error }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}
