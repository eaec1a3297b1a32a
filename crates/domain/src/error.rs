/// Shared error type used across all Paceline crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),

    #[error("tool boundary: {0}")]
    Boundary(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("pipeline stage {stage} violated {guard}: {message}")]
    PipelineInvariant {
        stage: &'static str,
        guard: &'static str,
        message: String,
    },

    #[error("progress version conflict for conversation {0}")]
    VersionConflict(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
