use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An item with this id is already indexed. Nothing was changed.
    #[error("item with id {0:?} already exists")]
    DuplicateId(String),

    #[error("window size must be at least 1, got {0}")]
    InvalidWindowSize(usize),

    #[error("similarity score must be within [0, 1], got {0}")]
    InvalidScore(f64),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
