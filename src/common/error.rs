use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompcacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read options file: {0}")]
    BadArgFile(String),

    #[error("Invalid argument construction: {0}")]
    InvalidArg(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CompcacheError>;
