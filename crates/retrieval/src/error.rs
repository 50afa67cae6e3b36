use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("File is not valid UTF-8: {0}")]
    DecodeError(#[from] std::string::FromUtf8Error),

    #[error("Invalid glob pattern: {0}")]
    GlobError(#[from] globset::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Search cancelled before completion")]
    SearchCancelled,

    #[error("{0}")]
    Other(String),
}

impl RetrievalError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
