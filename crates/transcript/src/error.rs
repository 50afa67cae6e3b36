use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscriptError>;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
