use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaterlineError {
    #[error("Queue transport error: {0}")]
    Transport(String),

    #[error("Inbound message decode error: {0}")]
    Decode(String),

    #[error("Extraction service error: {0}")]
    Extraction(String),

    #[error("Malformed extraction output: {0}")]
    MalformedExtraction(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
