use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("GPS read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GPS stream closed")]
    Closed,
}
