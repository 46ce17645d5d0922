use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimezoneError {
    #[error("no timezone covers {latitude},{longitude}")]
    NotFound { latitude: f64, longitude: f64 },
    #[error("unknown timezone id: {0}")]
    UnknownZone(String),
}
