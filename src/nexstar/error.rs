use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no response to '{command}' command")]
    Timeout { command: char },
    #[error("unexpected response to '{command}' command: {response:?}")]
    BadResponse { command: char, response: String },
    #[error("value out of range: {0}")]
    InvalidValue(String),
}

impl ControllerError {
    pub fn bad_response(command: u8, response: &[u8]) -> Self {
        ControllerError::BadResponse {
            command: command as char,
            response: String::from_utf8_lossy(response).into_owned(),
        }
    }
}
