use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("could not list serial ports: {0}")]
    Enumerate(#[from] serialport::Error),
    #[error("could not find the USB {device} device ({id})")]
    NotFound { device: &'static str, id: String },
    #[error("invalid USB id {0:?}, expected VVVV:PPPP")]
    InvalidUsbId(String),
}
