use thiserror::Error;

use crate::gps::SourceError;
use crate::nexstar::ControllerError;
use crate::timezone::TimezoneError;

/// Stages of one synchronization run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SyncStep {
    #[strum(to_string = "connect")]
    Connect,
    #[strum(to_string = "identify")]
    Identify,
    #[strum(to_string = "acquire fix")]
    AcquireFix,
    #[strum(to_string = "resolve time")]
    ResolveTime,
    #[strum(to_string = "push time")]
    PushTime,
    #[strum(to_string = "push location")]
    PushLocation,
    #[strum(to_string = "verify")]
    Verify,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not open {device} port {port}: {source}")]
    TransportOpen {
        device: &'static str,
        port: String,
        source: serialport::Error,
    },
    #[error("GPS failed while waiting for a fix: {0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Timezone(#[from] TimezoneError),
    #[error("{step} failed: {source}")]
    Controller {
        step: SyncStep,
        source: ControllerError,
    },
}

impl SyncError {
    pub fn controller(step: SyncStep) -> impl FnOnce(ControllerError) -> SyncError {
        move |source| SyncError::Controller { step, source }
    }
}
