use std::time::Duration;

use serialport::SerialPort;

use super::error::SyncError;
use crate::gps::{NmeaSource, SentenceSource};
use crate::nexstar::{Controller, NexstarController};
use crate::transport::open_serial;

/// Opens the two device sessions a run needs.
pub trait Connector {
    type Source: SentenceSource;
    type Controller: Controller;

    fn open_source(&mut self) -> Result<Self::Source, SyncError>;
    fn open_controller(&mut self) -> Result<Self::Controller, SyncError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialLink {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl SerialLink {
    fn open(&self, device: &'static str) -> Result<Box<dyn SerialPort>, SyncError> {
        log::info!("Opening {} on {} at {} baud", device, self.port, self.baud_rate);
        open_serial(&self.port, self.baud_rate, self.read_timeout).map_err(|source| {
            SyncError::TransportOpen {
                device,
                port: self.port.clone(),
                source,
            }
        })
    }
}

/// GPS and hand controller on real serial ports.
pub struct SerialConnector {
    pub gps: SerialLink,
    pub controller: SerialLink,
}

impl Connector for SerialConnector {
    type Source = NmeaSource<Box<dyn SerialPort>>;
    type Controller = NexstarController<Box<dyn SerialPort>>;

    fn open_source(&mut self) -> Result<Self::Source, SyncError> {
        Ok(NmeaSource::new(self.gps.open("GPS")?))
    }

    fn open_controller(&mut self) -> Result<Self::Controller, SyncError> {
        Ok(NexstarController::new(self.controller.open("telescope")?))
    }
}
