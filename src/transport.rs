use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

/// Byte stream to a serial device.
pub trait Transport: Read + Write {
    /// Drop whatever the device sent before now.
    fn clear_input(&mut self) -> io::Result<()>;
}

impl Transport for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

pub fn open_serial(
    port: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    serialport::new(port, baud_rate).timeout(timeout).open()
}

/// Read errors that only mean "nothing arrived yet".
pub fn is_idle(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
