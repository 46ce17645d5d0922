mod error;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serialport::{SerialPortInfo, SerialPortType};

pub use error::DeviceError;

/// u-blox 7 GPS receiver.
pub const GPS_USB_ID: UsbId = UsbId {
    vid: 0x1546,
    pid: 0x01a7,
};
/// Prolific PL2303 cable shipped with NexStar hand controllers.
pub const NEXSTAR_USB_ID: UsbId = UsbId {
    vid: 0x067b,
    pid: 0x23d3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vid, self.pid)
    }
}

impl FromStr for UsbId {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeviceError::InvalidUsbId(s.to_string());
        let (vid, pid) = s.trim().split_once(':').ok_or_else(invalid)?;
        if vid.len() != 4 || pid.len() != 4 {
            return Err(invalid());
        }
        Ok(Self {
            vid: u16::from_str_radix(vid, 16).map_err(|_| invalid())?,
            pid: u16::from_str_radix(pid, 16).map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for UsbId {
    type Error = DeviceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Serial port paths of the two devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortIds {
    pub gps: String,
    pub telescope: String,
}

/// Where to find each device: a fixed path, or a USB id to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    Path(String),
    Usb(UsbId),
}

/// Index USB serial ports by vendor/product id. Later ports win on duplicates.
pub fn usb_ports(ports: &[SerialPortInfo]) -> HashMap<UsbId, String> {
    let mut sorted: Vec<&SerialPortInfo> = ports.iter().collect();
    sorted.sort_by(|a, b| a.port_name.cmp(&b.port_name));

    let mut by_id = HashMap::new();
    for port in sorted {
        match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                let id = UsbId {
                    vid: usb.vid,
                    pid: usb.pid,
                };
                log::info!("{}: {}", port.port_name, id);
                by_id.insert(id, port.port_name.clone());
            }
            other => log::debug!("{}: not a USB port ({:?})", port.port_name, other),
        }
    }
    by_id
}

/// Pick the GPS and telescope ports out of `ports`.
pub fn identify_ports(
    ports: &[SerialPortInfo],
    gps: &PortSelector,
    telescope: &PortSelector,
) -> Result<PortIds, DeviceError> {
    let by_id = usb_ports(ports);
    let find = |device: &'static str, selector: &PortSelector| match selector {
        PortSelector::Path(path) => Ok(path.clone()),
        PortSelector::Usb(id) => by_id.get(id).cloned().ok_or(DeviceError::NotFound {
            device,
            id: id.to_string(),
        }),
    };

    Ok(PortIds {
        gps: find("GPS", gps)?,
        telescope: find("NexStar telescope", telescope)?,
    })
}

/// [`identify_ports`] against the ports present on this machine.
pub fn locate(gps: &PortSelector, telescope: &PortSelector) -> Result<PortIds, DeviceError> {
    let needs_scan = [gps, telescope]
        .iter()
        .any(|s| matches!(s, PortSelector::Usb(_)));
    let ports = if needs_scan {
        serialport::available_ports()?
    } else {
        Vec::new()
    };
    identify_ports(&ports, gps, telescope)
}
