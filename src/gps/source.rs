use nmea::sentences::{rmc::RmcStatusOfFix, FixType, GgaData, RmcData};
use nmea::ParseResult;

use super::error::SourceError;
use super::types::{FixQuality, PositionRecord};
use crate::transport::{is_idle, Transport};

const READ_CHUNK: usize = 256;
// Well above the 82-character NMEA limit.
const MAX_LINE: usize = 512;

/// Blocking pull of decoded positioning records.
pub trait SentenceSource {
    /// Next record, or `None` if nothing arrived within one poll interval.
    fn next_record(&mut self) -> Result<Option<PositionRecord>, SourceError>;

    /// Throw away anything buffered so far.
    fn reset_input(&mut self) -> Result<(), SourceError>;
}

/// NMEA-0183 sentences read line by line from a serial transport.
pub struct NmeaSource<T> {
    transport: T,
    pending: Vec<u8>,
}

impl<T: Transport> NmeaSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: Vec::with_capacity(MAX_LINE),
        }
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(line)
    }
}

impl<T: Transport> SentenceSource for NmeaSource<T> {
    fn next_record(&mut self) -> Result<Option<PositionRecord>, SourceError> {
        loop {
            while let Some(line) = self.take_line() {
                if let Some(record) = decode_line(&line) {
                    return Ok(Some(record));
                }
            }

            if self.pending.len() > MAX_LINE {
                log::debug!("Dropping {} bytes without a line break", self.pending.len());
                self.pending.clear();
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.transport.read(&mut chunk) {
                Ok(0) => return Err(SourceError::Closed),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if is_idle(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn reset_input(&mut self) -> Result<(), SourceError> {
        self.pending.clear();
        self.transport.clear_input()?;
        Ok(())
    }
}

fn decode_line(raw: &[u8]) -> Option<PositionRecord> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match nmea::parse_str(line) {
        Ok(ParseResult::GGA(gga)) => from_gga(&gga),
        Ok(ParseResult::RMC(rmc)) => from_rmc(&rmc),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Skipping undecodable sentence {:?}: {:?}", line, e);
            None
        }
    }
}

fn from_gga(gga: &GgaData) -> Option<PositionRecord> {
    let (Some(latitude), Some(longitude), Some(time), Some(hdop)) =
        (gga.latitude, gga.longitude, gga.fix_time, gga.hdop)
    else {
        log::debug!("GGA without position, time or HDOP");
        return None;
    };

    Some(PositionRecord::Position {
        latitude,
        longitude,
        time,
        hdop,
        quality: gga.fix_type.map_or(FixQuality::Invalid, fix_quality),
        satellites: gga.fix_satellites,
    })
}

fn from_rmc(rmc: &RmcData) -> Option<PositionRecord> {
    let (Some(date), Some(time)) = (rmc.fix_date, rmc.fix_time) else {
        log::debug!("RMC without date or time");
        return None;
    };

    Some(PositionRecord::DateValidity {
        date,
        time,
        valid: !matches!(rmc.status_of_fix, RmcStatusOfFix::Invalid),
    })
}

fn fix_quality(fix_type: FixType) -> FixQuality {
    match fix_type {
        FixType::Invalid => FixQuality::Invalid,
        FixType::Gps => FixQuality::Gps,
        FixType::DGps => FixQuality::Dgps,
        FixType::Pps => FixQuality::Pps,
        FixType::Rtk => FixQuality::Rtk,
        FixType::FloatRtk => FixQuality::FloatRtk,
        FixType::Estimated => FixQuality::Estimated,
        FixType::Manual => FixQuality::Manual,
        FixType::Simulation => FixQuality::Simulation,
    }
}
