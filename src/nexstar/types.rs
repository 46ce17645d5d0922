use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use super::error::ControllerError;
use crate::timezone::ResolvedTime;

/// Hand controller model as reported by the `m` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Model {
    GpsSeries,
    ISeries,
    ISeriesSe,
    Cge,
    AdvancedGt,
    Slt,
    Cpc,
    Gt,
    Se45,
    Se68,
    CgePro,
    CgemDx,
    Lcm,
    SkyProdigy,
    CpcDeluxe,
    Gt16,
    StarSeeker,
    Avx,
    Cosmos,
    Evolution,
    Cgx,
    Cgxl,
    Astrofi,
    SkyWatcher,
    Unknown(u8),
}

impl From<u8> for Model {
    fn from(code: u8) -> Self {
        match code {
            1 => Model::GpsSeries,
            3 => Model::ISeries,
            4 => Model::ISeriesSe,
            5 => Model::Cge,
            6 => Model::AdvancedGt,
            7 => Model::Slt,
            9 => Model::Cpc,
            10 => Model::Gt,
            11 => Model::Se45,
            12 => Model::Se68,
            13 => Model::CgePro,
            14 => Model::CgemDx,
            15 => Model::Lcm,
            16 => Model::SkyProdigy,
            17 => Model::CpcDeluxe,
            18 => Model::Gt16,
            19 => Model::StarSeeker,
            20 => Model::Avx,
            21 => Model::Cosmos,
            22 => Model::Evolution,
            23 => Model::Cgx,
            24 => Model::Cgxl,
            25 => Model::Astrofi,
            26 => Model::SkyWatcher,
            other => Model::Unknown(other),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Model::GpsSeries => "GPS Series",
            Model::ISeries => "i-Series",
            Model::ISeriesSe => "i-Series SE",
            Model::Cge => "CGE",
            Model::AdvancedGt => "Advanced GT",
            Model::Slt => "SLT",
            Model::Cpc => "CPC",
            Model::Gt => "GT",
            Model::Se45 => "4/5 SE",
            Model::Se68 => "6/8 SE",
            Model::CgePro => "CGE Pro",
            Model::CgemDx => "CGEM DX",
            Model::Lcm => "LCM",
            Model::SkyProdigy => "Sky Prodigy",
            Model::CpcDeluxe => "CPC Deluxe",
            Model::Gt16 => "GT 16",
            Model::StarSeeker => "StarSeeker",
            Model::Avx => "Advanced VX",
            Model::Cosmos => "Cosmos",
            Model::Evolution => "Evolution",
            Model::Cgx => "CGX",
            Model::Cgxl => "CGX-L",
            Model::Astrofi => "Astrofi",
            Model::SkyWatcher => "SkyWatcher",
            Model::Unknown(code) => return write!(f, "unknown model {}", code),
        };
        f.write_str(name)
    }
}

/// Hand controller firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Site location in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// `W`/`w` payload: degrees, minutes, seconds and hemisphere for each axis.
    pub fn to_bytes(&self) -> Result<[u8; 8], ControllerError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ControllerError::InvalidValue(format!(
                "latitude {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ControllerError::InvalidValue(format!(
                "longitude {}",
                self.longitude
            )));
        }

        let (lat_d, lat_m, lat_s) = to_dms(self.latitude);
        let (lon_d, lon_m, lon_s) = to_dms(self.longitude);
        Ok([
            lat_d,
            lat_m,
            lat_s,
            u8::from(self.latitude < 0.0),
            lon_d,
            lon_m,
            lon_s,
            u8::from(self.longitude < 0.0),
        ])
    }

    pub fn from_bytes(b: &[u8; 8]) -> Self {
        let latitude = from_dms(b[0], b[1], b[2], b[3] == 1);
        let longitude = from_dms(b[4], b[5], b[6], b[7] == 1);
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

fn to_dms(degrees: f64) -> (u8, u8, u8) {
    let total = (degrees.abs() * 3600.0).round() as u32;
    (
        (total / 3600) as u8,
        ((total % 3600) / 60) as u8,
        (total % 60) as u8,
    )
}

fn from_dms(d: u8, m: u8, s: u8, negative: bool) -> f64 {
    let value = f64::from(d) + f64::from(m) / 60.0 + f64::from(s) / 3600.0;
    if negative {
        -value
    } else {
        value
    }
}

/// Local wall-clock time as the hand controller stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerTime {
    pub local: NaiveDateTime,
    /// Standard (non-DST) offset from UTC in whole hours.
    pub utc_offset_hours: i8,
    pub dst: bool,
}

impl ControllerTime {
    pub fn from_resolved(resolved: &ResolvedTime) -> Self {
        let offset = resolved.standard_offset_seconds();
        if offset % 3600 != 0 {
            log::warn!(
                "{} has a fractional-hour offset ({}s); the controller only takes whole hours",
                resolved.timezone(),
                offset
            );
        }
        Self {
            local: resolved.local.naive_local(),
            utc_offset_hours: (offset / 3600) as i8,
            dst: resolved.is_dst,
        }
    }

    /// `H`/`h` payload: hour, minute, second, month, day, year - 2000, offset, DST.
    pub fn to_bytes(&self) -> Result<[u8; 8], ControllerError> {
        let year = u8::try_from(self.local.year() - 2000)
            .map_err(|_| ControllerError::InvalidValue(format!("year {}", self.local.year())))?;
        Ok([
            self.local.hour() as u8,
            self.local.minute() as u8,
            self.local.second() as u8,
            self.local.month() as u8,
            self.local.day() as u8,
            year,
            self.utc_offset_hours as u8,
            u8::from(self.dst),
        ])
    }

    pub fn from_bytes(b: &[u8; 8]) -> Option<Self> {
        let date =
            NaiveDate::from_ymd_opt(2000 + i32::from(b[5]), u32::from(b[3]), u32::from(b[4]))?;
        let time = NaiveTime::from_hms_opt(u32::from(b[0]), u32::from(b[1]), u32::from(b[2]))?;
        Some(Self {
            local: NaiveDateTime::new(date, time),
            utc_offset_hours: b[6] as i8,
            dst: b[7] != 0,
        })
    }
}

impl fmt::Display for ControllerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (UTC{:+}{})",
            self.local.format("%Y-%m-%d %H:%M:%S"),
            self.utc_offset_hours,
            if self.dst { ", DST" } else { "" }
        )
    }
}

/// Current pointing in equatorial coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl Position {
    /// Both axes are sent as fractions of a full turn scaled to 2^32.
    pub fn from_fractions(ra: u32, dec: u32) -> Self {
        const TURN: f64 = 4_294_967_296.0;
        let ra_deg = f64::from(ra) / TURN * 360.0;
        let mut dec_deg = f64::from(dec) / TURN * 360.0;
        if dec_deg > 180.0 {
            dec_deg -= 360.0;
        }
        Self { ra_deg, dec_deg }
    }

    pub fn ra_hours(&self) -> f64 {
        self.ra_deg / 15.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RA {:.4}h DEC {:+.4}°", self.ra_hours(), self.dec_deg)
    }
}
