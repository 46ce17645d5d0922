use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// GGA fix quality indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum FixQuality {
    Invalid,
    Gps,
    Dgps,
    Pps,
    Rtk,
    FloatRtk,
    Estimated,
    Manual,
    Simulation,
}

/// One decoded positioning sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionRecord {
    /// Instantaneous position (GGA).
    Position {
        latitude: f64,
        longitude: f64,
        time: NaiveTime,
        hdop: f32,
        quality: FixQuality,
        satellites: Option<u32>,
    },
    /// Date and fix validity (RMC).
    DateValidity {
        date: NaiveDate,
        time: NaiveTime,
        valid: bool,
    },
}

/// Quality-gated position with its UTC date and time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub time: NaiveTime,
}
