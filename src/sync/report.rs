use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::gps::Fix;
use crate::nexstar::{ControllerTime, Location, Model, Position, Version};
use crate::timezone::ResolvedTime;

/// How a run ended when it did not fail.
#[derive(Debug)]
pub enum SyncOutcome {
    Completed(Box<SyncReport>),
    /// No fix was acquired; nothing was written to the controller.
    Abandoned(NoFix),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoFix {
    Cancelled { reason: String },
    TimedOut(Duration),
}

impl fmt::Display for NoFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoFix::Cancelled { reason } => write!(f, "cancelled ({})", reason),
            NoFix::TimedOut(limit) => {
                write!(f, "timed out after {}", humantime::format_duration(*limit))
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Identity {
    pub model: Option<Model>,
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeReport {
    pub utc: DateTime<Utc>,
    pub local: DateTime<FixedOffset>,
    pub timezone: String,
    pub is_dst: bool,
}

impl From<&ResolvedTime> for TimeReport {
    fn from(resolved: &ResolvedTime) -> Self {
        Self {
            utc: resolved.utc,
            local: resolved.local.fixed_offset(),
            timezone: resolved.timezone().name().to_string(),
            is_dst: resolved.is_dst,
        }
    }
}

/// What the controller reported after the writes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Readback {
    pub location: Option<Location>,
    pub time: Option<ControllerTime>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub identity: Identity,
    pub fix: Fix,
    pub time: TimeReport,
    pub pushed_time: ControllerTime,
    pub pushed_location: Location,
    pub readback: Readback,
    /// Non-fatal failures, in the order they happened.
    pub warnings: Vec<String>,
}

fn or_unknown<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model:    {}", or_unknown(&self.identity.model))?;
        writeln!(f, "Version:  {}", or_unknown(&self.identity.version))?;
        writeln!(f, "UTC:      {}", self.time.utc)?;
        writeln!(f, "Local:    {} ({})", self.time.local, self.time.timezone)?;
        writeln!(f, "DST:      {}", self.time.is_dst)?;
        writeln!(f, "GPS:      {},{}", self.fix.latitude, self.fix.longitude)?;
        writeln!(f, "Set telescope location:     {}", or_unknown(&self.readback.location))?;
        writeln!(f, "Set telescope time:         {}", or_unknown(&self.readback.time))?;
        write!(f, "Current telescope position: {}", or_unknown(&self.readback.position))?;
        for warning in &self.warnings {
            write!(f, "\nwarning: {}", warning)?;
        }
        Ok(())
    }
}
