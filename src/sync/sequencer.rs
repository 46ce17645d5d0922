use std::time::Duration;

use super::connector::Connector;
use super::error::{SyncError, SyncStep};
use super::report::{Identity, NoFix, Readback, SyncOutcome, SyncReport, TimeReport};
use crate::abort::AbortToken;
use crate::gps::{wait_for_fix, Acquisition, FixAccumulator, SentenceSource, DEFAULT_MAX_HDOP};
use crate::nexstar::{Controller, ControllerError, ControllerTime, Location};
use crate::timezone::{resolve, TimezoneLookup};

/// Runs one GPS-to-telescope synchronization.
///
/// Steps run strictly in order: connect, identify, acquire a fix, resolve
/// local time, push time, push location, read back. Identify and read-back
/// failures become warnings. Nothing is retried, and once the time has been
/// pushed a later failure leaves the controller as it is.
pub struct Synchronizer<L> {
    lookup: L,
    max_hdop: f32,
    acquire_timeout: Option<Duration>,
}

impl<L: TimezoneLookup> Synchronizer<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            max_hdop: DEFAULT_MAX_HDOP,
            acquire_timeout: None,
        }
    }

    pub fn max_hdop(mut self, max_hdop: f32) -> Self {
        self.max_hdop = max_hdop;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn run<C: Connector>(
        &self,
        connector: &mut C,
        abort: &AbortToken,
    ) -> Result<SyncOutcome, SyncError> {
        let mut warnings = Vec::new();

        enter(SyncStep::Connect);
        let mut source = connector.open_source()?;
        let mut controller = connector.open_controller()?;

        enter(SyncStep::Identify);
        let identity = identify(&mut controller, &mut warnings);

        enter(SyncStep::AcquireFix);
        source.reset_input()?;
        let mut accumulator = FixAccumulator::new(self.max_hdop);
        let timeout = self.acquire_timeout;
        let acquired = match wait_for_fix(&mut source, &mut accumulator, abort, timeout)? {
            Acquisition::Fixed(fix) => Ok(fix),
            Acquisition::Cancelled(signal) => Err(NoFix::Cancelled {
                reason: signal.reason,
            }),
            Acquisition::TimedOut(limit) => Err(NoFix::TimedOut(limit)),
        };
        let fix = match acquired {
            Ok(fix) => fix,
            Err(no_fix) => {
                log::warn!(
                    "Failed to acquire a fix: {} (position {}, date {})",
                    no_fix,
                    held(accumulator.position().is_some()),
                    held(accumulator.date().is_some())
                );
                return Ok(SyncOutcome::Abandoned(no_fix));
            }
        };
        log::info!(
            "Fix: {},{} {} {} UTC",
            fix.latitude,
            fix.longitude,
            fix.date,
            fix.time
        );

        enter(SyncStep::ResolveTime);
        let resolved = resolve(&fix, &self.lookup)?;
        log::info!("UTC:   {}", resolved.utc);
        log::info!("Local: {} ({})", resolved.local, resolved.timezone());
        log::info!("DST:   {}", resolved.is_dst);

        enter(SyncStep::PushTime);
        let pushed_time = ControllerTime::from_resolved(&resolved);
        controller
            .set_time(&pushed_time)
            .map_err(SyncError::controller(SyncStep::PushTime))?;
        log::info!("Time set to {}", pushed_time);

        enter(SyncStep::PushLocation);
        let pushed_location = Location {
            latitude: fix.latitude,
            longitude: fix.longitude,
        };
        controller
            .set_location(&pushed_location)
            .map_err(SyncError::controller(SyncStep::PushLocation))?;
        log::info!("Location set to {}", pushed_location);

        enter(SyncStep::Verify);
        let readback = verify(&mut controller, &mut warnings);

        Ok(SyncOutcome::Completed(Box::new(SyncReport {
            identity,
            fix,
            time: TimeReport::from(&resolved),
            pushed_time,
            pushed_location,
            readback,
            warnings,
        })))
    }
}

fn held(known: bool) -> &'static str {
    if known {
        "known"
    } else {
        "missing"
    }
}

fn enter(step: SyncStep) {
    log::debug!("Step: {}", step);
}

/// Keep going without an identity; the writes may still succeed.
fn identify<C: Controller>(controller: &mut C, warnings: &mut Vec<String>) -> Identity {
    let model = soft(SyncStep::Identify, "model", controller.get_model(), warnings);
    let version = soft(SyncStep::Identify, "version", controller.get_version(), warnings);
    if let Some(model) = &model {
        log::info!("NexStar model: {}", model);
    }
    if let Some(version) = &version {
        log::info!("NexStar version: {}", version);
    }
    Identity { model, version }
}

fn verify<C: Controller>(controller: &mut C, warnings: &mut Vec<String>) -> Readback {
    let location = soft(SyncStep::Verify, "location", controller.get_location(), warnings);
    let time = soft(SyncStep::Verify, "time", controller.get_time(), warnings);
    let position = soft(SyncStep::Verify, "position", controller.get_position(), warnings);
    if let Some(location) = &location {
        log::info!("Telescope location: {}", location);
    }
    if let Some(time) = &time {
        log::info!("Telescope time: {}", time);
    }
    if let Some(position) = &position {
        log::info!("Telescope position: {}", position);
    }
    Readback {
        location,
        time,
        position,
    }
}

/// Turn a failed query into a warning.
fn soft<T>(
    step: SyncStep,
    what: &str,
    result: Result<T, ControllerError>,
    warnings: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            let message = format!("{}: could not read {}: {}", step, what, e);
            log::warn!("{}", message);
            warnings.push(message);
            None
        }
    }
}
