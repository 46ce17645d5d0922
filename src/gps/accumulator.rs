use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};

use super::error::SourceError;
use super::source::SentenceSource;
use super::types::{Fix, PositionRecord};
use crate::abort::{AbortSignal, AbortToken};

/// HDOP below 3 is "good" or better; anything worse moves the pointing model.
pub const DEFAULT_MAX_HDOP: f32 = 3.0;

/// How a wait for a fix ended without a transport failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    Fixed(Fix),
    Cancelled(AbortSignal),
    TimedOut(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GoodPosition {
    latitude: f64,
    longitude: f64,
    time: NaiveTime,
}

/// Combines GGA and RMC records into a single [`Fix`].
///
/// Position and time-of-day come from the latest GGA whose HDOP is strictly
/// below `max_hdop`; the date comes from the latest RMC flagged valid.
/// Rejected records never touch the held state.
#[derive(Debug, Clone)]
pub struct FixAccumulator {
    max_hdop: f32,
    position: Option<GoodPosition>,
    date: Option<NaiveDate>,
}

impl Default for FixAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HDOP)
    }
}

impl FixAccumulator {
    pub fn new(max_hdop: f32) -> Self {
        Self {
            max_hdop,
            position: None,
            date: None,
        }
    }

    /// Last accepted latitude, longitude and UTC time-of-day.
    pub fn position(&self) -> Option<(f64, f64, NaiveTime)> {
        self.position.map(|p| (p.latitude, p.longitude, p.time))
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Feed one record; returns the fix once every field is known.
    pub fn push(&mut self, record: &PositionRecord) -> Option<Fix> {
        match *record {
            PositionRecord::Position {
                latitude,
                longitude,
                time,
                hdop,
                quality,
                satellites,
            } => {
                log::info!(
                    "GGA {:.6},{:.6} {} quality={} sats={} hdop={}",
                    latitude,
                    longitude,
                    time,
                    quality,
                    satellites.map_or_else(|| "?".to_string(), |s| s.to_string()),
                    hdop
                );
                if hdop < self.max_hdop {
                    self.position = Some(GoodPosition {
                        latitude,
                        longitude,
                        time,
                    });
                } else {
                    log::warn!(
                        "Dilution of precision too high ({} >= {}), discarding position",
                        hdop,
                        self.max_hdop
                    );
                }
            }
            PositionRecord::DateValidity { date, time, valid } => {
                log::info!("RMC {} {} valid={}", date, time, valid);
                if valid {
                    self.date = Some(date);
                } else {
                    log::warn!("RMC frame is not valid, discarding date");
                }
            }
        }

        self.fix()
    }

    fn fix(&self) -> Option<Fix> {
        let position = self.position?;
        let date = self.date?;
        Some(Fix {
            latitude: position.latitude,
            longitude: position.longitude,
            date,
            time: position.time,
        })
    }
}

/// Pull records from `source` until a fix is assembled.
///
/// Blocks indefinitely unless `timeout` is set. `abort` is checked before
/// every pull, so the source's read timeout bounds cancellation latency.
pub fn wait_for_fix<S: SentenceSource + ?Sized>(
    source: &mut S,
    accumulator: &mut FixAccumulator,
    abort: &AbortToken,
    timeout: Option<Duration>,
) -> Result<Acquisition, SourceError> {
    let started = Instant::now();

    loop {
        if let Some(signal) = abort.poll() {
            return Ok(Acquisition::Cancelled(signal));
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                return Ok(Acquisition::TimedOut(limit));
            }
        }

        let Some(record) = source.next_record()? else {
            continue;
        };

        if let Some(fix) = accumulator.push(&record) {
            return Ok(Acquisition::Fixed(fix));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::mpsc::Sender;

    use super::*;
    use crate::abort;
    use crate::gps::FixQuality;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gga(latitude: f64, longitude: f64, hdop: f32, t: NaiveTime) -> PositionRecord {
        PositionRecord::Position {
            latitude,
            longitude,
            time: t,
            hdop,
            quality: FixQuality::Gps,
            satellites: Some(8),
        }
    }

    fn rmc(d: NaiveDate, valid: bool) -> PositionRecord {
        PositionRecord::DateValidity {
            date: d,
            time: time(10, 0, 0),
            valid,
        }
    }

    /// Plays back records, then aborts once it runs dry.
    struct Scripted {
        records: VecDeque<PositionRecord>,
        abort_tx: Option<Sender<AbortSignal>>,
        pulls: usize,
        idle_pulls: usize,
    }

    impl Scripted {
        fn new(records: Vec<PositionRecord>, abort_tx: Option<Sender<AbortSignal>>) -> Self {
            Self {
                records: records.into(),
                abort_tx,
                pulls: 0,
                idle_pulls: 0,
            }
        }
    }

    impl SentenceSource for Scripted {
        fn next_record(&mut self) -> Result<Option<PositionRecord>, SourceError> {
            self.pulls += 1;
            match self.records.pop_front() {
                Some(record) => Ok(Some(record)),
                None => {
                    self.idle_pulls += 1;
                    if let Some(tx) = &self.abort_tx {
                        let _ = tx.send(AbortSignal::new("script exhausted"));
                    }
                    Ok(None)
                }
            }
        }

        fn reset_input(&mut self) -> Result<(), SourceError> {
            Ok(())
        }
    }

    #[test]
    fn test_position_then_date_emits_fix() {
        let mut acc = FixAccumulator::default();
        assert_eq!(acc.push(&gga(34.0, -118.0, 1.5, time(10, 0, 0))), None);

        let fix = acc.push(&rmc(date(2024, 6, 1), true)).unwrap();
        assert_eq!(
            fix,
            Fix {
                latitude: 34.0,
                longitude: -118.0,
                date: date(2024, 6, 1),
                time: time(10, 0, 0),
            }
        );
    }

    #[test]
    fn test_date_then_position_emits_fix() {
        let mut acc = FixAccumulator::default();
        assert_eq!(acc.push(&rmc(date(2024, 6, 1), true)), None);
        let fix = acc.push(&gga(34.0, -118.0, 1.5, time(10, 0, 0))).unwrap();
        assert_eq!(fix.date, date(2024, 6, 1));
        assert_eq!(fix.time, time(10, 0, 0));
    }

    #[test]
    fn test_high_hdop_is_rejected() {
        let mut acc = FixAccumulator::new(3.0);
        assert_eq!(acc.push(&gga(34.0, -118.0, 4.0, time(10, 0, 0))), None);
        assert_eq!(acc.position(), None);

        // Still no fix once the date shows up.
        assert_eq!(acc.push(&rmc(date(2024, 6, 1), true)), None);
        assert_eq!(acc.date(), Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_hdop_at_threshold_is_rejected() {
        let mut acc = FixAccumulator::new(3.0);
        acc.push(&gga(34.0, -118.0, 3.0, time(10, 0, 0)));
        assert_eq!(acc.position(), None);
    }

    #[test]
    fn test_rejected_reports_never_change_state() {
        let mut acc = FixAccumulator::new(3.0);
        for (i, hdop) in [3.0, 3.5, 7.2, 20.0, 99.9].into_iter().enumerate() {
            acc.push(&gga(10.0 + i as f64, 20.0, hdop, time(1, 0, i as u32)));
            assert_eq!(acc.position(), None);
        }

        acc.push(&gga(34.0, -118.0, 1.0, time(10, 0, 0)));
        for hdop in [3.0, 5.0, 50.0] {
            acc.push(&gga(0.0, 0.0, hdop, time(11, 0, 0)));
            assert_eq!(acc.position(), Some((34.0, -118.0, time(10, 0, 0))));
        }
    }

    #[test]
    fn test_better_report_overwrites_position() {
        let mut acc = FixAccumulator::new(3.0);
        acc.push(&gga(34.0, -118.0, 2.0, time(10, 0, 0)));
        acc.push(&gga(34.1, -118.1, 2.9, time(10, 0, 1)));
        assert_eq!(acc.position(), Some((34.1, -118.1, time(10, 0, 1))));
    }

    #[test]
    fn test_invalid_date_is_ignored() {
        let mut acc = FixAccumulator::default();
        acc.push(&gga(34.0, -118.0, 1.5, time(10, 0, 0)));
        assert_eq!(acc.push(&rmc(date(2024, 6, 1), false)), None);
        assert_eq!(acc.date(), None);

        let fix = acc.push(&rmc(date(2024, 6, 2), true)).unwrap();
        assert_eq!(fix.date, date(2024, 6, 2));
    }

    #[test]
    fn test_invalid_date_keeps_previous_valid_date() {
        let mut acc = FixAccumulator::default();
        acc.push(&rmc(date(2024, 6, 1), true));
        acc.push(&rmc(date(1999, 1, 1), false));
        assert_eq!(acc.date(), Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_wait_for_fix_returns_first_complete_fix() {
        let mut source = Scripted::new(
            vec![
                gga(1.0, 1.0, 9.0, time(9, 59, 59)),
                rmc(date(2024, 6, 1), false),
                gga(34.0, -118.0, 1.5, time(10, 0, 0)),
                rmc(date(2024, 6, 1), true),
                gga(50.0, 50.0, 1.0, time(10, 0, 1)),
            ],
            None,
        );
        let mut acc = FixAccumulator::default();

        let result = wait_for_fix(&mut source, &mut acc, &AbortToken::never(), None).unwrap();
        assert_eq!(
            result,
            Acquisition::Fixed(Fix {
                latitude: 34.0,
                longitude: -118.0,
                date: date(2024, 6, 1),
                time: time(10, 0, 0),
            })
        );
        // Stops consuming after the fix.
        assert_eq!(source.records.len(), 1);
    }

    #[test]
    fn test_poor_sky_stalls_until_cancelled() {
        let (tx, token) = abort::channel();
        let mut source = Scripted::new(
            vec![
                rmc(date(2024, 6, 1), true),
                gga(34.0, -118.0, 4.0, time(10, 0, 0)),
                gga(34.0, -118.0, 6.5, time(10, 0, 1)),
            ],
            Some(tx),
        );
        let mut acc = FixAccumulator::new(3.0);

        let result = wait_for_fix(&mut source, &mut acc, &token, None).unwrap();
        assert_eq!(
            result,
            Acquisition::Cancelled(AbortSignal::new("script exhausted"))
        );
        assert_eq!(acc.position(), None);
        assert_eq!(source.idle_pulls, 1);
    }

    #[test]
    fn test_cancel_before_first_record() {
        let (tx, token) = abort::channel();
        tx.send(AbortSignal::new("operator")).unwrap();
        let mut source = Scripted::new(vec![gga(34.0, -118.0, 1.0, time(10, 0, 0))], None);
        let mut acc = FixAccumulator::default();

        let result = wait_for_fix(&mut source, &mut acc, &token, None).unwrap();
        assert!(matches!(result, Acquisition::Cancelled(_)));
        assert_eq!(source.pulls, 0);
    }

    #[test]
    fn test_timeout_gives_up() {
        let mut source = Scripted::new(vec![], None);
        let mut acc = FixAccumulator::default();

        let result = wait_for_fix(
            &mut source,
            &mut acc,
            &AbortToken::never(),
            Some(Duration::ZERO),
        )
        .unwrap();
        assert_eq!(result, Acquisition::TimedOut(Duration::ZERO));
    }

    #[test]
    fn test_source_error_propagates() {
        struct Broken;
        impl SentenceSource for Broken {
            fn next_record(&mut self) -> Result<Option<PositionRecord>, SourceError> {
                Err(SourceError::Closed)
            }
            fn reset_input(&mut self) -> Result<(), SourceError> {
                Ok(())
            }
        }

        let mut acc = FixAccumulator::default();
        let result = wait_for_fix(&mut Broken, &mut acc, &AbortToken::never(), None);
        assert!(matches!(result, Err(SourceError::Closed)));
    }
}
