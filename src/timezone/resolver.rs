use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Offset, Timelike, Utc};
use chrono_tz::{OffsetComponents, Tz};

use super::error::TimezoneError;
use super::lookup::TimezoneLookup;
use crate::gps::Fix;

/// A fix's instant in UTC and in the civil zone covering its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTime {
    pub utc: DateTime<Utc>,
    pub local: DateTime<Tz>,
    pub is_dst: bool,
}

impl ResolvedTime {
    pub fn timezone(&self) -> Tz {
        self.local.timezone()
    }

    /// Offset the controller pairs with the DST flag, in seconds.
    ///
    /// Local time minus this offset, minus an hour when `is_dst`, is UTC.
    /// Taken from the actual offset rather than the zone's base offset,
    /// which differs for zones with negative DST such as Europe/Dublin.
    pub fn standard_offset_seconds(&self) -> i64 {
        let total = i64::from(self.local.offset().fix().local_minus_utc());
        if self.is_dst {
            total - 3600
        } else {
            total
        }
    }
}

/// Resolve the local civil time of `fix`.
///
/// Fails when no zone covers the coordinates; there is no UTC fallback.
pub fn resolve<L: TimezoneLookup + ?Sized>(
    fix: &Fix,
    lookup: &L,
) -> Result<ResolvedTime, TimezoneError> {
    // The controller only takes whole seconds.
    let time = fix.time.with_nanosecond(0).unwrap_or(fix.time);
    let utc = NaiveDateTime::new(fix.date, time).and_utc();

    let zone_id = lookup
        .timezone_at(fix.latitude, fix.longitude)
        .ok_or(TimezoneError::NotFound {
            latitude: fix.latitude,
            longitude: fix.longitude,
        })?;
    let zone = Tz::from_str(&zone_id).map_err(|_| TimezoneError::UnknownZone(zone_id.clone()))?;

    let local = utc.with_timezone(&zone);
    let is_dst = local.offset().dst_offset().num_seconds() > 0;

    Ok(ResolvedTime { utc, local, is_dst })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    /// Answers every query with the same zone, or nothing.
    struct FixedLookup(Option<&'static str>);

    impl TimezoneLookup for FixedLookup {
        fn timezone_at(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            self.0.map(String::from)
        }
    }

    fn fix(latitude: f64, longitude: f64, ymd: (i32, u32, u32), hms: (u32, u32, u32)) -> Fix {
        Fix {
            latitude,
            longitude,
            date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            time: NaiveTime::from_hms_opt(hms.0, hms.1, hms.2).unwrap(),
        }
    }

    #[test]
    fn test_los_angeles_summer() {
        let lookup = FixedLookup(Some("America/Los_Angeles"));
        let resolved = resolve(&fix(34.0, -118.0, (2024, 6, 1), (17, 30, 0)), &lookup).unwrap();

        assert_eq!(resolved.utc.to_rfc3339(), "2024-06-01T17:30:00+00:00");
        assert_eq!(resolved.local.to_rfc3339(), "2024-06-01T10:30:00-07:00");
        assert!(resolved.is_dst);
        assert_eq!(resolved.timezone(), chrono_tz::America::Los_Angeles);
        assert_eq!(resolved.standard_offset_seconds(), -8 * 3600);
    }

    #[test]
    fn test_dublin_winter_offset_is_gmt() {
        let lookup = FixedLookup(Some("Europe/Dublin"));
        let resolved = resolve(&fix(53.35, -6.26, (2024, 1, 15), (12, 0, 0)), &lookup).unwrap();

        assert_eq!(resolved.local.to_rfc3339(), "2024-01-15T12:00:00+00:00");
        assert!(!resolved.is_dst);
        assert_eq!(resolved.standard_offset_seconds(), 0);
    }

    #[test]
    fn test_los_angeles_winter_is_not_dst() {
        let lookup = FixedLookup(Some("America/Los_Angeles"));
        let resolved = resolve(&fix(34.0, -118.0, (2024, 1, 15), (17, 30, 0)), &lookup).unwrap();

        assert_eq!(resolved.local.to_rfc3339(), "2024-01-15T09:30:00-08:00");
        assert!(!resolved.is_dst);
    }

    #[test]
    fn test_local_date_can_differ_from_utc_date() {
        let lookup = FixedLookup(Some("America/Los_Angeles"));
        let resolved = resolve(&fix(34.0, -118.0, (2024, 6, 1), (3, 0, 0)), &lookup).unwrap();
        assert_eq!(resolved.local.to_rfc3339(), "2024-05-31T20:00:00-07:00");
    }

    #[test]
    fn test_dst_ignores_total_utc_offset() {
        // Positive offset all year, never DST.
        let tokyo = FixedLookup(Some("Asia/Tokyo"));
        let resolved = resolve(&fix(35.7, 139.7, (2024, 7, 1), (0, 0, 0)), &tokyo).unwrap();
        assert!(!resolved.is_dst);

        // Zero UTC offset in winter, DST in summer.
        let london = FixedLookup(Some("Europe/London"));
        let winter = resolve(&fix(51.5, -0.1, (2024, 1, 1), (12, 0, 0)), &london).unwrap();
        let summer = resolve(&fix(51.5, -0.1, (2024, 7, 1), (12, 0, 0)), &london).unwrap();
        assert!(!winter.is_dst);
        assert!(summer.is_dst);
    }

    #[test]
    fn test_southern_hemisphere_dst() {
        let sydney = FixedLookup(Some("Australia/Sydney"));
        let january = resolve(&fix(-33.9, 151.2, (2024, 1, 10), (0, 0, 0)), &sydney).unwrap();
        let june = resolve(&fix(-33.9, 151.2, (2024, 6, 10), (0, 0, 0)), &sydney).unwrap();
        assert!(january.is_dst);
        assert!(!june.is_dst);
    }

    #[test]
    fn test_same_input_same_result() {
        let lookup = FixedLookup(Some("America/Los_Angeles"));
        let f = fix(34.0, -118.0, (2024, 3, 10), (10, 0, 0));
        assert_eq!(resolve(&f, &lookup).unwrap(), resolve(&f, &lookup).unwrap());
    }

    #[test]
    fn test_sub_second_time_is_truncated() {
        let lookup = FixedLookup(Some("UTC"));
        let mut f = fix(0.0, 0.0, (2024, 6, 1), (17, 30, 0));
        f.time = NaiveTime::from_hms_milli_opt(17, 30, 0, 750).unwrap();
        let resolved = resolve(&f, &lookup).unwrap();
        assert_eq!(resolved.utc.to_rfc3339(), "2024-06-01T17:30:00+00:00");
    }

    #[test]
    fn test_no_timezone_is_an_error() {
        let lookup = FixedLookup(None);
        let err = resolve(&fix(-30.0, -140.0, (2024, 6, 1), (0, 0, 0)), &lookup).unwrap_err();
        assert!(matches!(err, TimezoneError::NotFound { .. }));
    }

    #[test]
    fn test_unknown_zone_id_is_an_error() {
        let lookup = FixedLookup(Some("Mars/Olympus_Mons"));
        let err = resolve(&fix(0.0, 0.0, (2024, 6, 1), (0, 0, 0)), &lookup).unwrap_err();
        assert!(matches!(err, TimezoneError::UnknownZone(id) if id == "Mars/Olympus_Mons"));
    }
}
