use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::error::{ProcessingError, Result};

/// Decoder for CF-convention time offsets such as `days since 1800-01-01 00:00:00`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    seconds_per_unit: f64,
    epoch: NaiveDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| ProcessingError::InvalidFormat(format!(
                "Time units '{}' are not of the form '<unit> since <date>'", units
            )))?;

        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86400.0,
            other => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Unsupported time unit: '{}'", other
                )))
            }
        };

        Ok(Self {
            seconds_per_unit,
            epoch: parse_timestamp(reference.trim())?,
        })
    }

    pub fn decode(&self, offset: f64) -> Result<NaiveDateTime> {
        if !offset.is_finite() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Non-finite time offset: {}", offset
            )));
        }
        let overflow = || {
            ProcessingError::InvalidFormat(format!(
                "Time offset {} overflows the calendar", offset
            ))
        };

        // Round to the millisecond; half-hourly offsets in days are not exact in binary
        let millis = (offset * self.seconds_per_unit * 1000.0).round();
        if !(millis > i64::MIN as f64 && millis < i64::MAX as f64) {
            return Err(overflow());
        }
        let delta = Duration::try_milliseconds(millis as i64).ok_or_else(overflow)?;
        self.epoch.checked_add_signed(delta).ok_or_else(overflow)
    }
}

/// Parse the timestamp layouts seen in flux-tower files
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];

    let value = value.trim();
    for format in FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(timestamp);
        }
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.naive_utc());
    }

    // Date only, e.g. a CF reference date
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid timestamp: '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    #[test]
    fn test_decode_days_since() {
        let units = TimeUnits::parse("days since 1800-01-01 00:00:00.0").unwrap();
        assert_eq!(units.decode(0.0).unwrap(), datetime(1800, 1, 1, 0, 0));
        assert_eq!(units.decode(1.5).unwrap(), datetime(1800, 1, 2, 12, 0));
        // 1/48 day is not exactly representable
        assert_eq!(units.decode(1.0 / 48.0).unwrap(), datetime(1800, 1, 1, 0, 30));
    }

    #[test]
    fn test_decode_seconds_and_hours() {
        let seconds = TimeUnits::parse("seconds since 2017-01-01").unwrap();
        assert_eq!(seconds.decode(1800.0).unwrap(), datetime(2017, 1, 1, 0, 30));

        let hours = TimeUnits::parse("hours since 2017-01-01 00:00").unwrap();
        assert_eq!(hours.decode(25.0).unwrap(), datetime(2017, 1, 2, 1, 0));
    }

    #[test]
    fn test_decode_out_of_range_offsets() {
        let units = TimeUnits::parse("days since 1800-01-01").unwrap();
        for offset in [-1.0e300, 1.0e300, -1.0e12, 1.0e12, f64::NAN] {
            assert!(
                matches!(units.decode(offset), Err(ProcessingError::InvalidFormat(_))),
                "offset {} should be rejected",
                offset
            );
        }
    }

    #[test]
    fn test_invalid_units() {
        assert!(TimeUnits::parse("fortnights since 2017-01-01").is_err());
        assert!(TimeUnits::parse("days").is_err());
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = datetime(2017, 9, 28, 14, 30);
        assert_eq!(parse_timestamp("2017-09-28 14:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-09-28 14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-09-28T14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-09-28T14:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2017-09-28").unwrap(),
            datetime(2017, 9, 28, 0, 0)
        );
        assert!(parse_timestamp("28/09/2017").is_err());
    }
}
