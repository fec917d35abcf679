//! Conversions from decoded record data to physical values.
//!
//! Record times are expressed as seconds since 1900-01-01T00:00:00, the epoch used by the
//! downstream particle consumers.
use chrono::{NaiveDate, NaiveDateTime};

use crate::calibration::CalibrationCoefficients;
use crate::channel::ChannelData;
use crate::header::ProfileHeader;
use crate::{Error, Result};

/// Number of seconds between 1900 and the Unix epoch
pub const EPOCH_1900_UNIX_DELTA_SECS: i64 = 2_208_988_800;

/// Weight of one overflow count in a 32-bit linear sum.
const OVERFLOW_WEIGHT: f64 = 4_294_967_296.0;
/// Log offset applied to averaged linear values
const LOG_OFFSET: f64 = 2.5;
/// Counts per decade of averaged data before the detector slope is applied
const COUNTS_PER_DECADE: f64 = 8.0 * 65535.0;

/// Divisor turning a linear sum for `chan` into a per-sample mean.
///
/// When pings are averaged in time the sum covers every ping in the profile, otherwise
/// only the range samples of a single ping.
#[must_use]
pub fn averaged_divisor(header: &ProfileHeader, chan: usize) -> f64 {
    let range_samples = f64::from(header.range_samples[chan]);
    if header.is_averaged_pings != 0 {
        f64::from(header.num_pings_profile) * range_samples
    } else {
        range_samples
    }
}

/// Scale averaged linear sums into log counts.
///
/// `value = (sum + overflow * 2^32) / divisor`, then
/// `(log10(value) - 2.5) * 8 * 65535 * ds`. Infinite results, i.e., from a zero sum, are
/// reported as 0.
#[must_use]
pub fn scale_averaged(sums: &[u32], overflow: &[u8], divisor: f64, ds: f64) -> Vec<f64> {
    sums.iter()
        .zip(overflow)
        .map(|(sum, over)| {
            let linear = (f64::from(*sum) + f64::from(*over) * OVERFLOW_WEIGHT) / divisor;
            let scaled = (linear.log10() - LOG_OFFSET) * COUNTS_PER_DECADE * ds;
            if scaled.is_infinite() {
                0.0
            } else {
                scaled
            }
        })
        .collect()
}

/// Convert each decoded channel to counts. Raw channels are used as is, averaged channels
/// are scaled using [scale_averaged].
#[must_use]
pub fn channel_counts(
    header: &ProfileHeader,
    channels: &[ChannelData],
    calibration: &CalibrationCoefficients,
) -> Vec<Vec<f64>> {
    channels
        .iter()
        .enumerate()
        .map(|(chan, data)| match data {
            ChannelData::Raw(counts) => counts.iter().map(|c| f64::from(*c)).collect(),
            ChannelData::Averaged { sums, overflow } => scale_averaged(
                sums,
                overflow,
                averaged_divisor(header, chan),
                calibration.ds[chan],
            ),
        })
        .collect()
}

/// Compose the record time from the header date/time fields.
///
/// # Errors
/// [Error::InvalidTimestamp] if the fields do not form a valid calendar time.
pub fn record_time(header: &ProfileHeader) -> Result<NaiveDateTime> {
    let invalid = || {
        Error::InvalidTimestamp(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:02}",
            header.year,
            header.month,
            header.day,
            header.hour,
            header.minute,
            header.second,
            header.hundredths
        ))
    };
    if header.year == 0 || header.hundredths >= 100 {
        return Err(invalid());
    }
    NaiveDate::from_ymd_opt(
        i32::from(header.year),
        u32::from(header.month),
        u32::from(header.day),
    )
    .and_then(|date| {
        date.and_hms_micro_opt(
            u32::from(header.hour),
            u32::from(header.minute),
            u32::from(header.second),
            u32::from(header.hundredths) * 10_000,
        )
    })
    .ok_or_else(invalid)
}

/// The 1900 epoch as a [NaiveDateTime].
#[must_use]
pub fn epoch_1900() -> NaiveDateTime {
    NaiveDateTime::UNIX_EPOCH - chrono::TimeDelta::seconds(EPOCH_1900_UNIX_DELTA_SECS)
}

/// Seconds elapsed from 1900-01-01T00:00:00 to `time`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seconds_since_1900(time: NaiveDateTime) -> f64 {
    let elapsed = time - epoch_1900();
    elapsed.num_milliseconds() as f64 / 1000.0
}

/// Inverse of [seconds_since_1900], to millisecond precision. `None` if out of range.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn time_from_seconds_since_1900(secs: f64) -> Option<NaiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let millis = (secs * 1000.0).round() as i64;
    epoch_1900().checked_add_signed(chrono::TimeDelta::try_milliseconds(millis)?)
}

/// Record transmission time in seconds since 1900.
///
/// # Errors
/// See [record_time].
pub fn transmission_timestamp(header: &ProfileHeader) -> Result<f64> {
    Ok(seconds_since_1900(record_time(header)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn header_at(year: u16, month: u16, day: u16, hour: u16, minute: u16) -> ProfileHeader {
        ProfileHeader {
            year,
            month,
            day,
            hour,
            minute,
            ..Default::default()
        }
    }

    fn expected_scaled(value: f64, ds: f64) -> f64 {
        (value.log10() - 2.5) * 8.0 * 65535.0 * ds
    }

    #[test]
    fn scale_averaged_values() {
        let ds = 2.28e-2;
        let zult = scale_averaged(&[100, 200], &[0, 0], 1.0, ds);
        assert_eq!(zult.len(), 2);
        assert!((zult[0] - expected_scaled(100.0, ds)).abs() < 1e-9);
        assert!((zult[1] - expected_scaled(200.0, ds)).abs() < 1e-9);
    }

    #[test]
    fn scale_averaged_zero_sum_is_zero() {
        let zult = scale_averaged(&[0, 1000], &[0, 0], 1.0, 2.28e-2);
        assert_eq!(zult[0], 0.0);
        assert!(zult[1] != 0.0);
    }

    #[test]
    fn scale_averaged_overflow_carries() {
        let ds = 2.25e-2;
        let zult = scale_averaged(&[10], &[1], 4.0, ds);
        let expected = expected_scaled((10.0 + 4_294_967_296.0) / 4.0, ds);
        assert!((zult[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn divisor_branches() {
        let mut header = ProfileHeader {
            num_pings_profile: 6,
            range_samples: [1, 2, 3, 4],
            ..Default::default()
        };
        assert_eq!(averaged_divisor(&header, 2), 3.0);
        header.is_averaged_pings = 1;
        assert_eq!(averaged_divisor(&header, 2), 18.0);
    }

    #[test]
    fn channel_counts_by_kind() {
        let header = ProfileHeader {
            num_channels: 2,
            num_bins: [2, 1, 0, 0],
            range_samples: [1, 1, 1, 1],
            is_averaged_data: [0, 1, 0, 0],
            ..Default::default()
        };
        let channels = vec![
            ChannelData::Raw(vec![3, 65535]),
            ChannelData::Averaged {
                sums: vec![1000],
                overflow: vec![0],
            },
        ];
        let cc = CalibrationCoefficients::default();
        let counts = channel_counts(&header, &channels, &cc);
        assert_eq!(counts[0], vec![3.0, 65535.0]);
        assert!((counts[1][0] - expected_scaled(1000.0, cc.ds[1])).abs() < 1e-9);
    }

    #[test]
    fn timestamp_since_1900() {
        let header = header_at(2014, 8, 17, 12, 55);
        // 2014-08-17T12:55:00Z is unix 1408280100
        assert_eq!(
            transmission_timestamp(&header).unwrap(),
            1_408_280_100.0 + 2_208_988_800.0
        );
    }

    #[test]
    fn timestamp_matches_calendar_difference() {
        let mut header = header_at(2015, 3, 1, 23, 59);
        header.second = 58;
        header.hundredths = 99;

        let start = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let time = NaiveDate::from_ymd_opt(2015, 3, 1)
            .unwrap()
            .and_hms_milli_opt(23, 59, 58, 990)
            .unwrap();
        let expected = (time - start).num_milliseconds() as f64 / 1000.0;

        let got = transmission_timestamp(&header).unwrap();
        assert!((got - expected).abs() < 1e-6, "got {got} expected {expected}");
    }

    #[test]
    fn epoch_is_1900() {
        assert_eq!(epoch_1900().to_string(), "1900-01-01 00:00:00");
        assert_eq!(seconds_since_1900(epoch_1900()), 0.0);
    }

    #[test]
    fn seconds_since_1900_inverse() {
        let header = header_at(2015, 10, 5, 20, 1);
        let secs = transmission_timestamp(&header).unwrap();
        let time = time_from_seconds_since_1900(secs).unwrap();
        assert_eq!(time, record_time(&header).unwrap());
        assert!(time_from_seconds_since_1900(f64::NAN).is_none());
    }

    #[test_case(2014, 13, 1, 0, 0 ; "month out of range")]
    #[test_case(2014, 2, 30, 0, 0 ; "day out of range")]
    #[test_case(2014, 1, 1, 24, 0 ; "hour out of range")]
    #[test_case(2014, 1, 1, 0, 60 ; "minute out of range")]
    #[test_case(0, 1, 1, 0, 0 ; "year zero")]
    fn invalid_timestamp(year: u16, month: u16, day: u16, hour: u16, minute: u16) {
        let header = header_at(year, month, day, hour, minute);
        assert!(matches!(
            transmission_timestamp(&header),
            Err(Error::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn invalid_hundredths() {
        let mut header = header_at(2014, 1, 1, 0, 0);
        header.hundredths = 100;
        assert!(matches!(
            record_time(&header),
            Err(Error::InvalidTimestamp(_))
        ));
    }
}
