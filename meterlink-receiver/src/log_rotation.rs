//! Time-partitioned measurement logs.
//!
//! Each target writes to `<data_path>/<partition key>.<file_extension>`, where
//! the key comes from the frame timestamp and the target's scheme:
//!   `YYYY` → `2021`, `YYYY-MM` → `2021-07`, `YYYYMM` → `202107`,
//!   default → Modified Julian Day number (`59396`).
//! Calendar keys follow the receiver's local time; day numbers are UTC days.
//!
//! A new partition file starts with `Timestamp\t<header>`. Every record line
//! carries the fractional MJD with 6 decimals, whatever the partition scheme.
//! Files are opened in append mode per write and never rewritten.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use meterlink_core::{PartitionScheme, TargetConfig};

use crate::error::{io_err, ReceiverError};

/// MJD of 1970-01-01.
pub const MJD_UNIX_EPOCH: i64 = 40587;
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// What one [`append`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub path: PathBuf,
    /// `true` if this call created the file and wrote its header.
    pub created: bool,
}

/// Append one record for `target` at `seconds` (Unix time).
///
/// Creates the partition file with its header when absent. The data
/// directory itself must already exist.
pub fn append(
    target: &TargetConfig,
    seconds: f64,
    payload: &str,
) -> Result<AppendOutcome, ReceiverError> {
    let path = partition_path(target, seconds)?;
    let created = write_header_if_new(&path, &target.header)?;

    let mut file = OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    file.write_all(format_record(seconds, payload).as_bytes())
        .map_err(|e| io_err(&path, e))?;

    Ok(AppendOutcome { path, created })
}

/// `<data_path>/<key>.<file_extension>`
pub fn partition_path(target: &TargetConfig, seconds: f64) -> Result<PathBuf, ReceiverError> {
    let key = partition_key(target.partition, seconds)?;
    Ok(target
        .data_path
        .join(format!("{key}.{}", target.file_extension)))
}

/// Partition key for `seconds` under `scheme`. Calendar schemes use the
/// receiver's local time zone.
pub fn partition_key(scheme: PartitionScheme, seconds: f64) -> Result<String, ReceiverError> {
    partition_key_in(scheme, seconds, &Local)
}

/// [`partition_key`] with calendar keys taken in `tz`.
pub fn partition_key_in<Tz>(
    scheme: PartitionScheme,
    seconds: f64,
    tz: &Tz,
) -> Result<String, ReceiverError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let format = match scheme {
        PartitionScheme::ModifiedJulianDay => {
            return mjd_day(seconds)
                .map(|day| day.to_string())
                .ok_or(ReceiverError::TimestampOutOfRange(seconds));
        }
        PartitionScheme::Year => "%Y",
        PartitionScheme::YearMonth => "%Y-%m",
        PartitionScheme::YearMonthCompact => "%Y%m",
    };
    let whole = floor_i64(seconds).ok_or(ReceiverError::TimestampOutOfRange(seconds))?;
    let datetime = tz
        .timestamp_opt(whole, 0)
        .earliest()
        .ok_or(ReceiverError::TimestampOutOfRange(seconds))?;
    Ok(datetime.format(format).to_string())
}

/// Integer Modified Julian Day containing `seconds`, if representable.
pub fn mjd_day(seconds: f64) -> Option<i64> {
    floor_i64(seconds / SECONDS_PER_DAY)?.checked_add(MJD_UNIX_EPOCH)
}

fn floor_i64(value: f64) -> Option<i64> {
    let whole = value.floor();
    if whole.is_finite() && whole >= i64::MIN as f64 && whole < i64::MAX as f64 {
        Some(whole as i64)
    } else {
        None
    }
}

pub fn fractional_mjd(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY + MJD_UNIX_EPOCH as f64
}

/// `<fractional MJD, 6 decimals>\t<payload>\n`
pub fn format_record(seconds: f64, payload: &str) -> String {
    format!("{:.6}\t{payload}\n", fractional_mjd(seconds))
}

/// Create `path` holding only the header line. Returns `false` if the file
/// already existed, in which case it is left untouched.
fn write_header_if_new(path: &Path, header: &str) -> Result<bool, ReceiverError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(io_err(path, err)),
    };
    if let Err(err) = file.write_all(format!("Timestamp\t{header}\n").as_bytes()) {
        // Leave no headerless file behind for the next append to extend.
        let _ = fs::remove_file(path);
        return Err(io_err(path, err));
    }
    tracing::info!(path = %path.display(), "created partition file");
    Ok(true)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use meterlink_core::SenderName;
    use rstest::rstest;
    use tempfile::TempDir;

    /// 2021-07-01T00:00:00Z
    const JULY_2021: f64 = 1_625_097_600.0;

    fn target(dir: &TempDir, partition: PartitionScheme) -> TargetConfig {
        TargetConfig {
            local_name: "gasmeter".to_string(),
            remote_name: SenderName::from("METER1"),
            header: "Volume".to_string(),
            data_path: dir.path().to_path_buf(),
            file_extension: "dat".to_string(),
            partition,
        }
    }

    #[rstest]
    #[case(PartitionScheme::ModifiedJulianDay, 86400.0, "40588")]
    #[case(PartitionScheme::ModifiedJulianDay, 0.0, "40587")]
    #[case(PartitionScheme::ModifiedJulianDay, 86399.999, "40587")]
    #[case(PartitionScheme::ModifiedJulianDay, -1.0, "40586")]
    #[case(PartitionScheme::ModifiedJulianDay, JULY_2021, "59396")]
    #[case(PartitionScheme::Year, JULY_2021, "2021")]
    #[case(PartitionScheme::YearMonth, JULY_2021, "2021-07")]
    #[case(PartitionScheme::YearMonthCompact, JULY_2021, "202107")]
    #[case(PartitionScheme::YearMonth, JULY_2021 - 0.5, "2021-06")]
    fn partition_keys_in_utc(
        #[case] scheme: PartitionScheme,
        #[case] seconds: f64,
        #[case] key: &str,
    ) {
        assert_eq!(partition_key_in(scheme, seconds, &Utc).unwrap(), key);
    }

    #[rstest]
    #[case(PartitionScheme::Year, "2022")]
    #[case(PartitionScheme::YearMonth, "2022-01")]
    #[case(PartitionScheme::YearMonthCompact, "202201")]
    #[case(PartitionScheme::ModifiedJulianDay, "59579")]
    fn calendar_keys_follow_receiver_time_zone(
        #[case] scheme: PartitionScheme,
        #[case] key: &str,
    ) {
        // 2021-12-31T22:30:00Z is already New Year two hours east of Greenwich.
        let new_year_eve = 1_640_989_800.0;
        let utc_plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            partition_key_in(scheme, new_year_eve, &utc_plus_two).unwrap(),
            key
        );
    }

    #[test]
    fn default_calendar_keys_use_local_time() {
        // Mid-month noon UTC is the same month in every zone.
        let mid_july = JULY_2021 + 14.5 * SECONDS_PER_DAY;
        assert_eq!(
            partition_key(PartitionScheme::YearMonth, mid_july).unwrap(),
            partition_key_in(PartitionScheme::YearMonth, mid_july, &Local).unwrap()
        );
        assert_eq!(
            partition_key(PartitionScheme::YearMonth, mid_july).unwrap(),
            "2021-07"
        );
    }

    #[rstest]
    #[case(PartitionScheme::ModifiedJulianDay, 1e300)]
    #[case(PartitionScheme::ModifiedJulianDay, -1e300)]
    #[case(PartitionScheme::ModifiedJulianDay, 9.3e23)]
    #[case(PartitionScheme::Year, 1e300)]
    #[case(PartitionScheme::YearMonth, -1e300)]
    fn out_of_range_timestamp_is_an_error(
        #[case] scheme: PartitionScheme,
        #[case] seconds: f64,
    ) {
        assert!(matches!(
            partition_key(scheme, seconds),
            Err(ReceiverError::TimestampOutOfRange(_))
        ));
    }

    #[test]
    fn record_uses_fractional_mjd_with_six_decimals() {
        assert_eq!(format_record(86400.0, "12.34"), "40588.000000\t12.34\n");
        assert_eq!(format_record(43200.0, "1,2"), "40587.500000\t1,2\n");
    }

    #[test]
    fn first_append_creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir, PartitionScheme::Year);

        let outcome = append(&target, JULY_2021, "12.34").unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.path, dir.path().join("2021.dat"));
        assert_eq!(
            fs::read_to_string(&outcome.path).unwrap(),
            "Timestamp\tVolume\n59396.000000\t12.34\n"
        );
    }

    #[test]
    fn header_is_written_exactly_once() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir, PartitionScheme::Year);

        append(&target, JULY_2021, "1").unwrap();
        let second = append(&target, JULY_2021 + 3600.0, "2").unwrap();
        assert!(!second.created);

        let contents = fs::read_to_string(&second.path).unwrap();
        assert_eq!(contents.matches("Timestamp").count(), 1);
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with("Timestamp\tVolume\n"));
    }

    #[test]
    fn existing_file_without_header_is_only_appended_to() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir, PartitionScheme::ModifiedJulianDay);
        let path = dir.path().join("40588.dat");
        fs::write(&path, "legacy\n").unwrap();

        append(&target, 86400.0, "3").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "legacy\n40588.000000\t3\n"
        );
    }

    #[test]
    fn records_split_across_day_partitions() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir, PartitionScheme::ModifiedJulianDay);

        let a = append(&target, 86399.0, "a").unwrap();
        let b = append(&target, 86400.0, "b").unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(b.path, dir.path().join("40588.dat"));
    }

    #[test]
    fn missing_data_dir_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let mut target = target(&dir, PartitionScheme::Year);
        target.data_path = dir.path().join("missing");

        let err = append(&target, JULY_2021, "1").unwrap_err();
        assert!(matches!(err, ReceiverError::Io { .. }), "got: {err}");
        assert!(!target.data_path.exists());
    }
}
