//! Record Loading Module (C1)
//!
//! Normalizes heterogeneous AIS position reports into the [`Fix`] schema and
//! exposes the two iteration modes the pipeline needs: the full fix stream
//! (proximity index, network analyzer) and per-MMSI time-ordered slices
//! (gap detector, comprehensive evaluator).
//!
//! Two CSV dialects are recognized:
//! - NOAA AIS: `MMSI, BaseDateTime, LAT, LON, SOG, COG, VesselName, VesselType`
//! - Global Fishing Watch tracks: `mmsi, timestamp (unix), lat, lon, speed,
//!   course, distance_from_shore, is_fishing`
//!
//! Malformed rows are dropped and counted; an unreadable file or a file that
//! yields zero valid rows is fatal.

mod ais;
mod fleet;
mod mpa;

pub use ais::{load_ais_csv, FixStore, LoadReport};
pub use fleet::load_fleet_dir;
pub use mpa::{load_mpa_csv, Mpa, MpaLookup, MpaTable};

use std::path::PathBuf;
use thiserror::Error;

/// Loader errors. Row-level problems are not errors; they are dropped and
/// counted in [`LoadReport`].
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {}: {message}", path.display())]
    Csv { path: PathBuf, message: String },

    #[error("{} contains no usable rows ({dropped} dropped)", path.display())]
    Empty { path: PathBuf, dropped: usize },

    #[error("{} has an unrecognized header (need NOAA AIS or GFW track columns)", path.display())]
    UnknownDialect { path: PathBuf },
}

/// Classify a `csv::Error` from opening a file into the loader taxonomy:
/// I/O problems are fatal with the path named, anything else is a CSV error.
pub(crate) fn csv_open_error(path: &std::path::Path, source: csv::Error) -> LoaderError {
    if source.is_io_error() {
        match source.into_kind() {
            csv::ErrorKind::Io(io) => LoaderError::Io { path: path.to_path_buf(), source: io },
            other => LoaderError::Csv {
                path: path.to_path_buf(),
                message: format!("{other:?}"),
            },
        }
    } else {
        LoaderError::Csv {
            path: path.to_path_buf(),
            message: source.to_string(),
        }
    }
}

/// Parse an MMSI that may be serialized as an integer or a float
/// (Global Fishing Watch exports float-format the column).
pub(crate) fn parse_mmsi(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<u32>() {
        return Some(v);
    }
    let as_float: f64 = trimmed.parse().ok()?;
    let integral = as_float.is_finite()
        && as_float >= 0.0
        && as_float <= f64::from(u32::MAX)
        && as_float.fract() == 0.0;
    if integral {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mmsi = as_float as u32;
        Some(mmsi)
    } else {
        None
    }
}

/// Parse an optional float column; empty cells and NaN become `None`.
pub(crate) fn parse_optional_f32(raw: Option<&str>) -> Option<f32> {
    let value: f32 = raw?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmsi_accepts_integer_and_float_forms() {
        assert_eq!(parse_mmsi("367001234"), Some(367_001_234));
        assert_eq!(parse_mmsi("367001234.0"), Some(367_001_234));
        assert_eq!(parse_mmsi(" 123 "), Some(123));
        assert_eq!(parse_mmsi("123.5"), None);
        assert_eq!(parse_mmsi("-5"), None);
        assert_eq!(parse_mmsi(""), None);
        assert_eq!(parse_mmsi("not-a-number"), None);
    }

    #[test]
    fn optional_floats_reject_nan() {
        assert_eq!(parse_optional_f32(Some("3.5")), Some(3.5));
        assert_eq!(parse_optional_f32(Some("NaN")), None);
        assert_eq!(parse_optional_f32(Some("")), None);
        assert_eq!(parse_optional_f32(None), None);
    }
}
