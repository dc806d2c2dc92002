//! AIS position report loading and the `FixStore`.

use super::{csv_open_error, parse_mmsi, parse_optional_f32, LoaderError};
use crate::types::{FishingStatus, Fix};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use tracing::{info, warn};

/// Counts from one loading pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub dropped: usize,
}

/// Which header dialect a CSV uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Noaa,
    GlobalFishingWatch,
}

/// All fixes of a run, stably sorted by `(mmsi, timestamp)`, with a
/// per-vessel slice index. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct FixStore {
    fixes: Vec<Fix>,
    vessel_ranges: Vec<(u32, Range<usize>)>,
    range_by_mmsi: HashMap<u32, usize>,
}

impl FixStore {
    /// Build a store from unordered fixes. The sort is stable, so records
    /// with identical `(mmsi, timestamp)` keep their input order.
    pub fn from_fixes(mut fixes: Vec<Fix>) -> Self {
        fixes.sort_by(|a, b| (a.mmsi, a.timestamp).cmp(&(b.mmsi, b.timestamp)));

        let mut vessel_ranges: Vec<(u32, Range<usize>)> = Vec::new();
        let mut range_by_mmsi = HashMap::new();
        let mut start = 0;
        for i in 1..=fixes.len() {
            let boundary = i == fixes.len() || fixes[i].mmsi != fixes[start].mmsi;
            if boundary {
                let mmsi = fixes[start].mmsi;
                range_by_mmsi.insert(mmsi, vessel_ranges.len());
                vessel_ranges.push((mmsi, start..i));
                start = i;
            }
        }

        Self { fixes, vessel_ranges, range_by_mmsi }
    }

    /// The full fix stream, sorted by `(mmsi, timestamp)`.
    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    /// Per-vessel time-ordered slices, in ascending MMSI order.
    pub fn vessels(&self) -> impl Iterator<Item = (u32, &[Fix])> + '_ {
        self.vessel_ranges
            .iter()
            .map(move |(mmsi, range)| (*mmsi, &self.fixes[range.clone()]))
    }

    /// Time-ordered fixes of one vessel; empty when the vessel is unknown.
    pub fn vessel_fixes(&self, mmsi: u32) -> &[Fix] {
        self.range_by_mmsi
            .get(&mmsi)
            .map_or(&[], |&i| &self.fixes[self.vessel_ranges[i].1.clone()])
    }

    pub fn vessel_count(&self) -> usize {
        self.vessel_ranges.len()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

/// Load one AIS CSV, auto-detecting the dialect from its header.
///
/// Malformed rows (unparseable MMSI/timestamp, NaN or out-of-range
/// coordinates) are dropped and counted. Returns the surviving fixes and a
/// [`LoadReport`]; zero survivors is an error.
pub fn load_ais_csv(path: &Path) -> Result<(Vec<Fix>, LoadReport), LoaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_open_error(path, source))?;

    let headers = reader
        .headers()
        .map_err(|source| LoaderError::Csv {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?
        .clone();
    let columns = header_index(&headers);

    let dialect = if columns.contains_key("basedatetime") {
        Dialect::Noaa
    } else if columns.contains_key("timestamp") && columns.contains_key("mmsi") {
        Dialect::GlobalFishingWatch
    } else {
        return Err(LoaderError::UnknownDialect { path: path.to_path_buf() });
    };

    let mut fixes = Vec::new();
    let mut report = LoadReport::default();

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                report.dropped += 1;
                continue;
            }
        };
        match parse_row(&record, &columns, dialect) {
            Some(fix) => {
                fixes.push(fix);
                report.loaded += 1;
            }
            None => report.dropped += 1,
        }
    }

    if report.dropped > 0 {
        warn!(
            path = %path.display(),
            dropped = report.dropped,
            "dropped malformed AIS rows"
        );
    }
    if fixes.is_empty() {
        return Err(LoaderError::Empty {
            path: path.to_path_buf(),
            dropped: report.dropped,
        });
    }
    info!(path = %path.display(), loaded = report.loaded, "loaded AIS records");
    Ok((fixes, report))
}

/// Case-insensitive header lookup; strips a UTF-8 BOM from the first column
/// (the WDPA and some NOAA exports carry one).
fn header_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim_start_matches('\u{feff}').to_ascii_lowercase(), i))
        .collect()
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &HashMap<String, usize>,
    dialect: Dialect,
) -> Option<Fix> {
    let field = |name: &str| -> Option<&str> {
        columns.get(name).and_then(|&i| record.get(i)).map(str::trim)
    };
    let non_empty = |name: &str| -> Option<String> {
        field(name).filter(|s| !s.is_empty()).map(ToString::to_string)
    };

    let (mmsi, timestamp) = match dialect {
        Dialect::Noaa => {
            let mmsi = parse_mmsi(field("mmsi")?)?;
            let timestamp = parse_timestamp(field("basedatetime")?)?;
            (mmsi, timestamp)
        }
        Dialect::GlobalFishingWatch => {
            let mmsi = parse_mmsi(field("mmsi")?)?;
            let timestamp = parse_unix_timestamp(field("timestamp")?)?;
            (mmsi, timestamp)
        }
    };

    let lat: f32 = field("lat")?.parse().ok()?;
    let lon: f32 = field("lon")?.parse().ok()?;
    if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon)
    {
        return None;
    }

    let (speed, course) = match dialect {
        Dialect::Noaa => (
            parse_optional_f32(field("sog")),
            parse_optional_f32(field("cog")),
        ),
        Dialect::GlobalFishingWatch => (
            parse_optional_f32(field("speed")),
            parse_optional_f32(field("course")),
        ),
    };

    let is_fishing = field("is_fishing")
        .and_then(|raw| raw.parse::<f32>().ok())
        .map_or(FishingStatus::Unknown, |v| {
            if !v.is_finite() || v < 0.0 {
                FishingStatus::Unknown
            } else if v == 0.0 {
                FishingStatus::NotFishing
            } else {
                FishingStatus::Fishing
            }
        });

    Some(Fix {
        mmsi,
        timestamp,
        lat,
        lon,
        speed: speed.filter(|s| *s >= 0.0),
        course,
        vessel_name: non_empty("vesselname"),
        vessel_type: non_empty("vesseltype").or_else(|| non_empty("vessel_type")),
        is_fishing,
        distance_from_shore_m: parse_optional_f32(field("distance_from_shore")),
    })
}

/// Parse NOAA `BaseDateTime` values: RFC 3339, or the naive
/// `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS` forms, all treated as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Parse a unix-seconds timestamp, integer or float formatted.
fn parse_unix_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = raw.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let whole_seconds = seconds as i64;
    Utc.timestamp_opt(whole_seconds, 0).single()
}
