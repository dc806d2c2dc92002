//! Marine Protected Area reference data and the containment predicate.

use super::{csv_open_error, LoaderError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Point-in-MPA predicate consumed by the comprehensive risk evaluator.
///
/// The pipeline only ever asks this one question of the MPA data; everything
/// else about the table is descriptive metadata.
pub trait MpaLookup {
    fn in_mpa(&self, lat: f64, lon: f64) -> bool;
}

/// One marine protected area row from the WDPA table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mpa {
    pub wdpa_id: u64,
    pub name: String,
    pub designation: Option<String>,
    pub iucn_category: Option<String>,
    /// WDPA MARINE code: 1 = marine only, 2 = coastal/mixed
    pub marine: u8,
}

/// The loaded MPA table. May be empty when the dataset is absent.
#[derive(Debug, Clone, Default)]
pub struct MpaTable {
    areas: Vec<Mpa>,
}

impl MpaTable {
    pub fn areas(&self) -> &[Mpa] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

impl MpaLookup for MpaTable {
    /// The WDPA CSV export carries no polygon geometry, so containment
    /// cannot be answered from this table; the honest answer is `false`.
    ///
    /// TODO: spatial join against the WDPA polygon shapefiles so this
    /// predicate reflects real MPA boundaries.
    fn in_mpa(&self, _lat: f64, _lon: f64) -> bool {
        false
    }
}

/// Load the WDPA marine CSV, keeping rows with `MARINE ∈ {1, 2}`.
///
/// Malformed rows are dropped and counted. An absent file is not an error
/// at this layer; callers decide whether to run without MPA data.
pub fn load_mpa_csv(path: &Path) -> Result<MpaTable, LoaderError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| csv_open_error(path, source))?;
    let headers = reader
        .headers()
        .map_err(|source| LoaderError::Csv {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?
        .clone();

    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim_start_matches('\u{feff}').to_ascii_uppercase(), i))
        .collect();

    let mut areas = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let Ok(record) = record else {
            dropped += 1;
            continue;
        };
        let field = |name: &str| columns.get(name).and_then(|&i| record.get(i)).map(str::trim);

        let marine = field("MARINE").and_then(|raw| raw.parse::<u8>().ok());
        let Some(marine @ (1 | 2)) = marine else {
            // terrestrial or unlabeled rows are filtered, not malformed
            continue;
        };

        let wdpa_id = field("WDPAID").and_then(|raw| {
            raw.parse::<u64>().ok().or_else(|| {
                let as_float: f64 = raw.parse().ok()?;
                if !(as_float.is_finite() && as_float >= 0.0) {
                    return None;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let id = as_float as u64;
                Some(id)
            })
        });
        let name = field("NAME").filter(|s| !s.is_empty());
        let (Some(wdpa_id), Some(name)) = (wdpa_id, name) else {
            dropped += 1;
            continue;
        };

        areas.push(Mpa {
            wdpa_id,
            name: name.to_string(),
            designation: field("DESIG_ENG").filter(|s| !s.is_empty()).map(ToString::to_string),
            iucn_category: field("IUCN_CAT").filter(|s| !s.is_empty()).map(ToString::to_string),
            marine,
        });
    }

    if dropped > 0 {
        warn!(path = %path.display(), dropped, "dropped malformed MPA rows");
    }
    info!(path = %path.display(), areas = areas.len(), "loaded marine protected areas");
    Ok(MpaTable { areas })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn filters_to_marine_rows() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            b"WDPAID,NAME,DESIG_ENG,IUCN_CAT,MARINE\n\
              101.0,Great Reef,Marine Park,II,1\n\
              102,Coastal Zone,Reserve,,2\n\
              103,Inland Forest,National Park,IV,0\n\
              ,Nameless,Reserve,,1\n",
        )
        .expect("write csv");

        let table = load_mpa_csv(file.path()).expect("loads");
        assert_eq!(table.len(), 2);
        assert_eq!(table.areas()[0].wdpa_id, 101);
        assert_eq!(table.areas()[0].name, "Great Reef");
        assert_eq!(table.areas()[1].marine, 2);
        assert_eq!(table.areas()[1].iucn_category, None);
    }

    #[test]
    fn table_predicate_is_a_truthful_stub() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"WDPAID,NAME,DESIG_ENG,IUCN_CAT,MARINE\n1,Reef,Park,II,1\n")
            .expect("write csv");
        let table = load_mpa_csv(file.path()).expect("loads");
        // No geometry is loaded, so no point can be inside an MPA.
        assert!(!table.in_mpa(0.0, 0.0));
        assert!(!table.in_mpa(-45.0, 170.0));
    }

    #[test]
    fn empty_table_is_usable() {
        let table = MpaTable::default();
        assert!(table.is_empty());
        assert!(!table.in_mpa(10.0, 10.0));
    }
}
