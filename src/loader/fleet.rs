//! Fishing fleet reference data loading.

use super::{csv_open_error, parse_mmsi, LoaderError};
use crate::types::{FleetRegistry, GearType};
use std::path::Path;
use tracing::{info, warn};

/// Load the per-gear fleet CSVs (`<gear>.csv`, column `mmsi` plus optional
/// `flag` / `length_m`) from a directory into a [`FleetRegistry`].
///
/// Missing gear files are tolerated with a warning; the registry is simply
/// sparser. An unreadable file that exists is fatal.
pub fn load_fleet_dir(dir: &Path) -> Result<FleetRegistry, LoaderError> {
    let mut registry = FleetRegistry::new();

    for gear in GearType::ALL {
        let path = dir.join(format!("{}.csv", gear.file_stem()));
        if !path.exists() {
            warn!(path = %path.display(), gear = %gear, "fleet dataset missing, skipping");
            continue;
        }

        let mut reader =
            csv::Reader::from_path(&path).map_err(|source| csv_open_error(&path, source))?;
        let headers = reader
            .headers()
            .map_err(|source| LoaderError::Csv {
                path: path.clone(),
                message: source.to_string(),
            })?
            .clone();
        let mmsi_column = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case("mmsi"));
        let Some(mmsi_column) = mmsi_column else {
            warn!(path = %path.display(), "fleet dataset has no mmsi column, skipping");
            continue;
        };

        let mut loaded = 0usize;
        let mut dropped = 0usize;
        for record in reader.records() {
            let mmsi = record
                .ok()
                .as_ref()
                .and_then(|r| r.get(mmsi_column))
                .and_then(parse_mmsi);
            match mmsi {
                Some(mmsi) => {
                    registry.insert(mmsi, gear);
                    loaded += 1;
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(path = %path.display(), dropped, "dropped malformed fleet rows");
        }
        info!(gear = %gear, vessels = loaded, "loaded fleet dataset");
    }

    info!(vessels = registry.vessel_count(), "fleet registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_present_gear_files_and_skips_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("trawlers.csv"),
            "mmsi,flag,length_m\n100000001,ESP,45.0\n100000002,,\nnot-a-vessel,,\n",
        )
        .expect("write trawlers");
        fs::write(
            dir.path().join("fixed_gear.csv"),
            "mmsi\n100000001\n",
        )
        .expect("write fixed_gear");

        let registry = load_fleet_dir(dir.path()).expect("loads");
        assert_eq!(registry.vessel_count(), 2);
        assert!(registry.is_fishing_vessel(100_000_001));
        let gear = registry.gear_for(100_000_001).expect("gear");
        assert_eq!(gear.len(), 2, "vessel belongs to two fleets");
        assert!(!registry.is_fishing_vessel(999));
    }

    #[test]
    fn empty_directory_yields_empty_registry() {
        let dir = tempfile::tempdir().expect("temp dir");
        let registry = load_fleet_dir(dir.path()).expect("loads");
        assert!(registry.is_empty());
    }
}
