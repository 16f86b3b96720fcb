//! Region model and the durable region store.
//!
//! A region is one operator-defined parking slot polygon. The store holds the
//! authoritative ordered list; occupancy snapshots are always derived from it.
//! Persisted format: a JSON array of `{"code": "P1", "points": [[x,y],...]}`
//! entries, no version field.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LotError;
use crate::geometry::Point;

/// Minimum vertex count for a committable region.
pub const MIN_REGION_POINTS: usize = 3;

/// One operator-defined parking slot polygon.
///
/// `points` order matters: consecutive pairs form edges and last-to-first
/// closes the polygon. Winding direction carries no meaning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub points: Vec<Point>,
}

/// Validate a full region list as one unit: unique codes, at least
/// [`MIN_REGION_POINTS`] vertices each. Nothing is accepted if any entry
/// fails.
pub fn validate_regions(regions: &[Region]) -> Result<(), LotError> {
    let mut seen = HashSet::new();
    for region in regions {
        if region.points.len() < MIN_REGION_POINTS {
            return Err(LotError::InvalidRegion {
                code: region.code.clone(),
                reason: format!(
                    "{} points, at least {} required",
                    region.points.len(),
                    MIN_REGION_POINTS
                ),
            });
        }
        if !seen.insert(region.code.clone()) {
            return Err(LotError::InvalidRegion {
                code: region.code.clone(),
                reason: "duplicate code".to_string(),
            });
        }
    }
    Ok(())
}

/// Durable storage for the region list.
pub trait RegionStore {
    /// Read the persisted region list.
    ///
    /// `StoreMissing` when nothing has been persisted yet; `StoreCorrupt`
    /// when the content cannot be parsed or fails structural validation.
    fn load(&self) -> Result<Vec<Region>, LotError>;

    /// Atomically replace the persisted list. Overwrites unconditionally;
    /// on failure the prior persisted content remains intact.
    fn save(&mut self, regions: &[Region]) -> Result<(), LotError>;

    /// Validate then persist. No partial update on failure.
    fn replace_all(&mut self, regions: &[Region]) -> Result<(), LotError> {
        validate_regions(regions)?;
        self.save(regions)
    }
}

/// File-backed store using the JSON wire format.
///
/// Saves write to a sibling temp file and rename over the target, so a
/// partial write never clobbers the previous list.
pub struct JsonFileRegionStore {
    path: PathBuf,
}

impl JsonFileRegionStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegionStore for JsonFileRegionStore {
    fn load(&self) -> Result<Vec<Region>, LotError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LotError::StoreMissing)
            }
            Err(err) => {
                return Err(LotError::StoreCorrupt(format!(
                    "read {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };
        let regions: Vec<Region> = serde_json::from_str(&raw).map_err(|err| {
            LotError::StoreCorrupt(format!("parse {}: {}", self.path.display(), err))
        })?;
        validate_regions(&regions).map_err(|err| LotError::StoreCorrupt(err.to_string()))?;
        Ok(regions)
    }

    fn save(&mut self, regions: &[Region]) -> Result<(), LotError> {
        let json = serde_json::to_string_pretty(regions)
            .map_err(|err| LotError::StoreWriteFailed(format!("encode regions: {}", err)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .map_err(|err| LotError::StoreWriteFailed(format!("write {}: {}", tmp.display(), err)))?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            LotError::StoreWriteFailed(format!(
                "rename {} over {}: {}",
                tmp.display(),
                self.path.display(),
                err
            ))
        })?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegionStore {
    regions: Option<Vec<Region>>,
}

impl InMemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a persisted list.
    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self {
            regions: Some(regions),
        }
    }
}

impl RegionStore for InMemoryRegionStore {
    fn load(&self) -> Result<Vec<Region>, LotError> {
        match &self.regions {
            Some(regions) => Ok(regions.clone()),
            None => Err(LotError::StoreMissing),
        }
    }

    fn save(&mut self, regions: &[Region]) -> Result<(), LotError> {
        self.regions = Some(regions.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(code: &str, points: &[(i32, i32)]) -> Region {
        Region {
            code: code.to_string(),
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    #[test]
    fn validate_rejects_short_polygon() {
        let regions = vec![region("P1", &[(0, 0), (1, 0)])];
        assert!(matches!(
            validate_regions(&regions),
            Err(LotError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_codes() {
        let regions = vec![
            region("P1", &[(0, 0), (1, 0), (1, 1)]),
            region("P1", &[(5, 5), (6, 5), (6, 6)]),
        ];
        assert!(matches!(
            validate_regions(&regions),
            Err(LotError::InvalidRegion { code, .. }) if code == "P1"
        ));
    }

    #[test]
    fn in_memory_store_starts_missing() {
        let store = InMemoryRegionStore::new();
        assert!(matches!(store.load(), Err(LotError::StoreMissing)));
    }

    #[test]
    fn replace_all_rejects_invalid_without_partial_update() {
        let mut store =
            InMemoryRegionStore::with_regions(vec![region("P1", &[(0, 0), (1, 0), (1, 1)])]);
        let bad = vec![
            region("P2", &[(0, 0), (1, 0), (1, 1)]),
            region("P3", &[(0, 0)]),
        ];
        assert!(store.replace_all(&bad).is_err());
        let kept = store.load().expect("prior content intact");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].code, "P1");
    }

    #[test]
    fn region_points_serialize_as_pairs() {
        let r = region("P1", &[(3, 4), (5, 6), (7, 8)]);
        let json = serde_json::to_string(&r).expect("serialize");
        assert_eq!(json, r#"{"code":"P1","points":[[3,4],[5,6],[7,8]]}"#);
        let back: Region = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, r);
    }
}
