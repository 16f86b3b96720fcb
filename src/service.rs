//! Process-wide mutable occupancy state and the analysis pipeline.
//!
//! All mutable service state (region list, last-known occupancy, store
//! handle) lives behind one mutex, so a reconcile read-modify-write can
//! never interleave with a concurrent analysis or region edit and
//! classification always sees a stable region list. The detector has its own
//! lock: inference is the one slow step and must not block overlay or region
//! reads.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::BackendClient;
use crate::classify::classify;
use crate::detect::{filter_vehicles, VehicleDetector};
use crate::error::LotError;
use crate::geometry::Point;
use crate::occupancy::{diff_occupancy, OccupancySnapshot};
use crate::region::{Region, RegionStore};

/// Health flags for the service surface.
#[derive(Clone, Copy, Debug)]
pub struct HealthStatus {
    pub model_loaded: bool,
    pub regions_loaded: bool,
}

/// One region merged with its latest known occupancy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayRegion {
    pub code: String,
    pub points: Vec<Point>,
    pub is_occupied: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LastDetection {
    pub vehicles_detected: usize,
    pub timestamp: Option<String>,
}

/// Renderable snapshot for a live overlay client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    pub regions: Vec<OverlayRegion>,
    pub last_detection: LastDetection,
}

/// Everything one analysis pass produced.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub snapshot: OccupancySnapshot,
    /// Regions whose occupancy changed versus the previous pass.
    pub changed: Vec<(String, bool)>,
    /// Per-region backend push failures; empty when no backend is configured
    /// or every write landed.
    pub push_failures: Vec<(String, anyhow::Error)>,
}

struct LotState {
    regions: Vec<Region>,
    last_known: OccupancySnapshot,
    store: Box<dyn RegionStore + Send>,
}

/// The single owner of mutable occupancy state.
///
/// Initialized once at service start from the persisted region list;
/// flushed back on clean shutdown.
pub struct LotService {
    inner: Mutex<LotState>,
    detector: Option<Mutex<Box<dyn VehicleDetector>>>,
    backend: Option<BackendClient>,
    vehicle_classes: Vec<u32>,
    confidence_threshold: f32,
}

impl LotService {
    /// Open the service state, loading persisted regions from the store.
    /// A store with no persisted data yet yields an empty lot.
    pub fn open(
        store: Box<dyn RegionStore + Send>,
        detector: Option<Box<dyn VehicleDetector>>,
        backend: Option<BackendClient>,
        vehicle_classes: Vec<u32>,
        confidence_threshold: f32,
    ) -> Result<Self> {
        let regions = match store.load() {
            Ok(regions) => {
                log::info!("loaded {} parking regions", regions.len());
                regions
            }
            Err(LotError::StoreMissing) => {
                log::warn!("no persisted regions yet; starting with an empty lot");
                Vec::new()
            }
            Err(err) => return Err(err).context("load persisted regions"),
        };

        Ok(Self {
            inner: Mutex::new(LotState {
                regions,
                last_known: OccupancySnapshot::default(),
                store,
            }),
            detector: detector.map(Mutex::new),
            backend,
            vehicle_classes,
            confidence_threshold,
        })
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, LotState>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("lot state lock poisoned"))
    }

    pub fn health(&self) -> Result<HealthStatus> {
        let inner = self.lock_inner()?;
        Ok(HealthStatus {
            model_loaded: self.detector.is_some(),
            regions_loaded: !inner.regions.is_empty(),
        })
    }

    /// Run the full analysis pipeline on one encoded image.
    ///
    /// Decode and detection happen outside the state lock; classify, diff and
    /// the wholesale replacement of last-known occupancy happen under one
    /// lock acquisition. The backend push runs after the lock is released:
    /// push failures are reported, never rolled back into local state, and
    /// the locally computed occupancy is always returned.
    pub fn analyze(&self, image_bytes: &[u8]) -> Result<AnalysisOutcome> {
        let detector = self
            .detector
            .as_ref()
            .ok_or(LotError::DetectionUnavailable)?;

        let image = image::load_from_memory(image_bytes).context("decode image payload")?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.into_raw();

        let raw = {
            let mut guard = detector
                .lock()
                .map_err(|_| anyhow!("detector lock poisoned"))?;
            match guard.detect(&pixels, width, height) {
                Ok(raw) => raw,
                Err(err) => {
                    log::error!("detector failed: {:#}", err);
                    return Err(LotError::DetectionUnavailable.into());
                }
            }
        };
        let vehicles = filter_vehicles(raw, &self.vehicle_classes, self.confidence_threshold);
        log::info!("detected {} vehicles", vehicles.len());

        let timestamp = crate::local_timestamp();
        let (snapshot, changed) = {
            let mut inner = self.lock_inner()?;
            let slot_status = classify(&inner.regions, &vehicles);
            let snapshot = OccupancySnapshot::new(slot_status, vehicles.len(), timestamp);
            let changed = diff_occupancy(&snapshot.slot_status, &inner.last_known.slot_status);
            inner.last_known = snapshot.clone();
            (snapshot, changed)
        };

        let push_failures = match &self.backend {
            Some(backend) if !changed.is_empty() => backend.push_changes(&changed),
            _ => Vec::new(),
        };
        for (code, err) in &push_failures {
            log::warn!("backend push failed for {}: {:#}", code, err);
        }

        Ok(AnalysisOutcome {
            snapshot,
            changed,
            push_failures,
        })
    }

    /// Current region list, in store order.
    pub fn regions(&self) -> Result<Vec<Region>> {
        Ok(self.lock_inner()?.regions.clone())
    }

    /// Validate, persist and adopt a replacement region list.
    ///
    /// The store write happens first; an invalid list or failed write leaves
    /// the in-memory list untouched.
    pub fn set_regions(&self, regions: Vec<Region>) -> Result<usize> {
        let mut inner = self.lock_inner()?;
        inner.store.replace_all(&regions)?;
        let count = regions.len();
        inner.regions = regions;
        log::info!("region list replaced: {} regions", count);
        Ok(count)
    }

    /// Left-join the region list against the latest known occupancy.
    ///
    /// Regions without a snapshot entry (added since the last analysis, or
    /// never analyzed) render as empty. Read-only.
    pub fn overlay(&self) -> Result<OverlaySnapshot> {
        let inner = self.lock_inner()?;
        let regions = inner
            .regions
            .iter()
            .map(|region| OverlayRegion {
                code: region.code.clone(),
                points: region.points.clone(),
                is_occupied: inner
                    .last_known
                    .slot_status
                    .get(&region.code)
                    .copied()
                    .unwrap_or(false),
            })
            .collect();
        Ok(OverlaySnapshot {
            regions,
            last_detection: LastDetection {
                vehicles_detected: inner.last_known.vehicles_detected,
                timestamp: inner.last_known.timestamp.clone(),
            },
        })
    }

    /// Latest slot status, for callers that want the raw map.
    pub fn last_known(&self) -> Result<BTreeMap<String, bool>> {
        Ok(self.lock_inner()?.last_known.slot_status.clone())
    }

    /// Persist the current region list. Called on clean shutdown.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.lock_inner()?;
        let LotState { regions, store, .. } = &mut *inner;
        store.save(regions)?;
        log::info!("region list flushed ({} regions)", regions.len());
        Ok(())
    }
}
