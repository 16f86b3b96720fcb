//! lotwatch - parking lot occupancy kernel
//!
//! Determines which parking slots are occupied from camera images and keeps
//! a backend store and a live overlay in sync with the result.
//!
//! # Architecture
//!
//! - `region`: the durable list of operator-defined slot polygons
//! - `editor`: interactive point-by-point region authoring
//! - `geometry`: the ray-casting membership test
//! - `detect`: the object-detector seam (opaque capability)
//! - `classify`: per-region occupancy decisions
//! - `occupancy`: snapshots and reconciliation diffs
//! - `service`: the single owner of mutable occupancy state
//! - `backend`: HTTP client for the backend slot store
//! - `api`: the HTTP service surface
//!
//! Occupancy is derived state: the region store is authoritative for which
//! slots exist, and every analysis replaces the snapshot wholesale. Backend
//! pushes are best-effort; locally observed occupancy is trusted even when a
//! remote write fails, and the remote converges on the next analysis pass.

pub mod api;
pub mod backend;
pub mod classify;
pub mod config;
pub mod detect;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod occupancy;
pub mod region;
pub mod service;

pub use backend::{BackendClient, BackendSlot};
pub use classify::classify;
pub use detect::{
    filter_vehicles, BoundingBox, DetectedObject, StubDetector, VehicleDetector, VEHICLE_CLASS_IDS,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractDetector;
pub use editor::RegionEditor;
pub use error::LotError;
pub use geometry::{point_in_polygon, Point};
pub use occupancy::{diff_occupancy, OccupancySnapshot};
pub use region::{
    validate_regions, InMemoryRegionStore, JsonFileRegionStore, Region, RegionStore,
    MIN_REGION_POINTS,
};
pub use service::{
    AnalysisOutcome, HealthStatus, LastDetection, LotService, OverlayRegion, OverlaySnapshot,
};

/// Local wall-clock timestamp in ISO-8601, the overlay wire format.
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}
