use thiserror::Error;

/// Errors surfaced by the occupancy core.
///
/// Data-integrity failures (`StoreCorrupt`, `InvalidRegion`) always propagate
/// to the caller. Editor misuse (`TooFewPoints`, `NothingToUndo`) is
/// recoverable; the operator retries. External collaborators degrade
/// gracefully: `DetectionUnavailable` skips classification without guessing,
/// `BackendUnreachable` is reported per region and never corrupts local state.
#[derive(Debug, Error)]
pub enum LotError {
    /// No persisted region list exists yet. Callers treat this as zero
    /// regions, not as a failure.
    #[error("region store has no persisted data")]
    StoreMissing,

    /// Persisted region data exists but cannot be parsed or is structurally
    /// invalid. The load fails rather than producing partial regions.
    #[error("region store corrupt: {0}")]
    StoreCorrupt(String),

    /// Persisting the region list failed. The previously saved content is
    /// still intact on disk.
    #[error("region store write failed: {0}")]
    StoreWriteFailed(String),

    /// A region failed validation on a bulk write or an explicit commit.
    #[error("invalid region '{code}': {reason}")]
    InvalidRegion { code: String, reason: String },

    /// Commit attempted with fewer than three accumulated points.
    #[error("cannot commit a region with {got} points; at least 3 required")]
    TooFewPoints { got: usize },

    /// Undo requested with no committed regions.
    #[error("no committed region to undo")]
    NothingToUndo,

    /// The object detector is not loaded or failed to run.
    #[error("object detector unavailable")]
    DetectionUnavailable,

    /// The backend slot store did not accept a read or write.
    #[error("backend store unreachable: {0}")]
    BackendUnreachable(String),
}
