//! Interactive region-authoring state machine.
//!
//! The editor accumulates polygon vertices one click at a time and promotes
//! them to committed regions. Point accumulation is deliberately unvalidated;
//! only commit enforces the minimum vertex count, so the operator can fix a
//! bad polygon with `reset_current` before it ever becomes durable, and
//! `undo_last` can retract a committed region without reopening the file.
//!
//! The editor never renders. After every mutation an external renderer can
//! redraw from `committed()`, `current()` and `next_code()`.

use crate::error::LotError;
use crate::geometry::Point;
use crate::region::{Region, RegionStore, MIN_REGION_POINTS};

#[derive(Debug, Default)]
pub struct RegionEditor {
    committed: Vec<Region>,
    current: Vec<Point>,
    next_slot: u32,
}

impl RegionEditor {
    pub fn new() -> Self {
        Self {
            committed: Vec::new(),
            current: Vec::new(),
            next_slot: 1,
        }
    }

    /// Resume editing an already-persisted list; auto numbering continues
    /// after the loaded regions.
    pub fn with_regions(regions: Vec<Region>) -> Self {
        let next_slot = regions.len() as u32 + 1;
        Self {
            committed: regions,
            current: Vec::new(),
            next_slot,
        }
    }

    /// Append a vertex to the in-progress polygon. Geometry is not validated
    /// here; a degenerate accumulation is legal until commit.
    pub fn add_point(&mut self, point: Point) {
        self.current.push(point);
    }

    /// Commit the in-progress polygon under the next auto-generated code.
    ///
    /// Fails with `TooFewPoints` below [`MIN_REGION_POINTS`], leaving all
    /// state unchanged. On success returns the assigned code.
    pub fn commit(&mut self) -> Result<String, LotError> {
        if self.current.len() < MIN_REGION_POINTS {
            return Err(LotError::TooFewPoints {
                got: self.current.len(),
            });
        }
        let (slot, code) = self.next_free_slot();
        self.committed.push(Region {
            code: code.clone(),
            points: std::mem::take(&mut self.current),
        });
        self.next_slot = slot + 1;
        Ok(code)
    }

    /// Commit under an operator-supplied code instead of the counter.
    ///
    /// The counter is not consumed; a later auto commit skips any code that
    /// is already taken.
    pub fn commit_named(&mut self, code: &str) -> Result<String, LotError> {
        if self.current.len() < MIN_REGION_POINTS {
            return Err(LotError::TooFewPoints {
                got: self.current.len(),
            });
        }
        if code.trim().is_empty() {
            return Err(LotError::InvalidRegion {
                code: code.to_string(),
                reason: "empty code".to_string(),
            });
        }
        if self.committed.iter().any(|region| region.code == code) {
            return Err(LotError::InvalidRegion {
                code: code.to_string(),
                reason: "duplicate code".to_string(),
            });
        }
        self.committed.push(Region {
            code: code.to_string(),
            points: std::mem::take(&mut self.current),
        });
        Ok(code.to_string())
    }

    /// Discard the in-progress polygon. Committed regions are untouched.
    pub fn reset_current(&mut self) {
        self.current.clear();
    }

    /// Remove the most recently committed region and return its code.
    ///
    /// When the removed region carried the latest auto code, that slot number
    /// becomes available again.
    pub fn undo_last(&mut self) -> Result<String, LotError> {
        let region = self.committed.pop().ok_or(LotError::NothingToUndo)?;
        if self.next_slot > 1 && region.code == format!("P{}", self.next_slot - 1) {
            self.next_slot -= 1;
        }
        Ok(region.code)
    }

    /// Persist the committed list through the given store.
    pub fn persist(&self, store: &mut dyn RegionStore) -> Result<(), LotError> {
        store.save(&self.committed)
    }

    pub fn committed(&self) -> &[Region] {
        &self.committed
    }

    pub fn current(&self) -> &[Point] {
        &self.current
    }

    /// The code the next auto commit would assign.
    pub fn next_code(&self) -> String {
        self.next_free_slot().1
    }

    // Auto codes must stay unique even after an explicitly named commit
    // claimed a "P<n>" the counter has not reached yet.
    fn next_free_slot(&self) -> (u32, String) {
        let mut slot = self.next_slot;
        loop {
            let code = format!("P{}", slot);
            if !self.committed.iter().any(|region| region.code == code) {
                return (slot, code);
            }
            slot += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::InMemoryRegionStore;

    fn add_square(editor: &mut RegionEditor) {
        editor.add_point(Point::new(0, 0));
        editor.add_point(Point::new(10, 0));
        editor.add_point(Point::new(10, 10));
        editor.add_point(Point::new(0, 10));
    }

    #[test]
    fn commit_assigns_sequential_auto_codes() {
        let mut editor = RegionEditor::new();
        add_square(&mut editor);
        assert_eq!(editor.commit().expect("commit"), "P1");
        add_square(&mut editor);
        assert_eq!(editor.commit().expect("commit"), "P2");
        assert_eq!(editor.committed().len(), 2);
        assert!(editor.current().is_empty());
    }

    #[test]
    fn commit_with_too_few_points_changes_nothing() {
        let mut editor = RegionEditor::new();
        editor.add_point(Point::new(0, 0));
        editor.add_point(Point::new(1, 1));
        let err = editor.commit().expect_err("must fail");
        assert!(matches!(err, LotError::TooFewPoints { got: 2 }));
        assert!(editor.committed().is_empty());
        assert_eq!(editor.current().len(), 2);
        assert_eq!(editor.next_code(), "P1");
    }

    #[test]
    fn undo_on_empty_list_fails_and_keeps_counter() {
        let mut editor = RegionEditor::new();
        assert!(matches!(editor.undo_last(), Err(LotError::NothingToUndo)));
        assert_eq!(editor.next_code(), "P1");
    }

    #[test]
    fn undo_returns_code_and_frees_the_slot() {
        let mut editor = RegionEditor::new();
        add_square(&mut editor);
        editor.commit().expect("commit");
        add_square(&mut editor);
        editor.commit().expect("commit");
        assert_eq!(editor.undo_last().expect("undo"), "P2");
        assert_eq!(editor.next_code(), "P2");
    }

    #[test]
    fn reset_clears_only_the_current_polygon() {
        let mut editor = RegionEditor::new();
        add_square(&mut editor);
        editor.commit().expect("commit");
        editor.add_point(Point::new(3, 3));
        editor.reset_current();
        assert!(editor.current().is_empty());
        assert_eq!(editor.committed().len(), 1);
    }

    #[test]
    fn named_commit_rejects_duplicates_and_spares_the_counter() {
        let mut editor = RegionEditor::new();
        add_square(&mut editor);
        editor.commit_named("gate-a").expect("named commit");
        add_square(&mut editor);
        let err = editor.commit_named("gate-a").expect_err("duplicate");
        assert!(matches!(err, LotError::InvalidRegion { .. }));
        // The failed commit left the points in place for a retry.
        assert_eq!(editor.current().len(), 4);
        assert_eq!(editor.commit().expect("auto commit"), "P1");
    }

    #[test]
    fn auto_commit_skips_codes_claimed_by_name() {
        let mut editor = RegionEditor::new();
        add_square(&mut editor);
        editor.commit().expect("commit"); // P1
        add_square(&mut editor);
        editor.commit_named("P2").expect("named commit");
        add_square(&mut editor);
        assert_eq!(editor.commit().expect("commit"), "P3");
    }

    #[test]
    fn resumes_numbering_from_loaded_regions() {
        let regions = vec![
            Region {
                code: "P1".to_string(),
                points: vec![Point::new(0, 0), Point::new(1, 0), Point::new(1, 1)],
            },
            Region {
                code: "P2".to_string(),
                points: vec![Point::new(2, 0), Point::new(3, 0), Point::new(3, 1)],
            },
        ];
        let editor = RegionEditor::with_regions(regions);
        assert_eq!(editor.next_code(), "P3");
    }

    #[test]
    fn persist_writes_the_committed_list() {
        let mut editor = RegionEditor::new();
        add_square(&mut editor);
        editor.commit().expect("commit");
        let mut store = InMemoryRegionStore::new();
        editor.persist(&mut store).expect("persist");
        let stored = store.load().expect("load");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].code, "P1");
    }
}
