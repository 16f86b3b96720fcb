//! Per-region occupancy classification.

use std::collections::BTreeMap;

use crate::detect::DetectedObject;
use crate::geometry::point_in_polygon;
use crate::region::Region;

/// Decide occupied/empty for every region.
///
/// A region is occupied iff at least one object center lies inside its
/// polygon; the first qualifying object short-circuits the scan. Occupancy is
/// an existential predicate, not a count. The result's key set always equals
/// the region code set, whatever the object count; an empty region list
/// yields an empty map.
///
/// O(regions x objects x vertices); all three stay in the tens here, so no
/// spatial index.
pub fn classify(regions: &[Region], objects: &[DetectedObject]) -> BTreeMap<String, bool> {
    regions
        .iter()
        .map(|region| {
            let occupied = objects.iter().any(|object| {
                let (x, y) = object.center();
                point_in_polygon(x, y, &region.points)
            });
            (region.code.clone(), occupied)
        })
        .collect()
}
