//! Support surface search.
//!
//! Items never float: a placement rests on the ground or on top faces of other
//! items that are coplanar within `EPSILON_HEIGHT`, and at least
//! `SUPPORT_THRESHOLD` of its footprint must be carried.

use crate::geometry::collides;
use crate::model::{Basket, CandidatePlacement, ItemSpec, Placement};
use crate::orientation::{Rotation, oriented_size};
use crate::types::{BoundingBox, EPSILON_HEIGHT, Vec3, overlap_1d};

/// Minimum supported fraction of a footprint.
pub const SUPPORT_THRESHOLD: f64 = 0.7;

/// Horizontal rectangle at the bottom of a candidate placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub x: f64,
    pub z: f64,
    pub width: f64,
    pub depth: f64,
}

impl Footprint {
    pub const fn new(x: f64, z: f64, width: f64, depth: f64) -> Self {
        Self { x, z, width, depth }
    }

    /// Footprint of an oriented size placed at `position`.
    pub fn at(position: Vec3, oriented: Vec3) -> Self {
        Self::new(position.x, position.z, oriented.x, oriented.z)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.depth
    }

    fn overlap_area(&self, other: &BoundingBox) -> f64 {
        let ox = overlap_1d(self.x, self.x + self.width, other.min.x, other.max.x);
        let oz = overlap_1d(self.z, self.z + self.depth, other.min.z, other.max.z);
        ox * oz
    }

    fn overlaps_horizontally(&self, other: &BoundingBox) -> bool {
        other.min.x < self.x + self.width
            && other.max.x > self.x
            && other.min.z < self.z + self.depth
            && other.max.z > self.z
    }
}

/// Fraction of `footprint` carried at height `y`, in `[0, 1]`.
///
/// Only top faces within `EPSILON_HEIGHT` of `y` count. The ground (`y ≈ 0`)
/// always carries the full footprint. Degenerate footprints return 0.
pub fn support_ratio<P: Placement>(footprint: &Footprint, y: f64, existing: &[P]) -> f64 {
    ratio_over(footprint, y, existing.iter().map(|item| item.bounding_box()))
}

/// Support ratio of a placement against every *other* placement in `existing`.
pub fn placement_support_ratio<C, P>(item: &C, existing: &[P]) -> f64
where
    C: Placement + ?Sized,
    P: Placement,
{
    let aabb = item.bounding_box();
    let footprint = Footprint::at(aabb.min, aabb.size());
    let own_id = item.instance_id();
    let others = existing
        .iter()
        .filter(|other| own_id.is_none() || other.instance_id() != own_id)
        .map(|other| other.bounding_box());
    ratio_over(&footprint, aabb.min.y, others)
}

fn ratio_over(footprint: &Footprint, y: f64, boxes: impl Iterator<Item = BoundingBox>) -> f64 {
    let area = footprint.area();
    if area <= 0.0 || !area.is_finite() {
        return 0.0;
    }

    if y.abs() <= EPSILON_HEIGHT {
        return 1.0;
    }

    let supported: f64 = boxes
        .filter(|aabb| (aabb.top_y() - y).abs() <= EPSILON_HEIGHT)
        .map(|aabb| footprint.overlap_area(&aabb))
        .sum();

    (supported / area).clamp(0.0, 1.0)
}

/// Finds the lowest resting height for an item at the horizontal position `(x, z)`.
///
/// Candidate heights are the ground plus the top face of every placement whose box
/// overlaps the footprint horizontally. They are tried in ascending order, each clamped
/// into `[0, basket.height - item height]`; the first one that is collision-free and
/// supported at or above `SUPPORT_THRESHOLD` wins. Falls back to 0 when none qualify.
pub fn resting_height<P: Placement>(
    x: f64,
    z: f64,
    spec: &ItemSpec,
    rotation: Rotation,
    existing: &[P],
    basket: &Basket,
) -> f64 {
    let oriented = oriented_size(spec.size, rotation);
    let pos_x = x.max(0.0).min(basket.width - oriented.x);
    let pos_z = z.max(0.0).min(basket.depth - oriented.z);
    let max_y = basket.height - oriented.y;
    let footprint = Footprint::new(pos_x, pos_z, oriented.x, oriented.z);

    let mut candidates: Vec<f64> = existing
        .iter()
        .map(|item| item.bounding_box())
        .filter(|aabb| footprint.overlaps_horizontally(aabb))
        .map(|aabb| aabb.top_y())
        .collect();
    candidates.push(0.0);
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();

    for base in candidates {
        let y = base.max(0.0).min(max_y);
        let candidate = CandidatePlacement::new(spec, Vec3::new(pos_x, y, pos_z), rotation);
        if collides(&candidate, existing, basket) {
            continue;
        }
        if support_ratio(&footprint, y, existing) >= SUPPORT_THRESHOLD {
            return y;
        }
    }

    0.0
}
