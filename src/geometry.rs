//! Grid collision and snap/clamp helpers.
//!
//! Collision is tested on oriented bounding boxes: a candidate collides when it
//! leaves the basket or strictly overlaps another placement.

use crate::model::{Basket, ItemSpec, Placement};
use crate::orientation::{Rotation, oriented_size};
use crate::types::Vec3;

/// Checks whether `candidate` leaves the basket or overlaps any of `existing`.
///
/// An entry of `existing` sharing the candidate's instance id is skipped, so a
/// committed instance can be re-checked against the list that contains it.
/// Out-of-bounds placements count as collisions.
///
/// # Parameters
/// * `candidate` - The placement to test
/// * `existing` - Committed placements
/// * `basket` - Container bounds
///
/// # Returns
/// `true` on any collision, otherwise `false`
pub fn collides<C, P>(candidate: &C, existing: &[P], basket: &Basket) -> bool
where
    C: Placement + ?Sized,
    P: Placement,
{
    let candidate_box = candidate.bounding_box();
    if !candidate_box.is_within(&basket.extent()) {
        return true;
    }

    let own_id = candidate.instance_id();
    existing.iter().any(|item| {
        if own_id.is_some() && own_id == item.instance_id() {
            return false;
        }
        candidate_box.intersects(&item.bounding_box())
    })
}

/// Rounds each axis to the nearest grid unit (halves round away from zero).
///
/// # Example
/// ```
/// use basket_puzzle::geometry::snap_to_grid;
/// use basket_puzzle::types::Vec3;
///
/// assert_eq!(snap_to_grid(Vec3::new(1.5, -0.5, 2.49)), Vec3::new(2.0, -1.0, 2.0));
/// ```
#[inline]
pub fn snap_to_grid(position: Vec3) -> Vec3 {
    position.map(f64::round)
}

/// Clamps `value` into `[0, upper]`.
///
/// When `upper < 0` (the item is larger than the basket on that axis) the result is
/// `upper`, a degenerate position that later fails collision, instead of a panic.
#[inline]
fn clamp_axis(value: f64, upper: f64) -> f64 {
    value.max(0.0).min(upper)
}

/// Constrains a position so the oriented box stays inside the basket on every axis.
///
/// Callers usually replace the height afterwards with the resting height.
pub fn clamp_to_bounds(position: Vec3, spec: &ItemSpec, rotation: Rotation, basket: &Basket) -> Vec3 {
    let size = oriented_size(spec.size, rotation);
    Vec3::new(
        clamp_axis(position.x, basket.width - size.x),
        clamp_axis(position.y, basket.height - size.y),
        clamp_axis(position.z, basket.depth - size.z),
    )
}
