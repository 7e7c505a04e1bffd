//! Discrete orientation math.
//!
//! Items rotate in quarter turns about three axes. Because every angle is a
//! multiple of 90°, the rotation matrix only ever holds -1, 0 or 1 and the
//! oriented bounding box is a permutation of the intrinsic extents.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{BoundingBox, Vec3};

/// One of the four allowed angles on a single axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum AxisRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl AxisRotation {
    const CYCLE: [AxisRotation; 4] = [
        AxisRotation::Deg0,
        AxisRotation::Deg90,
        AxisRotation::Deg180,
        AxisRotation::Deg270,
    ];

    /// Number of quarter turns (0..=3).
    #[inline]
    pub const fn quarter_turns(self) -> usize {
        match self {
            AxisRotation::Deg0 => 0,
            AxisRotation::Deg90 => 1,
            AxisRotation::Deg180 => 2,
            AxisRotation::Deg270 => 3,
        }
    }

    #[inline]
    pub const fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    /// Steps the angle forward (`direction > 0`) or backward (`direction < 0`), wrapping mod 4.
    pub fn step(self, direction: i8) -> Self {
        let delta = direction.signum() as isize;
        let index = (self.quarter_turns() as isize + delta).rem_euclid(4) as usize;
        Self::CYCLE[index]
    }

    /// Exact (cos, sin) of the angle.
    #[inline]
    fn cos_sin(self) -> (f64, f64) {
        match self {
            AxisRotation::Deg0 => (1.0, 0.0),
            AxisRotation::Deg90 => (0.0, 1.0),
            AxisRotation::Deg180 => (-1.0, 0.0),
            AxisRotation::Deg270 => (0.0, -1.0),
        }
    }
}

/// Error for angles that are not a multiple of 90° in `[0, 270]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rotation must be one of 0, 90, 180, 270 (got {0})")]
pub struct InvalidAxisRotation(pub u16);

impl TryFrom<u16> for AxisRotation {
    type Error = InvalidAxisRotation;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AxisRotation::Deg0),
            90 => Ok(AxisRotation::Deg90),
            180 => Ok(AxisRotation::Deg180),
            270 => Ok(AxisRotation::Deg270),
            other => Err(InvalidAxisRotation(other)),
        }
    }
}

impl From<AxisRotation> for u16 {
    fn from(value: AxisRotation) -> Self {
        value.degrees()
    }
}

/// Rotation axis selector used by rotate actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// About the vertical (Y) axis.
    Yaw,
    /// About the width (X) axis.
    Pitch,
    /// About the depth (Z) axis.
    Roll,
}

/// Yaw, pitch and roll of an item, each in quarter turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Rotation {
    #[schema(value_type = u16, example = 0)]
    pub yaw: AxisRotation,
    #[schema(value_type = u16, example = 0)]
    pub pitch: AxisRotation,
    #[schema(value_type = u16, example = 0)]
    pub roll: AxisRotation,
}

type Matrix3 = [[f64; 3]; 3];

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        yaw: AxisRotation::Deg0,
        pitch: AxisRotation::Deg0,
        roll: AxisRotation::Deg0,
    };

    pub const fn new(yaw: AxisRotation, pitch: AxisRotation, roll: AxisRotation) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Returns a copy with one axis stepped by `direction`.
    pub fn rotated(self, axis: Axis, direction: i8) -> Self {
        let mut next = self;
        match axis {
            Axis::Yaw => next.yaw = self.yaw.step(direction),
            Axis::Pitch => next.pitch = self.pitch.step(direction),
            Axis::Roll => next.roll = self.roll.step(direction),
        }
        next
    }

    /// Composite matrix `yaw(Y) · pitch(X) · roll(Z)`.
    fn matrix(&self) -> Matrix3 {
        let (cy, sy) = self.yaw.cos_sin();
        let (cp, sp) = self.pitch.cos_sin();
        let (cr, sr) = self.roll.cos_sin();

        let yaw = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
        let pitch = [[1.0, 0.0, 0.0], [0.0, cp, -sp], [0.0, sp, cp]];
        let roll = [[cr, -sr, 0.0], [sr, cr, 0.0], [0.0, 0.0, 1.0]];

        multiply(&multiply(&yaw, &pitch), &roll)
    }
}

fn multiply(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut result = [[0.0; 3]; 3];
    for (i, row) in result.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    result
}

/// Rounds to 6 decimal places to suppress floating-point jitter.
#[inline]
fn sanitize(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// World-aligned extent of an item with intrinsic `size` (width, height, depth) under `rotation`.
///
/// # Example
/// ```
/// use basket_puzzle::orientation::{oriented_size, AxisRotation, Rotation};
/// use basket_puzzle::types::Vec3;
///
/// let rotation = Rotation::new(AxisRotation::Deg90, AxisRotation::Deg0, AxisRotation::Deg0);
/// assert_eq!(oriented_size(Vec3::new(4.0, 1.0, 2.0), rotation), Vec3::new(2.0, 1.0, 4.0));
/// ```
pub fn oriented_size(size: Vec3, rotation: Rotation) -> Vec3 {
    let m = rotation.matrix();
    let local = [size.x, size.y, size.z];
    let row = |r: &[f64; 3]| sanitize(r.iter().zip(local).map(|(c, s)| c.abs() * s).sum());
    Vec3::new(row(&m[0]), row(&m[1]), row(&m[2]))
}

/// Center of the oriented box whose minimum corner is `position`.
pub fn world_center(position: Vec3, size: Vec3, rotation: Rotation) -> Vec3 {
    oriented_bounding_box(position, size, rotation).center()
}

/// Oriented bounding box: `[position, position + oriented size]`.
pub fn oriented_bounding_box(position: Vec3, size: Vec3, rotation: Rotation) -> BoundingBox {
    BoundingBox::from_position_and_size(position, oriented_size(size, rotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Vec3 = Vec3::new(4.0, 1.0, 2.0);

    fn rot(yaw: u16, pitch: u16, roll: u16) -> Rotation {
        Rotation::new(
            yaw.try_into().unwrap(),
            pitch.try_into().unwrap(),
            roll.try_into().unwrap(),
        )
    }

    #[test]
    fn identity_and_half_turns_keep_extents() {
        assert_eq!(oriented_size(SIZE, Rotation::IDENTITY), SIZE);
        assert_eq!(oriented_size(SIZE, rot(180, 0, 0)), SIZE);
        assert_eq!(oriented_size(SIZE, rot(0, 180, 0)), SIZE);
        assert_eq!(oriented_size(SIZE, rot(180, 180, 180)), SIZE);
    }

    #[test]
    fn quarter_turns_swap_axes() {
        // yaw swaps width and depth
        assert_eq!(oriented_size(SIZE, rot(90, 0, 0)), Vec3::new(2.0, 1.0, 4.0));
        assert_eq!(oriented_size(SIZE, rot(270, 0, 0)), Vec3::new(2.0, 1.0, 4.0));
        // pitch swaps height and depth
        assert_eq!(oriented_size(SIZE, rot(0, 90, 0)), Vec3::new(4.0, 2.0, 1.0));
        // roll swaps width and height
        assert_eq!(oriented_size(SIZE, rot(0, 0, 90)), Vec3::new(1.0, 4.0, 2.0));
    }

    #[test]
    fn composed_rotation_is_a_permutation() {
        let size = oriented_size(SIZE, rot(90, 90, 0));
        let mut extents = [size.x, size.y, size.z];
        extents.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(extents, [1.0, 2.0, 4.0]);
        // pitch first turns depth into height, then yaw swaps width and depth
        assert_eq!(size, Vec3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn four_yaw_steps_return_to_start() {
        let start = rot(0, 90, 0);
        let mut rotation = start;
        for _ in 0..4 {
            rotation = rotation.rotated(Axis::Yaw, 1);
        }
        assert_eq!(rotation, start);
        assert_eq!(oriented_size(SIZE, rotation), oriented_size(SIZE, start));
    }

    #[test]
    fn step_wraps_backwards() {
        assert_eq!(AxisRotation::Deg0.step(-1), AxisRotation::Deg270);
        assert_eq!(AxisRotation::Deg270.step(1), AxisRotation::Deg0);
        assert_eq!(AxisRotation::Deg90.step(0), AxisRotation::Deg90);
    }

    #[test]
    fn world_center_and_box_use_oriented_size() {
        let position = Vec3::new(1.0, 0.0, 2.0);
        let rotation = rot(90, 0, 0);
        assert_eq!(world_center(position, SIZE, rotation), Vec3::new(2.0, 0.5, 4.0));

        let aabb = oriented_bounding_box(position, SIZE, rotation);
        assert_eq!(aabb.min, position);
        assert_eq!(aabb.max, Vec3::new(3.0, 1.0, 6.0));
    }

    #[test]
    fn rejects_non_quarter_angles() {
        assert_eq!(AxisRotation::try_from(45), Err(InvalidAxisRotation(45)));
        assert!(serde_json::from_str::<Rotation>(r#"{"yaw":45,"pitch":0,"roll":0}"#).is_err());
        let parsed: Rotation = serde_json::from_str(r#"{"yaw":270,"pitch":90,"roll":0}"#).unwrap();
        assert_eq!(parsed, rot(270, 90, 0));
    }
}
