//! Common types and traits for grid-space geometry.
//!
//! The basket uses a Y-up frame: `x` runs along the width, `y` is the
//! vertical (height) axis and `z` runs along the depth.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Tolerance for matching a support height against a top face.
pub const EPSILON_HEIGHT: f64 = 1e-3;

/// Tolerance used when deciding whether an item rests on top of another.
pub const EPSILON_RESTING: f64 = 1e-2;

/// Represents a 3D vector or point in grid space.
///
/// # Examples
/// ```
/// use basket_puzzle::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let size = Vec3::new(2.0, 2.0, 2.0);
/// let center = position + size * 0.5;
/// assert_eq!(center, Vec3::new(2.0, 3.0, 4.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector.
    ///
    /// # Parameters
    /// * `x` - X component (width)
    /// * `y` - Y component (height)
    /// * `z` - Z component (depth)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Product of all components, useful for size vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Applies `f` to every component.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

/// Trait for objects with 3D extent.
pub trait Dimensional {
    /// Returns the (width, height, depth) extent.
    fn dimensions(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Trait for objects with a position in grid space.
pub trait Positioned {
    /// Returns the minimum corner.
    fn position(&self) -> Vec3;
}

/// Trait for objects with mass.
pub trait Weighted {
    /// Returns the mass in kg.
    fn mass(&self) -> f64;
}

/// Calculates the overlap length of two intervals, at least 0.0.
///
/// # Example
/// ```
/// use basket_puzzle::types::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// assert_eq!(overlap_1d(0.0, 1.0, 3.0, 8.0), 0.0);
/// ```
#[inline]
pub fn overlap_1d(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    (a_max.min(b_max) - a_min.max(b_min)).max(0.0)
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + oriented size)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from position and size.
    #[inline]
    pub fn from_position_and_size(position: Vec3, size: Vec3) -> Self {
        Self {
            min: position,
            max: position + size,
        }
    }

    /// Checks if two boxes overlap as open intervals on all three axes.
    ///
    /// Touching faces do not count as an intersection.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.overlaps_horizontally(other)
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Open-interval overlap on the X and Z axes only.
    #[inline]
    pub fn overlaps_horizontally(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Checks if this box lies inside `[0, extent]` on every axis.
    #[inline]
    pub fn is_within(&self, extent: &Vec3) -> bool {
        self.min.x >= 0.0
            && self.min.y >= 0.0
            && self.min.z >= 0.0
            && self.max.x <= extent.x
            && self.max.y <= extent.y
            && self.max.z <= extent.z
    }

    /// Returns the top face height.
    #[inline]
    pub fn top_y(&self) -> f64 {
        self.max.y
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Returns the size (width, height, depth).
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Center of mass calculation helper.
///
/// Accumulates mass-weighted points.
#[derive(Clone, Debug, Default)]
pub struct CenterOfMassCalculator {
    weighted: Vec3,
    total_mass: f64,
}

impl CenterOfMassCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a weighted point.
    pub fn add_point(&mut self, point: Vec3, mass: f64) {
        self.weighted = self.weighted + point * mass;
        self.total_mass += mass;
    }

    /// Sum of all masses added so far.
    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    /// Calculates the center of mass.
    ///
    /// # Returns
    /// `Some(center)` for a positive total mass, `None` otherwise
    pub fn compute(&self) -> Option<Vec3> {
        if self.total_mass <= 0.0 {
            None
        } else {
            Some(self.weighted * (1.0 / self.total_mass))
        }
    }
}
