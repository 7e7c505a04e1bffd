//! Data models for the basket puzzle.
//!
//! This module defines the fundamental data structures of a round:
//! - `ItemSpec`: A catalog item with intrinsic size, mass and fragility
//! - `Basket`: The fixed-volume container
//! - `PlacedInstance` / `GhostInstance`: Committed and previewed placements
//!
//! All placement types implement the `Placement` trait so collision, support and
//! scoring work on any of them.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::orientation::{Rotation, oriented_bounding_box, oriented_size, world_center};
use crate::types::{BoundingBox, Dimensional, Positioned, Vec3, Weighted};

/// Validation error for catalog-level data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid mass: {0}")]
    InvalidMass(String),
    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),
    #[error("Unknown item id: {0}")]
    UnknownItem(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_size(size: Vec3, owner: &str) -> Result<(), ValidationError> {
    validate_dimension(size.x, &format!("{owner} width"))?;
    validate_dimension(size.y, &format!("{owner} height"))?;
    validate_dimension(size.z, &format!("{owner} depth"))?;
    Ok(())
}

/// Render shape of an item. Collision always uses the oriented bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Box,
    Cylinder,
    Capsule,
    Sphere,
}

/// An immutable catalog item.
///
/// # Fields
/// * `id` - Catalog key
/// * `name` - Display name
/// * `size` - Intrinsic extent: `x` = width, `y` = height, `z` = depth (grid units)
/// * `mass_kg` - Mass in kg, used for scoring only
/// * `shape` - Render shape
/// * `fragile` - Whether heavy items on top are penalized
/// * `model` - Optional model key for renderers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "egg-pack",
    "name": "Egg pack",
    "size": { "x": 3.0, "y": 1.0, "z": 2.0 },
    "mass_kg": 0.6,
    "shape": "box",
    "fragile": true,
    "model": "egg-pack"
}))]
pub struct ItemSpec {
    pub id: String,
    pub name: String,
    pub size: Vec3,
    pub mass_kg: f64,
    pub shape: Shape,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default)]
    pub model: Option<String>,
}

impl ItemSpec {
    /// Creates a validated item spec.
    ///
    /// # Examples
    /// ```
    /// use basket_puzzle::model::{ItemSpec, Shape};
    /// use basket_puzzle::types::Vec3;
    ///
    /// assert!(ItemSpec::new("potato", "Potato", Vec3::new(1.0, 1.0, 1.0), 0.2, Shape::Sphere).is_ok());
    /// assert!(ItemSpec::new("void", "Void", Vec3::new(0.0, 1.0, 1.0), 0.2, Shape::Box).is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size: Vec3,
        mass_kg: f64,
        shape: Shape,
    ) -> Result<Self, ValidationError> {
        let spec = Self {
            id: id.into(),
            name: name.into(),
            size,
            mass_kg,
            shape,
            fragile: false,
            model: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Marks the item as fragile.
    pub fn fragile(mut self) -> Self {
        self.fragile = true;
        self
    }

    /// Re-checks size and mass, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_size(self.size, &self.id)?;
        if self.mass_kg < 0.0 || !self.mass_kg.is_finite() {
            return Err(ValidationError::InvalidMass(format!(
                "{} mass must not be negative, got: {}",
                self.id, self.mass_kg
            )));
        }
        Ok(())
    }
}

impl Dimensional for ItemSpec {
    fn dimensions(&self) -> Vec3 {
        self.size
    }
}

impl Weighted for ItemSpec {
    fn mass(&self) -> f64 {
        self.mass_kg
    }
}

/// The fixed container. Extents are in grid units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Basket {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Basket {
    pub const DEFAULT_WIDTH: f64 = 12.0;
    pub const DEFAULT_HEIGHT: f64 = 12.0;
    pub const DEFAULT_DEPTH: f64 = 9.0;

    /// Creates a validated basket.
    pub fn new(width: f64, height: f64, depth: f64) -> Result<Self, ValidationError> {
        validate_size(Vec3::new(width, height, depth), "Basket")?;
        Ok(Self {
            width,
            height,
            depth,
        })
    }

    /// Extent as a vector (x = width, y = height, z = depth).
    #[inline]
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }

    /// Total voxel count used as the occupancy denominator.
    #[inline]
    pub fn total_voxels(&self) -> f64 {
        self.width * self.height * self.depth
    }

    /// Horizontal center `(x, z)`.
    #[inline]
    pub fn center_xz(&self) -> (f64, f64) {
        (self.width / 2.0, self.depth / 2.0)
    }
}

impl Default for Basket {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            depth: Self::DEFAULT_DEPTH,
        }
    }
}

impl Dimensional for Basket {
    fn dimensions(&self) -> Vec3 {
        self.extent()
    }
}

/// Anything that occupies an oriented box inside the basket.
pub trait Placement: Positioned {
    /// Backing catalog item.
    fn spec(&self) -> &ItemSpec;

    /// Current discrete rotation.
    fn rotation(&self) -> Rotation;

    /// Identifier used to skip self-collisions, if any.
    fn instance_id(&self) -> Option<&str> {
        None
    }

    fn oriented_size(&self) -> Vec3 {
        oriented_size(self.spec().size, self.rotation())
    }

    fn bounding_box(&self) -> BoundingBox {
        oriented_bounding_box(self.position(), self.spec().size, self.rotation())
    }

    fn world_center(&self) -> Vec3 {
        world_center(self.position(), self.spec().size, self.rotation())
    }
}

/// A borrowed, not yet committed placement used for probing positions.
#[derive(Clone, Copy, Debug)]
pub struct CandidatePlacement<'a> {
    pub id: Option<&'a str>,
    pub spec: &'a ItemSpec,
    pub position: Vec3,
    pub rotation: Rotation,
}

impl<'a> CandidatePlacement<'a> {
    pub fn new(spec: &'a ItemSpec, position: Vec3, rotation: Rotation) -> Self {
        Self {
            id: None,
            spec,
            position,
            rotation,
        }
    }
}

impl Positioned for CandidatePlacement<'_> {
    fn position(&self) -> Vec3 {
        self.position
    }
}

impl Placement for CandidatePlacement<'_> {
    fn spec(&self) -> &ItemSpec {
        self.spec
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn instance_id(&self) -> Option<&str> {
        self.id
    }
}

/// A committed placement.
///
/// # Fields
/// * `id` - Unique per session (`placed-N`)
/// * `spec` - Backing catalog item, copied by value
/// * `position` - Minimum corner of the oriented box
/// * `rotation` - Discrete rotation
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PlacedInstance {
    pub id: String,
    pub spec: ItemSpec,
    pub position: Vec3,
    pub rotation: Rotation,
}

impl PlacedInstance {
    /// Borrows this instance as a candidate that skips itself on collision checks.
    pub fn as_candidate(&self) -> CandidatePlacement<'_> {
        CandidatePlacement {
            id: Some(&self.id),
            spec: &self.spec,
            position: self.position,
            rotation: self.rotation,
        }
    }
}

impl Positioned for PlacedInstance {
    fn position(&self) -> Vec3 {
        self.position
    }
}

impl Weighted for PlacedInstance {
    fn mass(&self) -> f64 {
        self.spec.mass_kg
    }
}

impl Placement for PlacedInstance {
    fn spec(&self) -> &ItemSpec {
        &self.spec
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn instance_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// The single in-progress preview placement.
///
/// `is_valid` is derived: collision-free and supported at or above the threshold.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct GhostInstance {
    pub spec: ItemSpec,
    pub position: Vec3,
    pub rotation: Rotation,
    pub support_ratio: f64,
    pub is_valid: bool,
}

impl Positioned for GhostInstance {
    fn position(&self) -> Vec3 {
        self.position
    }
}

impl Placement for GhostInstance {
    fn spec(&self) -> &ItemSpec {
        &self.spec
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::AxisRotation;

    fn spec() -> ItemSpec {
        ItemSpec::new("loaf", "Loaf", Vec3::new(3.0, 2.0, 2.0), 0.4, Shape::Box).unwrap()
    }

    #[test]
    fn item_spec_rejects_bad_values() {
        assert!(matches!(
            ItemSpec::new("x", "X", Vec3::new(1.0, -1.0, 1.0), 1.0, Shape::Box),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            ItemSpec::new("x", "X", Vec3::new(1.0, 1.0, f64::NAN), 1.0, Shape::Box),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            ItemSpec::new("x", "X", Vec3::new(1.0, 1.0, 1.0), -2.0, Shape::Box),
            Err(ValidationError::InvalidMass(_))
        ));
    }

    #[test]
    fn basket_defaults_and_volume() {
        let basket = Basket::default();
        assert_eq!(basket.extent(), Vec3::new(12.0, 12.0, 9.0));
        assert_eq!(basket.total_voxels(), 1296.0);
        assert_eq!(basket.center_xz(), (6.0, 4.5));
        assert!(Basket::new(0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn placed_instance_box_follows_rotation() {
        let placed = PlacedInstance {
            id: "placed-1".to_string(),
            spec: spec(),
            position: Vec3::new(1.0, 0.0, 1.0),
            rotation: Rotation::new(AxisRotation::Deg90, AxisRotation::Deg0, AxisRotation::Deg0),
        };

        let aabb = placed.bounding_box();
        assert_eq!(aabb.max, Vec3::new(3.0, 2.0, 4.0));
        assert_eq!(placed.world_center(), Vec3::new(2.0, 1.0, 2.5));
        assert_eq!(placed.as_candidate().instance_id(), Some("placed-1"));
        assert_eq!(placed.mass(), 0.4);
    }

    #[test]
    fn item_spec_parses_with_defaults() {
        let json = r#"{
            "id": "potato",
            "name": "Potato",
            "size": {"x": 1.0, "y": 1.0, "z": 1.0},
            "mass_kg": 0.2,
            "shape": "sphere"
        }"#;
        let parsed: ItemSpec = serde_json::from_str(json).expect("valid item spec");
        assert!(!parsed.fragile);
        assert!(parsed.model.is_none());
        assert!(parsed.validate().is_ok());
    }
}
