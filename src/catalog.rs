//! Built-in item catalog and starter queue.
//!
//! Sizes are in grid units (width, height, depth) and sized for the default
//! 12 × 12 × 9 basket.

use std::collections::HashMap;

use crate::model::{ItemSpec, Shape, ValidationError};
use crate::types::Vec3;

/// Validated, immutable set of item specs plus the queue a round starts with.
#[derive(Clone, Debug)]
pub struct Catalog {
    items: Vec<ItemSpec>,
    starter_queue: Vec<String>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Creates a catalog after validating every spec and queue entry.
    pub fn new(items: Vec<ItemSpec>, starter_queue: Vec<String>) -> Result<Self, ValidationError> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, spec) in items.iter().enumerate() {
            spec.validate()?;
            if index.insert(spec.id.clone(), position).is_some() {
                return Err(ValidationError::DuplicateItem(spec.id.clone()));
            }
        }

        if let Some(unknown) = starter_queue.iter().find(|id| !index.contains_key(*id)) {
            return Err(ValidationError::UnknownItem(unknown.clone()));
        }

        Ok(Self {
            items,
            starter_queue,
            index,
        })
    }

    /// The grocery catalog shipped with the game.
    pub fn builtin() -> Self {
        Self::new(builtin_items(), builtin_queue()).expect("Built-in catalog must be valid")
    }

    /// Looks up a spec by id.
    pub fn get(&self, id: &str) -> Option<&ItemSpec> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    pub fn items(&self) -> &[ItemSpec] {
        &self.items
    }

    pub fn starter_queue(&self) -> &[String] {
        &self.starter_queue
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn item(
    id: &str,
    name: &str,
    size: (f64, f64, f64),
    mass_kg: f64,
    shape: Shape,
    fragile: bool,
) -> ItemSpec {
    ItemSpec {
        id: id.to_string(),
        name: name.to_string(),
        size: Vec3::from(size),
        mass_kg,
        shape,
        fragile,
        model: Some(id.to_string()),
    }
}

fn builtin_items() -> Vec<ItemSpec> {
    vec![
        // Breads
        item("bread-melon-square", "Melon bread", (2.0, 1.0, 2.0), 0.1, Shape::Box, true),
        item("bread-baguette-rect", "Baguette", (6.0, 1.0, 1.0), 0.25, Shape::Capsule, false),
        item("bread-loaf-rect", "Loaf bread", (3.0, 2.0, 2.0), 0.4, Shape::Box, true),
        // Meat
        item("meat-small", "Meat (small)", (2.0, 1.0, 2.0), 0.2, Shape::Box, false),
        item("meat-medium", "Meat (medium)", (3.0, 1.0, 2.0), 0.4, Shape::Box, false),
        item("meat-large", "Meat (large)", (4.0, 1.0, 3.0), 0.8, Shape::Box, false),
        // Fish / seafood
        item("sashimi", "Sashimi", (2.0, 1.0, 2.0), 0.3, Shape::Box, true),
        item("fresh-fish-med", "Fresh fish", (4.0, 1.0, 2.0), 0.6, Shape::Capsule, false),
        item("frozen-gyoza", "Frozen gyoza", (3.0, 1.0, 2.0), 0.5, Shape::Box, false),
        // Vegetables
        item("potato", "Potato", (1.0, 1.0, 1.0), 0.2, Shape::Sphere, false),
        item("carrot", "Carrot", (3.0, 1.0, 1.0), 0.15, Shape::Capsule, false),
        item("moyashi", "Bean sprouts", (2.0, 1.0, 2.0), 0.2, Shape::Box, true),
        item("daikon", "Daikon", (6.0, 2.0, 2.0), 1.0, Shape::Cylinder, false),
        // Drinks / eggs
        item("pet-500ml", "PET bottle 500ml", (1.0, 3.0, 1.0), 0.5, Shape::Cylinder, false),
        item("pet-1l", "PET bottle 1L", (1.0, 4.0, 1.0), 1.0, Shape::Cylinder, false),
        item("pet-2l", "PET bottle 2L", (2.0, 5.0, 2.0), 2.0, Shape::Cylinder, false),
        item("milk-carton-1l", "Milk carton 1L", (1.0, 3.0, 1.0), 1.0, Shape::Box, false),
        item("egg-pack", "Egg pack", (3.0, 1.0, 2.0), 0.6, Shape::Box, true),
    ]
}

fn builtin_queue() -> Vec<String> {
    [
        "pet-2l",
        "daikon",
        "meat-large",
        "milk-carton-1l",
        "frozen-gyoza",
        "fresh-fish-med",
        "pet-1l",
        "bread-loaf-rect",
        "meat-medium",
        "potato",
        "carrot",
        "pet-500ml",
        "bread-baguette-rect",
        "moyashi",
        "meat-small",
        "sashimi",
        "bread-melon-square",
        "egg-pack",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Basket;

    #[test]
    fn builtin_catalog_is_valid_and_fits_the_basket() {
        let catalog = Catalog::builtin();
        let basket = Basket::default();
        assert!(!catalog.items().is_empty());
        for spec in catalog.items() {
            assert!(spec.validate().is_ok(), "{} failed validation", spec.id);
            assert!(spec.size.x <= basket.width && spec.size.y <= basket.height);
            assert!(spec.size.z <= basket.depth);
        }
        for id in catalog.starter_queue() {
            assert!(catalog.get(id).is_some(), "queue entry {} missing", id);
        }
    }

    #[test]
    fn rejects_duplicates_and_unknown_queue_entries() {
        let potato = item("potato", "Potato", (1.0, 1.0, 1.0), 0.2, Shape::Sphere, false);
        assert_eq!(
            Catalog::new(vec![potato.clone(), potato.clone()], vec![]).unwrap_err(),
            ValidationError::DuplicateItem("potato".to_string())
        );
        assert_eq!(
            Catalog::new(vec![potato], vec!["melon".to_string()]).unwrap_err(),
            ValidationError::UnknownItem("melon".to_string())
        );
    }

    #[test]
    fn lookup_by_id() {
        let catalog = Catalog::builtin();
        let eggs = catalog.get("egg-pack").expect("egg pack present");
        assert!(eggs.fragile);
        assert!(catalog.get("caviar").is_none());
    }
}
