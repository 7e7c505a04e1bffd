//! Scoring of a committed arrangement.
//!
//! Four independent scorers run over the placed instances:
//! - occupancy ("empty"): how much of the basket is filled, `[0, 40]`
//! - balance: horizontal offset of the center of mass, `[0, 30]`
//! - stability: support coverage and top-heaviness, `[0, 30]`
//! - fragile adjustment: what rests on fragile items, `[-10, 10]`
//!
//! Every scorer saturates instead of propagating NaN or infinity.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{Basket, Placement};
use crate::support::{SUPPORT_THRESHOLD, placement_support_ratio};
use crate::types::{CenterOfMassCalculator, Dimensional, EPSILON_RESTING, Vec3};

pub const EMPTY_MAX: f64 = 40.0;
pub const BALANCE_MAX: f64 = 30.0;
pub const STABILITY_MAX: f64 = 30.0;
pub const FRAGILE_LIMIT: f64 = 10.0;

/// Fill ratio that already earns the full occupancy score.
const TARGET_OCCUPANCY: f64 = 0.75;
const BALANCE_EXPONENT: f64 = 1.6;
const UNDER_SUPPORT_PENALTY: f64 = 20.0;
/// Strongest top-heaviness reduction: the score never drops below 40% of its base.
const MIN_HEIGHT_FACTOR: f64 = 0.4;

const FRAGILE_TOP_BONUS: f64 = 2.0;
const FRAGILE_LIGHT_BONUS: f64 = 3.0;
const FRAGILE_HEAVY_PENALTY: f64 = 6.0;

/// Score components and their sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoreBreakdown {
    pub empty: f64,
    pub balance: f64,
    pub stability: f64,
    pub fragile_adjustment: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Builds a breakdown whose total is the plain sum of its components.
    pub fn from_components(empty: f64, balance: f64, stability: f64, fragile_adjustment: f64) -> Self {
        Self {
            empty,
            balance,
            stability,
            fragile_adjustment,
            total: empty + balance + stability + fragile_adjustment,
        }
    }
}

/// Mass-weighted centroid of a set of placements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct CenterOfMass {
    pub center: Vec3,
    pub total_mass: f64,
}

/// Weighted average of world centers by mass.
///
/// An empty set, or one without mass, yields the zero vector and zero total mass.
pub fn center_of_mass<P: Placement>(items: &[P]) -> CenterOfMass {
    let mut calc = CenterOfMassCalculator::new();
    for item in items {
        calc.add_point(item.world_center(), item.spec().mass_kg);
    }

    match calc.compute() {
        Some(center) => CenterOfMass {
            center,
            total_mass: calc.total_mass(),
        },
        None => CenterOfMass::default(),
    }
}

/// Occupancy score: `40 × clamp(occupied / total / 0.75, 0, 1)`.
pub fn empty_score(occupied_voxels: f64, total_voxels: f64) -> f64 {
    if total_voxels <= 0.0 {
        return 0.0;
    }
    let occupancy = occupied_voxels / total_voxels;
    let score = EMPTY_MAX * (occupancy / TARGET_OCCUPANCY).clamp(0.0, 1.0);
    if score.is_finite() { score } else { 0.0 }
}

/// Balance score with its normalized offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BalanceScore {
    pub score: f64,
    /// Chebyshev offset in `[0, 1]`.
    pub offset: f64,
}

/// Balance score for a horizontal center of mass `(x, z)`.
///
/// Each axis offset is normalized by the half extent and the larger one is used,
/// so touching either wall at its midpoint counts as full offset.
pub fn balance_score(center_x: f64, center_z: f64, basket: &Basket) -> BalanceScore {
    let (half_w, half_d) = basket.center_xz();
    if half_w <= 0.0 || half_d <= 0.0 {
        return BalanceScore {
            score: 0.0,
            offset: 1.0,
        };
    }

    let offset_x = (center_x - half_w).abs() / half_w;
    let offset_z = (center_z - half_d).abs() / half_d;
    let offset = offset_x.max(offset_z);
    let offset = if offset.is_finite() { offset.min(1.0) } else { 1.0 };

    BalanceScore {
        score: BALANCE_MAX * (1.0 - offset).powf(BALANCE_EXPONENT),
        offset,
    }
}

/// Stability score of the whole arrangement.
///
/// Base is the mass-weighted mean support ratio, each item checked against all
/// others. Items under `SUPPORT_THRESHOLD` add a penalty of
/// `20 × mean(threshold − ratio)` weighted by their mass. The result is then
/// scaled by `1 − 0.6 × (COM height / basket height)`, never below 0.4.
pub fn stability_score<P: Placement>(items: &[P], basket: &Basket) -> f64 {
    if items.is_empty() {
        return STABILITY_MAX;
    }

    let mut total_mass = 0.0;
    let mut weighted_support = 0.0;
    let mut under_mass = 0.0;
    let mut under_deficit = 0.0;

    for item in items {
        let mass = item.spec().mass_kg;
        let ratio = placement_support_ratio(item, items);
        total_mass += mass;
        weighted_support += ratio * mass;
        if ratio < SUPPORT_THRESHOLD {
            under_mass += mass;
            under_deficit += (SUPPORT_THRESHOLD - ratio) * mass;
        }
    }

    if total_mass <= 0.0 {
        return 0.0;
    }

    let base = STABILITY_MAX * weighted_support / total_mass;
    let penalty = if under_mass > 0.0 {
        UNDER_SUPPORT_PENALTY * under_deficit / under_mass
    } else {
        0.0
    };

    let com = center_of_mass(items);
    let height_ratio = if basket.height > 0.0 {
        (com.center.y / basket.height).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let height_factor = (1.0 - (1.0 - MIN_HEIGHT_FACTOR) * height_ratio).max(MIN_HEIGHT_FACTOR);

    let score = (base - penalty) * height_factor;
    if score.is_finite() {
        score.clamp(0.0, STABILITY_MAX)
    } else {
        0.0
    }
}

/// Adjustment for fragile items, clamped to `[-10, 10]`.
///
/// For every fragile item, the items resting on it are those overlapping it
/// horizontally with their bottom at or above its top (within 0.01):
/// - nothing on top and the item reaches within one unit of the lid: +2
/// - anything heavier on top: −6
/// - only lighter-or-equal items on top: +3
pub fn fragile_adjustment<P: Placement>(items: &[P], basket: &Basket) -> f64 {
    let mut adjustment = 0.0;

    for (index, fragile) in items.iter().enumerate() {
        if !fragile.spec().fragile {
            continue;
        }
        let fragile_box = fragile.bounding_box();
        let fragile_mass = fragile.spec().mass_kg;

        let mut resting = items
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, item)| item)
            .filter(|item| {
                let aabb = item.bounding_box();
                aabb.overlaps_horizontally(&fragile_box)
                    && aabb.min.y >= fragile_box.max.y - EPSILON_RESTING
            })
            .peekable();

        if resting.peek().is_none() {
            if fragile_box.max.y >= basket.height - 1.0 {
                adjustment += FRAGILE_TOP_BONUS;
            }
            continue;
        }

        if resting.any(|item| item.spec().mass_kg > fragile_mass) {
            adjustment -= FRAGILE_HEAVY_PENALTY;
        } else {
            adjustment += FRAGILE_LIGHT_BONUS;
        }
    }

    adjustment.clamp(-FRAGILE_LIMIT, FRAGILE_LIMIT)
}

/// Runs all four scorers over the committed placements.
///
/// With no mass present, balance is scored at the basket center.
pub fn evaluate_score<P: Placement>(items: &[P], basket: &Basket) -> ScoreBreakdown {
    let occupied: f64 = items.iter().map(|item| item.spec().volume()).sum();
    let empty = empty_score(occupied, basket.total_voxels());

    let com = center_of_mass(items);
    let (center_x, center_z) = if com.total_mass > 0.0 {
        (com.center.x, com.center.z)
    } else {
        basket.center_xz()
    };
    let balance = balance_score(center_x, center_z, basket).score;

    let stability = stability_score(items, basket);
    let fragile = fragile_adjustment(items, basket);

    let breakdown = ScoreBreakdown::from_components(empty, balance, stability, fragile);
    log::debug!(
        "scored {} items: empty {:.2}, balance {:.2}, stability {:.2}, fragile {:+.1}, total {:.2}",
        items.len(),
        breakdown.empty,
        breakdown.balance,
        breakdown.stability,
        breakdown.fragile_adjustment,
        breakdown.total
    );
    breakdown
}
