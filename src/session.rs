//! Placement session state machine.
//!
//! A `PlacementSession` owns everything a round needs: the queue of upcoming
//! items, the stock (hold) buffer, the committed placements, the ghost preview
//! and the countdown. It is mutated only through the actions below, each of which
//! returns whether it changed anything. Invalid actions are no-ops.
//!
//! Phases: `Start` → `Placing` → `Results` → (`Leaderboard` | `Placing` via restart) → `Start`.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::Catalog;
use crate::geometry::{clamp_to_bounds, collides, snap_to_grid};
use crate::model::{Basket, CandidatePlacement, GhostInstance, ItemSpec, PlacedInstance};
use crate::orientation::{Axis, Rotation, oriented_size};
use crate::scoring::{ScoreBreakdown, evaluate_score};
use crate::support::{Footprint, SUPPORT_THRESHOLD, resting_height, support_ratio};
use crate::types::Vec3;

/// Configuration of a round.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Container bounds for collision and scoring
    pub basket: Basket,
    /// Length of a round in milliseconds
    pub round_duration_ms: u64,
    /// Capacity of the stock (hold) buffer
    pub max_stock: usize,
}

impl SessionConfig {
    pub const DEFAULT_ROUND_DURATION_MS: u64 = 180_000;
    pub const DEFAULT_MAX_STOCK: usize = 7;

    /// Creates a builder for custom configuration.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            basket: Basket::default(),
            round_duration_ms: Self::DEFAULT_ROUND_DURATION_MS,
            max_stock: Self::DEFAULT_MAX_STOCK,
        }
    }
}

/// Builder for `SessionConfig`.
#[derive(Clone, Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Sets the basket dimensions.
    pub fn basket(mut self, basket: Basket) -> Self {
        self.config.basket = basket;
        self
    }

    /// Sets the round length.
    pub fn round_duration_ms(mut self, duration_ms: u64) -> Self {
        self.config.round_duration_ms = duration_ms;
        self
    }

    /// Sets the stock capacity.
    pub fn max_stock(mut self, max_stock: usize) -> Self {
        self.config.max_stock = max_stock;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

/// Screen-level phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Start,
    Placing,
    Results,
    Leaderboard,
}

/// Every mutation a host can request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionAction {
    StartGame,
    Restart,
    GoToLeaderboard,
    GoToStart,
    /// Pointer-projected position; snapped, clamped and dropped onto the support surface.
    SetGhostPosition { position: Vec3 },
    MoveGhostBy { dx: f64, dz: f64 },
    /// `direction` is a signed quarter-turn step (only its sign is used).
    RotateGhost { axis: Axis, direction: i8 },
    PlaceGhost,
    UndoLastPlacement,
    HoldCurrent,
    UseStockAt { index: usize },
    RemovePlacedItem { id: String },
    RequestScoring,
    Tick { delta_ms: u64 },
}

/// Scans grid cells height-major, then depth, then width, for the first collision-free cell.
///
/// Falls back to the origin when nothing fits.
pub fn find_spawn_position(
    spec: &ItemSpec,
    rotation: Rotation,
    placed: &[PlacedInstance],
    basket: &Basket,
) -> Vec3 {
    let oriented = oriented_size(spec.size, rotation);
    let max_x = (basket.width - oriented.x.round()) as i64;
    let max_y = (basket.height - oriented.y.round()) as i64;
    let max_z = (basket.depth - oriented.z.round()) as i64;

    for y in 0..=max_y {
        for z in 0..=max_z {
            for x in 0..=max_x {
                let position = Vec3::new(x as f64, y as f64, z as f64);
                let candidate = CandidatePlacement::new(spec, position, rotation);
                if !collides(&candidate, placed, basket) {
                    return position;
                }
            }
        }
    }

    log::warn!("no free cell for '{}', spawning at origin", spec.id);
    Vec3::zero()
}

/// A single round of the puzzle.
#[derive(Clone, Debug)]
pub struct PlacementSession {
    config: SessionConfig,
    catalog: Arc<Catalog>,
    phase: GamePhase,
    time_remaining_ms: u64,
    queue: VecDeque<String>,
    stock: Vec<String>,
    placed: Vec<PlacedInstance>,
    ghost: Option<GhostInstance>,
    score: Option<ScoreBreakdown>,
    instance_counter: u64,
}

impl PlacementSession {
    /// Creates a session on the start screen with the catalog's starter queue loaded.
    pub fn new(catalog: Arc<Catalog>, config: SessionConfig) -> Self {
        let queue = catalog.starter_queue().iter().cloned().collect();
        Self {
            config,
            catalog,
            phase: GamePhase::Start,
            time_remaining_ms: config.round_duration_ms,
            queue,
            stock: Vec::new(),
            placed: Vec::new(),
            ghost: None,
            score: None,
            instance_counter: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn basket(&self) -> &Basket {
        &self.config.basket
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn time_remaining_ms(&self) -> u64 {
        self.time_remaining_ms
    }

    pub fn queue(&self) -> &VecDeque<String> {
        &self.queue
    }

    pub fn stock(&self) -> &[String] {
        &self.stock
    }

    pub fn placed(&self) -> &[PlacedInstance] {
        &self.placed
    }

    pub fn ghost(&self) -> Option<&GhostInstance> {
        self.ghost.as_ref()
    }

    /// Frozen score of the last scoring transition, if any.
    pub fn score(&self) -> Option<&ScoreBreakdown> {
        self.score.as_ref()
    }

    /// Applies one action.
    ///
    /// # Returns
    /// `true` if the session changed, `false` for an ignored action
    pub fn apply(&mut self, action: SessionAction) -> bool {
        match action {
            SessionAction::StartGame => self.start_game(),
            SessionAction::Restart => self.restart(),
            SessionAction::GoToLeaderboard => self.go_to_leaderboard(),
            SessionAction::GoToStart => self.go_to_start(),
            SessionAction::SetGhostPosition { position } => self.set_ghost_position(position),
            SessionAction::MoveGhostBy { dx, dz } => self.move_ghost_by(dx, dz),
            SessionAction::RotateGhost { axis, direction } => self.rotate_ghost(axis, direction),
            SessionAction::PlaceGhost => self.place_ghost(),
            SessionAction::UndoLastPlacement => self.undo_last_placement(),
            SessionAction::HoldCurrent => self.hold_current(),
            SessionAction::UseStockAt { index } => self.use_stock_at(index),
            SessionAction::RemovePlacedItem { id } => self.remove_placed_item(&id),
            SessionAction::RequestScoring => self.request_scoring(),
            SessionAction::Tick { delta_ms } => self.tick(delta_ms),
        }
    }

    /// Start screen → placing with a fresh round.
    pub fn start_game(&mut self) -> bool {
        if self.phase != GamePhase::Start {
            return false;
        }
        self.reset_round();
        true
    }

    /// Discards the current round from any phase and begins a new one.
    pub fn restart(&mut self) -> bool {
        self.reset_round();
        true
    }

    pub fn go_to_leaderboard(&mut self) -> bool {
        self.transition(GamePhase::Results, GamePhase::Leaderboard)
    }

    pub fn go_to_start(&mut self) -> bool {
        if !matches!(self.phase, GamePhase::Results | GamePhase::Leaderboard) {
            return false;
        }
        log::debug!("{:?} -> Start", self.phase);
        self.phase = GamePhase::Start;
        true
    }

    fn transition(&mut self, from: GamePhase, to: GamePhase) -> bool {
        if self.phase != from {
            return false;
        }
        log::debug!("{:?} -> {:?}", from, to);
        self.phase = to;
        true
    }

    fn reset_round(&mut self) {
        self.instance_counter = 0;
        self.queue = self.catalog.starter_queue().iter().cloned().collect();
        self.stock.clear();
        self.placed.clear();
        self.score = None;
        self.time_remaining_ms = self.config.round_duration_ms;
        self.phase = GamePhase::Placing;
        self.ghost = self.ghost_for_queue_head();
        log::debug!("round started with {} queued items", self.queue.len());
    }

    /// Moves the ghost to a pointer-projected position.
    pub fn set_ghost_position(&mut self, point: Vec3) -> bool {
        if self.phase != GamePhase::Placing {
            return false;
        }
        let Some(ghost) = self.ghost.take() else {
            return false;
        };

        let snapped = snap_to_grid(point);
        let snapped = Vec3::new(snapped.x, ghost.position.y, snapped.z);
        let next = self.settle_ghost(ghost.spec, snapped, ghost.rotation);
        self.ghost = Some(next);
        true
    }

    /// Shifts the ghost horizontally by whole or partial grid steps.
    pub fn move_ghost_by(&mut self, dx: f64, dz: f64) -> bool {
        let Some(ghost) = self.ghost.as_ref() else {
            return false;
        };
        let target = ghost.position + Vec3::new(dx, 0.0, dz);
        self.set_ghost_position(target)
    }

    /// Steps one rotation axis, pivoting about the ghost's current world center.
    ///
    /// When an odd extent swaps with an even one the center cannot stay put on the
    /// grid; the corner then keeps its cell, so any step followed by its inverse
    /// returns the ghost to where it was.
    pub fn rotate_ghost(&mut self, axis: Axis, direction: i8) -> bool {
        if self.phase != GamePhase::Placing {
            return false;
        }
        let Some(ghost) = self.ghost.take() else {
            return false;
        };

        let next_rotation = ghost.rotation.rotated(axis, direction);
        let previous = oriented_size(ghost.spec.size, ghost.rotation);
        let next_size = oriented_size(ghost.spec.size, next_rotation);
        let shift = ((previous - next_size) * 0.5).map(f64::trunc);
        let recentered = snap_to_grid(ghost.position + shift);

        let next = self.settle_ghost(ghost.spec, recentered, next_rotation);
        self.ghost = Some(next);
        true
    }

    pub fn rotate_ghost_yaw(&mut self, direction: i8) -> bool {
        self.rotate_ghost(Axis::Yaw, direction)
    }

    pub fn rotate_ghost_pitch(&mut self, direction: i8) -> bool {
        self.rotate_ghost(Axis::Pitch, direction)
    }

    pub fn rotate_ghost_roll(&mut self, direction: i8) -> bool {
        self.rotate_ghost(Axis::Roll, direction)
    }

    /// Commits a valid ghost and advances the queue.
    pub fn place_ghost(&mut self) -> bool {
        if self.phase != GamePhase::Placing {
            return false;
        }
        let Some(ghost) = self.ghost.take_if(|ghost| ghost.is_valid) else {
            return false;
        };

        self.instance_counter += 1;
        let instance = PlacedInstance {
            id: format!("placed-{}", self.instance_counter),
            spec: ghost.spec,
            position: ghost.position,
            rotation: ghost.rotation,
        };
        log::debug!(
            "placed {} ({}) at ({}, {}, {})",
            instance.id,
            instance.spec.id,
            instance.position.x,
            instance.position.y,
            instance.position.z
        );
        self.placed.push(instance);
        self.queue.pop_front();
        self.score = None;
        self.ghost = self.ghost_for_queue_head();
        true
    }

    /// Returns the most recent placement to the front of the queue as the new ghost.
    pub fn undo_last_placement(&mut self) -> bool {
        if !matches!(self.phase, GamePhase::Placing | GamePhase::Results) {
            return false;
        }
        let Some(last) = self.placed.pop() else {
            return false;
        };

        self.queue.push_front(last.spec.id.clone());
        self.ghost = Some(self.create_ghost(last.spec, last.rotation));
        self.score = None;
        self.phase = GamePhase::Placing;
        true
    }

    /// Moves the current item into the stock buffer and advances the queue.
    pub fn hold_current(&mut self) -> bool {
        if self.phase != GamePhase::Placing || self.stock.len() >= self.config.max_stock {
            return false;
        }
        let Some(ghost) = self.ghost.take() else {
            return false;
        };

        self.queue.pop_front();
        self.stock.push(ghost.spec.id);
        self.score = None;
        self.ghost = self.ghost_for_queue_head();
        true
    }

    /// Recalls a held item to the front of the queue.
    pub fn use_stock_at(&mut self, index: usize) -> bool {
        if self.phase != GamePhase::Placing || index >= self.stock.len() {
            return false;
        }
        let Some(spec) = self.catalog.get(&self.stock[index]).cloned() else {
            return false;
        };

        let id = self.stock.remove(index);
        self.queue.push_front(id);
        self.score = None;
        self.ghost = Some(self.create_ghost(spec, Rotation::IDENTITY));
        true
    }

    /// Removes a committed instance and re-derives the ghost's validity in place.
    pub fn remove_placed_item(&mut self, id: &str) -> bool {
        if self.phase != GamePhase::Placing {
            return false;
        }
        let Some(position) = self.placed.iter().position(|item| item.id == id) else {
            return false;
        };

        self.placed.remove(position);
        self.score = None;
        if let Some(ghost) = self.ghost.take() {
            let next = self.validate_ghost(ghost.spec, ghost.position, ghost.rotation);
            self.ghost = Some(next);
        }
        true
    }

    /// Freezes the score and shows results. Requires an empty queue.
    pub fn request_scoring(&mut self) -> bool {
        if self.phase != GamePhase::Placing || !self.queue.is_empty() {
            return false;
        }
        self.finish_round();
        true
    }

    /// Advances the countdown; reaching zero scores the round.
    pub fn tick(&mut self, delta_ms: u64) -> bool {
        if self.phase != GamePhase::Placing {
            return false;
        }
        self.time_remaining_ms = self.time_remaining_ms.saturating_sub(delta_ms);
        if self.time_remaining_ms == 0 {
            log::debug!("time is up");
            self.finish_round();
        }
        true
    }

    fn finish_round(&mut self) {
        self.score = Some(evaluate_score(&self.placed, &self.config.basket));
        self.phase = GamePhase::Results;
    }

    fn ghost_for_queue_head(&self) -> Option<GhostInstance> {
        let id = self.queue.front()?;
        let Some(spec) = self.catalog.get(id) else {
            log::warn!("queued item '{}' is not in the catalog", id);
            return None;
        };
        Some(self.create_ghost(spec.clone(), Rotation::IDENTITY))
    }

    fn create_ghost(&self, spec: ItemSpec, rotation: Rotation) -> GhostInstance {
        create_ghost(spec, rotation, &self.placed, &self.config.basket)
    }

    fn settle_ghost(&self, spec: ItemSpec, position: Vec3, rotation: Rotation) -> GhostInstance {
        settle_ghost(spec, position, rotation, &self.placed, &self.config.basket)
    }

    fn validate_ghost(&self, spec: ItemSpec, position: Vec3, rotation: Rotation) -> GhostInstance {
        validate_ghost(spec, position, rotation, &self.placed, &self.config.basket)
    }
}

/// Spawns a ghost at the first free cell, then settles it onto the support surface.
pub fn create_ghost(
    spec: ItemSpec,
    rotation: Rotation,
    placed: &[PlacedInstance],
    basket: &Basket,
) -> GhostInstance {
    let spawn = find_spawn_position(&spec, rotation, placed, basket);
    settle_ghost(spec, snap_to_grid(spawn), rotation, placed, basket)
}

/// Clamps into the basket, drops to the resting height and derives validity.
pub fn settle_ghost(
    spec: ItemSpec,
    position: Vec3,
    rotation: Rotation,
    placed: &[PlacedInstance],
    basket: &Basket,
) -> GhostInstance {
    let clamped = clamp_to_bounds(position, &spec, rotation, basket);
    let y = resting_height(clamped.x, clamped.z, &spec, rotation, placed, basket);
    validate_ghost(spec, Vec3::new(clamped.x, y, clamped.z), rotation, placed, basket)
}

fn validate_ghost(
    spec: ItemSpec,
    position: Vec3,
    rotation: Rotation,
    placed: &[PlacedInstance],
    basket: &Basket,
) -> GhostInstance {
    let candidate = CandidatePlacement::new(&spec, position, rotation);
    let collision_free = !collides(&candidate, placed, basket);
    let footprint = Footprint::at(position, oriented_size(spec.size, rotation));
    let support = support_ratio(&footprint, position.y, placed);

    GhostInstance {
        is_valid: collision_free && support >= SUPPORT_THRESHOLD,
        support_ratio: support,
        spec,
        position,
        rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Placement, Shape};
    use crate::orientation::AxisRotation;

    fn spec(id: &str, size: (f64, f64, f64), mass: f64) -> ItemSpec {
        ItemSpec::new(id, id, Vec3::from(size), mass, Shape::Box).unwrap()
    }

    fn session_with(items: Vec<ItemSpec>, queue: &[&str]) -> PlacementSession {
        let queue = queue.iter().map(|id| id.to_string()).collect();
        let catalog = Catalog::new(items, queue).unwrap();
        let mut session = PlacementSession::new(Arc::new(catalog), SessionConfig::default());
        assert!(session.start_game());
        session
    }

    fn ghost(session: &PlacementSession) -> &GhostInstance {
        session.ghost().expect("ghost present")
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = SessionConfig::builder()
            .basket(Basket::new(6.0, 6.0, 6.0).unwrap())
            .round_duration_ms(1_000)
            .max_stock(2)
            .build();
        assert_eq!(config.basket.width, 6.0);
        assert_eq!(config.round_duration_ms, 1_000);
        assert_eq!(config.max_stock, 2);
        assert_eq!(SessionConfig::default().max_stock, 7);
    }

    #[test]
    fn new_session_waits_on_start_screen() {
        let catalog = Arc::new(Catalog::builtin());
        let session = PlacementSession::new(catalog.clone(), SessionConfig::default());
        assert_eq!(session.phase(), GamePhase::Start);
        assert!(session.ghost().is_none());
        assert_eq!(session.queue().len(), catalog.starter_queue().len());
    }

    #[test]
    fn first_ghost_spawns_at_origin_on_the_ground() {
        let session = session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube"]);
        let ghost = ghost(&session);
        assert_eq!(ghost.position, Vec3::zero());
        assert_eq!(ghost.support_ratio, 1.0);
        assert!(ghost.is_valid);
    }

    #[test]
    fn stacking_scenario() {
        let mut session =
            session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube", "cube"]);
        assert!(session.place_ghost());

        // next ghost spawns beside the first one
        assert_eq!(ghost(&session).position, Vec3::new(2.0, 0.0, 0.0));

        session.set_ghost_position(Vec3::new(0.0, 2.0, 0.0));
        let ghost = ghost(&session);
        assert_eq!(ghost.position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(ghost.support_ratio, 1.0);
        assert!(ghost.is_valid);

        assert!(session.place_ghost());
        assert_eq!(session.placed().len(), 2);
        assert!(session.ghost().is_none());
    }

    #[test]
    fn overhang_scenario_is_rejected() {
        let mut session = session_with(
            vec![spec("slab", (4.0, 1.0, 4.0), 3.0), spec("small", (2.0, 1.0, 2.0), 1.0)],
            &["slab", "small"],
        );
        assert!(session.place_ghost());

        session.set_ghost_position(Vec3::new(3.0, 1.0, 3.0));
        let ghost = ghost(&session);
        // y = 1 carries only 25% of the footprint, so the search falls back to the ground
        assert_eq!(ghost.position, Vec3::new(3.0, 0.0, 3.0));
        assert!(!ghost.is_valid);

        assert!(!session.place_ghost());
        assert_eq!(session.placed().len(), 1);
        assert_eq!(session.queue().len(), 1);
    }

    #[test]
    fn positions_snap_and_clamp() {
        let mut session = session_with(vec![spec("bar", (4.0, 1.0, 2.0), 1.0)], &["bar"]);

        session.set_ghost_position(Vec3::new(2.5, 7.0, 1.4));
        assert_eq!(ghost(&session).position, Vec3::new(3.0, 0.0, 1.0));

        session.set_ghost_position(Vec3::new(50.0, 0.0, -8.0));
        assert_eq!(ghost(&session).position, Vec3::new(8.0, 0.0, 0.0));

        session.move_ghost_by(-1.0, 2.0);
        assert_eq!(ghost(&session).position, Vec3::new(7.0, 0.0, 2.0));
    }

    #[test]
    fn rotation_pivots_and_cycles() {
        let mut session = session_with(vec![spec("bar", (4.0, 1.0, 2.0), 1.0)], &["bar"]);
        session.set_ghost_position(Vec3::new(4.0, 0.0, 3.0));
        let start = ghost(&session).clone();

        assert!(session.rotate_ghost_yaw(1));
        let turned = ghost(&session);
        assert_eq!(turned.rotation.yaw, AxisRotation::Deg90);
        assert_eq!(turned.oriented_size(), Vec3::new(2.0, 1.0, 4.0));
        // center (6, _, 4) is kept as pivot
        assert_eq!(turned.position, Vec3::new(5.0, 0.0, 2.0));

        for _ in 0..3 {
            session.rotate_ghost_yaw(1);
        }
        let back = ghost(&session);
        assert_eq!(back.rotation, start.rotation);
        assert_eq!(back.oriented_size(), start.oriented_size());
        assert_eq!(back.position, start.position);
    }

    #[test]
    fn odd_extent_rotation_is_reversible() {
        let mut session = session_with(vec![spec("loaf", (3.0, 2.0, 2.0), 0.4)], &["loaf"]);
        session.set_ghost_position(Vec3::new(4.0, 0.0, 3.0));
        let start = ghost(&session).position;

        session.rotate_ghost_yaw(1);
        assert_eq!(ghost(&session).oriented_size(), Vec3::new(2.0, 2.0, 3.0));
        session.rotate_ghost_yaw(-1);
        assert_eq!(ghost(&session).position, start);
        assert_eq!(ghost(&session).rotation, Rotation::IDENTITY);

        for _ in 0..8 {
            session.rotate_ghost_yaw(1);
        }
        assert_eq!(ghost(&session).position, start);

        session.rotate_ghost_pitch(1);
        session.rotate_ghost_roll(-1);
        session.rotate_ghost_roll(1);
        session.rotate_ghost_pitch(-1);
        assert_eq!(ghost(&session).position, start);
    }

    #[test]
    fn roll_changes_the_footprint() {
        let mut session = session_with(vec![spec("bottle", (1.0, 4.0, 1.0), 1.0)], &["bottle"]);
        assert!(session.rotate_ghost_roll(1));
        let ghost = ghost(&session);
        assert_eq!(ghost.oriented_size(), Vec3::new(4.0, 1.0, 1.0));
        assert_eq!(ghost.position.y, 0.0);
        assert!(ghost.is_valid);
    }

    #[test]
    fn undo_returns_item_with_its_rotation() {
        let mut session = session_with(
            vec![spec("bar", (4.0, 1.0, 2.0), 1.0), spec("cube", (1.0, 1.0, 1.0), 1.0)],
            &["bar", "cube"],
        );
        session.rotate_ghost_pitch(1);
        let rotation = ghost(&session).rotation;
        assert!(session.place_ghost());
        assert_eq!(ghost(&session).spec.id, "cube");

        assert!(session.undo_last_placement());
        assert!(session.placed().is_empty());
        assert_eq!(session.queue().iter().collect::<Vec<_>>(), ["bar", "cube"]);
        assert_eq!(ghost(&session).spec.id, "bar");
        assert_eq!(ghost(&session).rotation, rotation);

        assert!(!session.undo_last_placement());
    }

    #[test]
    fn hold_and_recall_from_stock() {
        let mut session = session_with(
            vec![spec("a", (1.0, 1.0, 1.0), 1.0), spec("b", (2.0, 1.0, 1.0), 1.0)],
            &["a", "b"],
        );

        assert!(session.hold_current());
        assert_eq!(session.stock(), ["a"]);
        assert_eq!(ghost(&session).spec.id, "b");
        assert_eq!(session.queue().len(), 1);

        assert!(!session.use_stock_at(3));
        assert!(session.use_stock_at(0));
        assert!(session.stock().is_empty());
        assert_eq!(session.queue().iter().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(ghost(&session).spec.id, "a");
    }

    #[test]
    fn hold_respects_capacity() {
        let catalog = Catalog::new(
            vec![spec("a", (1.0, 1.0, 1.0), 1.0)],
            vec!["a".to_string(); 4],
        )
        .unwrap();
        let config = SessionConfig::builder().max_stock(2).build();
        let mut session = PlacementSession::new(Arc::new(catalog), config);
        session.start_game();

        assert!(session.hold_current());
        assert!(session.hold_current());
        assert!(!session.hold_current());
        assert_eq!(session.stock().len(), 2);
        assert_eq!(session.queue().len(), 2);
    }

    #[test]
    fn hold_last_item_leaves_no_ghost() {
        let mut session = session_with(vec![spec("a", (1.0, 1.0, 1.0), 1.0)], &["a"]);
        assert!(session.hold_current());
        assert!(session.ghost().is_none());
        assert!(!session.hold_current());
    }

    #[test]
    fn scoring_requires_an_empty_queue() {
        let mut session = session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube"]);
        assert!(!session.request_scoring());
        assert_eq!(session.phase(), GamePhase::Placing);

        assert!(session.place_ghost());
        assert!(session.request_scoring());
        assert_eq!(session.phase(), GamePhase::Results);
        let score = session.score().expect("score frozen");
        assert_eq!(
            score.total,
            score.empty + score.balance + score.stability + score.fragile_adjustment
        );

        // ghost actions are ignored outside placing
        assert!(!session.place_ghost());
        assert!(!session.tick(1_000));
    }

    #[test]
    fn timer_expiry_forces_results() {
        let mut session = session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube", "cube"]);
        assert!(session.place_ghost());

        assert!(session.tick(179_000));
        assert_eq!(session.phase(), GamePhase::Placing);
        assert_eq!(session.time_remaining_ms(), 1_000);

        assert!(session.tick(5_000));
        assert_eq!(session.time_remaining_ms(), 0);
        assert_eq!(session.phase(), GamePhase::Results);
        let expected = evaluate_score(session.placed(), session.basket());
        assert_eq!(session.score(), Some(&expected));
    }

    #[test]
    fn phase_navigation() {
        let mut session = session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube"]);
        assert!(!session.go_to_leaderboard());
        assert!(!session.start_game());

        session.place_ghost();
        session.request_scoring();
        assert!(session.go_to_leaderboard());
        assert_eq!(session.phase(), GamePhase::Leaderboard);
        assert!(session.go_to_start());
        assert_eq!(session.phase(), GamePhase::Start);
        assert!(session.start_game());
        assert_eq!(session.phase(), GamePhase::Placing);
        assert!(session.placed().is_empty());
    }

    #[test]
    fn undo_from_results_resumes_placing() {
        let mut session = session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube"]);
        session.place_ghost();
        session.request_scoring();

        assert!(session.undo_last_placement());
        assert_eq!(session.phase(), GamePhase::Placing);
        assert!(session.score().is_none());
        assert!(session.ghost().is_some());
    }

    #[test]
    fn restart_resets_everything() {
        let mut session = session_with(
            vec![spec("cube", (2.0, 2.0, 2.0), 5.0)],
            &["cube", "cube", "cube"],
        );
        session.place_ghost();
        session.hold_current();
        session.tick(10_000);

        assert!(session.restart());
        assert!(session.placed().is_empty());
        assert!(session.stock().is_empty());
        assert_eq!(session.queue().len(), 3);
        assert_eq!(session.time_remaining_ms(), 180_000);

        session.place_ghost();
        assert_eq!(session.placed()[0].id, "placed-1");
    }

    #[test]
    fn remove_placed_item_revalidates_ghost() {
        let mut session = session_with(
            vec![spec("cube", (2.0, 2.0, 2.0), 5.0)],
            &["cube", "cube", "cube"],
        );
        session.place_ghost();
        session.set_ghost_position(Vec3::new(0.0, 0.0, 0.0));
        let stacked = ghost(&session).clone();
        assert_eq!(stacked.position.y, 2.0);
        assert!(stacked.is_valid);

        assert!(session.remove_placed_item("placed-1"));
        let floating = ghost(&session);
        assert_eq!(floating.position, stacked.position);
        assert_eq!(floating.support_ratio, 0.0);
        assert!(!floating.is_valid);

        assert!(!session.remove_placed_item("placed-1"));
    }

    #[test]
    fn placed_instances_stay_inside_the_basket() {
        let catalog = Arc::new(Catalog::builtin());
        let mut session = PlacementSession::new(catalog, SessionConfig::default());
        session.start_game();

        let targets = [(0.0, 0.0), (5.5, 3.2), (11.0, 8.0), (-4.0, 20.0), (6.0, 4.0)];
        let mut step = 0;
        while session.ghost().is_some() && step < 200 {
            let (x, z) = targets[step % targets.len()];
            session.set_ghost_position(Vec3::new(x, 0.0, z));
            if step % 3 == 0 {
                session.rotate_ghost_yaw(1);
            }
            if !session.place_ghost() {
                // items that do not fit here go to stock
                session.hold_current();
            }
            step += 1;
        }

        let extent = session.basket().extent();
        assert!(!session.placed().is_empty());
        for item in session.placed() {
            let aabb = item.bounding_box();
            assert!(aabb.min.x >= 0.0 && aabb.min.y >= 0.0 && aabb.min.z >= 0.0);
            assert!(aabb.max.x <= extent.x && aabb.max.y <= extent.y && aabb.max.z <= extent.z);
        }
    }

    #[test]
    fn create_ghost_settles_on_existing_items() {
        let basket = Basket::new(2.0, 6.0, 2.0).unwrap();
        let cube = spec("cube", (2.0, 2.0, 2.0), 1.0);
        let placed = vec![PlacedInstance {
            id: "placed-1".to_string(),
            spec: cube.clone(),
            position: Vec3::zero(),
            rotation: Rotation::IDENTITY,
        }];

        let ghost = create_ghost(cube, Rotation::IDENTITY, &placed, &basket);
        assert_eq!(ghost.position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(ghost.support_ratio, 1.0);
        assert!(ghost.is_valid);
    }

    #[test]
    fn spawn_search_falls_back_to_origin() {
        let basket = Basket::new(2.0, 2.0, 2.0).unwrap();
        let cube = spec("cube", (2.0, 2.0, 2.0), 1.0);
        let occupied = vec![PlacedInstance {
            id: "placed-1".to_string(),
            spec: cube.clone(),
            position: Vec3::zero(),
            rotation: Rotation::IDENTITY,
        }];
        assert_eq!(
            find_spawn_position(&cube, Rotation::IDENTITY, &occupied, &basket),
            Vec3::zero()
        );

        let big = spec("big", (3.0, 1.0, 1.0), 1.0);
        assert_eq!(find_spawn_position(&big, Rotation::IDENTITY, &[], &basket), Vec3::zero());
    }

    #[test]
    fn actions_deserialize_from_tagged_json() {
        let action: SessionAction =
            serde_json::from_str(r#"{"type":"rotate_ghost","axis":"pitch","direction":-1}"#).unwrap();
        assert_eq!(
            action,
            SessionAction::RotateGhost {
                axis: Axis::Pitch,
                direction: -1
            }
        );

        let action: SessionAction =
            serde_json::from_str(r#"{"type":"set_ghost_position","position":{"x":1.0,"y":0.0,"z":2.0}}"#)
                .unwrap();
        assert_eq!(
            action,
            SessionAction::SetGhostPosition {
                position: Vec3::new(1.0, 0.0, 2.0)
            }
        );

        let mut session = session_with(vec![spec("cube", (2.0, 2.0, 2.0), 5.0)], &["cube"]);
        assert!(session.apply(SessionAction::PlaceGhost));
        assert!(session.apply(SessionAction::RequestScoring));
        assert_eq!(session.phase(), GamePhase::Results);
    }
}
