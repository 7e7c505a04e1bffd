//! Placement and scoring engine for a 3D basket-packing puzzle.
//!
//! Items from a catalog are dropped one at a time into a grid-aligned basket.
//! The engine decides where a previewed item may rest, rejects overlaps and
//! overhangs, and scores the final arrangement for fill, balance, stability and
//! the care taken with fragile items.

pub mod api;
pub mod catalog;
pub mod config;
pub mod geometry;
pub mod leaderboard;
pub mod model;
pub mod orientation;
pub mod scoring;
pub mod session;
pub mod support;
pub mod types;
