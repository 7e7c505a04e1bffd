//! In-memory leaderboard.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

/// Maximum number of entries kept.
pub const LEADERBOARD_CAPACITY: usize = 100;

/// Maximum length of a player name in characters.
pub const MAX_NAME_LENGTH: usize = 24;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "name": "Mika", "score": 87.5, "date": 1760601600000u64 }))]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: f64,
    /// Submission time in milliseconds since the Unix epoch
    pub date: u64,
}

/// Scores sorted descending, ties keep submission order.
#[derive(Clone, Debug, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a score and trims the table to `LEADERBOARD_CAPACITY`.
    ///
    /// Names are trimmed and truncated; a blank name is stored as "Anonymous".
    ///
    /// # Returns
    /// Zero-based rank of the new entry, or `None` if it did not make the table
    pub fn submit(&mut self, name: &str, score: f64, date: u64) -> Option<usize> {
        let name = normalize_name(name);
        let rank = self.entries.partition_point(|entry| entry.score >= score);
        if rank >= LEADERBOARD_CAPACITY {
            return None;
        }

        self.entries
            .insert(rank, LeaderboardEntry { name, score, date });
        self.entries.truncate(LEADERBOARD_CAPACITY);
        Some(rank)
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "Anonymous".to_string();
    }
    trimmed.chars().take(MAX_NAME_LENGTH).collect()
}
