//! Best-score table shown on the results screen
//!
//! Top ten runs, kept in LocalStorage. Autopilot runs are recorded but
//! flagged so the page can tell them apart.

use serde::{Deserialize, Serialize};

pub const MAX_HIGH_SCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Layers placed on top of the base
    pub score: u32,
    #[serde(default)]
    pub autopilot: bool,
    /// Unix timestamp (ms)
    pub timestamp: f64,
}

/// Entries sorted best first; ties keep the older run ahead
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "stack_tower_highscores";

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finished run; returns its 1-based rank if it made the table
    pub fn record(&mut self, score: u32, autopilot: bool, timestamp: f64) -> Option<usize> {
        if score == 0 {
            return None;
        }
        let index = self.entries.partition_point(|e| e.score >= score);
        if index >= MAX_HIGH_SCORES {
            return None;
        }
        self.entries.insert(
            index,
            HighScoreEntry {
                score,
                autopilot,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(index + 1)
    }

    pub fn best(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse stored JSON, dropping anything past the table size
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut scores: HighScores = serde_json::from_str(json)?;
        scores
            .entries
            .sort_by(|a, b| b.score.cmp(&a.score).then(a.timestamp.total_cmp(&b.timestamp)));
        scores.entries.truncate(MAX_HIGH_SCORES);
        Ok(scores)
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let stored = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten());

        match stored.map(|json| Self::from_json(&json)) {
            Some(Ok(scores)) => {
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Some(Err(e)) => {
                log::warn!("Discarding unreadable high scores: {e}");
                Self::new()
            }
            None => Self::new(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            match serde_json::to_string(self) {
                Ok(json) => {
                    let _ = storage.set_item(Self::STORAGE_KEY, &json);
                }
                Err(e) => log::warn!("Could not save high scores: {e}"),
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_never_records() {
        let mut scores = HighScores::new();
        assert_eq!(scores.record(0, false, 1.0), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_sorted_best_first_with_stable_ties() {
        let mut scores = HighScores::new();
        assert_eq!(scores.record(5, false, 1.0), Some(1));
        assert_eq!(scores.record(9, false, 2.0), Some(1));
        assert_eq!(scores.record(5, true, 3.0), Some(3));

        let order: Vec<(u32, f64)> = scores.entries.iter().map(|e| (e.score, e.timestamp)).collect();
        assert_eq!(order, vec![(9, 2.0), (5, 1.0), (5, 3.0)]);
        assert_eq!(scores.best(), Some(9));
    }

    #[test]
    fn test_table_is_capped() {
        let mut scores = HighScores::new();
        for i in 1..=MAX_HIGH_SCORES as u32 {
            scores.record(i * 10, false, i as f64);
        }
        // Ties with the last entry don't displace it
        assert_eq!(scores.record(10, false, 99.0), None);
        assert_eq!(scores.record(15, false, 99.0), Some(MAX_HIGH_SCORES));
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries.last().unwrap().score, 15);
    }

    #[test]
    fn test_from_json_sorts_and_tolerates_missing_flag() {
        let json = r#"{"entries":[{"score":3,"timestamp":1.0},{"score":7,"timestamp":2.0}]}"#;
        let scores = HighScores::from_json(json).unwrap();
        assert_eq!(scores.best(), Some(7));
        assert!(!scores.entries[0].autopilot);
        assert!(HighScores::from_json("not json").is_err());
    }
}
