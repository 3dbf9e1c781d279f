//! crates/calmmind_core/src/mood.rs
//!
//! Mood tracking: the live current/previous score pair, significant-change
//! detection, and statistics over stored entries.

use chrono::Utc;

use crate::domain::{Entry, MoodDirection, MoodEntry, MoodState};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// One of the three fixed mood bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodBand {
    Low,
    Medium,
    High,
}

impl MoodBand {
    pub fn label(&self) -> &'static str {
        match self {
            MoodBand::Low => "low",
            MoodBand::Medium => "medium",
            MoodBand::High => "high",
        }
    }

    /// Descriptive phrase used in the instruction preamble.
    pub fn context(&self) -> &'static str {
        match self {
            MoodBand::Low => "low - struggling, needs gentle support and validation",
            MoodBand::Medium => {
                "medium - managing, could use encouragement and coping strategies"
            }
            MoodBand::High => {
                "high - doing well, maintain positive momentum and build resilience"
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MoodBand::Low => "struggling (needs gentle support)",
            MoodBand::Medium => "managing (could use encouragement)",
            MoodBand::High => "doing well (maintain momentum)",
        }
    }

    pub fn encouragement(&self) -> &'static str {
        match self {
            MoodBand::Low => "Take it easy. Be gentle with yourself today.",
            MoodBand::Medium => "You're managing. Keep going, one step at a time.",
            MoodBand::High => "Great to see you doing well! Keep it up.",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MoodBand::Low => "😔",
            MoodBand::Medium => "😐",
            MoodBand::High => "😊",
        }
    }
}

/// Low is 1-3, medium 4-7, high 8-10. Scores outside the range fall into the nearest band.
pub fn mood_band(score: u8) -> MoodBand {
    match score {
        0..=3 => MoodBand::Low,
        4..=7 => MoodBand::Medium,
        _ => MoodBand::High,
    }
}

/// Whether `score` lies on the 1-10 scale. The tracker itself never checks this.
pub fn is_valid_score(score: u8) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

/// Outcome of recording a mood score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodChange {
    pub changed: bool,
    pub direction: MoodDirection,
}

/// Holds the live mood state and the in-session history of readings.
#[derive(Debug, Clone, Default)]
pub struct MoodTracker {
    state: MoodState,
    history: Vec<MoodEntry>,
}

impl MoodTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new score. The caller is responsible for keeping it in 1-10.
    pub fn record_mood(&mut self, score: u8) -> MoodChange {
        self.state = MoodState {
            previous: self.state.current,
            current: score,
        };
        self.history.push(MoodEntry {
            score,
            timestamp: Utc::now(),
        });

        let changed = self.state.is_significant_change();
        MoodChange {
            changed,
            direction: if changed {
                self.state.direction()
            } else {
                MoodDirection::None
            },
        }
    }

    /// Seeds both scores from a loaded entry, so no change is pending.
    pub fn seed(&mut self, score: u8) {
        self.state = MoodState::seeded(score);
    }

    pub fn state(&self) -> MoodState {
        self.state
    }

    pub fn current(&self) -> u8 {
        self.state.current
    }

    pub fn history(&self) -> &[MoodEntry] {
        &self.history
    }
}

/// Aggregate statistics shown next to the mood tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodStats {
    pub total_entries: usize,
    pub average_mood: Option<u8>,
}

impl MoodStats {
    pub fn from_entries(entries: &[Entry]) -> Self {
        Self {
            total_entries: total_entry_count(entries),
            average_mood: average_mood(entries),
        }
    }
}

/// Mean mood over entries that carry one, rounded; `None` when no entry has a score.
pub fn average_mood(entries: &[Entry]) -> Option<u8> {
    let scores: Vec<u32> = entries
        .iter()
        .filter_map(|e| e.mood_score.map(u32::from))
        .collect();
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<u32>() as f64 / scores.len() as f64;
    Some(mean.round() as u8)
}

pub fn total_entry_count(entries: &[Entry]) -> usize {
    entries.len()
}
