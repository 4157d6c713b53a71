//! Bounded per-lap consumption history, newest first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Entries kept before the oldest is dropped.
pub const HISTORY_CAPACITY: usize = 100;

/// A lap is recorded once the new lap has run at least this long, in seconds.
pub const HISTORY_RECORD_DELAY: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionHistoryEntry {
    /// Zero-based lap number; -1 for the placeholder entry.
    pub lap_number: i64,
    pub is_valid: bool,
    pub lap_time: f64,
    pub fuel_used: f64,
    pub energy_used: f64,
    pub battery_drain: f64,
    pub battery_regen: f64,
}

/// Readings checked on every tick to decide whether a lap just finished.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryProbe {
    pub completed_laps: u32,
    pub is_valid_lap: bool,
    pub last_lap_time: f64,
    pub current_lap_time: f64,
    pub fuel_used: f64,
    pub energy_used: f64,
    pub battery_drain: f64,
    pub battery_regen: f64,
}

#[derive(Debug, Clone)]
pub struct ConsumptionHistory {
    entries: VecDeque<ConsumptionHistoryEntry>,
    max_size: usize,
}

impl Default for ConsumptionHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl ConsumptionHistory {
    /// Creates a history holding a single zeroed entry.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        let mut entries = VecDeque::with_capacity(max_size);
        entries.push_front(ConsumptionHistoryEntry {
            lap_number: -1,
            ..Default::default()
        });
        Self { entries, max_size }
    }

    /// Records the just-finished lap if the probe shows one. Returns whether
    /// an entry was added.
    pub fn record(&mut self, probe: &HistoryProbe) -> bool {
        let newest_lap_time = self.newest().map_or(0.0, |e| e.lap_time);
        let finished = newest_lap_time.total_cmp(&probe.last_lap_time).is_ne()
            && probe.last_lap_time > probe.current_lap_time
            && probe.current_lap_time > HISTORY_RECORD_DELAY;
        if !finished {
            return false;
        }

        if self.entries.len() >= self.max_size {
            self.entries.pop_back();
        }
        self.entries.push_front(ConsumptionHistoryEntry {
            lap_number: i64::from(probe.completed_laps) - 1,
            is_valid: probe.is_valid_lap,
            lap_time: probe.last_lap_time,
            fuel_used: probe.fuel_used,
            energy_used: probe.energy_used,
            battery_drain: probe.battery_drain,
            battery_regen: probe.battery_regen,
        });
        true
    }

    pub fn newest(&self) -> Option<&ConsumptionHistoryEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsumptionHistoryEntry> {
        self.entries.iter()
    }

    /// Copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<ConsumptionHistoryEntry> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(completed_laps: u32, last_lap_time: f64, current_lap_time: f64) -> HistoryProbe {
        HistoryProbe {
            completed_laps,
            is_valid_lap: true,
            last_lap_time,
            current_lap_time,
            fuel_used: 2.5,
            energy_used: 4.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_with_placeholder() {
        let history = ConsumptionHistory::default();
        assert_eq!(history.len(), 1);
        assert_eq!(history.newest().map(|e| e.lap_number), Some(-1));
    }

    #[test]
    fn test_records_once_per_lap_after_delay() {
        let mut history = ConsumptionHistory::default();
        // Too soon after the line.
        assert!(!history.record(&probe(1, 90.0, 1.0)));
        assert!(history.record(&probe(1, 90.0, 2.5)));
        // Same lap seen again.
        assert!(!history.record(&probe(1, 90.0, 3.0)));
        assert!(history.record(&probe(2, 91.0, 2.1)));

        let laps: Vec<i64> = history.iter().map(|e| e.lap_number).collect();
        assert_eq!(laps, vec![1, 0, -1]);
    }

    #[test]
    fn test_no_record_without_completed_lap() {
        let mut history = ConsumptionHistory::default();
        assert!(!history.record(&probe(0, 0.0, 30.0)));
        assert!(!history.record(&probe(0, -1.0, 30.0)));
    }

    #[test]
    fn test_bounded_and_newest_first() {
        let mut history = ConsumptionHistory::new(3);
        for lap in 1..=5u32 {
            assert!(history.record(&probe(lap, 80.0 + f64::from(lap), 5.0)));
        }
        assert_eq!(history.len(), 3);
        let laps: Vec<i64> = history.to_vec().iter().map(|e| e.lap_number).collect();
        assert_eq!(laps, vec![4, 3, 2]);
    }
}
