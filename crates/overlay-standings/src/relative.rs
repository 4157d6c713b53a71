//! Fixed-width relative window around the player.
//!
//! Vehicles are ordered by circular track distance to the player, largest
//! first, so slot 0 is the car furthest ahead. The player sits after
//! `3 + front` slots and the remaining `4 + behind` slots start with the
//! player itself. Near either end of the sorted field the window borrows
//! entries from the opposite end, so the list reads as a loop around the
//! track.

use racing_overlay_telemetry::{FieldSnapshot, circular_relative_distance};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Slots always shown in front of the player.
pub const BASE_FRONT_SLOTS: usize = 3;
/// Slots always shown from the player backwards, player included.
pub const BASE_BEHIND_SLOTS: usize = 4;
/// Upper bound for either configured additional slot count.
pub const MAX_ADDITIONAL_SLOTS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativeConfig {
    pub additional_players_front: i64,
    pub additional_players_behind: i64,
    /// Keep cars parked in the garage listed during a race.
    pub show_vehicle_in_garage_for_race: bool,
}

impl RelativeConfig {
    pub fn window(&self) -> RelativeWindow {
        RelativeWindow::new(self.additional_players_front, self.additional_players_behind)
    }
}

/// Clamped slot counts of a relative window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelativeWindow {
    front: usize,
    behind: usize,
}

impl RelativeWindow {
    /// Clamps each side to `0..=60`.
    pub fn new(additional_front: i64, additional_behind: i64) -> Self {
        Self {
            front: clamp_slots(additional_front),
            behind: clamp_slots(additional_behind),
        }
    }

    pub fn front_slots(&self) -> usize {
        BASE_FRONT_SLOTS + self.front
    }

    pub fn behind_slots(&self) -> usize {
        BASE_BEHIND_SLOTS + self.behind
    }

    /// Total number of slots, `7 + front + behind`.
    pub fn slot_count(&self) -> usize {
        self.front_slots() + self.behind_slots()
    }
}

fn clamp_slots(value: i64) -> usize {
    usize::try_from(value.clamp(0, MAX_ADDITIONAL_SLOTS)).unwrap_or(0)
}

/// A vehicle and its signed distance to the player, positive when ahead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeEntry {
    pub index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelativeOutput {
    /// Every eligible vehicle, furthest ahead first.
    pub sorted: Vec<RelativeEntry>,
    /// Window slots, `None` where no vehicle fills the slot.
    pub indices: Vec<Option<usize>>,
}

impl RelativeOutput {
    pub fn player_slot(&self, player_index: usize) -> Option<usize> {
        self.indices.iter().position(|slot| *slot == Some(player_index))
    }
}

/// Rebuilds the relative list from scratch every tick.
#[derive(Debug, Clone, Default)]
pub struct RelativeOrderBuilder {
    window: RelativeWindow,
    show_garage_in_race: bool,
}

impl RelativeOrderBuilder {
    pub fn new(config: &RelativeConfig) -> Self {
        Self {
            window: config.window(),
            show_garage_in_race: config.show_vehicle_in_garage_for_race,
        }
    }

    pub fn window(&self) -> RelativeWindow {
        self.window
    }

    pub fn build(&self, field: &FieldSnapshot) -> RelativeOutput {
        let sorted = relative_distances(field, self.show_garage_in_race);
        let order: Vec<usize> = sorted.iter().map(|entry| entry.index).collect();
        let indices = relative_window(&order, field.player_index, self.window);
        RelativeOutput { sorted, indices }
    }
}

/// Signed circular distance of every eligible vehicle to the player.
///
/// Sorted by distance descending; equal distances order by index descending.
/// Garage-parked cars drop out only during a race, unless configured to stay.
pub fn relative_distances(field: &FieldSnapshot, show_garage_in_race: bool) -> Vec<RelativeEntry> {
    let player_distance = field.player().map_or(0.0, |player| player.lap_distance);
    let hide_garage = field.in_race && !show_garage_in_race;

    let mut entries: Vec<RelativeEntry> = field
        .vehicles
        .iter()
        .filter(|vehicle| !hide_garage || !vehicle.in_garage)
        .map(|vehicle| RelativeEntry {
            index: vehicle.index,
            distance: circular_relative_distance(
                field.track_length,
                player_distance,
                vehicle.lap_distance,
            ),
        })
        .collect();

    entries.sort_by(|a, b| match b.distance.total_cmp(&a.distance) {
        Ordering::Equal => b.index.cmp(&a.index),
        other => other,
    });
    entries
}

/// Cuts the player-centred window out of a sorted index list.
///
/// The list is padded with empty slots up to the window length first, so the
/// result always has exactly `window.slot_count()` entries. When the player is not
/// in the list the window is taken around the first entry.
pub fn relative_window(
    order: &[usize],
    player_index: usize,
    window: RelativeWindow,
) -> Vec<Option<usize>> {
    let mut padded: Vec<Option<usize>> = order.iter().copied().map(Some).collect();
    if padded.len() < window.slot_count() {
        padded.resize(window.slot_count(), None);
    }
    let total = padded.len();
    let player_pos = order
        .iter()
        .position(|&index| index == player_index)
        .unwrap_or(0);

    let front_slots = window.front_slots();
    let front_start = player_pos.saturating_sub(front_slots);
    let front_cut = padded.get(front_start..player_pos).unwrap_or_default();
    let front_missing = front_slots.saturating_sub(front_cut.len());
    let front_wrap = padded
        .get(total.saturating_sub(front_missing)..)
        .unwrap_or_default();

    let behind_slots = window.behind_slots();
    let behind_end = (player_pos + behind_slots).min(total);
    let behind_cut = padded.get(player_pos..behind_end).unwrap_or_default();
    let behind_missing = behind_slots.saturating_sub(behind_cut.len());
    let behind_wrap = padded.get(..behind_missing).unwrap_or_default();

    let mut indices = Vec::with_capacity(window.slot_count());
    indices.extend_from_slice(front_wrap);
    indices.extend_from_slice(front_cut);
    indices.extend_from_slice(behind_cut);
    indices.extend_from_slice(behind_wrap);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use racing_overlay_telemetry::VehicleSnapshot;

    fn field_with(distances: &[f64], player_index: usize) -> FieldSnapshot {
        FieldSnapshot {
            track_length: 1000.0,
            player_index,
            in_race: true,
            vehicles: distances
                .iter()
                .enumerate()
                .map(|(index, &lap_distance)| VehicleSnapshot {
                    index,
                    lap_distance,
                    ..VehicleSnapshot::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_window_clamps_slots() {
        assert_eq!(RelativeWindow::new(-5, 100).slot_count(), 7 + 60);
        assert_eq!(RelativeWindow::new(0, 0).slot_count(), 7);
        assert_eq!(RelativeWindow::new(2, 1).front_slots(), 5);
    }

    #[test]
    fn test_sorted_furthest_ahead_first() {
        let field = field_with(&[500.0, 600.0, 400.0, 900.0], 0);
        let sorted = relative_distances(&field, false);
        let order: Vec<usize> = sorted.iter().map(|e| e.index).collect();
        // 900 is 400 ahead, within half a lap.
        assert_eq!(order, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_ties_order_by_index_descending() {
        let field = field_with(&[100.0, 200.0, 200.0], 0);
        let order: Vec<usize> = relative_distances(&field, false)
            .iter()
            .map(|e| e.index)
            .collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_garage_cars_hidden_only_in_race() {
        let mut field = field_with(&[100.0, 150.0, 200.0], 0);
        if let Some(vehicle) = field.vehicles.get_mut(2) {
            vehicle.in_garage = true;
        }
        assert_eq!(relative_distances(&field, false).len(), 2);
        assert_eq!(relative_distances(&field, true).len(), 3);

        field.in_race = false;
        assert_eq!(relative_distances(&field, false).len(), 3);
    }

    #[test]
    fn test_front_wraps_from_tail() {
        let order: Vec<usize> = (0..20).collect();
        let window = RelativeWindow::new(0, 0);
        let indices = relative_window(&order, 2, window);

        assert_eq!(indices.len(), 7);
        assert_eq!(
            indices,
            vec![Some(19), Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
    }

    #[test]
    fn test_behind_wraps_from_head() {
        let order: Vec<usize> = (0..10).collect();
        let indices = relative_window(&order, 8, RelativeWindow::new(0, 0));
        assert_eq!(
            indices,
            vec![Some(5), Some(6), Some(7), Some(8), Some(9), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_small_field_padded() {
        let order = vec![4, 7, 9];
        let indices = relative_window(&order, 4, RelativeWindow::new(0, 0));
        assert_eq!(
            indices,
            vec![None, None, None, Some(4), Some(7), Some(9), None]
        );
    }

    #[test]
    fn test_empty_field_all_empty_slots() {
        let indices = relative_window(&[], 0, RelativeWindow::new(1, 2));
        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(Option::is_none));
    }

    #[test]
    fn test_missing_player_falls_back_to_first() {
        let order: Vec<usize> = (0..10).collect();
        let indices = relative_window(&order, 42, RelativeWindow::new(0, 0));
        assert_eq!(indices.get(3), Some(&Some(0)));
    }

    #[test]
    fn test_builder_centres_player() {
        let distances: Vec<f64> = (0..12).map(|i| f64::from(i) * 50.0).collect();
        let field = field_with(&distances, 6);
        let builder = RelativeOrderBuilder::new(&RelativeConfig {
            additional_players_front: 1,
            additional_players_behind: 1,
            show_vehicle_in_garage_for_race: false,
        });
        let output = builder.build(&field);

        assert_eq!(output.indices.len(), 9);
        assert_eq!(output.player_slot(6), Some(4));
        assert_eq!(output.indices.get(3), Some(&Some(7)));
        assert_eq!(output.indices.get(5), Some(&Some(5)));
    }

    #[test]
    fn test_config_defaults_from_partial_json() -> Result<(), serde_json::Error> {
        let config: RelativeConfig = serde_json::from_str(r#"{"additional_players_front": 2}"#)?;
        assert_eq!(config.window().slot_count(), 9);
        assert!(!config.show_vehicle_in_garage_for_race);
        Ok(())
    }
}
