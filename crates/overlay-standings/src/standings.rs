//! Windowed standings with an optional per-class split.
//!
//! Windowing works on abstract 1-based places: `reference_places` decides
//! which places are visible and the caller maps each visible place back to
//! the vehicle holding it. The same routine serves the combined list and
//! every class block of the split view.

use crate::class::{ClassPosition, PlaceIndex, class_positions, is_multi_class, place_index_list};
use racing_overlay_telemetry::FieldSnapshot;
use serde::{Deserialize, Serialize};

/// Bounds for the protected top band.
pub const MIN_TOP_BAND: usize = 1;
pub const MAX_TOP_BAND: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandingsConfig {
    /// Leading places that are always shown.
    pub min_top_vehicles: usize,
    pub enable_multi_class_split_mode: bool,
    pub max_vehicles_combined_mode: usize,
    /// Limit for the class the player races in.
    pub max_vehicles_per_split_player: usize,
    /// Limit for every other class.
    pub max_vehicles_per_split_others: usize,
}

impl Default for StandingsConfig {
    fn default() -> Self {
        Self {
            min_top_vehicles: 3,
            enable_multi_class_split_mode: true,
            max_vehicles_combined_mode: 20,
            max_vehicles_per_split_player: 7,
            max_vehicles_per_split_others: 3,
        }
    }
}

impl StandingsConfig {
    pub fn top_band(&self) -> usize {
        self.min_top_vehicles.clamp(MIN_TOP_BAND, MAX_TOP_BAND)
    }

    pub fn combined_limit(&self) -> usize {
        self.max_vehicles_combined_mode.max(self.top_band() + 2)
    }

    pub fn player_class_limit(&self) -> usize {
        self.max_vehicles_per_split_player.max(self.top_band() + 2)
    }

    pub fn other_class_limit(&self) -> usize {
        self.max_vehicles_per_split_others.max(self.top_band())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StandingsOutput {
    /// In-class standing of every vehicle, grouped by class.
    pub class_positions: Vec<ClassPosition>,
    /// Every vehicle by overall place.
    pub place_index: Vec<PlaceIndex>,
    /// Visible vehicles in display order, `None` closing each block.
    pub indices: Vec<Option<usize>>,
    pub multi_class: bool,
}

/// Places visible for a list of `total` cars.
///
/// `player_place` is 1-based, or 0 when the player is not in this list. The
/// top `top` places are always kept. When the player is outside that band
/// and the list overflows `limit`, the remaining slots go to a block around
/// the player, alternating front then rear so an odd slot lands in front.
/// Places beyond `total` may appear in the first case and are dropped by
/// the caller.
pub fn reference_places(top: usize, total: usize, limit: usize, player_place: usize) -> Vec<usize> {
    if player_place <= top || total <= limit {
        return (1..=limit).collect();
    }

    let block_size = limit.saturating_sub(top);
    let mut places: Vec<usize> = (1..=top).collect();
    places.push(player_place);
    let mut count = 1;
    for step in 0..block_size {
        if count >= block_size {
            break;
        }
        if let Some(front) = player_place.checked_sub(1 + step)
            && front > top
        {
            places.push(front);
            count += 1;
            if count >= block_size {
                break;
            }
        }
        let rear = player_place + 1 + step;
        if rear <= total {
            places.push(rear);
            count += 1;
        }
    }
    places.sort_unstable();
    places
}

/// Maps visible places of one ordered list to vehicle indices, closed by a gap.
fn standings_block(top: usize, limit: usize, player_place: usize, order: &[usize]) -> Vec<Option<usize>> {
    if order.is_empty() {
        return Vec::new();
    }
    let mut block: Vec<Option<usize>> = reference_places(top, order.len(), limit, player_place)
        .into_iter()
        .filter_map(|place| place.checked_sub(1).and_then(|slot| order.get(slot)))
        .map(|&index| Some(index))
        .collect();
    block.push(None);
    block
}

/// Rebuilds the standings lists from scratch every tick.
#[derive(Debug, Clone, Default)]
pub struct StandingsBuilder {
    config: StandingsConfig,
}

impl StandingsBuilder {
    pub fn new(config: StandingsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StandingsConfig {
        &self.config
    }

    pub fn build(&self, field: &FieldSnapshot) -> StandingsOutput {
        let class_positions = class_positions(field);
        let place_index = place_index_list(field);
        let multi_class = is_multi_class(field);

        let indices = if multi_class && self.config.enable_multi_class_split_mode {
            self.split_indices(&class_positions, field.player_index)
        } else {
            self.combined_indices(&place_index, field.player_index)
        };

        StandingsOutput {
            class_positions,
            place_index,
            indices,
            multi_class,
        }
    }

    fn combined_indices(&self, place_index: &[PlaceIndex], player_index: usize) -> Vec<Option<usize>> {
        let order: Vec<usize> = place_index.iter().map(|entry| entry.index).collect();
        let player_place = order
            .iter()
            .position(|&index| index == player_index)
            .map_or(0, |slot| slot + 1);
        standings_block(
            self.config.top_band(),
            self.config.combined_limit(),
            player_place,
            &order,
        )
    }

    /// One block per class, fastest class first.
    fn split_indices(&self, positions: &[ClassPosition], player_index: usize) -> Vec<Option<usize>> {
        let mut groups: Vec<&[ClassPosition]> = positions
            .chunk_by(|a, b| a.class_name == b.class_name)
            .collect();
        groups.sort_by(|a, b| {
            let best_a = a.first().map_or(f64::INFINITY, |p| p.class_best);
            let best_b = b.first().map_or(f64::INFINITY, |p| p.class_best);
            best_a.total_cmp(&best_b)
        });

        let top = self.config.top_band();
        let mut indices = Vec::new();
        for group in groups {
            let order: Vec<usize> = group.iter().map(|p| p.index).collect();
            let player_place = group
                .iter()
                .find(|p| p.index == player_index)
                .and_then(|p| usize::try_from(p.position_in_class).ok())
                .unwrap_or(0);
            let limit = if player_place > 0 {
                self.config.player_class_limit()
            } else {
                self.config.other_class_limit()
            };
            indices.extend(standings_block(top, limit, player_place, &order));
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racing_overlay_telemetry::VehicleSnapshot;

    fn grid(classes: &[(&str, f64)], cars_per_class: usize, player_index: usize) -> FieldSnapshot {
        let mut vehicles = Vec::new();
        let mut place = 0_u32;
        for (class_name, best) in classes {
            for _ in 0..cars_per_class {
                place += 1;
                vehicles.push(VehicleSnapshot {
                    index: vehicles.len(),
                    class_name: (*class_name).to_string(),
                    place,
                    best_lap_time: best + f64::from(place) * 0.1,
                    ..VehicleSnapshot::default()
                });
            }
        }
        FieldSnapshot {
            track_length: 5000.0,
            player_index,
            in_race: true,
            vehicles,
        }
    }

    #[test]
    fn test_config_limits_clamped() {
        let config = StandingsConfig {
            min_top_vehicles: 10,
            enable_multi_class_split_mode: true,
            max_vehicles_combined_mode: 2,
            max_vehicles_per_split_player: 1,
            max_vehicles_per_split_others: 0,
        };
        assert_eq!(config.top_band(), 5);
        assert_eq!(config.combined_limit(), 7);
        assert_eq!(config.player_class_limit(), 7);
        assert_eq!(config.other_class_limit(), 5);

        let zero_top = StandingsConfig {
            min_top_vehicles: 0,
            ..StandingsConfig::default()
        };
        assert_eq!(zero_top.top_band(), 1);
    }

    #[test]
    fn test_small_field_shows_all() {
        assert_eq!(reference_places(3, 10, 20, 8), (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_player_in_top_band_shows_leading_block() {
        assert_eq!(reference_places(3, 30, 7, 2), (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_player_block_centred() {
        let places = reference_places(3, 30, 20, 15);
        let mut expected: Vec<usize> = vec![1, 2, 3];
        expected.extend(7..=23);
        assert_eq!(places, expected);
    }

    #[test]
    fn test_uneven_block_favours_front() {
        // Four slots around the player: two in front, one behind.
        assert_eq!(reference_places(3, 30, 7, 15), vec![1, 2, 3, 13, 14, 15, 16]);
    }

    #[test]
    fn test_player_near_end_fills_from_front() {
        let places = reference_places(3, 30, 10, 29);
        let mut expected: Vec<usize> = vec![1, 2, 3];
        expected.extend(24..=30);
        assert_eq!(places, expected);
    }

    #[test]
    fn test_player_last_place_visible() {
        let places = reference_places(3, 30, 10, 30);
        assert!(places.contains(&30));
        assert_eq!(places.len(), 10);
    }

    #[test]
    fn test_combined_mode_maps_places() {
        let field = grid(&[("GT3", 95.0)], 30, 20);
        let output = StandingsBuilder::default().build(&field);

        assert!(!output.multi_class);
        assert_eq!(output.indices.len(), 21);
        assert!(output.indices.contains(&Some(20)));
        assert_eq!(output.indices.last(), Some(&None));
        assert_eq!(output.indices.first(), Some(&Some(0)));
    }

    #[test]
    fn test_split_mode_orders_classes_by_best() {
        // GT3 listed first on the grid but LMP2 is faster.
        let field = grid(&[("GT3", 95.0), ("LMP2", 88.0)], 10, 4);
        let output = StandingsBuilder::default().build(&field);

        assert!(output.multi_class);
        let expected = vec![
            Some(10),
            Some(11),
            Some(12),
            None,
            Some(0),
            Some(1),
            Some(2),
            Some(3),
            Some(4),
            Some(5),
            Some(6),
            None,
        ];
        assert_eq!(output.indices, expected);
    }

    #[test]
    fn test_split_disabled_uses_combined() {
        let field = grid(&[("GT3", 95.0), ("LMP2", 88.0)], 4, 0);
        let builder = StandingsBuilder::new(StandingsConfig {
            enable_multi_class_split_mode: false,
            ..StandingsConfig::default()
        });
        let output = builder.build(&field);

        assert!(output.multi_class);
        assert_eq!(output.indices.iter().filter(|slot| slot.is_none()).count(), 1);
        assert_eq!(output.indices.len(), 9);
    }

    #[test]
    fn test_empty_field() {
        let output = StandingsBuilder::default().build(&FieldSnapshot::default());
        assert!(output.indices.is_empty());
        assert!(output.class_positions.is_empty());
    }
}
