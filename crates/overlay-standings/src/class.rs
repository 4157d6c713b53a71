//! Per-class positions and the overall place list.

use racing_overlay_telemetry::{FieldSnapshot, VehicleSnapshot};
use serde::Serialize;
use std::collections::BTreeSet;

/// Stand-in lap time for a car without a valid best lap.
pub const MISSING_LAP_TIME: f64 = 99999.0;

/// A vehicle's standing within its own class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPosition {
    pub index: usize,
    /// 1-based position among cars of the same class.
    pub position_in_class: u32,
    pub class_name: String,
    /// Fastest valid lap of the whole session.
    pub session_best: f64,
    /// Fastest valid lap within this class.
    pub class_best: f64,
    /// Next car up the class order.
    pub ahead: Option<usize>,
    /// Next car down the class order.
    pub behind: Option<usize>,
}

/// Overall place of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaceIndex {
    pub place: u32,
    pub index: usize,
}

fn best_or_missing(vehicle: &VehicleSnapshot) -> f64 {
    if vehicle.best_lap_time > 0.0 {
        vehicle.best_lap_time
    } else {
        MISSING_LAP_TIME
    }
}

/// Whether more than one distinct class is on track.
pub fn is_multi_class(field: &FieldSnapshot) -> bool {
    let classes: BTreeSet<&str> = field
        .vehicles
        .iter()
        .map(|vehicle| vehicle.class_name.as_str())
        .collect();
    classes.len() > 1
}

/// Every vehicle by overall place; ties on place order by index.
pub fn place_index_list(field: &FieldSnapshot) -> Vec<PlaceIndex> {
    let mut places: Vec<PlaceIndex> = field
        .vehicles
        .iter()
        .map(|vehicle| PlaceIndex {
            place: vehicle.place,
            index: vehicle.index,
        })
        .collect();
    places.sort_by_key(|entry| (entry.place, entry.index));
    places
}

/// Assigns in-class positions and neighbours, returned in class order.
///
/// Cars are grouped by class name and ordered by overall place within each
/// group. Positions are sequential from 1 in every class regardless of gaps
/// in the overall places.
pub fn class_positions(field: &FieldSnapshot) -> Vec<ClassPosition> {
    let mut ordered: Vec<&VehicleSnapshot> = field.vehicles.iter().collect();
    ordered.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then(a.place.cmp(&b.place))
            .then(a.index.cmp(&b.index))
    });

    let session_best = ordered
        .iter()
        .map(|vehicle| best_or_missing(vehicle))
        .min_by(f64::total_cmp)
        .unwrap_or(MISSING_LAP_TIME);

    let mut positions = Vec::with_capacity(ordered.len());
    for group in ordered.chunk_by(|a, b| a.class_name == b.class_name) {
        let class_best = group
            .iter()
            .map(|vehicle| best_or_missing(vehicle))
            .min_by(f64::total_cmp)
            .unwrap_or(MISSING_LAP_TIME);

        let mut position_in_class = 0_u32;
        for (slot, vehicle) in group.iter().enumerate() {
            position_in_class += 1;
            let ahead = slot
                .checked_sub(1)
                .and_then(|prev| group.get(prev))
                .map(|v| v.index);
            let behind = group.get(slot + 1).map(|v| v.index);
            positions.push(ClassPosition {
                index: vehicle.index,
                position_in_class,
                class_name: vehicle.class_name.clone(),
                session_best,
                class_best,
                ahead,
                behind,
            });
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(index: usize, class_name: &str, place: u32, best: f64) -> VehicleSnapshot {
        VehicleSnapshot {
            index,
            class_name: class_name.to_string(),
            place,
            best_lap_time: best,
            ..VehicleSnapshot::default()
        }
    }

    fn field(vehicles: Vec<VehicleSnapshot>) -> FieldSnapshot {
        FieldSnapshot {
            track_length: 3000.0,
            player_index: 0,
            in_race: true,
            vehicles,
        }
    }

    #[test]
    fn test_positions_sequential_per_class() {
        let snapshot = field(vec![
            car(0, "GT3", 3, 95.0),
            car(1, "LMP2", 1, 88.0),
            car(2, "GT3", 2, 94.5),
            car(3, "LMP2", 4, 0.0),
            car(4, "GT3", 5, -1.0),
        ]);
        let positions = class_positions(&snapshot);
        let summary: Vec<(usize, u32)> = positions
            .iter()
            .map(|p| (p.index, p.position_in_class))
            .collect();
        assert_eq!(summary, vec![(2, 1), (0, 2), (4, 3), (1, 1), (3, 2)]);
    }

    #[test]
    fn test_neighbours_stay_within_class() {
        let snapshot = field(vec![
            car(0, "GT3", 3, 95.0),
            car(1, "LMP2", 1, 88.0),
            car(2, "GT3", 2, 94.5),
        ]);
        let positions = class_positions(&snapshot);
        let leader = positions.iter().find(|p| p.index == 2);
        assert_eq!(leader.and_then(|p| p.ahead), None);
        assert_eq!(leader.and_then(|p| p.behind), Some(0));
        let prototype = positions.iter().find(|p| p.index == 1);
        assert_eq!(prototype.and_then(|p| p.behind), None);
    }

    #[test]
    fn test_best_times() {
        let snapshot = field(vec![
            car(0, "GT3", 1, 95.0),
            car(1, "GT3", 2, 0.0),
            car(2, "LMP2", 3, 88.0),
        ]);
        let positions = class_positions(&snapshot);
        for position in &positions {
            assert!((position.session_best - 88.0).abs() < 1e-9);
        }
        let gt3 = positions.iter().find(|p| p.index == 1);
        assert!(gt3.is_some_and(|p| (p.class_best - 95.0).abs() < 1e-9));
    }

    #[test]
    fn test_no_valid_laps_uses_placeholder() {
        let snapshot = field(vec![car(0, "GT3", 1, 0.0)]);
        let positions = class_positions(&snapshot);
        assert!(positions.first().is_some_and(|p| {
            (p.session_best - MISSING_LAP_TIME).abs() < 1e-9
                && (p.class_best - MISSING_LAP_TIME).abs() < 1e-9
        }));
    }

    #[test]
    fn test_multi_class_detection() {
        assert!(!is_multi_class(&field(vec![car(0, "GT3", 1, 0.0), car(1, "GT3", 2, 0.0)])));
        assert!(is_multi_class(&field(vec![car(0, "GT3", 1, 0.0), car(1, "LMP2", 2, 0.0)])));
        assert!(!is_multi_class(&field(Vec::new())));
    }

    #[test]
    fn test_place_list_sorted() {
        let snapshot = field(vec![car(5, "GT3", 2, 0.0), car(3, "GT3", 1, 0.0), car(1, "GT3", 3, 0.0)]);
        let places: Vec<usize> = place_index_list(&snapshot).iter().map(|p| p.index).collect();
        assert_eq!(places, vec![3, 5, 1]);
    }
}
