//! Running order derivation for the racing overlay core.
//!
//! Every tick the builders rebuild their lists from a fresh field snapshot;
//! nothing is patched incrementally. Empty slots and class gaps are `None`.
//!
//! ## Modules
//! - `relative` - Fixed-width window of cars nearest the player on track
//! - `class` - Per-class positions and the overall place list
//! - `standings` - Windowed standings, combined or split by class

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod class;
pub mod relative;
pub mod standings;

pub use class::{ClassPosition, MISSING_LAP_TIME, PlaceIndex, class_positions, is_multi_class, place_index_list};
pub use relative::{RelativeConfig, RelativeEntry, RelativeOrderBuilder, RelativeOutput, RelativeWindow};
pub use standings::{StandingsBuilder, StandingsConfig, StandingsOutput, reference_places};

/// Converts an index list to the `-1`-for-empty form used by renderers.
pub fn to_sentinel_indices(indices: &[Option<usize>]) -> Vec<i64> {
    indices
        .iter()
        .map(|slot| slot.and_then(|i| i64::try_from(i).ok()).unwrap_or(-1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_conversion() {
        assert_eq!(to_sentinel_indices(&[Some(3), None, Some(0)]), vec![3, -1, 0]);
        assert!(to_sentinel_indices(&[]).is_empty());
    }
}
