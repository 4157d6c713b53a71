//! Property-based tests for the shared distance helpers.

use proptest::prelude::*;
use racing_overlay_telemetry::{circular_relative_distance, strip_invalid_chars};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_relative_distance_within_half_lap(
        length in 100.0f64..20_000.0,
        player_frac in 0.0f64..1.0,
        other_frac in 0.0f64..1.0,
    ) {
        let player = player_frac * length;
        let other = other_frac * length;
        let rel = circular_relative_distance(length, player, other);
        prop_assert!(rel.abs() <= length * 0.5 + 1e-9);
    }

    #[test]
    fn prop_relative_distance_is_antisymmetric(
        length in 100.0f64..20_000.0,
        player_frac in 0.0f64..1.0,
        other_frac in 0.0f64..1.0,
    ) {
        let player = player_frac * length;
        let other = other_frac * length;
        let forward = circular_relative_distance(length, player, other);
        let backward = circular_relative_distance(length, other, player);
        // Exactly half a lap apart may resolve to the same sign from both ends.
        prop_assume!((forward.abs() - length * 0.5).abs() > 1e-6);
        prop_assert!((forward + backward).abs() < 1e-6);
    }

    #[test]
    fn prop_stripped_names_have_no_separators(name in ".{0,40}") {
        let cleaned = strip_invalid_chars(&name);
        prop_assert!(!cleaned.contains('/'));
        prop_assert!(!cleaned.contains('\\'));
        prop_assert!(!cleaned.contains(':'));
    }
}
