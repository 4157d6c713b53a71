//! Distance-indexed consumption curves.
//!
//! A curve maps track position (meters from the start line) to the amount
//! used since the start of the lap. A completed lap ends with a synthetic
//! terminal knot placed [`TERMINAL_POSITION_OFFSET`] past the last recorded
//! position, carrying the lap's total used amount and its lap time.

use crate::error::CurveError;
use serde::{Deserialize, Serialize};

/// Distance added past the last recorded sample for the terminal knot.
pub const TERMINAL_POSITION_OFFSET: f64 = 10.0;

/// Shortest curve worth persisting or loading.
pub const MIN_PERSISTED_ROWS: usize = 10;

/// Leading rows inspected for stale lap-start positions on load.
const LEADING_ROWS_CHECKED: usize = 11;

/// One knot of a consumption curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSample {
    pub position: f64,
    pub used: f64,
}

impl ConsumptionSample {
    pub const ZERO: Self = Self {
        position: 0.0,
        used: 0.0,
    };

    pub fn new(position: f64, used: f64) -> Self {
        Self { position, used }
    }
}

/// Persisted form of a knot. Only the terminal row carries a lap time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveRow {
    pub position: f64,
    pub used: f64,
    pub lap_time: Option<f64>,
}

/// The most recent validated lap.
///
/// Samples are sorted ascending by position. The value is never mutated
/// after construction; a newly validated lap replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLap {
    samples: Vec<ConsumptionSample>,
    lap_time: f64,
}

impl Default for ReferenceLap {
    fn default() -> Self {
        Self::zero()
    }
}

impl ReferenceLap {
    /// Placeholder used until a lap has been validated or loaded.
    pub fn zero() -> Self {
        Self {
            samples: vec![ConsumptionSample::ZERO],
            lap_time: 0.0,
        }
    }

    /// Closes a recorded lap with its terminal knot.
    ///
    /// `samples` must already be sorted by position. The tracker only
    /// records a sample past the furthest one already recorded, so its laps
    /// satisfy this even when the car rolls backwards. The terminal knot
    /// never lands before the last recorded sample.
    pub fn from_completed_lap(
        mut samples: Vec<ConsumptionSample>,
        last_position: f64,
        used_total: f64,
        lap_time: f64,
    ) -> Self {
        let last_recorded = samples.last().map_or(last_position, |s| s.position);
        samples.push(ConsumptionSample::new(
            last_position.max(last_recorded) + TERMINAL_POSITION_OFFSET,
            used_total,
        ));
        Self { samples, lap_time }
    }

    /// Rebuilds a lap from persisted rows.
    ///
    /// Rows among the leading samples that sit beyond half of the lap and
    /// ahead of the row that follows them are stale positions left over from
    /// the previous lap, and are removed. In-order rows are always kept, so
    /// any curve written by [`ReferenceLap::to_rows`] loads back unchanged.
    /// The number of removed rows is returned so the caller can re-save the
    /// cleaned curve.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError`] when fewer than [`MIN_PERSISTED_ROWS`] rows
    /// remain, the terminal total drops below the preceding row, the terminal
    /// lap time is missing, a value is not finite, or positions decrease.
    pub fn from_rows(mut rows: Vec<CurveRow>) -> Result<(Self, usize), CurveError> {
        let (Some(terminal), Some(preceding)) = (
            rows.last().copied(),
            rows.len().checked_sub(2).and_then(|i| rows.get(i)).copied(),
        ) else {
            return Err(CurveError::TooFewRows {
                count: rows.len(),
                min: MIN_PERSISTED_ROWS,
            });
        };
        if terminal.used < preceding.used {
            return Err(CurveError::DecreasingTotal {
                terminal: terminal.used,
                preceding: preceding.used,
            });
        }
        let lap_time = terminal.lap_time.ok_or(CurveError::MissingLapTime)?;

        let removed = remove_stale_leading_rows(&mut rows, terminal.position * 0.5);
        if rows.len() < MIN_PERSISTED_ROWS {
            return Err(CurveError::TooFewRows {
                count: rows.len(),
                min: MIN_PERSISTED_ROWS,
            });
        }

        let mut samples = Vec::with_capacity(rows.len());
        let mut previous = f64::NEG_INFINITY;
        for (row, entry) in rows.iter().enumerate() {
            if !entry.position.is_finite() || !entry.used.is_finite() || !lap_time.is_finite() {
                return Err(CurveError::NonFinite { row });
            }
            if entry.position < previous {
                return Err(CurveError::UnsortedPosition {
                    row,
                    position: entry.position,
                });
            }
            previous = entry.position;
            samples.push(ConsumptionSample::new(entry.position, entry.used));
        }

        Ok((Self { samples, lap_time }, removed))
    }

    pub fn to_rows(&self) -> Vec<CurveRow> {
        let last = self.samples.len().saturating_sub(1);
        self.samples
            .iter()
            .enumerate()
            .map(|(i, s)| CurveRow {
                position: s.position,
                used: s.used,
                lap_time: (i == last).then_some(self.lap_time),
            })
            .collect()
    }

    pub fn samples(&self) -> &[ConsumptionSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Amount used over the whole lap.
    pub fn used_total(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.used)
    }

    pub fn lap_time(&self) -> f64 {
        self.lap_time
    }

    /// Whether this lap has never been validated or loaded.
    pub fn is_placeholder(&self) -> bool {
        self.samples.len() < 2
    }

    /// Amount the reference lap had used at `position`.
    ///
    /// Interpolates between the bracketing knots and extrapolates along the
    /// last segment past the final knot. Returns `None` when no segment
    /// brackets the position, which includes the single-knot placeholder.
    pub fn expected_used_at(&self, position: f64) -> Option<f64> {
        let last = self.samples.len().checked_sub(1)?;
        let higher = self
            .samples
            .partition_point(|s| s.position < position)
            .min(last);
        let lower = higher.checked_sub(1)?;
        let a = self.samples.get(lower)?;
        let b = self.samples.get(higher)?;
        Some(linear_interp(position, a, b))
    }

    /// Used amount so far this lap minus the reference at the same position.
    pub fn delta(&self, position: f64, used: f64) -> f64 {
        self.expected_used_at(position)
            .map_or(0.0, |expected| used - expected)
    }
}

fn linear_interp(x: f64, a: &ConsumptionSample, b: &ConsumptionSample) -> f64 {
    let span = b.position - a.position;
    if span.abs() <= f64::EPSILON {
        return a.used;
    }
    a.used + (b.used - a.used) * (x - a.position) / span
}

/// Drops leading rows that sit past half a lap and ahead of their successor.
///
/// Walks backwards so a run of stale rows is compared against the first
/// in-order row that follows it.
fn remove_stale_leading_rows(rows: &mut Vec<CurveRow>, half_lap: f64) -> usize {
    let upper = LEADING_ROWS_CHECKED.min(rows.len().saturating_sub(2));
    let mut removed = 0;
    for idx in (1..=upper).rev() {
        let stale = match (rows.get(idx), rows.get(idx + 1)) {
            (Some(row), Some(next)) => row.position > half_lap && row.position > next.position,
            _ => false,
        };
        if stale {
            rows.remove(idx);
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn even_rows(count: usize, spacing: f64, used_per_row: f64, lap_time: f64) -> Vec<CurveRow> {
        let mut rows: Vec<CurveRow> = (0..count)
            .map(|i| CurveRow {
                position: i as f64 * spacing,
                used: i as f64 * used_per_row,
                lap_time: None,
            })
            .collect();
        if let Some(last) = rows.last_mut() {
            last.lap_time = Some(lap_time);
        }
        rows
    }

    #[test]
    fn test_interpolates_between_bracketing_knots() -> TestResult {
        let lap = ReferenceLap::from_completed_lap(
            vec![ConsumptionSample::ZERO, ConsumptionSample::new(500.0, 2.0)],
            1000.0,
            4.0,
            90.0,
        );
        assert!(close(lap.used_total(), 4.0));
        assert!(close(lap.lap_time(), 90.0));
        let expected = lap.expected_used_at(750.0).ok_or("no bracket")?;
        assert!(close(expected, 2.0 + 2.0 * 250.0 / 510.0));
        assert!((expected - 2.98).abs() < 0.01);
        Ok(())
    }

    #[test]
    fn test_extrapolates_past_last_knot() -> TestResult {
        let lap = ReferenceLap::from_completed_lap(
            vec![ConsumptionSample::ZERO, ConsumptionSample::new(100.0, 1.0)],
            190.0,
            2.0,
            30.0,
        );
        // Last segment runs from (100, 1.0) to (200, 2.0).
        let expected = lap.expected_used_at(300.0).ok_or("no bracket")?;
        assert!(close(expected, 3.0));
        Ok(())
    }

    #[test]
    fn test_placeholder_has_zero_delta() {
        let lap = ReferenceLap::zero();
        assert!(lap.is_placeholder());
        assert_eq!(lap.expected_used_at(500.0), None);
        assert!(close(lap.delta(500.0, 3.2), 0.0));
    }

    #[test]
    fn test_delta_at_lap_start_is_zero() {
        let lap = ReferenceLap::from_completed_lap(
            vec![ConsumptionSample::ZERO, ConsumptionSample::new(500.0, 2.0)],
            1000.0,
            4.0,
            90.0,
        );
        assert!(close(lap.delta(0.0, 0.0), 0.0));
    }

    #[test]
    fn test_terminal_never_precedes_last_sample() -> TestResult {
        // Lap distance was reset below the last recorded sample.
        let lap = ReferenceLap::from_completed_lap(
            vec![ConsumptionSample::ZERO, ConsumptionSample::new(50.0, 0.5)],
            0.0,
            0.9,
            10.0,
        );
        let terminal = lap.samples().last().ok_or("no terminal")?;
        assert!(close(terminal.position, 60.0));
        let expected = lap.expected_used_at(50.0).ok_or("no bracket")?;
        assert!(close(expected, 0.5));
        Ok(())
    }

    #[test]
    fn test_rows_round_trip_through_reference() -> TestResult {
        let rows = even_rows(40, 50.0, 0.1, 88.5);
        let (lap, removed) = ReferenceLap::from_rows(rows.clone())?;
        assert_eq!(removed, 0);
        assert_eq!(lap.to_rows(), rows);
        assert!(close(lap.lap_time(), 88.5));
        Ok(())
    }

    #[test]
    fn test_rejects_decreasing_terminal() {
        let mut rows = even_rows(20, 50.0, 0.1, 60.0);
        if let Some(last) = rows.last_mut() {
            last.used = 0.0;
        }
        assert!(matches!(
            ReferenceLap::from_rows(rows),
            Err(CurveError::DecreasingTotal { .. })
        ));
    }

    #[test]
    fn test_rejects_short_and_empty_curves() {
        assert!(matches!(
            ReferenceLap::from_rows(Vec::new()),
            Err(CurveError::TooFewRows { count: 0, .. })
        ));
        assert!(matches!(
            ReferenceLap::from_rows(even_rows(5, 50.0, 0.1, 60.0)),
            Err(CurveError::TooFewRows { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_lap_time() {
        let mut rows = even_rows(20, 50.0, 0.1, 60.0);
        if let Some(last) = rows.last_mut() {
            last.lap_time = None;
        }
        assert_eq!(
            ReferenceLap::from_rows(rows),
            Err(CurveError::MissingLapTime)
        );
    }

    #[test]
    fn test_removes_stale_leading_positions() -> TestResult {
        let mut rows = even_rows(40, 50.0, 0.1, 60.0);
        // Stale value from the end of the previous lap.
        if let Some(row) = rows.get_mut(1) {
            row.position = 1900.0;
        }
        let (lap, removed) = ReferenceLap::from_rows(rows)?;
        assert_eq!(removed, 1);
        assert_eq!(lap.len(), 39);
        assert!(lap.samples().windows(2).all(|w| match w {
            [a, b] => a.position <= b.position,
            _ => true,
        }));
        Ok(())
    }

    #[test]
    fn test_keeps_short_even_curve_on_load() -> TestResult {
        let samples: Vec<ConsumptionSample> = (0..11)
            .map(|i| ConsumptionSample::new(f64::from(i) * 100.0, f64::from(i) * 0.2))
            .collect();
        let lap = ReferenceLap::from_completed_lap(samples, 1000.0, 2.1, 62.0);
        assert_eq!(lap.len(), 12);

        let (loaded, removed) = ReferenceLap::from_rows(lap.to_rows())?;
        assert_eq!(removed, 0);
        assert_eq!(loaded, lap);
        Ok(())
    }

    #[test]
    fn test_removes_run_of_stale_leading_positions() -> TestResult {
        let mut rows = even_rows(30, 50.0, 0.1, 60.0);
        rows.splice(1..1, [1380.0, 1390.0].map(|position| CurveRow {
            position,
            used: 0.0,
            lap_time: None,
        }));
        let (lap, removed) = ReferenceLap::from_rows(rows)?;
        assert_eq!(removed, 2);
        assert_eq!(lap.to_rows(), even_rows(30, 50.0, 0.1, 60.0));
        Ok(())
    }

    #[test]
    fn test_rejects_unsorted_positions() {
        let mut rows = even_rows(40, 50.0, 0.1, 60.0);
        if let Some(row) = rows.get_mut(20) {
            row.position = 10.0;
        }
        assert!(matches!(
            ReferenceLap::from_rows(rows),
            Err(CurveError::UnsortedPosition { row: 20, .. })
        ));
    }
}
