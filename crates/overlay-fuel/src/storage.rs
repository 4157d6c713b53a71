//! Per-combo persistence of reference laps.
//!
//! Each combo gets one plain-text file of comma-separated numeric rows,
//! `position,used` with the terminal row extended to
//! `position,used,lap_time`. No header.

use crate::curve::{CurveRow, MIN_PERSISTED_ROWS, ReferenceLap};
use crate::error::{Result, StorageError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads and writes reference laps under a base directory.
#[derive(Debug, Clone)]
pub struct CurveStore {
    base_dir: PathBuf,
    extension: String,
}

impl CurveStore {
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File holding the reference lap for `combo`.
    pub fn path_for(&self, combo: &str) -> PathBuf {
        self.base_dir.join(format!("{combo}.{}", self.extension))
    }

    /// Loads the reference lap for `combo`.
    ///
    /// Stale leading rows are dropped and the cleaned curve is written back.
    /// A failed re-save is logged and does not fail the load.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadFailed`] when the file cannot be read (see
    /// [`StorageError::is_missing`]), [`StorageError::MalformedRow`] when a
    /// line is not two or three numbers, and [`StorageError::InvalidCurve`]
    /// when the rows do not form a usable curve.
    pub fn load(&self, combo: &str) -> Result<ReferenceLap> {
        let path = self.path_for(combo);
        debug!(path = ?path, "Loading reference lap");
        let content = fs::read_to_string(&path).map_err(|source| StorageError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let rows = parse_rows(&path, &content)?;
        let (lap, removed) =
            ReferenceLap::from_rows(rows).map_err(|source| StorageError::InvalidCurve {
                path: path.clone(),
                source,
            })?;

        if removed > 0 {
            info!(path = ?path, removed, "Removed stale rows from reference lap");
            if let Err(e) = self.save(combo, &lap) {
                warn!(error = %e, "Failed to re-save cleaned reference lap");
            }
        }
        Ok(lap)
    }

    /// Loads the reference lap, falling back to the placeholder on any error.
    pub fn load_or_default(&self, combo: &str) -> ReferenceLap {
        match self.load(combo) {
            Ok(lap) => {
                info!(combo = %combo, used = lap.used_total(), "Reference lap loaded");
                lap
            }
            Err(e) if e.is_missing() => {
                info!(combo = %combo, extension = %self.extension, "No saved reference lap");
                ReferenceLap::zero()
            }
            Err(e) => {
                info!(combo = %combo, error = %e, "Saved reference lap unusable, starting fresh");
                ReferenceLap::zero()
            }
        }
    }

    /// Writes `lap` for `combo`, creating the base directory on demand.
    ///
    /// The file is written to a temporary sibling and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooShortToSave`] for curves under
    /// [`MIN_PERSISTED_ROWS`] rows, [`StorageError::DirectoryCreationFailed`]
    /// when the base directory cannot be created, and
    /// [`StorageError::WriteFailed`] when the write or rename fails.
    pub fn save(&self, combo: &str, lap: &ReferenceLap) -> Result<()> {
        if lap.len() < MIN_PERSISTED_ROWS {
            return Err(StorageError::TooShortToSave { rows: lap.len() });
        }
        fs::create_dir_all(&self.base_dir).map_err(|source| {
            StorageError::DirectoryCreationFailed {
                path: self.base_dir.clone(),
                source,
            }
        })?;
        let path = self.path_for(combo);
        write_atomic(&path, &format_rows(&lap.to_rows()))?;
        info!(path = ?path, rows = lap.len(), "Reference lap saved");
        Ok(())
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|source| StorageError::WriteFailed {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = ?path, "File written successfully");
    Ok(())
}

fn format_rows(rows: &[CurveRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = match row.lap_time {
            Some(lap_time) => format!("{},{},{}\n", row.position, row.used, lap_time),
            None => format!("{},{}\n", row.position, row.used),
        };
        out.push_str(&line);
    }
    out
}

fn parse_rows(path: &Path, content: &str) -> Result<Vec<CurveRow>> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let values = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StorageError::malformed_row(path, line_no, e.to_string()))?;
        let row = match values.as_slice() {
            [position, used] => CurveRow {
                position: *position,
                used: *used,
                lap_time: None,
            },
            [position, used, lap_time, ..] => CurveRow {
                position: *position,
                used: *used,
                lap_time: Some(*lap_time),
            },
            _ => {
                return Err(StorageError::malformed_row(
                    path,
                    line_no,
                    format!("expected 2 or 3 columns, found {}", values.len()),
                ));
            }
        };
        rows.push(row);
    }

    // Only the terminal row's lap time is meaningful.
    let last = rows.len().saturating_sub(1);
    for row in rows.iter_mut().take(last) {
        row.lap_time = None;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_rows_formats() -> TestResult {
        let path = Path::new("test.fuel");
        let rows = parse_rows(path, "0.0,0.0\n\n12.5, 0.01\n1010,4.0,90.25\n")?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.get(2).and_then(|r| r.lap_time), Some(90.25));
        assert_eq!(rows.first().and_then(|r| r.lap_time), None);
        Ok(())
    }

    #[test]
    fn test_parse_rows_rejects_text_and_wrong_width() {
        let path = Path::new("test.fuel");
        assert!(matches!(
            parse_rows(path, "0,0\nabc,1\n"),
            Err(StorageError::MalformedRow { line: 2, .. })
        ));
        assert!(matches!(
            parse_rows(path, "0\n"),
            Err(StorageError::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_format_rows_marks_terminal_only() {
        let rows = vec![
            CurveRow {
                position: 0.0,
                used: 0.0,
                lap_time: None,
            },
            CurveRow {
                position: 1010.0,
                used: 4.5,
                lap_time: Some(90.0),
            },
        ];
        assert_eq!(format_rows(&rows), "0,0\n1010,4.5,90\n");
    }

    #[test]
    fn test_missing_file_falls_back_to_placeholder() -> TestResult {
        let dir = tempdir()?;
        let store = CurveStore::new(dir.path(), "fuel");
        let err = store.load("Nowhere - GT3").err().ok_or("expected error")?;
        assert!(err.is_missing());
        assert!(store.load_or_default("Nowhere - GT3").is_placeholder());
        Ok(())
    }

    #[test]
    fn test_short_curve_is_not_saved() -> TestResult {
        let dir = tempdir()?;
        let store = CurveStore::new(dir.path(), "fuel");
        assert!(matches!(
            store.save("Spa - GT3", &ReferenceLap::zero()),
            Err(StorageError::TooShortToSave { rows: 1 })
        ));
        assert!(!store.path_for("Spa - GT3").exists());
        Ok(())
    }
}
