//! Recorded and synthetic sessions replayed as a telemetry source.

use crate::sample::{FieldSnapshot, PlayerSample, RaceFormat, TelemetryFrame, VehicleSnapshot};
use crate::{Result, TelemetryError, TelemetrySource, combo_id};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// Recorded session container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecording {
    pub metadata: RecordingMetadata,
    pub frames: Vec<TelemetryFrame>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub track_name: String,
    pub vehicle_class: String,
    pub duration_seconds: f64,
    pub frame_count: usize,
    pub average_fps: f64,
    pub description: Option<String>,
}

impl TelemetryRecording {
    /// Reads a JSON recording from disk.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::RecordingIo`] when the file cannot be opened,
    /// [`TelemetryError::RecordingFormat`] when it is not a valid recording,
    /// and [`TelemetryError::EmptyRecording`] when it holds no frames.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TelemetryError::RecordingIo {
            path: path.to_path_buf(),
            source,
        })?;
        let recording: Self = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            TelemetryError::RecordingFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if recording.frames.is_empty() {
            return Err(TelemetryError::EmptyRecording);
        }
        Ok(recording)
    }

    /// Writes the recording as pretty-printed JSON, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::RecordingIo`] when the directory or file
    /// cannot be created and [`TelemetryError::RecordingFormat`] when
    /// serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| TelemetryError::RecordingIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|source| {
            TelemetryError::RecordingFormat {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn combo_id(&self) -> String {
        combo_id(&self.metadata.track_name, &self.metadata.vehicle_class)
    }

    /// Frame in effect `offset` after the start of the recording.
    ///
    /// Returns `None` once the recording has been played past its last frame.
    pub fn frame_at(&self, offset: Duration) -> Option<&TelemetryFrame> {
        let offset_ns = u64::try_from(offset.as_nanos()).unwrap_or(u64::MAX);
        let last = self.frames.last()?;
        if offset_ns > last.timestamp_ns {
            return None;
        }
        let next = self.frames.partition_point(|f| f.timestamp_ns <= offset_ns);
        self.frames.get(next.saturating_sub(1))
    }

    fn duration(&self) -> Duration {
        self.frames
            .last()
            .map(|f| Duration::from_nanos(f.timestamp_ns))
            .unwrap_or_default()
    }
}

/// Plays a recording back in wall-clock time.
///
/// After the last frame the source reports itself idle and holds the final
/// readings, the same way a simulator does when the player returns to the
/// garage.
pub struct ReplaySource {
    recording: TelemetryRecording,
    combo: String,
    started_at: Instant,
    playback_speed: f64,
    looping: bool,
}

impl ReplaySource {
    pub fn new(recording: TelemetryRecording) -> Self {
        let combo = recording.combo_id();
        info!(
            combo = %combo,
            frames = recording.frames.len(),
            "Replay source ready"
        );
        Self {
            recording,
            combo,
            started_at: Instant::now(),
            playback_speed: 1.0,
            looping: false,
        }
    }

    pub fn with_playback_speed(mut self, speed: f64) -> Self {
        self.playback_speed = speed.clamp(0.1, 100.0);
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn playback_offset(&self) -> Duration {
        let offset = self.started_at.elapsed().mul_f64(self.playback_speed);
        let duration = self.recording.duration();
        if self.looping && !duration.is_zero() {
            let wrapped = offset.as_nanos() % duration.as_nanos();
            return Duration::from_nanos(u64::try_from(wrapped).unwrap_or(0));
        }
        offset
    }

    fn current(&self) -> Option<&TelemetryFrame> {
        self.recording.frame_at(self.playback_offset())
    }

    fn current_or_last(&self) -> Option<&TelemetryFrame> {
        self.current().or_else(|| self.recording.frames.last())
    }

    pub fn is_finished(&self) -> bool {
        self.current().is_none()
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.recording.metadata
    }
}

impl TelemetrySource for ReplaySource {
    fn is_active(&self) -> bool {
        self.current().is_some_and(|f| f.on_track)
    }

    fn combo_id(&self) -> String {
        self.combo.clone()
    }

    fn player(&self) -> PlayerSample {
        self.current_or_last()
            .map(|f| f.player.clone())
            .unwrap_or_default()
    }

    fn field(&self) -> FieldSnapshot {
        self.current_or_last()
            .map(|f| f.field.clone())
            .unwrap_or_default()
    }
}

/// Deterministic session generator for demos and tests.
///
/// The player runs constant-pace laps on a circular track and burns fuel and
/// virtual energy linearly with distance. Opponents run at slightly
/// different paces so the running order changes over time.
#[derive(Debug, Clone)]
pub struct SyntheticSession {
    pub track_name: String,
    pub vehicle_class: String,
    pub track_length: f64,
    pub lap_time: f64,
    pub laps: u32,
    pub fps: f64,
    pub tank_capacity: f64,
    pub start_fuel: f64,
    pub fuel_per_lap: f64,
    /// Zero disables virtual energy.
    pub max_energy: f64,
    /// Energy used per lap, as a percentage of `max_energy`.
    pub energy_per_lap: f64,
    /// Lap on which the player stops and refills to capacity.
    pub pit_lap: Option<u32>,
    pub race_format: RaceFormat,
    pub session_length: f64,
    /// Class name of each opponent; the player occupies slot 0.
    pub opponents: Vec<String>,
}

impl Default for SyntheticSession {
    fn default() -> Self {
        Self {
            track_name: "Synthetic Ring".to_string(),
            vehicle_class: "GT3".to_string(),
            track_length: 2000.0,
            lap_time: 60.0,
            laps: 5,
            fps: 20.0,
            tank_capacity: 100.0,
            start_fuel: 60.0,
            fuel_per_lap: 2.5,
            max_energy: 0.0,
            energy_per_lap: 0.0,
            pit_lap: None,
            race_format: RaceFormat::TimeLimited,
            session_length: 3600.0,
            opponents: Vec::new(),
        }
    }
}

impl SyntheticSession {
    pub fn with_opponents(mut self, classes: &[&str]) -> Self {
        self.opponents = classes.iter().map(|c| (*c).to_string()).collect();
        self
    }

    pub fn combo_id(&self) -> String {
        combo_id(&self.track_name, &self.vehicle_class)
    }

    /// Session time at which the player stops driving.
    pub fn end_time(&self) -> f64 {
        f64::from(self.laps) * self.lap_time
    }

    pub fn generate(&self) -> TelemetryRecording {
        let step = 1.0 / self.fps.max(1.0);
        let end = self.end_time();
        let mut frames = Vec::new();
        let mut t = 0.0;
        while t < end {
            frames.push(self.frame_at(t));
            t += step;
        }
        frames.push(self.frame_at(end + 1.0));

        let metadata = RecordingMetadata {
            track_name: self.track_name.clone(),
            vehicle_class: self.vehicle_class.clone(),
            duration_seconds: end + 1.0,
            frame_count: frames.len(),
            average_fps: self.fps,
            description: Some("Synthetic session".to_string()),
        };
        TelemetryRecording { metadata, frames }
    }

    /// State of the session `t` seconds after the start.
    pub fn frame_at(&self, t: f64) -> TelemetryFrame {
        let on_track = t < self.end_time();
        let t_drive = t.clamp(0.0, self.end_time());
        let laps_run = t_drive / self.lap_time;
        let lap = laps_run.floor();
        let progress = laps_run - lap;
        let lap_start = lap * self.lap_time;
        #[expect(clippy::cast_sign_loss, reason = "lap is floor of a non-negative value")]
        let completed_laps = lap as u32;

        let refilled_at = self
            .pit_lap
            .filter(|p| completed_laps >= *p)
            .map(f64::from);
        let (fuel_base, energy_base, laps_since_fill) = match refilled_at {
            Some(pit) => (self.tank_capacity, 100.0, laps_run - pit),
            None => (self.start_fuel, 100.0, laps_run),
        };
        let fuel = (fuel_base - laps_since_fill * self.fuel_per_lap).max(0.0);
        let energy = if self.max_energy > 0.0 {
            let percent = (energy_base - laps_since_fill * self.energy_per_lap).max(0.0);
            percent / 100.0 * self.max_energy
        } else {
            0.0
        };

        let session_remaining = match self.race_format {
            RaceFormat::TimeLimited => (self.session_length - t).max(0.0),
            RaceFormat::LapLimited { .. } => 0.0,
        };

        let player = PlayerSample {
            tank_capacity: self.tank_capacity,
            fuel,
            energy,
            max_energy: self.max_energy,
            lap_start_time: lap_start,
            elapsed_time: t,
            current_lap_time: t_drive - lap_start,
            last_lap_time: if completed_laps > 0 { self.lap_time } else { 0.0 },
            session_remaining,
            race_format: self.race_format,
            completed_laps,
            lap_distance: progress * self.track_length,
            lap_progress: progress,
            in_pits: self.pit_lap == Some(completed_laps) && progress < 0.1,
            in_garage: !on_track,
            position_xyz: self.track_point(progress),
            pace_lap_time: self.lap_time,
            is_valid_lap: true,
            battery_drain_last: 0.0,
            battery_regen_last: 0.0,
        };

        TelemetryFrame {
            timestamp_ns: u64::try_from(Duration::from_secs_f64(t.max(0.0)).as_nanos())
                .unwrap_or(u64::MAX),
            on_track,
            player,
            field: self.field_at(t_drive, laps_run),
        }
    }

    fn track_point(&self, progress: f64) -> [f64; 3] {
        let radius = self.track_length / TAU;
        let angle = progress * TAU;
        [radius * angle.cos(), 0.0, radius * angle.sin()]
    }

    fn field_at(&self, t: f64, player_laps: f64) -> FieldSnapshot {
        let count = self.opponents.len() as f64;
        let mut runs: Vec<(usize, f64, &str)> = vec![(0, player_laps, self.vehicle_class.as_str())];
        for (slot, class_name) in self.opponents.iter().enumerate() {
            let n = (slot + 1) as f64;
            let lap_time = self.lap_time * (1.0 + 0.003 * (n - count / 2.0));
            let head_start = n / (count + 1.0);
            runs.push((slot + 1, t / lap_time + head_start, class_name.as_str()));
        }

        let mut order: Vec<usize> = (0..runs.len()).collect();
        order.sort_by(|a, b| {
            let da = runs.get(*a).map_or(0.0, |r| r.1);
            let db = runs.get(*b).map_or(0.0, |r| r.1);
            db.total_cmp(&da)
        });

        let mut vehicles = Vec::with_capacity(runs.len());
        for (rank, run_idx) in order.iter().enumerate() {
            let Some(&(index, laps_run, class_name)) = runs.get(*run_idx) else {
                continue;
            };
            let progress = laps_run - laps_run.floor();
            let best = if laps_run >= 1.0 { t / laps_run.max(1.0) } else { 0.0 };
            vehicles.push(VehicleSnapshot {
                index,
                lap_distance: progress * self.track_length,
                lap_progress: progress,
                class_name: class_name.to_string(),
                place: u32::try_from(rank + 1).unwrap_or(u32::MAX),
                in_pits: false,
                in_garage: false,
                best_lap_time: best,
                last_lap_time: best,
                position_xyz: self.track_point(progress),
            });
        }
        vehicles.sort_by_key(|v| v.index);

        FieldSnapshot {
            track_length: self.track_length,
            player_index: 0,
            in_race: true,
            vehicles,
        }
    }
}
