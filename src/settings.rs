//! Engine settings
//!
//! Tunables for gesture disambiguation, zoom limits, auto-rotate cadence,
//! cache capacity, prefetch concurrency and health thresholds. Stored as JSON;
//! every field falls back to its default when missing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::catalog::ComplianceList;
use crate::error::{EngineError, EngineResult};

/// Gesture disambiguation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GestureSettings {
    /// Maximum travel (px) for a press to still count as a tap
    pub tap_max_distance_px: f32,
    /// Maximum press duration (ms) for a tap; longer stationary presses are holds
    pub tap_max_duration_ms: u64,
    /// Window (ms) in which a second tap forms a double-tap
    pub double_tap_window_ms: u64,
    /// Maximum distance (px) between the two taps of a double-tap
    pub double_tap_max_distance_px: f32,
    /// Horizontal drag distance per rotation frame
    pub drag_px_per_frame: f32,
    /// Whether releasing a drag keeps spinning
    pub inertia_enabled: bool,
    /// Exponential velocity decay rate (1/s) while coasting
    pub inertia_friction: f32,
    /// Coasting stops below this speed (px/s)
    pub inertia_min_velocity: f32,
    /// Trailing window (ms) used to estimate release velocity
    pub velocity_window_ms: u64,
    /// Zoom factor per `+`/`-` key press
    pub keyboard_zoom_step: f32,
    /// Zoom factor per wheel notch
    pub wheel_zoom_step: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            tap_max_distance_px: 10.0,
            tap_max_duration_ms: 250,
            double_tap_window_ms: 300,
            double_tap_max_distance_px: 30.0,
            drag_px_per_frame: 12.0,
            inertia_enabled: true,
            inertia_friction: 4.0,
            inertia_min_velocity: 60.0,
            velocity_window_ms: 100,
            keyboard_zoom_step: 1.25,
            wheel_zoom_step: 1.1,
        }
    }
}

/// Zoom limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomSettings {
    pub min: f32,
    pub max: f32,
    /// Zoom restored by `ResetView`
    pub default: f32,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 4.0,
            default: 1.0,
        }
    }
}

/// Auto-rotate cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoRotateSettings {
    /// Wall-clock time per frame advance
    pub frame_interval_ms: u64,
    /// Whether a new session starts spinning
    pub start_enabled: bool,
}

impl Default for AutoRotateSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 80,
            start_enabled: false,
        }
    }
}

impl AutoRotateSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Asset cache capacity and expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Maximum number of cached frames
    pub max_entries: usize,
    /// Maximum total payload size in bytes
    pub max_bytes: u64,
    /// Optional time-to-live for cached frames
    pub ttl_secs: Option<u64>,
    /// How many recent fetch errors to retain for inspection
    pub error_log_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_bytes: 64 * 1024 * 1024,
            ttl_secs: None,
            error_log_capacity: 32,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Background prefetch behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrefetchSettings {
    /// Concurrent background fetches (interactive fetches are not counted)
    pub max_concurrent: usize,
    /// Retries after a transient failure
    pub retry_attempts: u32,
    /// First retry delay; doubles per attempt
    pub retry_backoff_ms: u64,
    /// Cap on the retry delay
    pub max_backoff_ms: u64,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            retry_attempts: 3,
            retry_backoff_ms: 200,
            max_backoff_ms: 2_000,
        }
    }
}

/// Thresholds beyond which the cache reports degraded health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthSettings {
    /// Fraction of entry/byte capacity considered degraded (0.0-1.0)
    pub max_fill_ratio: f64,
    /// Average fetch latency considered degraded
    pub max_avg_latency_ms: f64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            max_fill_ratio: 0.95,
            max_avg_latency_ms: 250.0,
        }
    }
}

/// All engine settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub gesture: GestureSettings,
    pub zoom: ZoomSettings,
    pub auto_rotate: AutoRotateSettings,
    pub cache: CacheSettings,
    pub prefetch: PrefetchSettings,
    pub health: HealthSettings,
    /// Global compliance allow-list
    pub compliance: ComplianceList,
}

impl EngineSettings {
    /// Load settings from a JSON file
    pub fn load_from_file(path: &Path) -> EngineResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let settings: Self = serde_json::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        tracing::info!("Loaded engine settings from {:?}", path);
        Ok(settings.validated())
    }

    /// Save settings as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("failed to serialize settings: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| EngineError::Config(format!("failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Normalize out-of-range values so the engine invariants hold
    pub fn validated(mut self) -> Self {
        let zoom = &mut self.zoom;
        if !(zoom.min.is_finite() && zoom.min > 0.0) {
            zoom.min = ZoomSettings::default().min;
        }
        if !zoom.max.is_finite() || zoom.max < zoom.min {
            zoom.max = zoom.min;
        }
        zoom.default = if zoom.default.is_finite() {
            zoom.default.clamp(zoom.min, zoom.max)
        } else {
            zoom.min
        };

        self.auto_rotate.frame_interval_ms = self.auto_rotate.frame_interval_ms.max(1);
        self.cache.max_entries = self.cache.max_entries.max(1);
        self.cache.max_bytes = self.cache.max_bytes.max(1);
        self.prefetch.max_concurrent = self.prefetch.max_concurrent.max(1);
        self.prefetch.max_backoff_ms = self.prefetch.max_backoff_ms.max(self.prefetch.retry_backoff_ms);
        self.health.max_fill_ratio = self.health.max_fill_ratio.clamp(0.0, 1.0);

        let gesture = &mut self.gesture;
        if !(gesture.drag_px_per_frame > 0.0) {
            gesture.drag_px_per_frame = GestureSettings::default().drag_px_per_frame;
        }
        if !(gesture.inertia_friction > 0.0) {
            gesture.inertia_friction = GestureSettings::default().inertia_friction;
        }
        if !(gesture.keyboard_zoom_step > 1.0) {
            gesture.keyboard_zoom_step = GestureSettings::default().keyboard_zoom_step;
        }
        if !(gesture.wheel_zoom_step > 1.0) {
            gesture.wheel_zoom_step = GestureSettings::default().wheel_zoom_step;
        }
        self
    }
}
