//! Configuration loading for snapshot captures.
//!
//! One YAML file describes the region, the tile source, fetch policy,
//! output layout and the watch interval. Everything except `region` has a
//! default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use capture::FetchConfig;
use chrono::{FixedOffset, Offset, Utc};
use mosaic_common::{
    BoundingBox, ScaleFactor, TileUrlTemplate, DEFAULT_TILE_EDGE, DEFAULT_URL_TEMPLATE,
};
use serde::Deserialize;
use tracing::{debug, warn};

/// Root configuration loaded from the snapshot YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    pub region: BoundingBox,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub timelapse: TimelapseConfig,
}

/// Tile server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// URL with `{x}` and `{y}` placeholders
    #[serde(default = "default_url_template")]
    pub url_template: String,
    /// Tile width and height in pixels
    #[serde(default = "default_tile_edge")]
    pub tile_edge: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            tile_edge: default_tile_edge(),
        }
    }
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_tile_edge() -> u32 {
    DEFAULT_TILE_EDGE
}

/// Retry and concurrency policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff unit in seconds
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Cap on concurrent requests; unset means one per tile
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent: None,
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base() -> f64 {
    1.5
}

fn default_request_timeout() -> u64 {
    30
}

/// Where and how snapshots are written.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub scale_factor: ScaleFactor,
    /// "UTC" or a fixed offset such as "+07:00"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Also write `<dir>/latest.png`
    #[serde(default = "default_write_latest")]
    pub write_latest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            scale_factor: ScaleFactor::default(),
            timezone: default_timezone(),
            write_latest: default_write_latest(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_write_latest() -> bool {
    true
}

/// Periodic capture settings for `watch`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

fn default_interval() -> u64 {
    600
}

/// Frame layout for daily timelapses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimelapseConfig {
    #[serde(default = "default_frame_width")]
    pub width: u32,
    #[serde(default = "default_frame_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Red border drawn inside the frame edge
    #[serde(default = "default_border")]
    pub border_px: u32,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            width: default_frame_width(),
            height: default_frame_height(),
            fps: default_fps(),
            border_px: default_border(),
        }
    }
}

fn default_frame_width() -> u32 {
    1920
}

fn default_frame_height() -> u32 {
    1080
}

fn default_fps() -> u32 {
    30
}

fn default_border() -> u32 {
    8
}

impl SnapshotConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded snapshot config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: SnapshotConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_attempts == 0 {
            bail!("fetch.max_attempts must be at least 1");
        }
        if self.source.tile_edge == 0 {
            bail!("source.tile_edge must be positive");
        }
        if !self.fetch.backoff_base_secs.is_finite() || self.fetch.backoff_base_secs < 0.0 {
            bail!("fetch.backoff_base_secs must be a non-negative number");
        }
        if self.fetch.max_concurrent == Some(0) {
            bail!("fetch.max_concurrent must be at least 1 when set");
        }
        if self.schedule.interval_secs == 0 {
            bail!("schedule.interval_secs must be positive");
        }
        if self.timelapse.width == 0 || self.timelapse.height == 0 {
            bail!("timelapse.width and timelapse.height must be positive");
        }
        if self.timelapse.fps == 0 {
            bail!("timelapse.fps must be positive");
        }
        self.url_template()?;
        Ok(())
    }

    pub fn url_template(&self) -> Result<TileUrlTemplate> {
        TileUrlTemplate::new(self.source.url_template.clone()).context("source.url_template")
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_attempts: self.fetch.max_attempts,
            backoff_base: Duration::from_secs_f64(self.fetch.backoff_base_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            tile_edge: self.source.tile_edge,
            max_concurrent: self.fetch.max_concurrent,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }
}

impl OutputConfig {
    /// Offset used for folder and file timestamps.
    ///
    /// Unknown values fall back to UTC with a warning.
    pub fn offset(&self) -> FixedOffset {
        parse_offset(&self.timezone).unwrap_or_else(|| {
            warn!(timezone = %self.timezone, "Unrecognized timezone, using UTC");
            utc()
        })
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse "UTC", "Z" or "±HH:MM" / "±HHMM".
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("utc") || value.eq_ignore_ascii_case("z") {
        return Some(utc());
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
