//! Daily timelapse of saved snapshots.
//!
//! One day's `merged_tiles_<YYYYMMDD>_<HHMMSS>.png` files are ordered by the
//! timestamp in their names, letterboxed onto a white frame with a red
//! border, and written as an animated GIF to
//! `<dir>/timelapse/timelapse_<YYYYMMDD>.gif`. The day's `README.md` gets a
//! `## Timelapse` section linking to it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, Frame, Rgba, RgbaImage};
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::TimelapseConfig;

/// Subdirectory of the output dir that holds timelapses.
pub const TIMELAPSE_DIR: &str = "timelapse";

/// Copy of the most recent timelapse.
pub const LATEST_TIMELAPSE: &str = "latest.gif";

pub(crate) const README: &str = "README.md";

const SECTION_HEADER: &str = "## Timelapse";

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BORDER: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// What a timelapse run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelapseReport {
    pub path: PathBuf,
    pub frames: usize,
    /// Snapshots that could not be read
    pub skipped: Vec<PathBuf>,
    /// `HH:MM:SS` of the first and last frame
    pub span: (String, String),
}

/// A snapshot file and the `HHMMSS` part of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    path: PathBuf,
    time: String,
}

fn snapshot_name() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^merged_tiles_(\d{8})_(\d{6})\.png$").expect("snapshot name pattern")
    })
}

/// Snapshots taken on `date`, in capture order.
///
/// Looks in `root` and one level down, which covers both the writer's
/// date folders and files not yet organized.
fn snapshots_for(root: &Path, date: NaiveDate) -> Vec<Snapshot> {
    let day = date.format("%Y%m%d").to_string();

    let mut found: Vec<Snapshot> = WalkDir::new(root)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?;
            let caps = snapshot_name().captures(name)?;
            (caps[1] == day).then(|| Snapshot {
                time: caps[2].to_string(),
                path: e.path().to_path_buf(),
            })
        })
        .collect();

    found.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.path.cmp(&b.path)));
    found.dedup_by(|a, b| a.time == b.time);
    found
}

/// Fit `image` inside a `width`×`height` white frame, centered, keeping
/// its aspect ratio, then draw the border.
pub fn letterbox(image: &RgbaImage, width: u32, height: u32, border: u32) -> RgbaImage {
    let mut frame = RgbaImage::from_pixel(width, height, BACKGROUND);

    let (iw, ih) = image.dimensions();
    if iw > 0 && ih > 0 {
        let scale = f64::min(width as f64 / iw as f64, height as f64 / ih as f64);
        let fw = ((iw as f64 * scale) as u32).clamp(1, width);
        let fh = ((ih as f64 * scale) as u32).clamp(1, height);

        let fitted = if (fw, fh) == (iw, ih) {
            image.clone()
        } else {
            imageops::resize(image, fw, fh, FilterType::Lanczos3)
        };
        let x = (width - fw) / 2;
        let y = (height - fh) / 2;
        imageops::overlay(&mut frame, &fitted, x as i64, y as i64);
    }

    draw_border(&mut frame, border);
    frame
}

fn draw_border(frame: &mut RgbaImage, thickness: u32) {
    let (w, h) = frame.dimensions();
    for (x, y, px) in frame.enumerate_pixels_mut() {
        if x < thickness || y < thickness || x + thickness >= w || y + thickness >= h {
            *px = BORDER;
        }
    }
}

/// Build the timelapse for `date` from the snapshots under `root`.
pub fn create_timelapse(
    root: &Path,
    date: NaiveDate,
    settings: &TimelapseConfig,
) -> Result<TimelapseReport> {
    let day = date.format("%Y%m%d").to_string();
    let snapshots = snapshots_for(root, date);
    if snapshots.is_empty() {
        bail!("No snapshots found for {} under {}", day, root.display());
    }

    info!(
        date = %day,
        snapshots = snapshots.len(),
        fps = settings.fps,
        "Creating timelapse"
    );

    let delay = Delay::from_numer_denom_ms(1000, settings.fps);
    let mut encoded: Vec<u8> = Vec::new();
    let mut frames = Vec::with_capacity(snapshots.len());
    let mut skipped = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut encoded, 10);
        encoder
            .set_repeat(Repeat::Infinite)
            .context("Failed to start GIF stream")?;

        for (i, snapshot) in snapshots.iter().enumerate() {
            let image = match image::open(&snapshot.path) {
                Ok(image) => image.to_rgba8(),
                Err(e) => {
                    warn!(path = %snapshot.path.display(), error = %e, "Skipping unreadable snapshot");
                    skipped.push(snapshot.path.clone());
                    continue;
                }
            };

            let frame = letterbox(&image, settings.width, settings.height, settings.border_px);
            encoder
                .encode_frame(Frame::from_parts(frame, 0, 0, delay))
                .with_context(|| format!("Failed to encode frame {}", snapshot.path.display()))?;
            frames.push(snapshot);

            if (i + 1) % 10 == 0 {
                debug!(done = i + 1, total = snapshots.len(), "Encoded frames");
            }
        }
    }

    let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
        bail!("None of the {} snapshots for {} could be read", snapshots.len(), day);
    };
    let span = (clock(&first.time), clock(&last.time));
    let frame_count = frames.len();

    let dir = root.join(TIMELAPSE_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let file_name = format!("timelapse_{}.gif", day);
    let path = dir.join(&file_name);
    write_atomic(&path, &encoded)?;
    write_atomic(&dir.join(LATEST_TIMELAPSE), &encoded)?;

    let link = format!("../{}/{}", TIMELAPSE_DIR, file_name);
    let section = format!(
        "{}\n\n[Timelapse for {}]({})\n\nFrames: {} ({} to {})\n\n",
        SECTION_HEADER,
        date.format("%Y-%m-%d"),
        link,
        frame_count,
        span.0,
        span.1,
    );
    link_in_readme(&root.join(&day), &day, &section)?;

    info!(
        path = %path.display(),
        frames = frame_count,
        skipped = skipped.len(),
        bytes = encoded.len(),
        "Timelapse saved"
    );

    Ok(TimelapseReport {
        path,
        frames: frame_count,
        skipped,
        span,
    })
}

/// `HHMMSS` as `HH:MM:SS`.
fn clock(time: &str) -> String {
    format!("{}:{}:{}", &time[..2], &time[2..4], &time[4..6])
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".partial");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move timelapse into place: {}", path.display()))
}

fn link_in_readme(folder: &Path, day: &str, section: &str) -> Result<()> {
    std::fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create {}", folder.display()))?;
    let path = folder.join(README);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => format!("# Snapshots for {}\n", day),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    std::fs::write(&path, upsert_section(&content, section))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Linked timelapse in README");
    Ok(())
}

/// Byte range of the timelapse section: from its header up to the next
/// `## ` header or the end.
fn section_range(content: &str) -> Option<(usize, usize)> {
    let start = content.find(SECTION_HEADER)?;
    let after = start + SECTION_HEADER.len();
    let end = content[after..]
        .find("\n## ")
        .map(|i| after + i + 1)
        .unwrap_or(content.len());
    Some((start, end))
}

/// The timelapse section of a README, if it has one.
pub(crate) fn readme_section(content: &str) -> Option<&str> {
    section_range(content).map(|(start, end)| &content[start..end])
}

/// Replace the timelapse section, or insert it after the title.
pub(crate) fn upsert_section(content: &str, section: &str) -> String {
    if let Some((start, end)) = section_range(content) {
        return format!("{}{}{}", &content[..start], section, &content[end..]);
    }

    let lines: Vec<&str> = content.lines().collect();
    let at = lines
        .iter()
        .enumerate()
        .position(|(i, line)| !(i == 0 && line.starts_with("# ")) && !line.trim().is_empty())
        .unwrap_or(lines.len());

    let mut out = String::with_capacity(content.len() + section.len() + 2);
    for line in &lines[..at] {
        out.push_str(line);
        out.push('\n');
    }
    if at > 0 && !out.ends_with("\n\n") {
        out.push('\n');
    }
    out.push_str(section);
    for line in &lines[at..] {
        out.push_str(line);
        out.push('\n');
    }
    out
}
