//! Sorting saved images into per-day folders.
//!
//! Dates come from file names (`YYYYMMDD`, `YYYY-MM-DD`, `YYYY_MM_DD` or
//! `YYYY.MM.DD`) and must be real calendar dates. Each touched folder gets a
//! `README.md` listing its contents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::timelapse::{self, README};

/// Extensions treated as snapshot images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp"];

/// What an organize run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeReport {
    /// Files moved into a date folder
    pub moved: usize,
    /// Dated files that were already in place
    pub already_sorted: usize,
    /// Every date seen, as `YYYYMMDD`
    pub dates: Vec<String>,
    /// Files whose name carries no valid date
    pub undated: Vec<PathBuf>,
}

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(\d{4})(\d{2})(\d{2})",
            r"(\d{4})-(\d{2})-(\d{2})",
            r"(\d{4})_(\d{2})_(\d{2})",
            r"(\d{4})\.(\d{2})\.(\d{2})",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Extract a `YYYYMMDD` date from a file name, ignoring its extension.
///
/// Patterns are tried in order; the first one that yields a valid calendar
/// date wins.
pub fn extract_date(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;

    date_patterns().iter().find_map(|re| {
        let caps = re.captures(stem)?;
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y%m%d").to_string())
    })
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// First free name in `dir`, appending `_1`, `_2`, ... to the stem.
fn free_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(file_name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(file_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    (1..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Move every dated image under `root` into `root/<YYYYMMDD>/`.
pub fn organize(root: &Path) -> Result<OrganizeReport> {
    let mut report = OrganizeReport::default();
    if !root.is_dir() {
        warn!(path = %root.display(), "Output directory not found, nothing to organize");
        return Ok(report);
    }

    let mut by_date: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_image(path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match extract_date(name) {
            Some(date) => by_date.entry(date).or_default().push(path.to_path_buf()),
            None => report.undated.push(path.to_path_buf()),
        }
    }

    info!(
        dates = by_date.len(),
        undated = report.undated.len(),
        "Organizing snapshots"
    );

    for (date, files) in &by_date {
        let folder = root.join(date);
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create {}", folder.display()))?;

        let mut moved_here = 0usize;
        for file in files {
            if file.parent() == Some(folder.as_path()) {
                report.already_sorted += 1;
                continue;
            }

            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let destination = free_destination(&folder, name);
            std::fs::rename(file, &destination).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    file.display(),
                    destination.display()
                )
            })?;
            debug!(from = %file.display(), to = %destination.display(), "Moved snapshot");
            moved_here += 1;
        }

        write_readme(&folder, date, moved_here)?;
        report.moved += moved_here;
        report.dates.push(date.clone());
    }

    for file in &report.undated {
        info!(path = %file.display(), "Left undated file in place");
    }
    info!(
        moved = report.moved,
        dates = report.dates.len(),
        "Organize complete"
    );

    Ok(report)
}

fn write_readme(folder: &Path, date: &str, moved: usize) -> Result<()> {
    let mut files: Vec<String> = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to list {}", folder.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n != README)
        .collect();
    files.sort();

    let mut body = format!(
        "# Snapshots for {date}\n\nDate: {}-{}-{}\nProcessed: {}\nFiles moved: {moved}\n\n## Files\n",
        &date[..4],
        &date[4..6],
        &date[6..8],
        Local::now().format("%Y-%m-%d %H:%M:%S"),
    );
    for name in files {
        body.push_str(&format!("- {}\n", name));
    }

    // Keep a timelapse link written by an earlier run.
    let path = folder.join(README);
    if let Ok(existing) = std::fs::read_to_string(&path) {
        if let Some(section) = timelapse::readme_section(&existing) {
            body = timelapse::upsert_section(&body, section);
        }
    }

    std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extract_date_formats() {
        assert_eq!(extract_date("merged_tiles_20250814_223005.png").as_deref(), Some("20250814"));
        assert_eq!(extract_date("shot-2024-02-29.jpg").as_deref(), Some("20240229"));
        assert_eq!(extract_date("map_2023_12_31.bmp").as_deref(), Some("20231231"));
        assert_eq!(extract_date("2022.01.05 backup.png").as_deref(), Some("20220105"));
    }

    #[test]
    fn test_extract_date_rejects_invalid_dates() {
        assert_eq!(extract_date("shot-2023-02-29.png"), None);
        assert_eq!(extract_date("latest.png"), None);
        assert_eq!(extract_date("99999999.png"), None);
    }

    #[test]
    fn test_organize_moves_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("merged_tiles_20250814_101010.png"), b"a").unwrap();
        fs::create_dir_all(root.join("misc")).unwrap();
        fs::write(root.join("misc/shot-2025-08-14.png"), b"b").unwrap();
        fs::write(root.join("latest.png"), b"c").unwrap();
        fs::write(root.join("notes_20250814.txt"), b"d").unwrap();

        // Already in its folder, plus a name that will collide.
        fs::create_dir_all(root.join("20250814")).unwrap();
        fs::write(root.join("20250814/merged_tiles_20250814_090000.png"), b"e").unwrap();
        fs::write(root.join("20250814/shot-2025-08-14.png"), b"f").unwrap();

        let report = organize(root).unwrap();
        assert_eq!(report.moved, 2);
        assert_eq!(report.already_sorted, 2);
        assert_eq!(report.dates, vec!["20250814".to_string()]);
        assert_eq!(report.undated, vec![root.join("latest.png")]);

        let folder = root.join("20250814");
        assert!(folder.join("merged_tiles_20250814_101010.png").exists());
        assert_eq!(fs::read(folder.join("shot-2025-08-14_1.png")).unwrap(), b"b");
        assert_eq!(fs::read(folder.join("shot-2025-08-14.png")).unwrap(), b"f");
        assert!(root.join("latest.png").exists());
        assert!(root.join("notes_20250814.txt").exists());

        let readme = fs::read_to_string(folder.join(README)).unwrap();
        assert!(readme.contains("Date: 2025-08-14"));
        assert!(readme.contains("Files moved: 2"));
        assert!(readme.contains("- shot-2025-08-14_1.png"));
        assert!(!readme.contains("- README.md"));
    }

    #[test]
    fn test_organize_keeps_timelapse_link() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let folder = root.join("20250814");
        fs::create_dir_all(&folder).unwrap();
        fs::write(
            folder.join(README),
            "# Snapshots for 20250814\n\n## Timelapse\n\n[t](../timelapse/t.gif)\n\n## Files\n",
        )
        .unwrap();
        fs::write(root.join("merged_tiles_20250814_101010.png"), b"a").unwrap();

        organize(root).unwrap();

        let readme = fs::read_to_string(folder.join(README)).unwrap();
        assert!(readme.contains("Files moved: 1"));
        assert_eq!(readme.matches("## Timelapse").count(), 1);
        assert!(readme.contains("[t](../timelapse/t.gif)"));
        assert!(readme.contains("- merged_tiles_20250814_101010.png"));
    }

    #[test]
    fn test_organize_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let report = organize(&dir.path().join("nope")).unwrap();
        assert_eq!(report, OrganizeReport::default());
    }
}
