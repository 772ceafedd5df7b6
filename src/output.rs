//! CLI output formatting.
//!
//! Two kinds of output are produced: a progress line per photo while a run is
//! in flight, and a fixed-column summary when it ends.
//!
//! ## Progress
//!
//! ```text
//! Collected 3 files
//! [1/3] summer/a.jpg → summer
//! [2/3] summer/b.jpg: not located
//! [3/3] summer/c.jpg: failed: No EXIF data in summer/c.jpg
//!     warning: thumbnail failed: ...
//! Wrote trip.kml
//! ```
//!
//! ## Summary
//!
//! ```text
//! Files:              3
//! EXIF:               2
//! GPS:                1
//! Placemarks:         1
//! Errors:             1
//! Time:           0.04s
//! Destination: /home/me/trip.kml
//! ```
//!
//! Each `format_*` function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout.

use crate::pipeline::{AbortReason, PhotoStatus, RunEvent, Summary};
use std::path::Path;

// ============================================================================
// Progress
// ============================================================================

/// Format a single progress event.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::Collected { count } => vec![format!("Collected {count} files")],
        RunEvent::Photo {
            index,
            total,
            path,
            status,
        } => {
            let prefix = format!("[{index}/{total}] {}", path.display());
            let line = match status {
                PhotoStatus::Placed { folder } => format!("{prefix} → {folder}"),
                PhotoStatus::NotLocated => format!("{prefix}: not located"),
                PhotoStatus::Failed(reason) => format!("{prefix}: failed: {reason}"),
            };
            vec![line]
        }
        RunEvent::Warning { message, .. } => vec![format!("    warning: {message}")],
        RunEvent::Written { path } => vec![format!("Wrote {}", path.display())],
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-run counters, labels left-aligned in one column.
pub fn format_summary(summary: &Summary, dest: &Path) -> Vec<String> {
    let rows = [
        ("Files:", summary.files.to_string()),
        ("EXIF:", summary.exif.to_string()),
        ("GPS:", summary.gps.to_string()),
        ("Placemarks:", summary.placemarks.to_string()),
        ("Errors:", summary.errors.to_string()),
        (
            "Time:",
            format!("{:.2}s", summary.elapsed.as_secs_f64()),
        ),
    ];
    let width = rows
        .iter()
        .map(|(label, _)| label.len())
        .chain(std::iter::once("Destination:".len()))
        .max()
        .unwrap_or(0)
        + 1;

    let mut lines: Vec<String> = rows
        .iter()
        .map(|(label, value)| format!("{label:<width$}{value:>8}"))
        .collect();
    lines.push(format!("{:<width$}{}", "Destination:", dest.display()));
    lines
}

/// One line explaining why a run stopped early.
pub fn format_abort(reason: &AbortReason) -> String {
    match reason {
        AbortReason::Cancelled => "Run cancelled, no KML written".to_string(),
        AbortReason::ThumbnailDirUnwritable(dir) => {
            format!("Cannot write thumbnails to {}, no KML written", dir.display())
        }
    }
}

pub fn print_summary(summary: &Summary, dest: &Path) {
    for line in format_summary(summary, dest) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn placed_photo_shows_folder() {
        let lines = format_run_event(&RunEvent::Photo {
            index: 2,
            total: 5,
            path: PathBuf::from("summer/a.jpg"),
            status: PhotoStatus::Placed {
                folder: "summer".to_string(),
            },
        });
        assert_eq!(lines, vec!["[2/5] summer/a.jpg → summer"]);
    }

    #[test]
    fn failed_photo_shows_reason() {
        let lines = format_run_event(&RunEvent::Photo {
            index: 1,
            total: 1,
            path: PathBuf::from("a.jpg"),
            status: PhotoStatus::Failed("No EXIF data in a.jpg".to_string()),
        });
        assert_eq!(lines, vec!["[1/1] a.jpg: failed: No EXIF data in a.jpg"]);
    }

    #[test]
    fn warnings_are_indented() {
        let lines = format_run_event(&RunEvent::Warning {
            path: PathBuf::from("a.jpg"),
            message: "thumbnail failed".to_string(),
        });
        assert_eq!(lines, vec!["    warning: thumbnail failed"]);
    }

    #[test]
    fn summary_columns_align() {
        let summary = Summary {
            files: 12,
            exif: 10,
            gps: 7,
            placemarks: 7,
            errors: 2,
            elapsed: Duration::from_millis(1250),
        };
        let lines = format_summary(&summary, Path::new("/tmp/trip.kml"));

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "Files:             12");
        assert_eq!(lines[3], "Placemarks:         7");
        assert_eq!(lines[5], "Time:           1.25s");
        assert_eq!(lines[6], "Destination: /tmp/trip.kml");
        let value_end: Vec<usize> = lines[..6].iter().map(|l| l.len()).collect();
        assert!(value_end.iter().all(|&len| len == value_end[0]));
    }

    #[test]
    fn abort_messages() {
        assert_eq!(
            format_abort(&AbortReason::Cancelled),
            "Run cancelled, no KML written"
        );
        assert!(
            format_abort(&AbortReason::ThumbnailDirUnwritable(PathBuf::from("/x")))
                .contains("/x")
        );
    }
}
