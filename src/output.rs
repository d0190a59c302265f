//! CLI output formatting for the post workflow.
//!
//! Each step has a `format_*` function (pure, returns lines) so the wording
//! can be tested, and the [`Console`] writes them to stdout with colour.
//! Structured diagnostics go through `tracing` on stderr instead.
//!
//! ```text
//! Image Collection
//! 001 DSC_0001.JPG
//! 002 DSC_0002.jpeg
//!
//! ✓ Image 1 (image/jpeg, 4.12 MB, 6000×4000)
//!     Source: /Users/ana/Pictures/export/DSC_0001.JPG
//!     Key: autumn/dsc-0001.jpg
//!
//! Total: 2 image(s), 8.3 MB
//! ```

use crate::git::PublishEvent;
use crate::scan::{ImageCandidate, ScanError};
use crate::staging::StagedImage;
use crate::storage::UploadEvent;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable size with 1024-based units, at most two decimals.
///
/// ```text
/// 0 → "0 Bytes", 1536 → "1.5 KB", 4_320_000 → "4.12 MB"
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Numbered list of discovered files shown before the ordering prompt.
pub fn format_candidates(candidates: &[ImageCandidate]) -> Vec<String> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} {}", format_index(i + 1), c.original_name))
        .collect()
}

pub fn format_staged_image(index: usize, image: &StagedImage) -> Vec<String> {
    vec![
        format!(
            "✓ Image {} ({}, {}, {}×{})",
            index,
            image.mime,
            format_bytes(image.size),
            image.width,
            image.height
        ),
        format!("    Source: {}", image.source.display()),
        format!("    Key: {}", image.remote_key),
    ]
}

pub fn format_staging_failure(index: usize, name: &str, error: &ScanError) -> String {
    format!("✗ Image {} ({}): {}", index, name, error)
}

/// `Total: N image(s), SIZE`.
pub fn format_batch_summary(images: &[StagedImage]) -> String {
    let total: u64 = images.iter().map(|i| i.size).sum();
    format!("Total: {} image(s), {}", images.len(), format_bytes(total))
}

pub fn format_upload_event(event: &UploadEvent<'_>) -> String {
    match event {
        UploadEvent::Started { index, total, key } => {
            format!("Uploading {}/{}: {}", index, total, key)
        }
        UploadEvent::Retrying { key, error, .. } => {
            format!("Retrying upload: {} ({})", key, error)
        }
        UploadEvent::Uploaded {
            index,
            total,
            key,
            attempts,
        } => {
            if *attempts > 1 {
                format!("Uploaded {}/{}: {} (after {} attempts)", index, total, key, attempts)
            } else {
                format!("Uploaded {}/{}: {}", index, total, key)
            }
        }
    }
}

pub fn format_publish_event(event: &PublishEvent<'_>) -> String {
    match event {
        PublishEvent::OffPrimaryBranch { branch, primary } => {
            format!("⚠ On branch '{}' (not {})", branch, primary)
        }
        PublishEvent::Committing => "Committing changes".to_string(),
        PublishEvent::Committed => "Committed changes".to_string(),
        PublishEvent::Pushing { remote, branch } => format!("Pushing to {}/{}", remote, branch),
        PublishEvent::Pushed { remote, branch } => format!("Pushed to {}/{}", remote, branch),
    }
}

/// Lines for `create-post check`.
pub fn format_check_report(reports: &[crate::post::PostReport], root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut bad = 0;
    for (i, report) in reports.iter().enumerate() {
        let shown = report.path.strip_prefix(root).unwrap_or(&report.path);
        match &report.result {
            Ok(problems) if problems.is_empty() => {
                lines.push(format!("{} {} ok", format_index(i + 1), shown.display()));
            }
            Ok(problems) => {
                bad += 1;
                lines.push(format!("{} {}", format_index(i + 1), shown.display()));
                lines.extend(problems.iter().map(|p| format!("    {}", p)));
            }
            Err(e) => {
                bad += 1;
                lines.push(format!("{} {}", format_index(i + 1), shown.display()));
                lines.push(format!("    {}", e));
            }
        }
    }
    lines.push(format!("Checked {} post(s), {} with problems", reports.len(), bad));
    lines
}

// ============================================================================
// Console
// ============================================================================

/// Writes user-facing progress to stdout. Silent consoles swallow everything,
/// which is what tests and scripted runs use.
pub struct Console {
    enabled: bool,
    spinner: RefCell<Option<ProgressBar>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self {
            enabled: true,
            spinner: RefCell::new(None),
        }
    }

    pub fn silent() -> Self {
        Self {
            enabled: false,
            spinner: RefCell::new(None),
        }
    }

    pub fn heading(&self, text: &str) {
        if self.enabled {
            println!("\n{}", style(text).cyan());
        }
    }

    pub fn line(&self, text: &str) {
        if self.enabled {
            println!("{}", text);
        }
    }

    pub fn lines(&self, lines: &[String]) {
        for line in lines {
            self.line(line);
        }
    }

    pub fn muted(&self, text: &str) {
        if self.enabled {
            println!("{}", style(text).dim());
        }
    }

    pub fn success(&self, text: &str) {
        if self.enabled {
            println!("{}", style(text).green());
        }
    }

    pub fn warning(&self, text: &str) {
        if self.enabled {
            println!("{}", style(text).yellow());
        }
    }

    pub fn error(&self, text: &str) {
        if self.enabled {
            eprintln!("{}", style(text).red());
        }
    }

    /// Start a spinner, replacing any running one.
    pub fn spin(&self, message: String) {
        if !self.enabled {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Some(old) = self.spinner.borrow_mut().replace(pb) {
            old.finish_and_clear();
        }
    }

    /// Stop the running spinner, leaving `message` in its place.
    pub fn spin_done(&self, message: String, ok: bool) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            let marker = if ok {
                style("✓").green()
            } else {
                style("✗").red()
            };
            pb.set_style(ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
            pb.finish_with_message(format!("{} {}", marker, message));
        }
    }

    pub fn upload_event(&self, event: &UploadEvent<'_>) {
        let text = format_upload_event(event);
        match event {
            UploadEvent::Started { .. } => self.spin(text),
            UploadEvent::Retrying { .. } => {
                self.spin_done(text.clone(), false);
                self.spin(text);
            }
            UploadEvent::Uploaded { .. } => self.spin_done(text, true),
        }
    }

    pub fn publish_event(&self, event: &PublishEvent<'_>) {
        let text = format_publish_event(event);
        match event {
            PublishEvent::OffPrimaryBranch { .. } => self.warning(&text),
            PublishEvent::Committing | PublishEvent::Pushing { .. } => self.spin(text),
            PublishEvent::Committed | PublishEvent::Pushed { .. } => self.spin_done(text, true),
        }
    }

    /// Abandon a spinner after a failure.
    pub fn spin_failed(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            pb.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use crate::test_helpers::staged_image;
    use std::path::PathBuf;

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(4_320_000), "4.12 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn candidates_are_numbered() {
        let candidates = vec![
            ImageCandidate {
                original_name: "a.jpg".into(),
                full_path: PathBuf::from("/x/a.jpg"),
            },
            ImageCandidate {
                original_name: "b.png".into(),
                full_path: PathBuf::from("/x/b.png"),
            },
        ];
        assert_eq!(format_candidates(&candidates), vec!["001 a.jpg", "002 b.png"]);
    }

    #[test]
    fn staged_image_lines() {
        let mut image = staged_image("autumn/dawn.jpg", 6000, 4000);
        image.size = 1536;
        image.source = PathBuf::from("/pics/Dawn.JPG");
        assert_eq!(
            format_staged_image(1, &image),
            vec![
                "✓ Image 1 (image/jpeg, 1.5 KB, 6000×4000)",
                "    Source: /pics/Dawn.JPG",
                "    Key: autumn/dawn.jpg",
            ]
        );
    }

    #[test]
    fn batch_summary_totals_sizes() {
        let mut a = staged_image("s/a.jpg", 1, 1);
        let mut b = staged_image("s/b.jpg", 1, 1);
        a.size = 1024;
        b.size = 512;
        assert_eq!(format_batch_summary(&[a, b]), "Total: 2 image(s), 1.5 KB");
    }

    #[test]
    fn upload_event_wording() {
        assert_eq!(
            format_upload_event(&UploadEvent::Started {
                index: 1,
                total: 3,
                key: "s/a.jpg"
            }),
            "Uploading 1/3: s/a.jpg"
        );
        let error = StorageError::Rejected("boom".into());
        assert_eq!(
            format_upload_event(&UploadEvent::Retrying {
                index: 1,
                key: "s/a.jpg",
                attempt: 1,
                error: &error
            }),
            "Retrying upload: s/a.jpg (boom)"
        );
        assert_eq!(
            format_upload_event(&UploadEvent::Uploaded {
                index: 1,
                total: 3,
                key: "s/a.jpg",
                attempts: 2
            }),
            "Uploaded 1/3: s/a.jpg (after 2 attempts)"
        );
    }

    #[test]
    fn branch_warning_wording() {
        assert_eq!(
            format_publish_event(&PublishEvent::OffPrimaryBranch {
                branch: "drafts",
                primary: "main"
            }),
            "⚠ On branch 'drafts' (not main)"
        );
    }

    #[test]
    fn silent_console_ignores_spinners() {
        let console = Console::silent();
        console.spin("x".into());
        console.spin_done("y".into(), true);
        assert!(console.spinner.borrow().is_none());
    }
}
