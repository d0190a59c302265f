//! Shared test utilities for the photo-post test suite.
//!
//! Provides image fixture writers and in-memory stand-ins for the external
//! collaborators (object storage, git) so workflow pieces can be tested
//! without a bucket or a repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_image(tmp.path(), "dawn.png", ImageFormat::Png, 40, 30);
//!
//! let store = FlakyStore::new().fail("trip/dawn.jpg", 1);
//! // ... upload ...
//! assert_eq!(store.calls(), vec!["trip/dawn.jpg", "trip/dawn.jpg"]);
//! ```

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use image::{ImageBuffer, ImageFormat, Rgb};

use crate::frontmatter;
use crate::git::{GitError, VersionControl};
use crate::staging::StagedImage;
use crate::storage::{ObjectStore, StorageError};

// =========================================================================
// Image fixtures
// =========================================================================

/// Encode a solid-colour `width`×`height` image in `format`.
pub fn encode_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(width, height, Rgb([200, 120, 40]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A minimal GIF header: recognisable as GIF, not one of our formats.
pub fn gif_bytes() -> Vec<u8> {
    b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec()
}

/// Write a real image named `name` into `dir`.
pub fn write_image(dir: &Path, name: &str, format: ImageFormat, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode_image(format, width, height)).unwrap();
    path
}

/// Same as [`write_image`]; named for call sites where the extension lies
/// about the content.
pub fn write_mislabeled(
    dir: &Path,
    name: &str,
    format: ImageFormat,
    width: u32,
    height: u32,
) -> PathBuf {
    write_image(dir, name, format, width, height)
}

/// A staged JPEG that exists only on paper.
pub fn staged_image(key: &str, width: u32, height: u32) -> StagedImage {
    let name = key.rsplit('/').next().unwrap_or(key);
    StagedImage {
        local_path: PathBuf::from("/staging").join(name),
        remote_key: key.to_string(),
        size: 1024,
        width,
        height,
        mime: "image/jpeg",
        source: PathBuf::from("/photos").join(name),
    }
}

/// A complete post with one photo.
pub fn sample_post(photo_key: &str, featured_key: &str) -> String {
    let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
    let fm = frontmatter::generate_at(
        "Sample",
        "A sample post.",
        &[staged_image(photo_key, 640, 480)],
        featured_key,
        true,
        created,
    );
    frontmatter::render(&fm)
}

// =========================================================================
// Object storage stand-in
// =========================================================================

/// Records every `put` and fails chosen keys a set number of times.
#[derive(Debug, Default)]
pub struct FlakyStore {
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` puts of `key`.
    pub fn fail(self, key: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(key.to_string(), times);
        self
    }

    /// Keys passed to `put`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ObjectStore for FlakyStore {
    fn describe(&self) -> String {
        "flaky://test".to_string()
    }

    fn put(&self, _local: &Path, key: &str) -> Result<(), StorageError> {
        self.calls.lock().unwrap().push(key.to_string());
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(StorageError::Rejected(format!("injected failure for {key}")))
            }
            _ => Ok(()),
        }
    }
}

// =========================================================================
// Git stand-in
// =========================================================================

/// Records repository operations as strings: `status`, `add <path>`,
/// `commit <message>`, `push <remote> <branch>`.
#[derive(Debug)]
pub struct RecordingVcs {
    branch: String,
    failing: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl RecordingVcs {
    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            failing: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the operation named `op` (`add`, `commit`, `push`) fail.
    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.failing = Some(op);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, call: String) -> Result<(), GitError> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing == Some(op) {
            return Err(GitError::Command {
                args: call,
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl VersionControl for RecordingVcs {
    fn current_branch(&self) -> Result<String, GitError> {
        self.calls.lock().unwrap().push("status".to_string());
        Ok(self.branch.clone())
    }

    fn add(&self, path: &Path) -> Result<(), GitError> {
        self.record("add", format!("add {}", path.display()))
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.record("commit", format!("commit {message}"))
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.record("push", format!("push {remote} {branch}"))
    }
}
