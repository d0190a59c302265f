//! Image source discovery.
//!
//! The operator points the tool at a directory (drag-and-drop from a file
//! manager usually works, quotes and all). Discovery is two-phase:
//!
//! 1. [`list_images`] picks candidates by extension only and sorts them by
//!    filename so the numbered list shown to the operator is stable.
//! 2. [`read_image`] loads one candidate, sniffs its real format from the
//!    content, and reads its dimensions. This runs per image during staging
//!    so one bad file does not sink the whole batch.
//!
//! ```text
//! ~/Pictures/export/
//! ├── .DS_Store          # hidden, skipped
//! ├── DSC_0001.JPG       # candidate
//! ├── DSC_0002.jpeg      # candidate
//! ├── notes.txt          # wrong extension, skipped
//! ├── raw/               # directory, skipped
//! └── pano.webp          # candidate
//! ```

use crate::imaging::{self, ImageInfo, ProbeError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path not found: {0}")]
    NotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    /// Exists but cannot be listed.
    #[error("Cannot read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No images (jpg, jpeg, png, webp) found in {0}")]
    NoImagesFound(PathBuf),
    #[error("{path}: {source}")]
    UnsupportedFormat {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Extensions considered during listing. Matching is case-insensitive.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];

/// A file picked up by the listing, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub original_name: String,
    pub full_path: PathBuf,
}

/// A candidate whose bytes have been read and verified.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub info: ImageInfo,
}

/// Expand a leading `~` using the current user's home directory.
///
/// Surrounding whitespace and one pair of matching quotes are stripped first,
/// which is what terminals paste when a folder is dropped onto them.
pub fn expand_home(input: &str) -> PathBuf {
    expand_home_with(input, dirs::home_dir().as_deref())
}

/// [`expand_home`] with an explicit home directory.
pub fn expand_home_with(input: &str, home: Option<&Path>) -> PathBuf {
    let trimmed = unquote(input.trim());
    match (trimmed, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (path, Some(home)) if path.starts_with("~/") => home.join(&path[2..]),
        (path, _) => PathBuf::from(path),
    }
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// List candidate images in `dir`, sorted by filename.
///
/// Only regular, non-hidden files with an allowed extension are returned.
/// Subdirectories are not descended into.
pub fn list_images(dir: &Path) -> Result<Vec<ImageCandidate>, ScanError> {
    let meta = fs::metadata(dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ScanError::NotFound(dir.to_path_buf()),
        _ => directory_error(dir, e),
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| directory_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !path.is_file() || !has_image_extension(&path) {
            continue;
        }
        candidates.push(ImageCandidate {
            original_name: name,
            full_path: path,
        });
    }

    if candidates.is_empty() {
        return Err(ScanError::NoImagesFound(dir.to_path_buf()));
    }

    candidates.sort_by(|a, b| a.original_name.cmp(&b.original_name));
    Ok(candidates)
}

fn directory_error(dir: &Path, source: io::Error) -> ScanError {
    match source.kind() {
        io::ErrorKind::PermissionDenied => ScanError::Unreadable {
            path: dir.to_path_buf(),
            source,
        },
        _ => ScanError::Io {
            path: dir.to_path_buf(),
            source,
        },
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Read a candidate fully and verify its content.
pub fn read_image(path: &Path) -> Result<LoadedImage, ScanError> {
    let bytes = fs::read(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let info = imaging::probe(&bytes).map_err(|source| ScanError::UnsupportedFormat {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LoadedImage { bytes, info })
}
