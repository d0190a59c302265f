//! Staging: turn the ordered candidates into upload-ready files.
//!
//! Each run gets its own temporary directory (`$TMPDIR/create-post-XXXXXX`).
//! Every candidate is read and verified, given a canonical collision-free
//! name, and written there:
//!
//! ```text
//! candidates (ordered)        staging dir            remote key
//! IMG_0042.JPG           →    img-0042.jpg      →    autumn/img-0042.jpg
//! img 0042.png           →    img-0042-2.jpg    →    autumn/img-0042-2.jpg
//! Sunset.webp            →    sunset.jpg        →    autumn/sunset.jpg
//! ```
//!
//! A candidate that fails to read or verify does not stop the batch by
//! itself: the operator decides whether to skip it or abort.
//!
//! The directory is removed when the [`StagingDir`] is dropped, on success
//! and failure alike.

use crate::interrupt::{CleanupRegistry, Registration};
use crate::naming::FilenameAllocator;
use crate::prompt::{PromptError, Prompter};
use crate::scan::{self, ImageCandidate, ScanError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Image processing aborted at {0}")]
    ProcessingAborted(String),
    #[error("No images were processed")]
    NoImagesProcessed,
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

const STAGING_PREFIX: &str = "create-post-";

/// A run-scoped temporary directory.
///
/// Removed on drop. Removal failures are logged and otherwise ignored so they
/// never replace the run's real outcome.
#[derive(Debug)]
pub struct StagingDir {
    dir: Option<TempDir>,
    _registration: Option<Registration>,
}

impl StagingDir {
    /// Create under the system temp directory.
    pub fn create(registry: Option<&CleanupRegistry>) -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), registry)
    }

    /// Create under `parent`. If a registry is given the directory is also
    /// removed on Ctrl-C.
    pub fn create_in(parent: &Path, registry: Option<&CleanupRegistry>) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)?;
        tracing::debug!(path = %dir.path().display(), "created staging directory");
        let registration = registry.map(|r| r.register(dir.path()));
        Ok(Self {
            dir: Some(dir),
            _registration: registration,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => tracing::debug!(path = %path.display(), "removed staging directory"),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove staging directory"
                ),
            }
        }
    }
}

/// An image copied into the staging directory under its final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub local_path: PathBuf,
    /// `<suffix>/<final filename>`, unique within the run.
    pub remote_key: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
    pub source: PathBuf,
}

/// Progress notifications from [`stage_images`].
#[derive(Debug)]
pub enum StagingEvent<'a> {
    Staged {
        index: usize,
        image: &'a StagedImage,
    },
    Failed {
        index: usize,
        candidate: &'a ImageCandidate,
        error: &'a ScanError,
    },
}

/// Stage `candidates` in order under keys prefixed with `suffix`.
///
/// `index` in events is 1-based over `candidates`.
pub fn stage_images(
    candidates: &[ImageCandidate],
    suffix: &str,
    staging: &StagingDir,
    prompter: &mut dyn Prompter,
    mut on_event: impl FnMut(StagingEvent<'_>),
) -> Result<Vec<StagedImage>, StagingError> {
    let mut names = FilenameAllocator::new();
    let mut staged = Vec::with_capacity(candidates.len());

    for (i, candidate) in candidates.iter().enumerate() {
        let index = i + 1;
        let loaded = match scan::read_image(&candidate.full_path) {
            Ok(loaded) => loaded,
            Err(error) => {
                tracing::info!(
                    source = %candidate.full_path.display(),
                    error = %error,
                    "could not stage image"
                );
                on_event(StagingEvent::Failed {
                    index,
                    candidate,
                    error: &error,
                });
                if prompter.confirm("Continue without this image?", true)? {
                    continue;
                }
                return Err(StagingError::ProcessingAborted(candidate.original_name.clone()));
            }
        };

        let filename = names.allocate(&candidate.original_name);
        let local_path = staging.path().join(&filename);
        fs::write(&local_path, &loaded.bytes)?;

        let image = StagedImage {
            local_path,
            remote_key: format!("{suffix}/{filename}"),
            size: loaded.bytes.len() as u64,
            width: loaded.info.width,
            height: loaded.info.height,
            mime: loaded.info.format.mime(),
            source: candidate.full_path.clone(),
        };
        tracing::info!(
            key = %image.remote_key,
            size_bytes = image.size,
            width = image.width,
            height = image.height,
            "staged image"
        );
        on_event(StagingEvent::Staged {
            index,
            image: &image,
        });
        staged.push(image);
    }

    if staged.is_empty() {
        return Err(StagingError::NoImagesProcessed);
    }
    Ok(staged)
}
