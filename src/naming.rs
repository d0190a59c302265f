//! Identifier validation and filename canonicalisation.
//!
//! Two kinds of names flow through a post run:
//!
//! - **Identifiers** typed by the operator: the post slug and the image
//!   directory suffix. Both must match `[a-z0-9-]+` because they end up in
//!   URLs and object-storage keys verbatim.
//! - **Source filenames** picked up from the image directory. These are
//!   arbitrary (`IMG_0042 (1).JPG`, `Résumé photo.png`) and get rewritten
//!   into a canonical form before staging:
//!
//! ```text
//! "IMG_0042 (1).JPG"   → "img-0042-1.jpg"
//! "Sunset  over_Sea.png" → "sunset-over-sea.jpg"
//! "???.webp"           → "image.jpg"
//! ```
//!
//! Every staged file carries the same [`CANONICAL_EXTENSION`] regardless of
//! the source format; the downstream renderer addresses photos by key only.

use std::collections::HashSet;
use thiserror::Error;

/// Extension appended to every sanitized filename.
pub const CANONICAL_EXTENSION: &str = "jpg";

/// Base name used when a source filename has no usable characters left.
pub const FALLBACK_BASE_NAME: &str = "image";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("cannot be empty")]
    Empty,
    #[error("use lowercase letters, numbers, and hyphens only (e.g. \"autumn-europe\")")]
    InvalidCharset,
}

/// Validate a slug or directory suffix against `[a-z0-9-]+`.
///
/// Whitespace-only input counts as empty.
pub fn validate_identifier(value: &str) -> Result<(), IdentifierError> {
    if value.trim().is_empty() {
        return Err(IdentifierError::Empty);
    }
    if value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Ok(())
    } else {
        Err(IdentifierError::InvalidCharset)
    }
}

/// Titles are free text; only blank ones are rejected.
pub fn validate_title(value: &str) -> Result<(), IdentifierError> {
    if value.trim().is_empty() {
        Err(IdentifierError::Empty)
    } else {
        Ok(())
    }
}

/// Rewrite an arbitrary filename into `<base>.jpg` with `base` in `[a-z0-9-]+`.
///
/// Steps: drop the extension, lowercase, turn whitespace/underscore runs into
/// a single hyphen, drop everything outside `[a-z0-9-]`, collapse hyphen runs,
/// trim hyphens at both ends. An empty result falls back to
/// [`FALLBACK_BASE_NAME`].
pub fn sanitize_filename(name: &str) -> String {
    format!("{}.{}", sanitize_base(strip_extension(name)), CANONICAL_EXTENSION)
}

fn strip_extension(name: &str) -> &str {
    // Matches `Path::file_stem`: a leading dot is part of the name.
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

fn sanitize_base(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut pending_hyphen = false;

    for c in stem.chars().flat_map(char::to_lowercase) {
        let mapped = if c.is_whitespace() || c == '_' || c == '-' {
            Some('-')
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            Some(c)
        } else {
            None
        };
        match mapped {
            Some('-') => pending_hyphen = true,
            Some(c) => {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push(c);
            }
            None => {}
        }
    }

    if out.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        out
    }
}

/// Hands out unique canonical filenames within one run.
///
/// The first claim of a base name gets `foo.jpg`; later claims get
/// `foo-2.jpg`, `foo-3.jpg`, … skipping any name already taken.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    used: HashSet<String>,
}

impl FilenameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize `original` and reserve a name that has not been handed out yet.
    pub fn allocate(&mut self, original: &str) -> String {
        let base = sanitize_base(strip_extension(original));
        let mut candidate = format!("{base}.{CANONICAL_EXTENSION}");
        let mut n = 2u32;
        while self.used.contains(&candidate) {
            candidate = format!("{base}-{n}.{CANONICAL_EXTENSION}");
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
