//! Post frontmatter: generation, rendering, and parsing.
//!
//! A post file is a YAML header between `---` delimiters, a blank line, and
//! the description as the body:
//!
//! ```text
//! ---
//! title: "Autumn in Europe"
//! description: "Three weeks, two trains, one camera."
//! public: true
//! created_at: "2026-10-15T09:30:00.000Z"
//! photos:
//!   - filename: "autumn-europe/dsc-0001.jpg"
//!     width: 6000
//!     height: 4000
//! featured_photo: "autumn-europe/dsc-0001.jpg"
//! show_in_homepage: true
//! ---
//!
//! Three weeks, two trains, one camera.
//! ```
//!
//! The site's content collection, RSS feed, and sitemap all read these field
//! names, so they are fixed.
//!
//! ## Rendering
//!
//! The header is emitted by hand rather than through a YAML serializer so the
//! output is byte-stable: every string is double-quoted, nothing is ever
//! line-wrapped, and keys keep the order above. String scalars are written as
//! JSON string literals, which are valid YAML double-quoted scalars. Parsing
//! goes through `serde_yaml`.

use crate::staging::StagedImage;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

pub const DELIMITER: &str = "---";

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("missing opening `---`")]
    MissingOpening,
    #[error("missing closing `---`")]
    MissingClosing,
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Structured post header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub photos: Vec<Photo>,
    pub featured_photo: String,
    pub show_in_homepage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Remote key of the object, e.g. `autumn-europe/dsc-0001.jpg`.
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl From<&StagedImage> for Photo {
    fn from(image: &StagedImage) -> Self {
        Photo {
            filename: image.remote_key.clone(),
            width: image.width,
            height: image.height,
        }
    }
}

/// Build the header for a new post, timestamped now.
pub fn generate(
    title: &str,
    description: &str,
    photos: &[StagedImage],
    featured_key: &str,
    show_in_homepage: bool,
) -> Frontmatter {
    generate_at(
        title,
        description,
        photos,
        featured_key,
        show_in_homepage,
        Utc::now(),
    )
}

/// [`generate`] with an explicit timestamp.
///
/// The timestamp is truncated to milliseconds, the precision it is rendered
/// with.
pub fn generate_at(
    title: &str,
    description: &str,
    photos: &[StagedImage],
    featured_key: &str,
    show_in_homepage: bool,
    created_at: DateTime<Utc>,
) -> Frontmatter {
    Frontmatter {
        title: title.to_string(),
        description: description.to_string(),
        public: true,
        created_at: created_at.trunc_subsecs(3),
        photos: photos.iter().map(Photo::from).collect(),
        featured_photo: featured_key.to_string(),
        show_in_homepage,
    }
}

impl Frontmatter {
    /// Schema-level problems a renderer would trip over.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push("title is empty".to_string());
        }
        if self.photos.is_empty() {
            problems.push("no photos".to_string());
        }
        for photo in &self.photos {
            if photo.width == 0 || photo.height == 0 {
                problems.push(format!("{} has zero dimensions", photo.filename));
            }
        }
        if !self
            .photos
            .iter()
            .any(|p| p.filename == self.featured_photo)
        {
            problems.push(format!(
                "featured_photo {} is not one of the photos",
                self.featured_photo
            ));
        }
        problems
    }
}

/// Quote a string scalar.
///
/// JSON escaping covers C0 controls, `"` and `\`. YAML additionally forbids
/// DEL, the C1 range, and U+FFFE/U+FFFF raw, and folds a raw NEL (U+0085)
/// into a space, so those are written as `\uXXXX` too.
fn quoted(s: &str) -> String {
    // JSON string escaping never fails for &str
    let json = serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.escape_default()));
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if yaml_needs_escape(c) {
            let _ = write!(out, "\\u{:04X}", c as u32);
        } else {
            out.push(c);
        }
    }
    out
}

fn yaml_needs_escape(c: char) -> bool {
    matches!(c, '\u{7f}'..='\u{9f}' | '\u{fffe}' | '\u{ffff}')
}

/// Render only the YAML between the delimiters (trailing newline included).
pub fn render_header(fm: &Frontmatter) -> String {
    let mut out = String::new();
    let created_at = fm.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let _ = writeln!(out, "title: {}", quoted(&fm.title));
    let _ = writeln!(out, "description: {}", quoted(&fm.description));
    let _ = writeln!(out, "public: {}", fm.public);
    let _ = writeln!(out, "created_at: {}", quoted(&created_at));
    if fm.photos.is_empty() {
        out.push_str("photos: []\n");
    } else {
        out.push_str("photos:\n");
        for photo in &fm.photos {
            let _ = writeln!(out, "  - filename: {}", quoted(&photo.filename));
            let _ = writeln!(out, "    width: {}", photo.width);
            let _ = writeln!(out, "    height: {}", photo.height);
        }
    }
    let _ = writeln!(out, "featured_photo: {}", quoted(&fm.featured_photo));
    let _ = writeln!(out, "show_in_homepage: {}", fm.show_in_homepage);
    out
}

/// Render the complete post file: header, blank line, description body.
pub fn render(fm: &Frontmatter) -> String {
    format!(
        "{DELIMITER}\n{}{DELIMITER}\n\n{}\n",
        render_header(fm),
        fm.description
    )
}

/// Split a post file into its parsed header and body.
pub fn parse(text: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
        .ok_or(FrontmatterError::MissingOpening)?;

    let (yaml, body) = split_closing(rest).ok_or(FrontmatterError::MissingClosing)?;
    let fm: Frontmatter = serde_yaml::from_str(yaml)?;
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    Ok((fm, body.trim_end_matches(['\n', '\r']).to_string()))
}

fn split_closing(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
