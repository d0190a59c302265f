//! Post files in the content directory.
//!
//! A post lives at `<posts_dir>/<slug>.md`. Writing never silently replaces
//! an existing post: the operator must confirm the overwrite.

use crate::frontmatter::{self, FrontmatterError};
use crate::prompt::{PromptError, Prompter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const POST_EXTENSION: &str = "md";

#[derive(Error, Debug)]
pub enum PostError {
    #[error("Overwrite of {0} declined")]
    Cancelled(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PostError + '_ {
    move |source| PostError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Where the post for `slug` is written.
pub fn post_path(posts_dir: &Path, slug: &str) -> PathBuf {
    posts_dir.join(format!("{slug}.{POST_EXTENSION}"))
}

/// Write `contents` to `path`, asking before replacing an existing file.
///
/// Missing parent directories are created.
pub fn write_post(
    path: &Path,
    contents: &str,
    prompter: &mut dyn Prompter,
) -> Result<PathBuf, PostError> {
    if path.try_exists().map_err(io_error(path))? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let overwrite = prompter.confirm(&format!("Post {name} already exists. Overwrite?"), false)?;
        if !overwrite {
            tracing::info!(path = %path.display(), "overwrite declined");
            return Err(PostError::Cancelled(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), "overwriting existing post");
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(path, contents).map_err(io_error(path))?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "wrote post");
    Ok(path.to_path_buf())
}

/// Outcome of checking one existing post.
#[derive(Debug)]
pub struct PostReport {
    pub path: PathBuf,
    pub result: Result<Vec<String>, FrontmatterError>,
}

impl PostReport {
    pub fn is_ok(&self) -> bool {
        matches!(&self.result, Ok(problems) if problems.is_empty())
    }
}

/// Parse every post in `posts_dir` and collect schema problems.
///
/// Reports are sorted by path.
pub fn check_posts(posts_dir: &Path) -> Result<Vec<PostReport>, PostError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(posts_dir)
        .map_err(io_error(posts_dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(POST_EXTENSION))
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path).map_err(io_error(&path))?;
            let result = frontmatter::parse(&text).map(|(fm, _)| fm.problems());
            Ok(PostReport { path, result })
        })
        .collect()
}
