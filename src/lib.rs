//! # Photo Post
//!
//! Interactive onboarding for photo-blog posts. One run takes a directory of
//! photos and ends with a committed, pushed markdown post whose frontmatter
//! references the uploaded images.
//!
//! # Architecture: One Linear Workflow
//!
//! ```text
//! 1. Metadata   prompts       →  title, slug, description, key suffix
//! 2. Images     directory     →  staged copies with canonical names
//! 3. Upload     staging dir   →  object storage (one retry per image)
//! 4. Post       staged images →  <posts_dir>/<slug>.md
//! 5. Publish    post file     →  git add, commit, push
//! ```
//!
//! Every external collaborator sits behind a trait so the workflow can run in
//! tests without a terminal, a bucket, or a repository:
//!
//! - [`prompt::Prompter`] for operator input (`dialoguer` in production).
//! - [`storage::ObjectStore`] for uploads (`wrangler` subprocess or a local directory).
//! - [`git::VersionControl`] for publishing (`git` subprocess).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`workflow`] | The stage sequence, `PostDraft`, error kinds, run outcome |
//! | [`naming`] | Slug and suffix validation, canonical filenames with collision suffixes |
//! | [`imaging`] | Content sniffing and dimension probing |
//! | [`scan`] | Image directory listing and reading |
//! | [`ordering`] | Operator-supplied display order |
//! | [`staging`] | Run-scoped temp directory and image staging |
//! | [`storage`] | Object storage backends and the sequential upload loop |
//! | [`retry`] | Bounded retry |
//! | [`frontmatter`] | Post header generation, rendering, parsing |
//! | [`post`] | Writing and checking post files |
//! | [`git`] | Commit and push |
//! | [`prompt`] | Operator prompts |
//! | [`interrupt`] | Ctrl-C cleanup |
//! | [`config`] | `photo-post.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Sniffing Over Extensions
//!
//! Extensions only decide which files are candidates. Whether a file is
//! actually a JPEG, PNG, or WebP is decided from its bytes, and its
//! dimensions come from the header, so a mislabeled file is caught before
//! anything is uploaded.
//!
//! ## No Rollback
//!
//! A failed upload stops the batch but leaves earlier objects in the bucket;
//! a failed push leaves the commit in place. The operator gets the list of
//! orphaned keys instead. Deleting remote objects automatically would make a
//! partial failure worse, not better.

pub mod config;
pub mod frontmatter;
pub mod git;
pub mod imaging;
pub mod interrupt;
pub mod naming;
pub mod ordering;
pub mod output;
pub mod post;
pub mod prompt;
pub mod retry;
pub mod scan;
pub mod staging;
pub mod storage;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;
