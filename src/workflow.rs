//! The post-creation workflow.
//!
//! One run walks these stages in order, once:
//!
//! ```text
//! CollectMetadata → CollectImages → ConfirmUpload → Upload
//!     → GenerateMarkdown → WriteFile → GitPublish → Done
//! ```
//!
//! Exits besides `Done`:
//!
//! - **Cancelled**: the operator declined the upload or the overwrite.
//! - **Failed**: any [`WorkflowError`]. Nothing is rolled back: objects
//!   already uploaded stay in the bucket and a written post stays on disk.
//!
//! The staging directory lives exactly as long as [`run`] does, so it is
//! removed on every one of these paths.

use crate::config::PostConfig;
use crate::frontmatter;
use crate::git::{self, GitError, PublishOutcome, PublishTarget, VersionControl};
use crate::interrupt::CleanupRegistry;
use crate::naming::{validate_identifier, validate_title};
use crate::ordering::{apply_order, parse_order};
use crate::output::{self, Console};
use crate::post::{self, PostError};
use crate::prompt::{PromptError, Prompter};
use crate::scan::{self, ScanError};
use crate::staging::{self, StagedImage, StagingDir, StagingError, StagingEvent};
use crate::storage::{self, ObjectStore, UploadError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error categories, independent of which step raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    NotADirectory,
    NoImagesFound,
    UnsupportedFormat,
    ProcessingAborted,
    NoImagesProcessed,
    UploadFailed,
    /// Reported through [`Outcome::Cancelled`], never as an error.
    Cancelled,
    GitOperationFailed,
    Io,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Post(PostError),
    #[error("Git operation failed: {0}")]
    Git(#[from] GitError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Scan(e) => match e {
                ScanError::NotFound(_) => ErrorKind::NotFound,
                ScanError::NotADirectory(_) | ScanError::Unreadable { .. } => {
                    ErrorKind::NotADirectory
                }
                ScanError::NoImagesFound(_) => ErrorKind::NoImagesFound,
                ScanError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
                ScanError::Io { .. } => ErrorKind::Io,
            },
            WorkflowError::Staging(e) => match e {
                StagingError::ProcessingAborted(_) => ErrorKind::ProcessingAborted,
                StagingError::NoImagesProcessed => ErrorKind::NoImagesProcessed,
                StagingError::Io(_) | StagingError::Prompt(_) => ErrorKind::Io,
            },
            WorkflowError::Upload(_) => ErrorKind::UploadFailed,
            WorkflowError::Post(e) => match e {
                PostError::Cancelled(_) => ErrorKind::Cancelled,
                PostError::Io { .. } | PostError::Prompt(_) => ErrorKind::Io,
            },
            WorkflowError::Git(GitError::Prompt(_)) => ErrorKind::Io,
            WorkflowError::Git(_) => ErrorKind::GitOperationFailed,
            WorkflowError::Prompt(_) | WorkflowError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Workflow stages, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectMetadata,
    CollectImages,
    ConfirmUpload,
    Upload,
    GenerateMarkdown,
    WriteFile,
    GitPublish,
    Done,
}

fn enter(stage: Stage) {
    tracing::debug!(stage = ?stage, "entering stage");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    UploadDeclined,
    OverwriteDeclined(PathBuf),
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Written, committed, and pushed.
    Published {
        path: PathBuf,
        remote: String,
        branch: String,
    },
    /// Written; the operator skipped git.
    Written { path: PathBuf },
    Cancelled(CancelReason),
}

/// Answers to the metadata prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetadata {
    pub title: String,
    pub slug: String,
    pub description: String,
    /// First segment of every remote key for this post.
    pub suffix: String,
    pub show_in_homepage: bool,
}

/// Everything frontmatter generation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub photos: Vec<StagedImage>,
    /// Remote key of the cover photo.
    pub featured_photo: String,
    pub show_in_homepage: bool,
    pub is_public: bool,
}

impl PostDraft {
    /// Draft with the first photo featured. `None` without photos.
    pub fn new(meta: PostMetadata, photos: Vec<StagedImage>) -> Option<Self> {
        let featured_photo = photos.first()?.remote_key.clone();
        Some(Self {
            title: meta.title,
            description: meta.description,
            slug: meta.slug,
            photos,
            featured_photo,
            show_in_homepage: meta.show_in_homepage,
            is_public: true,
        })
    }

    pub fn frontmatter(&self) -> frontmatter::Frontmatter {
        let mut fm = frontmatter::generate(
            &self.title,
            &self.description,
            &self.photos,
            &self.featured_photo,
            self.show_in_homepage,
        );
        fm.public = self.is_public;
        fm
    }
}

/// External collaborators for one run.
pub struct RunContext<'a> {
    /// Project root: git working tree, config, and content live here.
    pub root: &'a Path,
    pub config: &'a PostConfig,
    pub store: &'a dyn ObjectStore,
    pub vcs: &'a dyn VersionControl,
    pub console: &'a Console,
    /// Directories registered here are removed on Ctrl-C.
    pub cleanup: Option<&'a CleanupRegistry>,
    /// Parent for the staging directory; the system temp dir when `None`.
    pub staging_parent: Option<PathBuf>,
}

fn message(result: Result<(), impl ToString>) -> Result<(), String> {
    result.map_err(|e| e.to_string())
}

/// Ask for title, slug, description, key suffix, and homepage visibility.
pub fn collect_metadata(prompter: &mut dyn Prompter) -> Result<PostMetadata, PromptError> {
    let title = prompter.text("Post title:", &|s| message(validate_title(s)))?;
    let slug = prompter.text("Post slug:", &|s| message(validate_identifier(s)))?;
    let description = prompter.long_text("Post description (opens editor):")?;
    let suffix = prompter.text("Images directory suffix:", &|s| {
        message(validate_identifier(s))
    })?;
    let show_in_homepage = prompter.confirm("Show in homepage carousel?", true)?;
    Ok(PostMetadata {
        title: title.trim().to_string(),
        slug,
        description,
        suffix,
        show_in_homepage,
    })
}

/// Run the whole workflow once.
pub fn run(ctx: &RunContext<'_>, prompter: &mut dyn Prompter) -> Result<Outcome, WorkflowError> {
    let console = ctx.console;

    enter(Stage::CollectMetadata);
    console.heading("Post Metadata");
    let meta = collect_metadata(prompter)?;
    tracing::info!(slug = %meta.slug, suffix = %meta.suffix, "collected metadata");

    enter(Stage::CollectImages);
    console.heading("Image Collection");
    let dir_input = prompter.text("Image directory:", &|s| {
        if s.trim().is_empty() {
            Err("Path cannot be empty".to_string())
        } else {
            Ok(())
        }
    })?;
    let dir = scan::expand_home(&dir_input);
    let candidates = scan::list_images(&dir)?;
    tracing::info!(dir = %dir.display(), count = candidates.len(), "found images");
    console.lines(&output::format_candidates(&candidates));

    let count = candidates.len();
    let order_answer = prompter.text(
        "Image order (e.g. 3,1,2; empty keeps this order):",
        &|s| parse_order(s, count).map(drop).map_err(|e| e.to_string()),
    )?;
    let order = parse_order(&order_answer, count)
        .map_err(|e| PromptError::Script(format!("order accepted but unparsable: {e}")))?;
    let ordered = apply_order(&candidates, &order);

    let staging_dir = match &ctx.staging_parent {
        Some(parent) => StagingDir::create_in(parent, ctx.cleanup)?,
        None => StagingDir::create(ctx.cleanup)?,
    };
    let staged = staging::stage_images(&ordered, &meta.suffix, &staging_dir, prompter, |event| {
        match event {
            StagingEvent::Staged { index, image } => {
                console.lines(&output::format_staged_image(index, image))
            }
            StagingEvent::Failed {
                index,
                candidate,
                error,
            } => console.error(&output::format_staging_failure(
                index,
                &candidate.original_name,
                error,
            )),
        }
    })?;
    console.muted(&output::format_batch_summary(&staged));

    enter(Stage::ConfirmUpload);
    let proceed = prompter.confirm(
        &format!("Upload {} image(s) to {}?", staged.len(), ctx.store.describe()),
        true,
    )?;
    if !proceed {
        tracing::info!("upload declined");
        return Ok(Outcome::Cancelled(CancelReason::UploadDeclined));
    }

    enter(Stage::Upload);
    console.heading(&format!("Uploading {} image(s)", staged.len()));
    let uploaded = storage::upload_all(ctx.store, &staged, ctx.config.retry_policy(), |event| {
        console.upload_event(&event)
    });
    if let Err(e) = &uploaded {
        console.spin_failed();
        if !e.uploaded.is_empty() {
            console.warning("These objects were uploaded before the failure and remain in storage:");
            console.lines(&e.uploaded.iter().map(|k| format!("    {k}")).collect::<Vec<_>>());
        }
    }
    uploaded?;
    console.success("✓ All images uploaded");

    enter(Stage::GenerateMarkdown);
    let draft = PostDraft::new(meta, staged).ok_or(StagingError::NoImagesProcessed)?;
    let document = frontmatter::render(&draft.frontmatter());

    enter(Stage::WriteFile);
    let path = post::post_path(&ctx.config.posts_dir(ctx.root), &draft.slug);
    let path = match post::write_post(&path, &document, prompter) {
        Ok(path) => path,
        Err(PostError::Cancelled(path)) => {
            return Ok(Outcome::Cancelled(CancelReason::OverwriteDeclined(path)));
        }
        Err(e) => return Err(WorkflowError::Post(e)),
    };
    console.success(&format!("✓ Created {}", path.display()));

    enter(Stage::GitPublish);
    console.heading("Git Operations");
    let target = PublishTarget {
        primary_branch: ctx.config.primary_branch.clone(),
        remote: ctx.config.remote.clone(),
    };
    let published = git::publish(ctx.vcs, prompter, &path, &draft.title, &target, |event| {
        console.publish_event(&event)
    });
    if published.is_err() {
        console.spin_failed();
    }

    let outcome = match published? {
        PublishOutcome::Skipped => {
            console.muted("Skipped git operations");
            Outcome::Written { path }
        }
        PublishOutcome::Pushed { remote, branch } => Outcome::Published {
            path,
            remote,
            branch,
        },
    };

    enter(Stage::Done);
    console.success("✓ Post created successfully!");
    console.muted(&format!("View at: {}", ctx.config.post_url(&draft.slug)));
    drop(staging_dir);
    Ok(outcome)
}
