//! Publishing the new post through git.
//!
//! The publisher stages exactly the post file, commits it as
//! `Add post: <title>`, and pushes the current branch to the configured
//! remote. Being on a branch other than the primary one is allowed but
//! flagged before the operator confirms. Declining to publish is not an
//! error: the post file stays on disk for a manual commit.

use crate::prompt::{PromptError, Prompter};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] io::Error),
    #[error("`git {args}` failed: {stderr}")]
    Command { args: String, stderr: String },
    #[error("HEAD is detached; check out a branch to publish")]
    DetachedHead,
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// The four repository operations publishing needs.
pub trait VersionControl {
    fn current_branch(&self) -> Result<String, GitError>;
    fn add(&self, path: &Path) -> Result<(), GitError>;
    fn commit(&self, message: &str) -> Result<(), GitError>;
    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError>;
}

/// Runs the `git` binary inside `repo`.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(args = ?args, repo = %self.repo.display(), "running git");
        Ok(Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .stdin(Stdio::null())
            .output()?)
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args)?;
        if output.status.success() {
            Ok(stdout(&output))
        } else {
            Err(command_error(args, &output))
        }
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn command_error(args: &[&str], output: &Output) -> GitError {
    GitError::Command {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl VersionControl for GitCli {
    /// Reads the symbolic ref, so a branch with no commits yet still has a name.
    fn current_branch(&self) -> Result<String, GitError> {
        let args = ["symbolic-ref", "--short", "-q", "HEAD"];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(stdout(&output)),
            // -q: exit 1 without output when HEAD is not a symbolic ref
            Some(1) => Err(GitError::DetachedHead),
            _ => Err(command_error(&args, &output)),
        }
    }

    fn add(&self, path: &Path) -> Result<(), GitError> {
        let path = path.to_string_lossy();
        self.run(&["add", "--", &*path]).map(drop)
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).map(drop)
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["push", remote, branch]).map(drop)
    }
}

pub fn commit_message(title: &str) -> String {
    format!("Add post: {title}")
}

/// Where to publish.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub primary_branch: String,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Skipped,
    Pushed { remote: String, branch: String },
}

/// Progress notifications from [`publish`].
#[derive(Debug)]
pub enum PublishEvent<'a> {
    OffPrimaryBranch { branch: &'a str, primary: &'a str },
    Committing,
    Committed,
    Pushing { remote: &'a str, branch: &'a str },
    Pushed { remote: &'a str, branch: &'a str },
}

/// Stage, commit, and push `post` after the operator confirms.
pub fn publish(
    vcs: &dyn VersionControl,
    prompter: &mut dyn Prompter,
    post: &Path,
    title: &str,
    target: &PublishTarget,
    mut on_event: impl FnMut(PublishEvent<'_>),
) -> Result<PublishOutcome, GitError> {
    let branch = vcs.current_branch()?;
    if branch != target.primary_branch {
        tracing::warn!(
            branch = %branch,
            primary = %target.primary_branch,
            "publishing from a non-primary branch"
        );
        on_event(PublishEvent::OffPrimaryBranch {
            branch: &branch,
            primary: &target.primary_branch,
        });
    }

    if !prompter.confirm("Commit and push to remote?", true)? {
        tracing::info!("git publish skipped");
        return Ok(PublishOutcome::Skipped);
    }

    on_event(PublishEvent::Committing);
    vcs.add(post)?;
    vcs.commit(&commit_message(title))?;
    on_event(PublishEvent::Committed);

    on_event(PublishEvent::Pushing {
        remote: &target.remote,
        branch: &branch,
    });
    vcs.push(&target.remote, &branch)?;
    on_event(PublishEvent::Pushed {
        remote: &target.remote,
        branch: &branch,
    });
    tracing::info!(remote = %target.remote, branch = %branch, "pushed post");

    Ok(PublishOutcome::Pushed {
        remote: target.remote.clone(),
        branch,
    })
}
