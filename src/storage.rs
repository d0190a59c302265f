//! Object storage and the upload dispatcher.
//!
//! The bucket is addressed only through [`ObjectStore::put`]: a local file
//! goes up under a `/`-separated key. Two stores are provided:
//!
//! | Store | Used for |
//! |---|---|
//! | [`WranglerStore`] | Cloudflare R2 via `npx wrangler r2 object put … --remote` |
//! | [`DirectoryStore`] | Mirroring keys into a local directory (offline runs, tests) |
//!
//! [`upload_all`] pushes staged images strictly one at a time, in staging
//! order. Each put gets one retry; a second failure stops the batch before
//! the next image is touched. Objects uploaded before the failure stay in the
//! bucket and are listed in the returned [`UploadError`].

use crate::retry::{RetryPolicy, retry};
use crate::staging::StagedImage;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
    #[error("{0}")]
    Rejected(String),
}

pub trait ObjectStore {
    /// Short description for logs, e.g. `r2://bucket`.
    fn describe(&self) -> String;

    /// Upload `local` to `key`, replacing any existing object.
    fn put(&self, local: &Path, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// Wrangler (R2)
// ============================================================================

/// Uploads through the Wrangler CLI, authenticated however the operator's
/// Wrangler is.
#[derive(Debug, Clone)]
pub struct WranglerStore {
    pub bucket: String,
    /// Working directory for `npx`, so the project's pinned Wrangler is used.
    pub project_root: PathBuf,
    pub timeout: Duration,
    pub program: String,
}

impl WranglerStore {
    pub fn new(bucket: impl Into<String>, project_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            project_root: project_root.into(),
            timeout,
            program: "npx".to_string(),
        }
    }

    /// Arguments passed to `npx` for one put.
    pub fn put_args(&self, local: &Path, key: &str) -> Vec<String> {
        vec![
            "wrangler".into(),
            "r2".into(),
            "object".into(),
            "put".into(),
            format!("{}/{}", self.bucket, key),
            "--file".into(),
            local.to_string_lossy().into_owned(),
            "--remote".into(),
        ]
    }
}

impl ObjectStore for WranglerStore {
    fn describe(&self) -> String {
        format!("r2://{}", self.bucket)
    }

    fn put(&self, local: &Path, key: &str) -> Result<(), StorageError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.put_args(local, key))
            .current_dir(&self.project_root);
        run_with_timeout(&self.program, cmd, self.timeout)
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// On unix the child leads its own process group and the whole group is
/// killed, so `wrangler` started by `npx` cannot finish a put behind the
/// retry. A terminal Ctrl-C no longer reaches that group; an interrupted run
/// leaves an in-flight put to complete or time out on its own.
fn run_with_timeout(program: &str, mut cmd: Command, timeout: Duration) -> Result<(), StorageError> {
    own_process_group(&mut cmd);
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain stderr on a thread so a chatty child cannot block on a full pipe.
    let stderr = child.stderr.take();
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            kill_group(&mut child);
            return Err(StorageError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = reader.join().unwrap_or_default();
    if status.success() {
        Ok(())
    } else {
        Err(StorageError::CommandFailed {
            program: program.to_string(),
            status,
            stderr: stderr.trim().to_string(),
        })
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        // group id == child pid, see own_process_group
        let pgid = child.id() as libc::pid_t;
        // SAFETY: killpg only sends a signal; a stale pgid yields ESRCH.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

// ============================================================================
// Local directory
// ============================================================================

/// Copies each object to `<root>/<key>`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    pub root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl ObjectStore for DirectoryStore {
    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn put(&self, local: &Path, key: &str) -> Result<(), StorageError> {
        if key.split('/').any(|part| part == "..") {
            return Err(StorageError::Rejected(format!("key escapes store root: {key}")));
        }
        let dest = self.object_path(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(local, &dest)?;
        Ok(())
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// The batch stopped at `key`.
#[derive(Error, Debug)]
#[error("Upload of {key} failed after {attempts} attempts: {source}")]
pub struct UploadError {
    pub key: String,
    pub attempts: u32,
    /// Keys that made it into the bucket before the failure.
    pub uploaded: Vec<String>,
    #[source]
    pub source: StorageError,
}

/// Progress notifications from [`upload_all`]. `index` is 1-based.
#[derive(Debug)]
pub enum UploadEvent<'a> {
    Started {
        index: usize,
        total: usize,
        key: &'a str,
    },
    Retrying {
        index: usize,
        key: &'a str,
        attempt: u32,
        error: &'a StorageError,
    },
    Uploaded {
        index: usize,
        total: usize,
        key: &'a str,
        attempts: u32,
    },
}

/// Upload every staged image in order, stopping at the first exhausted retry.
///
/// Returns the uploaded keys.
pub fn upload_all(
    store: &dyn ObjectStore,
    images: &[StagedImage],
    policy: RetryPolicy,
    mut on_event: impl FnMut(UploadEvent<'_>),
) -> Result<Vec<String>, UploadError> {
    let total = images.len();
    let mut uploaded = Vec::with_capacity(total);

    for (i, image) in images.iter().enumerate() {
        let index = i + 1;
        let key = image.remote_key.as_str();
        on_event(UploadEvent::Started { index, total, key });

        let start = Instant::now();
        let mut attempts = 0;
        let result = retry(
            policy,
            |attempt| {
                attempts = attempt;
                store.put(&image.local_path, key)
            },
            |attempt, error| {
                tracing::warn!(key, attempt, error = %error, "upload failed, retrying");
                on_event(UploadEvent::Retrying {
                    index,
                    key,
                    attempt,
                    error,
                });
            },
        );

        match result {
            Ok(()) => {
                tracing::info!(
                    key,
                    store = %store.describe(),
                    size_bytes = image.size,
                    attempts,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "uploaded"
                );
                on_event(UploadEvent::Uploaded {
                    index,
                    total,
                    key,
                    attempts,
                });
                uploaded.push(image.remote_key.clone());
            }
            Err(source) => {
                tracing::error!(key, attempts, error = %source, "upload failed");
                return Err(UploadError {
                    key: image.remote_key.clone(),
                    attempts,
                    uploaded,
                    source,
                });
            }
        }
    }

    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FlakyStore, staged_image};
    use tempfile::TempDir;

    fn batch(n: usize) -> Vec<StagedImage> {
        (1..=n)
            .map(|i| staged_image(&format!("trip/{i}.jpg"), 100, 100))
            .collect()
    }

    // =========================================================================
    // upload_all
    // =========================================================================

    #[test]
    fn uploads_each_once_in_order() {
        let store = FlakyStore::new();
        let images = batch(3);
        let keys = upload_all(&store, &images, RetryPolicy::ONCE, |_| {}).unwrap();
        assert_eq!(keys, vec!["trip/1.jpg", "trip/2.jpg", "trip/3.jpg"]);
        assert_eq!(store.calls(), vec!["trip/1.jpg", "trip/2.jpg", "trip/3.jpg"]);
    }

    #[test]
    fn single_failure_is_retried() {
        let store = FlakyStore::new().fail("trip/2.jpg", 1);
        let images = batch(3);
        let mut retried = Vec::new();
        upload_all(&store, &images, RetryPolicy::ONCE, |event| {
            if let UploadEvent::Retrying { key, attempt, .. } = event {
                retried.push((key.to_string(), attempt));
            }
        })
        .unwrap();

        assert_eq!(
            store.calls(),
            vec!["trip/1.jpg", "trip/2.jpg", "trip/2.jpg", "trip/3.jpg"]
        );
        assert_eq!(retried, vec![("trip/2.jpg".to_string(), 1)]);
    }

    #[test]
    fn double_failure_aborts_before_next_item() {
        let store = FlakyStore::new().fail("trip/2.jpg", 2);
        let images = batch(3);
        let err = upload_all(&store, &images, RetryPolicy::ONCE, |_| {}).unwrap_err();

        assert_eq!(err.key, "trip/2.jpg");
        assert_eq!(err.attempts, 2);
        assert_eq!(err.uploaded, vec!["trip/1.jpg"]);
        assert_eq!(store.calls(), vec!["trip/1.jpg", "trip/2.jpg", "trip/2.jpg"]);
    }

    #[test]
    fn events_bracket_each_upload() {
        let store = FlakyStore::new();
        let images = batch(2);
        let mut log = Vec::new();
        upload_all(&store, &images, RetryPolicy::ONCE, |event| {
            log.push(match event {
                UploadEvent::Started { index, total, .. } => format!("start {index}/{total}"),
                UploadEvent::Retrying { index, .. } => format!("retry {index}"),
                UploadEvent::Uploaded { index, attempts, .. } => format!("done {index} x{attempts}"),
            })
        })
        .unwrap();
        assert_eq!(log, vec!["start 1/2", "done 1 x1", "start 2/2", "done 2 x1"]);
    }

    // =========================================================================
    // DirectoryStore
    // =========================================================================

    #[test]
    fn directory_store_mirrors_keys() {
        let tmp = TempDir::new().unwrap();
        let local = tmp.path().join("a.jpg");
        fs::write(&local, b"jpeg bytes").unwrap();

        let store = DirectoryStore::new(tmp.path().join("bucket"));
        store.put(&local, "autumn/a.jpg").unwrap();

        let dest = tmp.path().join("bucket").join("autumn").join("a.jpg");
        assert_eq!(fs::read(dest).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn directory_store_rejects_parent_segments() {
        let tmp = TempDir::new().unwrap();
        let local = tmp.path().join("a.jpg");
        fs::write(&local, b"x").unwrap();
        let store = DirectoryStore::new(tmp.path().join("bucket"));
        assert!(matches!(
            store.put(&local, "../escape.jpg"),
            Err(StorageError::Rejected(_))
        ));
    }

    #[test]
    fn directory_store_missing_source_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryStore::new(tmp.path());
        assert!(matches!(
            store.put(&tmp.path().join("missing.jpg"), "k/a.jpg"),
            Err(StorageError::Io(_))
        ));
    }

    // =========================================================================
    // WranglerStore
    // =========================================================================

    #[test]
    fn wrangler_put_args() {
        let store = WranglerStore::new("photos", "/repo", Duration::from_secs(60));
        assert_eq!(
            store.put_args(Path::new("/tmp/create-post-x/a.jpg"), "autumn/a.jpg"),
            vec![
                "wrangler",
                "r2",
                "object",
                "put",
                "photos/autumn/a.jpg",
                "--file",
                "/tmp/create-post-x/a.jpg",
                "--remote"
            ]
        );
        assert_eq!(store.describe(), "r2://photos");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 'bucket not found' >&2; exit 3"]);
        let err = run_with_timeout("sh", cmd, Duration::from_secs(10)).unwrap_err();
        match err {
            StorageError::CommandFailed { stderr, status, .. } => {
                assert_eq!(stderr, "bucket not found");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);
        let err = run_with_timeout("sh", cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, StorageError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_grandchildren() {
        let tmp = tempfile::TempDir::new().unwrap();
        let marker = tmp.path().join("late-put");
        let mut cmd = Command::new("sh");
        cmd.args([
            "-c",
            &format!("(sleep 1; touch '{}') & wait", marker.display()),
        ]);
        let err = run_with_timeout("sh", cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, StorageError::Timeout { .. }));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "background child outlived the timeout");
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_is_ok() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 0"]);
        run_with_timeout("sh", cmd, Duration::from_secs(10)).unwrap();
    }
}
