//! Ctrl-C handling.
//!
//! A run registers its staging directory with a [`CleanupRegistry`] for as
//! long as the directory exists. The signal handler installed by [`install`]
//! removes whatever is registered and exits with [`INTERRUPTED_EXIT_CODE`].
//! Normal and error exits never go through here: the staging directory's own
//! drop handles those.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Conventional `128 + SIGINT`.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Shared list of directories to remove on interrupt.
#[derive(Debug, Clone, Default)]
pub struct CleanupRegistry {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` until the returned registration is dropped.
    pub fn register(&self, path: &Path) -> Registration {
        self.lock().push(path.to_path_buf());
        Registration {
            registry: self.clone(),
            path: path.to_path_buf(),
        }
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Remove every registered directory, ignoring failures.
    ///
    /// Returns how many were removed.
    pub fn cleanup_all(&self) -> usize {
        let paths = std::mem::take(&mut *self.lock());
        paths
            .iter()
            .filter(|p| std::fs::remove_dir_all(p).is_ok())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        // A poisoned list is still the right list to clean up.
        self.paths.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Keeps a path registered; unregisters on drop.
#[derive(Debug)]
pub struct Registration {
    registry: CleanupRegistry,
    path: PathBuf,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.lock().retain(|p| p != &self.path);
    }
}

/// Install the process-wide Ctrl-C handler.
pub fn install(registry: CleanupRegistry) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || std::process::exit(on_interrupt(&registry)))
}

/// Everything the handler does before exiting. Returns the exit code.
pub fn on_interrupt(registry: &CleanupRegistry) -> i32 {
    let removed = registry.cleanup_all();
    // dialoguer hides the cursor while a prompt is active
    let _ = console::Term::stderr().show_cursor();
    eprintln!();
    eprintln!("{}", console::style("✗ Interrupted").yellow());
    tracing::debug!(removed, "cleaned up staging directories after interrupt");
    INTERRUPTED_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingDir;
    use tempfile::TempDir;

    #[test]
    fn registration_is_scoped() {
        let registry = CleanupRegistry::new();
        let tmp = TempDir::new().unwrap();
        {
            let _reg = registry.register(tmp.path());
            assert_eq!(registry.registered(), vec![tmp.path().to_path_buf()]);
        }
        assert!(registry.registered().is_empty());
    }

    #[test]
    fn cleanup_all_removes_registered_dirs() {
        let registry = CleanupRegistry::new();
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("create-post-x");
        std::fs::create_dir(&staged).unwrap();
        std::fs::write(staged.join("a.jpg"), b"x").unwrap();

        let _reg = registry.register(&staged);
        assert_eq!(registry.cleanup_all(), 1);
        assert!(!staged.exists());
        assert!(registry.registered().is_empty());
    }

    #[test]
    fn interrupt_removes_live_staging_dir_and_exits_130() {
        let registry = CleanupRegistry::new();
        let parent = TempDir::new().unwrap();
        let staging = StagingDir::create_in(parent.path(), Some(&registry)).unwrap();
        std::fs::write(staging.path().join("a.jpg"), b"x").unwrap();
        assert!(staging.path().exists());

        assert_eq!(on_interrupt(&registry), INTERRUPTED_EXIT_CODE);
        assert!(!staging.path().exists());
        assert!(std::fs::read_dir(parent.path()).unwrap().next().is_none());
    }

    #[test]
    fn cleanup_all_ignores_missing_dirs() {
        let registry = CleanupRegistry::new();
        let _reg = registry.register(Path::new("/nonexistent/create-post-gone"));
        assert_eq!(registry.cleanup_all(), 0);
    }
}
