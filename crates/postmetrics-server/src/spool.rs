//! Per-request temporary directory for uploaded images.
//!
//! Everything a request writes lives under one [`TempDir`], so the whole
//! spool disappears on [`Spool::close`] or, failing that, on drop.

use std::path::{Path, PathBuf};

use postmetrics_core::sanitize_filename;
use tempfile::TempDir;

pub struct Spool {
    dir: TempDir,
    files: usize,
}

impl Spool {
    /// Creates a fresh `postmetrics-*` directory under `parent`.
    pub fn create(parent: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("postmetrics-")
            .tempdir_in(parent)?;
        Ok(Self { dir, files: 0 })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Picks the stored name and on-disk location for the next upload.
    ///
    /// The stored name is the sanitized browser name (used in Drive); the
    /// disk name is prefixed with a counter so duplicates never collide.
    pub fn reserve(&mut self, original_name: &str) -> (String, PathBuf) {
        self.files += 1;
        let stored = sanitize_filename(original_name)
            .unwrap_or_else(|| format!("captura_{}.png", self.files));
        let path = self
            .dir
            .path()
            .join(format!("{:03}_{stored}", self.files));
        (stored, path)
    }

    /// Removes the directory. Failures are logged, never returned.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "spool removed"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove spool");
            }
        }
    }
}
