//! Per-job scratch directories.
//!
//! A [`Workspace`] owns a temporary directory that holds every file a job
//! creates. Dropping it removes the directory; [`Workspace::close`] does the
//! same but reports failures.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "a2v-job-";

/// Temporary directory for intermediate files of one job.
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `root`, or the system temp directory if
    /// `root` is `None`.
    pub fn new(root: Option<&Path>) -> a2v_core::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let created = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        let temp_dir = created.map_err(|e| {
            a2v_core::Error::tool("workspace", format!("failed to create temp dir: {e}"))
        })?;

        Ok(Self { temp_dir })
    }

    /// Path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a path for a named temporary file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Remove the directory and everything in it.
    pub fn close(self) -> a2v_core::Result<()> {
        let path = self.temp_dir.path().to_path_buf();
        self.temp_dir.close().map_err(|e| {
            a2v_core::Error::tool(
                "workspace",
                format!("failed to remove {}: {e}", path.display()),
            )
        })
    }
}
