//! Per-invocation scratch files for the repackaged container.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{Error, Result};

const SCRATCH_PREFIX: &str = "SslCert-";
const SCRATCH_EXTENSION: &str = "pfx";

/// Directory in which scratch containers are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The operating system's temporary directory.
    pub fn system_default() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a fresh `SslCert-<uuid>.pfx` file.
    ///
    /// The file is created exclusively, so an existing path is an error rather
    /// than an overwrite.
    pub fn write(&self, bytes: &[u8]) -> Result<ScratchFile> {
        let path =
            self.dir.join(format!("{}{}.{}", SCRATCH_PREFIX, Uuid::new_v4(), SCRATCH_EXTENSION));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path).map_err(|e| {
            Error::io(e, format!("Failed to create scratch file {}", path.display()))
        })?;
        // From here on the guard owns the path and cleans up on any failure
        let scratch = ScratchFile { path, keep: false };

        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::io(e, format!("Failed to write {}", scratch.path.display())))?;

        debug!(path = %scratch.path.display(), bytes = bytes.len(), "Wrote scratch container");
        Ok(scratch)
    }
}

/// A scratch file that is deleted when dropped unless [`ScratchFile::keep`] is called.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    keep: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the file on disk and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed scratch container"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch container; delete it manually"
            ),
        }
    }
}
