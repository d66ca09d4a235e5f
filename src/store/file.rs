//! Local file blob for the snapshot store.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{SnapshotBlob, StoreError, StoreErrorKind};

const LOCK_POLL: Duration = Duration::from_millis(2);

/// Snapshot file guarded by a sibling lock file.
///
/// Writers take `<path>.lock` (created exclusively, holding the writer's
/// pid), compare, write
/// `<path>.tmp` and rename it over `<path>`. Readers never lock: rename is
/// atomic, so they always see a complete document.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
    lock_path: PathBuf,
    tmp_path: PathBuf,
    lock_timeout: Duration,
}

impl FileBlob {
    /// Opens the blob at `path`, creating missing parent directories.
    ///
    /// The file itself is created on first write.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let with_suffix = |suffix: &str| {
            let mut name = path.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        let blob = Self {
            lock_path: with_suffix(".lock"),
            tmp_path: with_suffix(".tmp"),
            path,
            lock_timeout,
        };
        info!(path = %blob.path.display(), "Snapshot file ready");
        Ok(blob)
    }

    /// Path of the snapshot document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<LockGuard, StoreError> {
        let started = Instant::now();
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.lock_path)
            {
                Ok(mut file) => {
                    let guard = LockGuard {
                        path: self.lock_path.clone(),
                    };
                    writeln!(file, "{}", std::process::id())?;
                    return Ok(guard);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if started.elapsed() >= self.lock_timeout {
                        let holder = fs::read_to_string(&self.lock_path)
                            .ok()
                            .map(|pid| pid.trim().to_string())
                            .filter(|pid| !pid.is_empty())
                            .unwrap_or_else(|| "unknown".to_string());
                        warn!(lock = %self.lock_path.display(), %holder, "Timed out waiting for snapshot lock");
                        return Err(StoreError::new(
                            StoreErrorKind::LockTimeout,
                            format!(
                                "Lock {} held by process {} for more than {:?}; remove the file if that process is gone",
                                self.lock_path.display(),
                                holder,
                                self.lock_timeout
                            ),
                        ));
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "Failed to release snapshot lock");
        }
    }
}

impl SnapshotBlob for FileBlob {
    fn fetch(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, expected, next), fields(path = %self.path.display(), bytes = next.len()))]
    fn compare_and_swap(&self, expected: Option<&[u8]>, next: &[u8]) -> Result<bool, StoreError> {
        let _lock = self.lock()?;
        if self.fetch()?.as_deref() != expected {
            debug!("Snapshot file changed since read");
            return Ok(false);
        }
        fs::write(&self.tmp_path, next)?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(true)
    }
}
