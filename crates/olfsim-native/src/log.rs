//! Run log
//!
//! A thread-safe, append-only line log owned by each run. Hosts point it at a
//! file with [`RunLogger::redirect`]; until then every call is a no-op. Write
//! failures switch the logger off and emit a `tracing` warning, so logging can
//! never abort a simulation.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

struct Sink {
    path: PathBuf,
    file: File,
}

/// Mutex-protected line logger
#[derive(Default)]
pub struct RunLogger {
    sink: Mutex<Option<Sink>>,
}

impl RunLogger {
    /// Create a logger with no destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Sink>> {
        // A panic mid-write leaves at worst a truncated line
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start appending to `path`, closing any previous destination first.
    ///
    /// On failure the logger is left disabled and the error is returned for
    /// the host to report.
    pub fn redirect(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let mut sink = self.lock();
        *sink = None;

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                *sink = Some(Sink {
                    path: path.to_path_buf(),
                    file,
                });
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "run log unavailable, logging disabled");
                Err(e)
            }
        }
    }

    /// Stop writing; later calls are no-ops until the next redirect.
    pub fn disable(&self) {
        *self.lock() = None;
    }

    /// Whether a destination is currently set.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().is_some()
    }

    /// Current destination, if any.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|s| s.path.clone())
    }

    /// Append one line.
    pub fn log(&self, msg: impl AsRef<str>) {
        let mut sink = self.lock();
        let Some(s) = sink.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(s.file, "{}", msg.as_ref()) {
            warn!(path = %s.path.display(), error = %e, "run log write failed, logging disabled");
            *sink = None;
        }
    }

    /// Append an empty line.
    pub fn blank(&self) {
        self.log("");
    }
}

impl std::fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLogger").field("path", &self.path()).finish()
    }
}
