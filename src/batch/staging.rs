use std::io;
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use time::OffsetDateTime;

const MAX_ATTEMPTS: usize = 10;

/// A transient directory, receiving the signed files of one batch.
///
/// The directory gets removed, with all of its content, when closed or dropped.
#[derive(Debug)]
pub struct StagingDirectory {
    path: PathBuf,
    removed: bool,
}

impl StagingDirectory {
    /// Create a new, uniquely named, directory inside `parent`.
    pub async fn create(parent: &Path) -> io::Result<Self> {
        let mut attempt = 0;
        loop {
            let path = parent.join(staging_name(now()));
            match fs::create_dir(&path) {
                Ok(()) => {
                    log::debug!("Created staging directory: {}", path.display());
                    return Ok(Self {
                        path,
                        removed: false,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_ATTEMPTS => {
                    attempt += 1;
                    // the name has a resolution of 100µs
                    tokio::time::sleep(Duration::from_micros(100)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory, reporting a failure to do so.
    pub fn close(mut self) -> io::Result<()> {
        self.removed = true;
        log::debug!("Removing staging directory: {}", self.path.display());
        fs::remove_dir_all(&self.path)
    }
}

impl Drop for StagingDirectory {
    fn drop(&mut self) {
        if !self.removed {
            if let Err(err) = fs::remove_dir_all(&self.path) {
                log::warn!(
                    "Failed to remove staging directory {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// The name of the staging directory: `signing-<yyyyMMddHHmmssffff>`.
pub fn staging_name(timestamp: OffsetDateTime) -> String {
    format!(
        "signing-{:04}{:02}{:02}{:02}{:02}{:02}{:04}",
        timestamp.year(),
        u8::from(timestamp.month()),
        timestamp.day(),
        timestamp.hour(),
        timestamp.minute(),
        timestamp.second(),
        timestamp.nanosecond() / 100_000
    )
}
