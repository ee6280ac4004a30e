//! Follows the game's `console.log` as it grows.
//!
//! The game appends to the file for as long as it runs and truncates it on
//! launch, so the tail has to notice the file shrinking (or being swapped
//! out) and restart from the top. Reading is plain polling: the file lives
//! on local disk and grows in bursts, so a 250ms cadence is plenty and
//! avoids platform watcher machinery.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ConsoleError;

/// Poll cadence and initial retry backoff.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Ceiling for the error backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Tails a single append-only file and emits complete lines in order.
pub struct LogTail {
    path: PathBuf,
    read_from_start: bool,
}

impl LogTail {
    /// Set up a tail over `path`.
    ///
    /// The file itself may not exist yet (the game creates it on launch),
    /// but the directory must.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::MissingLogDirectory`] when the parent
    /// directory is absent.
    pub fn create(path: impl Into<PathBuf>, read_from_start: bool) -> Result<Self, ConsoleError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConsoleError::MissingLogDirectory(parent.to_owned()));
            }
        }
        Ok(Self {
            path,
            read_from_start,
        })
    }

    /// Follow the file until `cancel` fires, sending complete lines to
    /// `lines`. The startup policy skips existing content unless the tail
    /// was created with `read_from_start`.
    pub async fn run(self, lines: mpsc::Sender<String>, cancel: CancellationToken) {
        let mut position: u64 = if self.read_from_start {
            0
        } else {
            tokio::fs::metadata(&self.path)
                .await
                .map(|m| m.len())
                .unwrap_or(0)
        };
        let mut signature = file_signature(&self.path).await;
        let mut pending: Vec<u8> = Vec::new();
        let mut backoff = POLL_INTERVAL;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(backoff) => {}
            }

            let meta = match tokio::fs::metadata(&self.path).await {
                Ok(meta) => meta,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    // Not created yet, or mid-rotation.
                    position = 0;
                    pending.clear();
                    backoff = POLL_INTERVAL;
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, path = %self.path.display(), "log stat failed");
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            let current_signature = file_signature(&self.path).await;
            if meta.len() < position || current_signature != signature {
                debug!(path = %self.path.display(), "log truncated or rotated, rewinding");
                position = 0;
                pending.clear();
            }
            signature = current_signature;

            if meta.len() == position {
                backoff = POLL_INTERVAL;
                continue;
            }

            match read_from(&self.path, position, &mut pending).await {
                Ok(read) => {
                    position += read;
                    backoff = POLL_INTERVAL;
                }
                Err(err) => {
                    warn!(error = %err, path = %self.path.display(), "log read failed");
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            }

            while let Some(newline) = pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = pending.drain(..=newline).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(['\n', '\r']);
                if line.is_empty() {
                    continue;
                }
                if lines.send(line.to_owned()).await.is_err() {
                    debug!("line channel closed, stopping tail");
                    return;
                }
            }
        }
        debug!("log tail exited");
    }
}

/// Read everything past `position`, appending raw bytes to `pending`.
/// Returns the number of bytes consumed.
async fn read_from(
    path: &Path,
    position: u64,
    pending: &mut Vec<u8>,
) -> Result<u64, std::io::Error> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(position)).await?;
    let mut chunk = Vec::new();
    let read = file.read_to_end(&mut chunk).await?;
    pending.extend_from_slice(&chunk);
    Ok(read as u64)
}

/// A cheap identity for the file backing the path, used to detect
/// rotation that swaps the file without shrinking it.
#[cfg(unix)]
async fn file_signature(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    tokio::fs::metadata(path).await.ok().map(|m| m.ino())
}

#[cfg(not(unix))]
async fn file_signature(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn recv_line(rx: &mut mpsc::Receiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for line")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn follows_appends_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.log");
        std::fs::write(&path, "first\nsecond\n").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let tail = LogTail::create(&path, true).unwrap();
        let handle = tokio::spawn(tail.run(tx, cancel.clone()));

        assert_eq!(recv_line(&mut rx).await, "first");
        assert_eq!(recv_line(&mut rx).await, "second");

        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "third").unwrap();
        }
        assert_eq!(recv_line(&mut rx).await, "third");

        // Truncate (game relaunch) and keep writing.
        std::fs::write(&path, "fresh\n").unwrap();
        assert_eq!(recv_line(&mut rx).await, "fresh");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn seeks_to_end_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.log");
        std::fs::write(&path, "historic\n").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let tail = LogTail::create(&path, false).unwrap();
        let handle = tokio::spawn(tail.run(tx, cancel.clone()));

        // Give the tail a moment, then append. Only the new line arrives.
        tokio::time::sleep(Duration::from_millis(300)).await;
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "live").unwrap();
        }
        assert_eq!(recv_line(&mut rx).await, "live");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn create_requires_parent_directory() {
        let missing = Path::new("/definitely/not/a/real/dir/console.log");
        assert!(matches!(
            LogTail::create(missing, false),
            Err(ConsoleError::MissingLogDirectory(_))
        ));
    }
}
