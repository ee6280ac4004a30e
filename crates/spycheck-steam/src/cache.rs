//! Content-addressed avatar cache on local disk.
//!
//! Layout: `<root>/avatars/<first-two-hex-chars>/<hash>.jpg`. Freshness is
//! decided by file modification time against a configured TTL; a stale or
//! absent entry surfaces as [`SteamError::Expired`], which callers treat
//! as "go download it again".

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::SteamError;

/// On-disk avatar cache.
pub struct AvatarCache {
    root: PathBuf,
    max_age: Duration,
}

impl AvatarCache {
    /// A cache rooted at `<root>/avatars` whose entries expire after
    /// `max_age`.
    pub fn new(root: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            root: root.into(),
            max_age,
        }
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        let prefix = hash.get(0..2).unwrap_or("00");
        self.root
            .join("avatars")
            .join(prefix)
            .join(format!("{hash}.jpg"))
    }

    /// Read a cached avatar.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::Expired`] when the entry is absent or older
    /// than the TTL; any other I/O failure is surfaced as
    /// [`SteamError::Io`].
    pub async fn get(&self, hash: &str) -> Result<Vec<u8>, SteamError> {
        let path = self.entry_path(hash);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SteamError::Expired)
            }
            Err(err) => return Err(err.into()),
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .unwrap_or(Duration::MAX);
        if age > self.max_age {
            debug!(hash, "cached avatar is stale");
            return Err(SteamError::Expired);
        }
        Ok(tokio::fs::read(&path).await?)
    }

    /// Store an avatar, creating parent directories as needed. The write
    /// goes through a sibling temp file and a rename so readers never see
    /// a half-written entry.
    ///
    /// # Errors
    ///
    /// Returns [`SteamError::Io`] on filesystem failure.
    pub async fn set(&self, hash: &str, payload: &[u8]) -> Result<(), SteamError> {
        let path = self.entry_path(hash);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = temp_sibling(&path);
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "fef49e7fa7e1997310d705b2a6158ff8dc1cdfeb";

    #[tokio::test]
    async fn set_then_get_returns_payload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AvatarCache::new(dir.path(), Duration::from_secs(3600));
        assert!(matches!(cache.get(HASH).await, Err(SteamError::Expired)));

        cache.set(HASH, b"jpeg bytes").await.unwrap();
        assert_eq!(cache.get(HASH).await.unwrap(), b"jpeg bytes");

        // Sharded under the first two hash characters.
        assert!(dir
            .path()
            .join("avatars")
            .join("fe")
            .join(format!("{HASH}.jpg"))
            .exists());
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AvatarCache::new(dir.path(), Duration::ZERO);
        cache.set(HASH, b"payload").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(cache.get(HASH).await, Err(SteamError::Expired)));
    }

    #[tokio::test]
    async fn overwrite_replaces_payload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AvatarCache::new(dir.path(), Duration::from_secs(3600));
        cache.set(HASH, b"old").await.unwrap();
        cache.set(HASH, b"new").await.unwrap();
        assert_eq!(cache.get(HASH).await.unwrap(), b"new");
    }
}
