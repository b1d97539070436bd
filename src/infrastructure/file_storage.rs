// File storage root - confines every user supplied name to a single directory

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::File;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::AppResult;

/// Size and modification time of a stored file, read from the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// A directory of named blobs
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    root_ready: OnceCell<()>,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            root_ready: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory on first use. Concurrent callers share one attempt;
    /// a failed attempt is retried by the next caller.
    pub async fn ensure_root(&self) -> AppResult<()> {
        self.root_ready
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.root).await?;
                info!("File storage root ready at {}", self.root.display());
                Ok::<(), std::io::Error>(())
            })
            .await?;
        Ok(())
    }

    /// Map a requested name to a path inside the root.
    ///
    /// `/` and `\` both separate segments, `.` and empty segments are dropped and
    /// `..` pops a segment but never climbs above the root. Returns None when the
    /// name normalizes to the root itself or contains a segment that is not a plain
    /// file name (NUL bytes, drive prefixes).
    ///
    /// The check is lexical only: symlinks placed inside the root are trusted and
    /// followed, even when they point outside it.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.contains('\0') {
            return None;
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in name.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => {
                    let mut components = Path::new(other).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => segments.push(other),
                        _ => return None,
                    }
                }
            }
        }

        if segments.is_empty() {
            return None;
        }

        let mut path = self.root.clone();
        path.extend(segments);
        Some(path)
    }

    /// Stat a stored file. Missing names, and names that are not regular files, are None.
    pub async fn stat(&self, name: &str) -> AppResult<Option<StoredFile>> {
        self.ensure_root().await?;

        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(StoredFile {
            path,
            size: metadata.len(),
            modified: metadata.modified()?,
        }))
    }

    /// Open a file previously returned by `stat`
    pub async fn open(&self, file: &StoredFile) -> AppResult<File> {
        Ok(File::open(&file.path).await?)
    }

    /// Write `bytes` under `name`, replacing any existing file
    pub async fn save(&self, name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        self.ensure_root().await?;
        let path = self.resolve(name).ok_or_else(|| {
            crate::error::AppError::Validation(format!("Invalid file name: {:?}", name))
        })?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_stays_inside_root() {
        let storage = FileStorage::new("/srv/files");

        assert_eq!(storage.resolve("a.png"), Some(PathBuf::from("/srv/files/a.png")));
        assert_eq!(
            storage.resolve("../../etc/passwd"),
            Some(PathBuf::from("/srv/files/etc/passwd"))
        );
        assert_eq!(
            storage.resolve("sub/../../x.png"),
            Some(PathBuf::from("/srv/files/x.png"))
        );
        assert_eq!(
            storage.resolve("..\\..\\win.ini"),
            Some(PathBuf::from("/srv/files/win.ini"))
        );
        assert_eq!(
            storage.resolve("/etc/passwd"),
            Some(PathBuf::from("/srv/files/etc/passwd"))
        );
    }

    #[test]
    fn test_resolve_rejects_degenerate_names() {
        let storage = FileStorage::new("/srv/files");
        assert_eq!(storage.resolve(""), None);
        assert_eq!(storage.resolve(".."), None);
        assert_eq!(storage.resolve("./."), None);
        assert_eq!(storage.resolve("a\0b.png"), None);
    }

    #[tokio::test]
    async fn test_ensure_root_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("images"));

        storage.ensure_root().await.unwrap();
        storage.ensure_root().await.unwrap();
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn test_stat_missing_and_directories() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        assert!(storage.stat("nope.png").await.unwrap().is_none());
        assert!(storage.stat("folder").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_removed_after_stat_is_io_error() {
        use axum::{http::StatusCode, response::IntoResponse};

        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        std::fs::write(dir.path().join("a.png"), b"png").unwrap();

        let stored = storage.stat("a.png").await.unwrap().unwrap();
        std::fs::remove_file(&stored.path).unwrap();

        let err = storage.open(&stored).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Io(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_save_then_stat() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.save("pic.webp", b"webp-bytes").await.unwrap();
        let stored = storage.stat("pic.webp").await.unwrap().unwrap();
        assert_eq!(stored.size, 10);
        assert!(stored.path.starts_with(dir.path()));
    }
}
