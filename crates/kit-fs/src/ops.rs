use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::{self, DirBuilder, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use kit_sync::CancelToken;

use crate::error::{FsError, FsResult};

/// Interval between existence checks in [`wait_until_file_exists`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn absolute(path: &Path) -> FsResult<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// Read a whole file.
pub async fn read_file(cancel: &CancelToken, path: impl AsRef<Path>) -> FsResult<Vec<u8>> {
    let path = absolute(path.as_ref())?;
    cancel.check()?;

    let mut file = File::open(&path)
        .await
        .map_err(|source| FsError::FailedToOpenFile {
            path: path.clone(),
            source,
        })?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

/// Replace a file's contents with `data`, creating it (mode 0600) if needed.
pub async fn overwrite_file(
    cancel: &CancelToken,
    path: impl AsRef<Path>,
    data: &[u8],
) -> FsResult<()> {
    let path = absolute(path.as_ref())?;
    cancel.check()?;

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&path)
        .await
        .map_err(|source| FsError::FailedToOpenFile {
            path: path.clone(),
            source,
        })?;
    file.write_all(data).await?;
    file.flush().await?;
    debug!(path = %path.display(), bytes = data.len(), "file overwritten");
    Ok(())
}

/// Create an empty file, and its parent directories (mode 0755), unless it
/// already exists.
pub async fn create_file(cancel: &CancelToken, path: impl AsRef<Path>) -> FsResult<()> {
    let path = absolute(path.as_ref())?;
    cancel.check()?;

    if let Some(dir) = path.parent() {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder
            .create(dir)
            .await
            .map_err(|source| FsError::CreateDirHierarchy {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    match OpenOptions::new().write(true).create_new(true).open(&path).await {
        Ok(_) => {
            debug!(path = %path.display(), "file created");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(FsError::CreateFile { path, source }),
    }
}

/// Poll every `poll_interval` until `path` exists.
///
/// Returns the cancellation error if `cancel` fires or expires first.
pub async fn wait_until_file_exists(
    cancel: &CancelToken,
    path: impl AsRef<Path>,
    poll_interval: Duration,
) -> FsResult<()> {
    let path = absolute(path.as_ref())?;
    cancel.check()?;

    loop {
        match fs::metadata(&path).await {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tokio::select! {
            () = tokio::time::sleep(poll_interval) => {}
            err = cancel.cancelled() => return Err(err.into()),
        }
    }
}

/// Delete `path` after `after` has elapsed.
///
/// The file must exist when called. Returns the cancellation error, and
/// leaves the file in place, if `cancel` fires first.
pub async fn pend_file_delete(
    cancel: &CancelToken,
    path: impl AsRef<Path>,
    after: Duration,
) -> FsResult<()> {
    let path = absolute(path.as_ref())?;
    cancel.check()?;
    fs::metadata(&path).await?;

    tokio::select! {
        () = tokio::time::sleep(after) => {}
        err = cancel.cancelled() => return Err(err.into()),
    }

    fs::remove_file(&path).await?;
    debug!(path = %path.display(), "file deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kit_sync::SyncError;

    #[tokio::test]
    async fn overwrite_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let cancel = CancelToken::new();

        overwrite_file(&cancel, &path, b"a longer first version").await.unwrap();
        overwrite_file(&cancel, &path, b"short").await.unwrap();
        assert_eq!(read_file(&cancel, &path).await.unwrap(), b"short");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn overwrite_creates_private_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        overwrite_file(&CancelToken::new(), &path, b"x").await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn read_missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&CancelToken::new(), dir.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::FailedToOpenFile { .. }));
    }

    #[tokio::test]
    async fn create_file_builds_hierarchy_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        let cancel = CancelToken::new();

        create_file(&cancel, &path).await.unwrap();
        assert!(path.exists());

        overwrite_file(&cancel, &path, b"keep").await.unwrap();
        create_file(&cancel, &path).await.unwrap();
        assert_eq!(read_file(&cancel, &path).await.unwrap(), b"keep");
    }

    #[tokio::test]
    async fn cancelled_token_blocks_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = create_file(&cancel, &path).await.unwrap_err();
        assert!(matches!(err, FsError::Cancelled(SyncError::Canceled)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn wait_returns_once_file_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late");
        let cancel = CancelToken::new().with_timeout(Duration::from_secs(10));

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                std::fs::write(path, b"here").unwrap();
            })
        };

        wait_until_file_exists(&cancel, &path, Duration::from_millis(10))
            .await
            .unwrap();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn wait_gives_up_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new().with_timeout(Duration::from_millis(50));
        let err = wait_until_file_exists(&cancel, dir.path().join("never"), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Cancelled(SyncError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn pend_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        std::fs::write(&path, b"x").unwrap();

        pend_file_delete(&CancelToken::new(), &path, Duration::from_millis(5))
            .await
            .unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn pend_delete_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = pend_file_delete(&CancelToken::new(), dir.path().join("nope"), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Io(_)));
    }
}
