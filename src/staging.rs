use std::{
    ffi::OsString,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand_core::{OsRng, RngCore};
use uuid::Uuid;

use crate::error_code::ErrorCode;

const NAME_BYTES: usize = 32;

pub(crate) type ArcTmpDir = Arc<TmpDir>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StagingError {
    #[error("Failed to gather random bytes for file name")]
    Random(#[source] rand_core::Error),

    #[error("Error creating staged file")]
    Create(#[source] std::io::Error),

    #[error("Error reading upload")]
    Read(#[source] std::io::Error),

    #[error("Error writing staged file")]
    Write(#[source] std::io::Error),

    #[error("Upload exceeded the size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Upload was empty")]
    Empty,
}

impl StagingError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Random(_) => ErrorCode::RANDOM_SOURCE,
            Self::Create(_) | Self::Write(_) => ErrorCode::IO_ERROR,
            Self::Read(_) => ErrorCode::FILE_UPLOAD_ERROR,
            Self::TooLarge { .. } => ErrorCode::VALIDATE_FILE_SIZE,
            Self::Empty => ErrorCode::VALIDATE_FILE_EMPTY,
        }
    }

    pub(crate) const fn is_client_error(&self) -> bool {
        matches!(self, Self::TooLarge { .. } | Self::Empty | Self::Read(_))
    }
}

/// Generate an unguessable file name with the extension for `content_type`
///
/// The name is 32 bytes from the OS random source, base64url encoded without padding.
pub(crate) fn random_name(content_type: &str) -> Result<String, StagingError> {
    let mut bytes = [0u8; NAME_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(StagingError::Random)?;

    Ok(format!(
        "{}{}",
        URL_SAFE_NO_PAD.encode(bytes),
        crate::media_type::extension(content_type)
    ))
}

/// Per-process directory holding every in-flight upload
#[derive(Debug)]
pub(crate) struct TmpDir {
    path: Option<PathBuf>,
}

impl TmpDir {
    pub(crate) async fn init<P: AsRef<Path>>(path: P) -> std::io::Result<Arc<Self>> {
        let path = path.as_ref().join(Uuid::now_v7().to_string());
        tokio::fs::create_dir_all(&path).await?;
        Ok(Arc::new(TmpDir { path: Some(path) }))
    }

    pub(crate) fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Allocate a uniquely named staged file for an upload of `content_type`
    ///
    /// Nothing is created on disk yet, but whatever ends up at the returned path is removed
    /// when the `TmpFile` is dropped.
    pub(crate) fn tmp_file(&self, content_type: &str) -> Result<TmpFile, StagingError> {
        let name = random_name(content_type)?;

        Ok(TmpFile(Some(self.path().join(name))))
    }

    pub(crate) async fn cleanup(self: Arc<Self>) -> std::io::Result<()> {
        if let Some(path) = Arc::into_inner(self).and_then(|mut this| this.path.take()) {
            tokio::fs::remove_dir_all(path).await?;
        }

        Ok(())
    }
}

impl Drop for TmpDir {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!("Failed to remove staging directory {path:?}: {e}");
            }
        }
    }
}

#[must_use]
#[derive(Debug)]
pub(crate) struct TmpFile(Option<PathBuf>);

impl TmpFile {
    /// A hidden in-progress path for `name` inside `dir`
    pub(crate) fn partial(dir: &Path, name: &str) -> TmpFile {
        TmpFile(Some(dir.join(format!(".{name}.partial"))))
    }

    /// Move the file to `to`, after which it is no longer removed on drop
    pub(crate) async fn persist(mut self, to: &Path) -> std::io::Result<()> {
        if let Some(path) = self.0.as_deref() {
            tokio::fs::rename(path, to).await?;
        }

        self.0.take();

        Ok(())
    }

    /// A second staged path next to this one, named by appending `suffix`
    pub(crate) fn sibling(&self, suffix: &str) -> TmpFile {
        let mut name = OsString::from(self.as_os_str());
        name.push(suffix);

        TmpFile(Some(PathBuf::from(name)))
    }

    pub(crate) async fn cleanup(mut self) -> std::io::Result<()> {
        if let Some(path) = self.0.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

impl AsRef<Path> for TmpFile {
    fn as_ref(&self) -> &Path {
        self
    }
}

impl Deref for TmpFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TmpFile {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{random_name, TmpDir, TmpFile};

    fn entries(path: &std::path::Path) -> usize {
        std::fs::read_dir(path).expect("Read dir").count()
    }

    #[test]
    fn random_names_are_unique_and_url_safe() {
        let first = random_name("video/mp4").expect("Generated name");
        let second = random_name("video/mp4").expect("Generated name");

        assert_ne!(first, second);
        assert!(first.ends_with(".mp4"));

        let stem = first.trim_end_matches(".mp4");
        // 32 bytes of base64 without padding
        assert_eq!(stem.len(), 43);
        assert!(stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn odd_content_types_get_bin() {
        let name = random_name("application").expect("Generated name");
        assert!(name.ends_with(".bin"));
    }

    #[tokio::test]
    async fn dropped_files_are_removed() {
        let root = tempfile::tempdir().expect("Created tempdir");
        let tmp_dir = TmpDir::init(root.path()).await.expect("Created tmp dir");

        let file = tmp_dir.tmp_file("video/mp4").expect("Allocated file");
        let sibling = file.sibling(".processing");
        assert_eq!(
            sibling.to_str().expect("utf8 path"),
            format!("{}.processing", file.to_str().expect("utf8 path"))
        );

        tokio::fs::write(&*file, b"data").await.expect("Wrote file");
        tokio::fs::write(&*sibling, b"data").await.expect("Wrote file");
        assert_eq!(entries(tmp_dir.path()), 2);

        drop(file);
        sibling.cleanup().await.expect("Cleaned up sibling");

        assert_eq!(entries(tmp_dir.path()), 0);
    }

    #[tokio::test]
    async fn persisted_files_survive_drop() {
        let root = tempfile::tempdir().expect("Created tempdir");

        let partial = TmpFile::partial(root.path(), "name.png");
        assert!(partial
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.')));

        tokio::fs::write(&*partial, b"data").await.expect("Wrote file");
        partial
            .persist(&root.path().join("name.png"))
            .await
            .expect("Persisted file");

        let names = std::fs::read_dir(root.path())
            .expect("Read dir")
            .map(|entry| entry.expect("Entry").file_name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![std::ffi::OsString::from("name.png")]);
    }

    #[tokio::test]
    async fn cleanup_of_unwritten_file_is_ok() {
        let root = tempfile::tempdir().expect("Created tempdir");
        let tmp_dir = TmpDir::init(root.path()).await.expect("Created tmp dir");

        let file = tmp_dir.tmp_file("video/mp4").expect("Allocated file");
        file.cleanup().await.expect("Nothing to clean");
    }

    #[tokio::test]
    async fn tmp_dir_removed_on_cleanup() {
        let root = tempfile::tempdir().expect("Created tempdir");
        let tmp_dir = TmpDir::init(root.path()).await.expect("Created tmp dir");
        let path = tmp_dir.path().to_path_buf();

        assert!(path.exists());
        tmp_dir.cleanup().await.expect("Removed tmp dir");
        assert!(!path.exists());
    }
}
