use std::path::{Path, PathBuf};

use actix_web::web::Bytes;
use futures_core::Stream;
use url::Url;
use uuid::Uuid;

use crate::{
    error::{Error, UploadError},
    file::File,
    media_type::UploadKind,
    repo::{VideoRecord, VideoRepo},
    staging::{random_name, StagingError, TmpFile},
};

/// Thumbnails live on local disk and are served back under `/assets`
#[derive(Clone, Debug)]
pub(crate) struct Assets {
    root: PathBuf,
    public_url: Url,
    max_file_size: u64,
}

impl Assets {
    pub(crate) async fn init(
        root: PathBuf,
        public_url: Url,
        max_file_size: u64,
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&root).await?;

        Ok(Assets {
            root,
            public_url,
            max_file_size,
        })
    }

    fn asset_url(&self, name: &str) -> String {
        format!(
            "{}/assets/{name}",
            self.public_url.as_str().trim_end_matches('/')
        )
    }

    /// Store a thumbnail for `video_id` and point the record at it
    #[tracing::instrument(name = "Upload thumbnail", skip(self, repo, stream))]
    pub(crate) async fn upload_thumbnail<R, S>(
        &self,
        repo: &R,
        video_id: Uuid,
        requester: Uuid,
        content_type: &str,
        stream: S,
    ) -> Result<VideoRecord, Error>
    where
        R: VideoRepo + ?Sized,
        S: Stream<Item = std::io::Result<Bytes>>,
    {
        let content_type = UploadKind::Thumbnail.validate(content_type)?;
        let mut record = crate::validate::owned_video(repo, video_id, requester).await?;

        let name = random_name(content_type.essence_str())?;

        // Removed on drop until persisted, including when the request is cancelled
        let partial = TmpFile::partial(&self.root, &name);
        self.write(&partial, stream).await?;
        partial
            .persist(&self.root.join(&name))
            .await
            .map_err(StagingError::Write)?;

        record.set_thumbnail_url(self.asset_url(&name));
        repo.update_video(&record).await?;

        metrics::counter!(crate::init_metrics::FILES, "kind" => UploadKind::Thumbnail.field_name())
            .increment(1);

        tracing::info!(%video_id, "Uploaded thumbnail");

        Ok(record)
    }

    async fn write<S>(&self, path: &Path, stream: S) -> Result<(), Error>
    where
        S: Stream<Item = std::io::Result<Bytes>>,
    {
        let mut file = File::create(path).await.map_err(StagingError::Create)?;

        let written = file.write_from_stream(stream, self.max_file_size).await?;

        if written == 0 {
            return Err(StagingError::Empty.into());
        }

        file.close().await.map_err(StagingError::Write)?;

        Ok(())
    }

    /// Read a stored thumbnail along with the content type its extension implies
    #[tracing::instrument(skip(self))]
    pub(crate) async fn read(&self, filename: &str) -> Result<(mime::Mime, Vec<u8>), Error> {
        if !is_asset_name(filename) {
            return Err(UploadError::MissingAsset.into());
        }

        let bytes = match tokio::fs::read(self.root.join(filename)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::MissingAsset.into())
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
            Some("png") => mime::IMAGE_PNG,
            Some("jpeg") | Some("jpg") => mime::IMAGE_JPEG,
            _ => mime::APPLICATION_OCTET_STREAM,
        };

        Ok((content_type, bytes))
    }
}

fn is_asset_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use actix_web::web::Bytes;
    use uuid::Uuid;

    use super::Assets;
    use crate::{
        error::UploadError,
        repo::{sled::SledRepo, VideoRecord, VideoRepo},
        staging::StagingError,
        validate::ValidationError,
    };

    fn body(
        parts: &'static [&'static [u8]],
    ) -> impl futures_core::Stream<Item = std::io::Result<Bytes>> {
        streem::from_fn(move |yielder| async move {
            for part in parts {
                yielder.yield_(Ok(Bytes::from_static(part))).await;
            }
        })
    }

    async fn setup(max_file_size: u64) -> (tempfile::TempDir, Assets, SledRepo, VideoRecord) {
        let dir = tempfile::tempdir().expect("Created tempdir");
        let assets = Assets::init(
            dir.path().join("assets"),
            "http://localhost:8091/".parse().expect("Valid url"),
            max_file_size,
        )
        .await
        .expect("Created assets dir");

        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("Opened temporary db");
        let repo = SledRepo::new(db).expect("Opened trees");

        let record = VideoRecord::new(Uuid::new_v4(), "title".into(), "description".into());
        repo.create_video(&record).await.expect("Created video");

        (dir, assets, repo, record)
    }

    fn asset_count(assets: &Assets) -> usize {
        std::fs::read_dir(&assets.root)
            .expect("Read assets dir")
            .count()
    }

    #[tokio::test]
    async fn png_thumbnail() {
        let (_dir, assets, repo, video) = setup(1024).await;

        let record = assets
            .upload_thumbnail(&repo, video.id, video.user_id, "image/png", body(&[b"png"]))
            .await
            .expect("Uploaded thumbnail");

        let url = record.thumbnail_url.clone().expect("Thumbnail url is set");
        assert!(url.starts_with("http://localhost:8091/assets/"));
        assert!(url.ends_with(".png"));
        assert_eq!(record.video_url, None);

        let name = url.rsplit('/').next().expect("Url has a file name");
        let (content_type, bytes) = assets.read(name).await.expect("Read asset");
        assert_eq!(content_type, mime::IMAGE_PNG);
        assert_eq!(bytes, b"png");

        let stored = repo
            .video(video.id)
            .await
            .expect("Read video")
            .expect("Video exists");
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn gif_is_rejected_before_writing() {
        let (_dir, assets, repo, video) = setup(1024).await;

        let err = assets
            .upload_thumbnail(&repo, video.id, video.user_id, "image/gif", body(&[b"gif"]))
            .await
            .expect_err("Gif is not allowed");

        assert!(matches!(
            err.kind(),
            Some(UploadError::Validation(ValidationError::MediaType(_)))
        ));
        assert_eq!(asset_count(&assets), 0);
    }

    #[tokio::test]
    async fn other_users_cannot_set_thumbnails() {
        let (_dir, assets, repo, video) = setup(1024).await;

        let err = assets
            .upload_thumbnail(&repo, video.id, Uuid::new_v4(), "image/jpeg", body(&[b"jpg"]))
            .await
            .expect_err("Not the owner");

        assert!(matches!(
            err.kind(),
            Some(UploadError::Validation(ValidationError::NotOwner(_)))
        ));
        assert_eq!(asset_count(&assets), 0);
    }

    #[tokio::test]
    async fn oversized_thumbnail_is_removed() {
        let (_dir, assets, repo, video) = setup(2).await;

        let err = assets
            .upload_thumbnail(&repo, video.id, video.user_id, "image/png", body(&[b"png"]))
            .await
            .expect_err("Too large");

        assert!(matches!(
            err.kind(),
            Some(UploadError::Staging(StagingError::TooLarge { .. }))
        ));
        assert_eq!(asset_count(&assets), 0);
    }

    #[tokio::test]
    async fn cancelled_upload_leaves_nothing_behind() {
        let (_dir, assets, repo, video) = setup(1024).await;

        let stalled = streem::from_fn(|yielder| async move {
            yielder.yield_(Ok(Bytes::from_static(b"png"))).await;
            std::future::pending::<()>().await;
        });

        let upload =
            assets.upload_thumbnail(&repo, video.id, video.user_id, "image/png", stalled);
        tokio::time::timeout(std::time::Duration::from_millis(100), upload)
            .await
            .expect_err("Upload never finishes");

        assert_eq!(asset_count(&assets), 0);

        let stored = repo
            .video(video.id)
            .await
            .expect("Read video")
            .expect("Video exists");
        assert_eq!(stored.thumbnail_url, None);
    }

    #[tokio::test]
    async fn asset_names_cannot_escape() {
        let (_dir, assets, _repo, _video) = setup(1024).await;

        for name in ["../secret", ".hidden", "", "a/b.png"] {
            let err = assets.read(name).await.expect_err("Invalid name");
            assert!(matches!(err.kind(), Some(UploadError::MissingAsset)));
        }

        let err = assets.read("missing.png").await.expect_err("Missing");
        assert!(matches!(err.kind(), Some(UploadError::MissingAsset)));
    }
}
