use std::{path::PathBuf, time::Instant};

use sled::{Db, Tree};
use uuid::Uuid;

use crate::repo::{RepoError, VideoRecord, VideoRepo};

macro_rules! b {
    ($self:ident.$ident:ident, $expr:expr) => {{
        let $ident = $self.$ident.clone();

        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || span.in_scope(|| $expr))
            .await
            .map_err(|_| SledError::Panic)
            .map_err(RepoError::from)?
            .map_err(SledError::from)
            .map_err(RepoError::from)?
    }};
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SledError {
    #[error("Error in database")]
    Sled(#[from] sled::Error),

    #[error("Invalid video record json")]
    Record(#[from] serde_json::Error),

    #[error("Operation panicked")]
    Panic,
}

#[derive(Clone)]
pub(crate) struct SledRepo {
    videos: Tree,
    db: Db,
}

impl std::fmt::Debug for SledRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledRepo").finish()
    }
}

impl SledRepo {
    #[tracing::instrument]
    pub(crate) fn build(path: PathBuf, cache_capacity: u64) -> Result<Self, SledError> {
        let db = sled::Config::new()
            .cache_capacity(cache_capacity)
            .path(path)
            .open()?;

        Self::new(db)
    }

    pub(crate) fn new(db: Db) -> Result<Self, SledError> {
        Ok(SledRepo {
            videos: db.open_tree("tubely-videos-tree")?,
            db,
        })
    }
}

#[async_trait::async_trait(?Send)]
impl VideoRepo for SledRepo {
    async fn health_check(&self) -> Result<(), RepoError> {
        let next = self.db.generate_id().map_err(SledError::from)?;

        b!(self.db, db.insert("health-check", &next.to_be_bytes()[..]));

        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn video(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError> {
        let start = Instant::now();

        let opt = b!(self.videos, videos.get(id.as_bytes()));

        metrics::histogram!(crate::init_metrics::SLED_VIDEO_READ)
            .record(start.elapsed().as_secs_f64());

        opt.map(|ivec| serde_json::from_slice(&ivec))
            .transpose()
            .map_err(SledError::from)
            .map_err(RepoError::from)
    }

    #[tracing::instrument(level = "trace", skip(self, record), fields(video_id = %record.id))]
    async fn create_video(&self, record: &VideoRecord) -> Result<(), RepoError> {
        let id = record.id;
        let value = serde_json::to_vec(record).map_err(SledError::from)?;

        let res = b!(
            self.videos,
            videos.compare_and_swap(id.as_bytes(), None as Option<&[u8]>, Some(value))
        );

        if res.is_err() {
            return Err(RepoError::AlreadyExists(id));
        }

        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self, record), fields(video_id = %record.id))]
    async fn update_video(&self, record: &VideoRecord) -> Result<(), RepoError> {
        let start = Instant::now();

        let id = record.id;
        let value = serde_json::to_vec(record).map_err(SledError::from)?;

        b!(self.videos, videos.insert(id.as_bytes(), value));

        metrics::histogram!(crate::init_metrics::SLED_VIDEO_WRITE)
            .record(start.elapsed().as_secs_f64());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::SledRepo;
    use crate::repo::{RepoError, VideoRecord, VideoRepo};

    fn repo() -> SledRepo {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("Opened temporary db");

        SledRepo::new(db).expect("Opened trees")
    }

    #[tokio::test]
    async fn create_then_read() {
        let repo = repo();
        let record = VideoRecord::new(Uuid::new_v4(), "title".into(), "description".into());

        repo.create_video(&record).await.expect("Created video");

        let found = repo
            .video(record.id)
            .await
            .expect("Read video")
            .expect("Video exists");

        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn missing_video_is_none() {
        let repo = repo();

        assert!(repo
            .video(Uuid::new_v4())
            .await
            .expect("Read video")
            .is_none());
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let repo = repo();
        let record = VideoRecord::new(Uuid::new_v4(), "title".into(), "description".into());

        repo.create_video(&record).await.expect("Created video");

        let res = repo.create_video(&record).await;
        assert!(matches!(res, Err(RepoError::AlreadyExists(id)) if id == record.id));
    }

    #[tokio::test]
    async fn update_overwrites() {
        let repo = repo();
        let mut record = VideoRecord::new(Uuid::new_v4(), "title".into(), "description".into());

        repo.create_video(&record).await.expect("Created video");

        record.set_video_url(String::from("bucket,landscape/key.mp4"));
        repo.update_video(&record).await.expect("Updated video");

        let found = repo
            .video(record.id)
            .await
            .expect("Read video")
            .expect("Video exists");

        assert_eq!(found.video_url.as_deref(), Some("bucket,landscape/key.mp4"));
        assert_eq!(found.thumbnail_url, None);
    }

    #[tokio::test]
    async fn health_check() {
        repo().health_check().await.expect("Healthy");
    }
}
