use std::{fmt::Debug, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{config, error_code::ErrorCode};

pub(crate) mod sled;

pub(crate) type ArcRepo = Arc<dyn VideoRepo>;

#[derive(Clone, Debug)]
pub(crate) enum Repo {
    Sled(self::sled::SledRepo),
}

/// A video as known to the record store
///
/// The ingestion pipeline only ever changes `video_url`, the thumbnail endpoint only
/// `thumbnail_url`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub(crate) struct VideoRecord {
    pub(crate) id: Uuid,

    pub(crate) user_id: Uuid,

    pub(crate) title: String,

    pub(crate) description: String,

    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,

    pub(crate) thumbnail_url: Option<String>,

    pub(crate) video_url: Option<String>,
}

impl VideoRecord {
    pub(crate) fn new(user_id: Uuid, title: String, description: String) -> Self {
        let now = OffsetDateTime::now_utc();

        VideoRecord {
            id: Uuid::now_v7(),
            user_id,
            title,
            description,
            created_at: now,
            updated_at: now,
            thumbnail_url: None,
            video_url: None,
        }
    }

    pub(crate) fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub(crate) fn set_video_url(&mut self, url: String) {
        self.video_url = Some(url);
        self.updated_at = OffsetDateTime::now_utc();
    }

    pub(crate) fn set_thumbnail_url(&mut self, url: String) {
        self.thumbnail_url = Some(url);
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RepoError {
    #[error("Error in sled")]
    SledError(#[from] self::sled::SledError),

    #[error("Video {0} already exists")]
    AlreadyExists(Uuid),
}

impl RepoError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SledError(_) => ErrorCode::SLED_ERROR,
            Self::AlreadyExists(_) => ErrorCode::PERSIST_RECORD,
        }
    }
}

/// Storage for video records
#[async_trait::async_trait(?Send)]
pub(crate) trait VideoRepo: Debug + Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;

    async fn video(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError>;

    async fn create_video(&self, record: &VideoRecord) -> Result<(), RepoError>;

    /// Overwrite the stored record with the same id, last writer wins
    async fn update_video(&self, record: &VideoRecord) -> Result<(), RepoError>;
}

#[async_trait::async_trait(?Send)]
impl<T> VideoRepo for Arc<T>
where
    T: VideoRepo + ?Sized,
{
    async fn health_check(&self) -> Result<(), RepoError> {
        T::health_check(self).await
    }

    async fn video(&self, id: Uuid) -> Result<Option<VideoRecord>, RepoError> {
        T::video(self, id).await
    }

    async fn create_video(&self, record: &VideoRecord) -> Result<(), RepoError> {
        T::create_video(self, record).await
    }

    async fn update_video(&self, record: &VideoRecord) -> Result<(), RepoError> {
        T::update_video(self, record).await
    }
}

impl Repo {
    #[tracing::instrument]
    pub(crate) fn open(config: config::Repo) -> color_eyre::Result<Self> {
        match config {
            config::Repo::Sled(config::Sled {
                path,
                cache_capacity,
            }) => {
                let repo = self::sled::SledRepo::build(path, cache_capacity)?;

                Ok(Self::Sled(repo))
            }
        }
    }

    pub(crate) fn to_arc(&self) -> ArcRepo {
        match self {
            Self::Sled(sled_repo) => Arc::new(sled_repo.clone()),
        }
    }
}
