use uuid::Uuid;

use crate::{
    error::Error,
    error_code::ErrorCode,
    media_type::MediaTypeError,
    repo::{VideoRecord, VideoRepo},
};

#[derive(Clone, Debug, thiserror::Error)]
pub(crate) enum ValidationError {
    #[error(transparent)]
    MediaType(#[from] MediaTypeError),

    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("Video {0} does not belong to you")]
    NotOwner(Uuid),

    #[error("Invalid video id")]
    InvalidVideoId(#[source] uuid::Error),

    #[error("Missing or invalid user identity")]
    MissingIdentity,
}

impl ValidationError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MediaType(e) => e.error_code(),
            Self::NotFound(_) => ErrorCode::VIDEO_NOT_FOUND,
            Self::NotOwner(_) => ErrorCode::NOT_OWNER,
            Self::InvalidVideoId(_) => ErrorCode::INVALID_VIDEO_ID,
            Self::MissingIdentity => ErrorCode::MISSING_IDENTITY,
        }
    }
}

pub(crate) fn parse_video_id(s: &str) -> Result<Uuid, ValidationError> {
    s.parse().map_err(ValidationError::InvalidVideoId)
}

/// Load a video that `requester` is allowed to modify
#[tracing::instrument(skip(repo))]
pub(crate) async fn owned_video<R>(
    repo: &R,
    video_id: Uuid,
    requester: Uuid,
) -> Result<VideoRecord, Error>
where
    R: VideoRepo + ?Sized,
{
    let Some(record) = repo.video(video_id).await? else {
        return Err(ValidationError::NotFound(video_id).into());
    };

    if !record.is_owned_by(requester) {
        return Err(ValidationError::NotOwner(video_id).into());
    }

    Ok(record)
}
