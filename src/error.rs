use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use color_eyre::Report;

use crate::error_code::ErrorCode;

pub(crate) struct Error {
    inner: color_eyre::Report,
}

impl Error {
    pub(crate) fn kind(&self) -> Option<&UploadError> {
        self.inner.downcast_ref()
    }

    pub(crate) fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        self.inner.root_cause()
    }

    pub(crate) fn error_code(&self) -> ErrorCode {
        self.kind()
            .map(|e| e.error_code())
            .unwrap_or(ErrorCode::UNKNOWN_ERROR)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl<T> From<T> for Error
where
    UploadError: From<T>,
{
    fn from(error: T) -> Self {
        Error {
            inner: Report::from(UploadError::from(error)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum UploadError {
    #[error("Couldn't upload file")]
    Upload(#[from] actix_form_data::Error),

    #[error("Error validating upload")]
    Validation(#[from] crate::validate::ValidationError),

    #[error("Error staging upload")]
    Staging(#[from] crate::staging::StagingError),

    #[error("Couldn't determine aspect ratio")]
    Inspect(#[source] crate::ffmpeg::FfMpegError),

    #[error("Failed to preprocess the video")]
    Rewrite(#[source] crate::ffmpeg::FfMpegError),

    #[error("Couldn't upload file to storage")]
    Storage(#[source] crate::store::StoreError),

    #[error("Couldn't update video")]
    Persistence(#[source] crate::repo::RepoError),

    #[error("Error in DB")]
    Repo(#[from] crate::repo::RepoError),

    #[error("Error in store")]
    Store(#[from] crate::store::StoreError),

    #[error("Invalid stored video address")]
    Address(#[from] crate::blob_address::AddressError),

    #[error("Error interacting with filesystem")]
    Io(#[from] std::io::Error),

    #[error("No files present in upload")]
    NoFiles,

    #[error("Requested asset doesn't exist")]
    MissingAsset,
}

impl UploadError {
    const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Upload(_) => ErrorCode::FILE_UPLOAD_ERROR,
            Self::Validation(e) => e.error_code(),
            Self::Staging(e) => e.error_code(),
            Self::Inspect(e) | Self::Rewrite(e) => e.error_code(),
            Self::Storage(e) | Self::Store(e) => e.error_code(),
            Self::Persistence(_) => ErrorCode::PERSIST_RECORD,
            Self::Repo(e) => e.error_code(),
            Self::Address(e) => e.error_code(),
            Self::Io(_) => ErrorCode::IO_ERROR,
            Self::NoFiles => ErrorCode::VALIDATE_NO_FILES,
            Self::MissingAsset => ErrorCode::ASSET_NOT_FOUND,
        }
    }
}

impl From<crate::media_type::MediaTypeError> for UploadError {
    fn from(value: crate::media_type::MediaTypeError) -> Self {
        Self::Validation(value.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        use crate::validate::ValidationError;

        match self.kind() {
            Some(
                UploadError::Upload(_)
                | UploadError::NoFiles
                | UploadError::Validation(
                    ValidationError::MediaType(_) | ValidationError::InvalidVideoId(_),
                ),
            ) => StatusCode::BAD_REQUEST,
            Some(UploadError::Staging(e)) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Some(UploadError::Inspect(e) | UploadError::Rewrite(e)) if e.is_client_error() => {
                StatusCode::BAD_REQUEST
            }
            Some(UploadError::Validation(
                ValidationError::NotOwner(_) | ValidationError::MissingIdentity,
            )) => StatusCode::UNAUTHORIZED,
            Some(
                UploadError::Validation(ValidationError::NotFound(_)) | UploadError::MissingAsset,
            ) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("application/json")
            .body(
                serde_json::to_string(&serde_json::json!({
                    "msg": self.root_cause().to_string(),
                    "code": self.error_code()
                }))
                .unwrap_or_else(|_| {
                    r#"{"msg":"Request failed","code":"unknown-error"}"#.to_string()
                }),
            )
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, ResponseError};
    use uuid::Uuid;

    use super::{Error, UploadError};
    use crate::{
        media_type::UploadKind,
        repo::{sled::SledError, RepoError},
        staging::StagingError,
        validate::ValidationError,
    };

    #[test]
    fn statuses() {
        let unsupported: Error = UploadKind::Thumbnail
            .validate("image/gif")
            .expect_err("gif is not allowed")
            .into();
        assert_eq!(unsupported.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.error_code().as_str(), "unsupported-media-type");

        let not_owner: Error = ValidationError::NotOwner(Uuid::new_v4()).into();
        assert_eq!(not_owner.status_code(), StatusCode::UNAUTHORIZED);

        let not_found: Error = ValidationError::NotFound(Uuid::new_v4()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let too_large: Error = StagingError::TooLarge { limit: 10 }.into();
        assert_eq!(too_large.status_code(), StatusCode::BAD_REQUEST);

        let io: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(io.kind(), Some(UploadError::Io(_))));
    }

    #[test]
    fn blocking_panics_surface_as_repo_errors() {
        let panicked: Error = RepoError::from(SledError::Panic).into();

        assert_eq!(panicked.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(panicked.error_code().as_str(), "sled-error");
        assert!(matches!(panicked.kind(), Some(UploadError::Repo(_))));
    }
}
