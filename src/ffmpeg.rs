use crate::{error_code::ErrorCode, process::ProcessError};

#[derive(Debug, thiserror::Error)]
pub(crate) enum FfMpegError {
    #[error("Error in ffmpeg process")]
    Process(#[source] ProcessError),

    #[error("Invalid output format")]
    Json(#[source] serde_json::Error),

    #[error("Invalid file path")]
    Path,
}

impl FfMpegError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Process(e) => e.error_code(),
            Self::Json(_) => ErrorCode::INVALID_PROBE_OUTPUT,
            Self::Path => ErrorCode::IO_ERROR,
        }
    }

    pub(crate) const fn is_client_error(&self) -> bool {
        // ffmpeg bailing probably means bad input
        match self {
            Self::Process(e) => e.is_client_error(),
            _ => false,
        }
    }
}
