use mime::Mime;

use crate::error_code::ErrorCode;

/// The kinds of media that can be attached to a video record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UploadKind {
    Thumbnail,
    Video,
}

#[derive(Clone, Debug, thiserror::Error)]
pub(crate) enum MediaTypeError {
    #[error("Unsupported media type {declared}. Supported types: {supported}")]
    Unsupported {
        declared: String,
        supported: &'static str,
    },
}

impl MediaTypeError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        ErrorCode::UNSUPPORTED_MEDIA_TYPE
    }
}

impl UploadKind {
    const fn allowed(self) -> &'static [&'static str] {
        match self {
            Self::Thumbnail => &["image/png", "image/jpeg"],
            Self::Video => &["video/mp4"],
        }
    }

    const fn supported(self) -> &'static str {
        match self {
            Self::Thumbnail => "png, jpeg",
            Self::Video => "mp4",
        }
    }

    pub(crate) const fn field_name(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Video => "video",
        }
    }

    /// Check a declared content type against this kind's allow-list
    ///
    /// Parameters such as `; charset=binary` are ignored, only the essence is compared.
    pub(crate) fn validate(self, declared: &str) -> Result<Mime, MediaTypeError> {
        let unsupported = || MediaTypeError::Unsupported {
            declared: declared.to_string(),
            supported: self.supported(),
        };

        let mime: Mime = declared.trim().parse().map_err(|_| unsupported())?;

        let essence = mime.essence_str();

        if self.allowed().iter().any(|allowed| *allowed == essence) {
            // drop any parameters so the stored content type is the bare essence
            essence.parse().map_err(|_| unsupported())
        } else {
            Err(unsupported())
        }
    }
}

/// File extension for a content type, taken from its subtype
///
/// Anything not shaped like `type/subtype` gets `.bin`.
pub(crate) fn extension(content_type: &str) -> String {
    let mut parts = content_type.split('/');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(subtype), None) => format!(".{subtype}"),
        _ => String::from(".bin"),
    }
}
