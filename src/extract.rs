use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::{
    error::Error,
    validate::{parse_video_id, ValidationError},
};

pub(crate) const DEFAULT_USER_HEADER: &str = "X-Authenticated-User";

/// Name of the header the upstream gateway puts the authenticated user's id in
#[derive(Clone, Debug)]
pub(crate) struct UserHeader(pub(crate) String);

/// The user a request is made on behalf of
///
/// Tokens are verified upstream. This only reads the id the gateway forwarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Requester(pub(crate) Uuid);

impl Requester {
    pub(crate) fn from_request_headers(req: &HttpRequest) -> Result<Self, ValidationError> {
        let header = req
            .app_data::<web::Data<UserHeader>>()
            .map(|header| header.0.as_str())
            .unwrap_or(DEFAULT_USER_HEADER);

        let value = req
            .headers()
            .get(header)
            .ok_or(ValidationError::MissingIdentity)?;

        value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(Requester)
            .ok_or(ValidationError::MissingIdentity)
    }
}

impl FromRequest for Requester {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_request_headers(req).map_err(Error::from))
    }
}

/// The `{video_id}` path segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VideoId(pub(crate) Uuid);

impl VideoId {
    pub(crate) fn from_path(req: &HttpRequest) -> Result<Self, ValidationError> {
        parse_video_id(req.match_info().get("video_id").unwrap_or_default()).map(VideoId)
    }
}

impl FromRequest for VideoId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_path(req).map_err(Error::from))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test::TestRequest, web, FromRequest};
    use uuid::Uuid;

    use super::{Requester, UserHeader, VideoId};
    use crate::{error::UploadError, validate::ValidationError};

    #[tokio::test]
    async fn default_header() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header(("X-Authenticated-User", id.to_string()))
            .to_http_request();

        let requester = Requester::extract(&req).await.expect("Extracted requester");
        assert_eq!(requester, Requester(id));
    }

    #[tokio::test]
    async fn configured_header() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .app_data(web::Data::new(UserHeader("X-User".into())))
            .insert_header(("X-User", id.to_string()))
            .insert_header(("X-Authenticated-User", Uuid::new_v4().to_string()))
            .to_http_request();

        let requester = Requester::extract(&req).await.expect("Extracted requester");
        assert_eq!(requester, Requester(id));
    }

    #[tokio::test]
    async fn missing_or_invalid() {
        let missing = TestRequest::default().to_http_request();
        let invalid = TestRequest::default()
            .insert_header(("X-Authenticated-User", "not-a-uuid"))
            .to_http_request();

        for req in [missing, invalid] {
            let err = Requester::extract(&req).await.expect_err("No identity");
            assert!(matches!(
                err.kind(),
                Some(UploadError::Validation(ValidationError::MissingIdentity))
            ));
        }
    }

    #[tokio::test]
    async fn video_id_from_path() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .param("video_id", id.to_string())
            .to_http_request();

        let video_id = VideoId::extract(&req).await.expect("Extracted video id");
        assert_eq!(video_id, VideoId(id));

        let req = TestRequest::default()
            .param("video_id", "12345")
            .to_http_request();

        let err = VideoId::extract(&req).await.expect_err("Invalid id");
        assert!(matches!(
            err.kind(),
            Some(UploadError::Validation(ValidationError::InvalidVideoId(_)))
        ));
    }
}
