use std::time::{Duration, Instant};

use ::object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    path::Path,
    signer::Signer,
    Attribute, Attributes, ObjectStore as _, PutOptions, PutPayload,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use url::Url;

use crate::{
    blob_address::BlobAddress,
    config,
    error_code::ErrorCode,
    store::{BlobClient, StoreError},
};

const HEALTH_CHECK_KEY: &str = "tubely-health-check";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ObjectError {
    #[error("Failed to build object storage client")]
    Build(#[source] ::object_store::Error),

    #[error("Failed to upload object")]
    Put(#[source] ::object_store::Error),

    #[error("Failed to sign object url")]
    Sign(#[source] ::object_store::Error),

    #[error("Failed to reach object storage")]
    Health(#[source] ::object_store::Error),
}

impl ObjectError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Build(_) | Self::Put(_) | Self::Health(_) => ErrorCode::OBJECT_REQUEST_ERROR,
            Self::Sign(_) => ErrorCode::SIGN_URL_ERROR,
        }
    }
}

/// S3 backed storage for processed videos, bound to a single bucket
#[derive(Debug)]
pub(crate) struct ObjectStore {
    client: AmazonS3,
    bucket: String,
}

impl ObjectStore {
    #[tracing::instrument(skip(config), fields(bucket = %config.bucket_name, region = %config.region))]
    pub(crate) fn build(config: &config::Store) -> Result<Self, ObjectError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(config.bucket_name.clone())
            .with_region(config.region.clone())
            .with_virtual_hosted_style_request(!config.use_path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint.as_str())
                .with_allow_http(endpoint.scheme() == "http");
        }

        if let Some(access_key) = &config.access_key {
            builder = builder.with_access_key_id(access_key.clone());
        }

        if let Some(secret_key) = &config.secret_key {
            builder = builder.with_secret_access_key(secret_key.clone());
        }

        if let Some(session_token) = &config.session_token {
            builder = builder.with_token(session_token.clone());
        }

        let client = builder.build().map_err(ObjectError::Build)?;

        Ok(ObjectStore {
            client,
            bucket: config.bucket_name.clone(),
        })
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.bucket
    }

    fn location(&self, address: &BlobAddress) -> Result<Path, StoreError> {
        if address.bucket() != self.bucket {
            return Err(StoreError::UnknownBucket(address.bucket().to_string()));
        }

        Ok(Path::from(address.key()))
    }
}

#[async_trait::async_trait(?Send)]
impl BlobClient for ObjectStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        match self.client.head(&Path::from(HEALTH_CHECK_KEY)).await {
            Ok(_) | Err(::object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(ObjectError::Health(e).into()),
        }
    }

    #[tracing::instrument(skip(self, reader), fields(bucket = %address.bucket(), key = %address.key()))]
    async fn put(
        &self,
        address: &BlobAddress,
        reader: &mut (dyn AsyncRead + Unpin),
        content_type: &str,
    ) -> Result<(), StoreError> {
        let location = self.location(address)?;

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.map_err(StoreError::Io)?;

        let size = buf.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let start = Instant::now();

        let res = self
            .client
            .put_opts(&location, PutPayload::from(buf), opts)
            .await;

        metrics::histogram!(
            crate::init_metrics::OBJECT_STORAGE_PUT_OBJECT_REQUEST,
            "success" => if res.is_ok() { "true" } else { "false" }
        )
        .record(start.elapsed().as_secs_f64());

        res.map_err(ObjectError::Put)?;

        tracing::debug!(size, "Uploaded object");

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(bucket = %address.bucket(), key = %address.key()))]
    async fn presign_get(&self, address: &BlobAddress, ttl: Duration) -> Result<Url, StoreError> {
        let location = self.location(address)?;

        let start = Instant::now();

        let url = self
            .client
            .signed_url(http::Method::GET, &location, ttl)
            .await
            .map_err(ObjectError::Sign)?;

        metrics::histogram!(crate::init_metrics::OBJECT_STORAGE_PRESIGN)
            .record(start.elapsed().as_secs_f64());

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ObjectStore;
    use crate::{
        blob_address::BlobAddress,
        config::{Store, UrlStyle},
        store::{BlobClient, StoreError},
    };

    fn config() -> Store {
        Store {
            bucket_name: String::from("tubely-videos"),
            region: String::from("us-east-2"),
            endpoint: None,
            use_path_style: false,
            access_key: Some(String::from("AKIDEXAMPLE")),
            secret_key: Some(String::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")),
            session_token: None,
            url_style: UrlStyle::Signed,
            distribution_url: None,
            signature_duration: 3600,
        }
    }

    #[tokio::test]
    async fn presign_get() {
        let store = ObjectStore::build(&config()).expect("Built store");
        assert_eq!(store.bucket(), "tubely-videos");

        let address =
            BlobAddress::new("tubely-videos", "landscape/abc.mp4").expect("Valid address");

        let url = store
            .presign_get(&address, Duration::from_secs(3600))
            .await
            .expect("Signed url");

        assert!(url.path().ends_with("landscape/abc.mp4"));

        let query = url.query().expect("Signed url has a query");
        assert!(query.contains("X-Amz-Expires=3600"));
        assert!(query.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn other_buckets_are_rejected() {
        let store = ObjectStore::build(&config()).expect("Built store");

        let address = BlobAddress::new("someone-elses", "landscape/abc.mp4").expect("Valid address");

        let res = store
            .presign_get(&address, Duration::from_secs(60))
            .await;
        assert!(matches!(res, Err(StoreError::UnknownBucket(bucket)) if bucket == "someone-elses"));

        let mut reader: &[u8] = b"not uploaded";
        let res = store.put(&address, &mut reader, "video/mp4").await;
        assert!(matches!(res, Err(StoreError::UnknownBucket(_))));
    }
}
