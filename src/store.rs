use std::{fmt::Debug, sync::Arc, time::Duration};

use tokio::io::AsyncRead;
use url::Url;

use crate::{blob_address::BlobAddress, error_code::ErrorCode};

pub(crate) mod object_store;

pub(crate) type ArcBlobClient = Arc<dyn BlobClient>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("Error in object store")]
    ObjectStore(#[source] crate::store::object_store::ObjectError),

    #[error("Failed to read upload for storage")]
    Io(#[source] std::io::Error),

    #[error("Bucket {0} is not served by this store")]
    UnknownBucket(String),
}

impl StoreError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ObjectStore(e) => e.error_code(),
            Self::Io(_) => ErrorCode::OBJECT_IO_ERROR,
            Self::UnknownBucket(_) => ErrorCode::UNKNOWN_BUCKET,
        }
    }
}

impl From<crate::store::object_store::ObjectError> for StoreError {
    fn from(value: crate::store::object_store::ObjectError) -> Self {
        Self::ObjectStore(value)
    }
}

/// Durable object storage for processed uploads
#[async_trait::async_trait(?Send)]
pub(crate) trait BlobClient: Debug + Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Write the full contents of `reader` to `address`
    async fn put(
        &self,
        address: &BlobAddress,
        reader: &mut (dyn AsyncRead + Unpin),
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// A GET URL for `address` that expires after `ttl`
    async fn presign_get(&self, address: &BlobAddress, ttl: Duration) -> Result<Url, StoreError>;
}

#[async_trait::async_trait(?Send)]
impl<T> BlobClient for Arc<T>
where
    T: BlobClient + ?Sized,
{
    async fn health_check(&self) -> Result<(), StoreError> {
        T::health_check(self).await
    }

    async fn put(
        &self,
        address: &BlobAddress,
        reader: &mut (dyn AsyncRead + Unpin),
        content_type: &str,
    ) -> Result<(), StoreError> {
        T::put(self, address, reader, content_type).await
    }

    async fn presign_get(&self, address: &BlobAddress, ttl: Duration) -> Result<Url, StoreError> {
        T::presign_get(self, address, ttl).await
    }
}
