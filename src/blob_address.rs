use std::{str::FromStr, time::Duration};

use url::Url;

use crate::{
    error_code::ErrorCode,
    repo::VideoRecord,
    store::{BlobClient, StoreError},
};

/// Separates the bucket from the key in a persisted address
pub(crate) const DELIMITER: char = ',';

/// Location of an object in durable storage
///
/// Persisted as `bucket,key`. Bucket names may never contain the delimiter, and parsing
/// splits on the first occurrence, so any key survives a round trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct BlobAddress {
    bucket: String,
    key: String,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum AddressError {
    #[error("Bucket name {0:?} contains the address delimiter")]
    DelimiterInBucket(String),

    #[error("Bucket name is empty")]
    EmptyBucket,

    #[error("Object key is empty")]
    EmptyKey,

    #[error("Stored URL is not a bucket,key address")]
    NotAnAddress,
}

impl AddressError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        ErrorCode::INVALID_BLOB_ADDRESS
    }
}

/// How a freshly uploaded object is referenced from its video record
#[derive(Clone, Debug)]
pub(crate) enum Playback {
    /// Store `bucket,key` and sign a short lived URL whenever the record is read
    Signed,

    /// Store the public S3 URL
    Direct { region: String },

    /// Store a URL on the CDN that fronts the bucket
    Distribution { base: Url },
}

/// The two shapes a persisted video URL can take
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StoredUrl<'a> {
    Address(BlobAddress),
    Plain(&'a str),
}

impl<'a> StoredUrl<'a> {
    pub(crate) fn classify(stored: &'a str) -> Self {
        match BlobAddress::parse(stored) {
            Ok(address) => StoredUrl::Address(address),
            Err(_) => StoredUrl::Plain(stored),
        }
    }
}

impl BlobAddress {
    pub(crate) fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, AddressError> {
        let bucket = bucket.into();
        let key = key.into();

        if bucket.is_empty() {
            return Err(AddressError::EmptyBucket);
        }

        if bucket.contains(DELIMITER) {
            return Err(AddressError::DelimiterInBucket(bucket));
        }

        if key.is_empty() {
            return Err(AddressError::EmptyKey);
        }

        Ok(BlobAddress { bucket, key })
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.bucket
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn format(&self) -> String {
        self.to_string()
    }

    /// Split a persisted address on the first delimiter
    ///
    /// Anything whose bucket half looks like part of a URL (a scheme or a path) is rejected,
    /// so plain URLs that happen to contain a comma are never mistaken for addresses.
    pub(crate) fn parse(s: &str) -> Result<Self, AddressError> {
        let (bucket, key) = s.split_once(DELIMITER).ok_or(AddressError::NotAnAddress)?;

        if bucket.contains(':') || bucket.contains('/') {
            return Err(AddressError::NotAnAddress);
        }

        Self::new(bucket, key)
    }

    pub(crate) fn direct_url(&self, region: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, region, self.key
        )
    }

    pub(crate) fn distribution_url(&self, base: &Url) -> String {
        format!("{}/{}", base.as_str().trim_end_matches('/'), self.key)
    }

    /// The value written to a video record's URL field
    pub(crate) fn playback_url(&self, playback: &Playback) -> String {
        match playback {
            Playback::Signed => self.format(),
            Playback::Direct { region } => self.direct_url(region),
            Playback::Distribution { base } => self.distribution_url(base),
        }
    }

    /// A time limited GET URL for this object, valid for `ttl`
    pub(crate) async fn signed_url<B>(&self, client: &B, ttl: Duration) -> Result<Url, StoreError>
    where
        B: BlobClient + ?Sized,
    {
        client.presign_get(self, ttl).await
    }
}

impl FromStr for BlobAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for BlobAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.bucket, self.key)
    }
}

/// Replace an address-encoded video URL with a freshly signed one
///
/// Records without a video URL, and records holding a plain URL, pass through untouched.
#[tracing::instrument(skip(client), fields(video_id = %record.id))]
pub(crate) async fn resolve_video_url<B>(
    mut record: VideoRecord,
    client: &B,
    ttl: Duration,
) -> Result<VideoRecord, StoreError>
where
    B: BlobClient + ?Sized,
{
    let address = match record
        .video_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(StoredUrl::classify)
    {
        Some(StoredUrl::Address(address)) => address,
        _ => return Ok(record),
    };

    let url = address.signed_url(client, ttl).await?;
    record.video_url = Some(url.to_string());

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::{AddressError, BlobAddress, Playback, StoredUrl};

    #[test]
    fn round_trip() {
        let cases = [
            ("tubely-videos", "landscape/abc.mp4"),
            ("b", "k"),
            ("tubely-videos", "other/has,commas,in,it.mp4"),
            ("tubely-videos", ",leading-comma"),
        ];

        for (bucket, key) in cases {
            let address = BlobAddress::new(bucket, key).expect("Valid address");
            let parsed = BlobAddress::parse(&address.format()).expect("Parsed address");

            assert_eq!(parsed.bucket(), bucket);
            assert_eq!(parsed.key(), key);
            assert_eq!(parsed, address);
        }
    }

    #[test]
    fn bucket_cannot_hold_delimiter() {
        assert!(matches!(
            BlobAddress::new("bad,bucket", "key"),
            Err(AddressError::DelimiterInBucket(_))
        ));
        assert!(matches!(
            BlobAddress::new("", "key"),
            Err(AddressError::EmptyBucket)
        ));
        assert!(matches!(
            BlobAddress::new("bucket", ""),
            Err(AddressError::EmptyKey)
        ));
    }

    #[test]
    fn plain_urls_are_not_addresses() {
        for url in [
            "https://example.cloudfront.net/landscape/abc.mp4",
            "https://example.com/video.mp4?a=1,2",
            "http://localhost:8091/assets/abc.mp4",
        ] {
            assert_eq!(StoredUrl::classify(url), StoredUrl::Plain(url));
        }

        assert!(matches!(
            StoredUrl::classify("tubely-videos,portrait/abc.mp4"),
            StoredUrl::Address(_)
        ));
    }

    #[test]
    fn urls() {
        let address =
            BlobAddress::new("tubely-videos", "landscape/abc.mp4").expect("Valid address");

        assert_eq!(
            address.direct_url("us-east-2"),
            "https://tubely-videos.s3.us-east-2.amazonaws.com/landscape/abc.mp4"
        );

        let base = "https://d111111abcdef8.cloudfront.net/"
            .parse()
            .expect("Valid url");
        assert_eq!(
            address.distribution_url(&base),
            "https://d111111abcdef8.cloudfront.net/landscape/abc.mp4"
        );

        assert_eq!(
            address.playback_url(&Playback::Signed),
            "tubely-videos,landscape/abc.mp4"
        );
        assert_eq!(
            address.playback_url(&Playback::Direct {
                region: String::from("eu-west-1")
            }),
            "https://tubely-videos.s3.eu-west-1.amazonaws.com/landscape/abc.mp4"
        );
    }
}
