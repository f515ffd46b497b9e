use std::{net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

use crate::{
    blob_address::Playback,
    config::primitives::{LogFormat, Targets, UrlStyle},
};

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct ConfigFile {
    pub(crate) server: Server,

    pub(crate) tracing: Tracing,

    #[serde(default)]
    pub(crate) metrics: Metrics,

    pub(crate) media: Media,

    pub(crate) repo: Repo,

    pub(crate) store: Store,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub(crate) enum Repo {
    Sled(Sled),
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Server {
    pub(crate) address: SocketAddr,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) api_key: Option<String>,

    /// Header in which the upstream gateway forwards the authenticated user's id
    pub(crate) user_header: String,

    pub(crate) temporary_directory: PathBuf,

    /// Base URL that thumbnail asset links are built from
    pub(crate) public_url: Url,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Tracing {
    pub(crate) logging: Logging,

    pub(crate) opentelemetry: OpenTelemetry,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Logging {
    pub(crate) format: LogFormat,

    pub(crate) targets: Targets,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct OpenTelemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) url: Option<Url>,

    pub(crate) service_name: String,

    pub(crate) targets: Targets,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) prometheus_address: Option<SocketAddr>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Media {
    /// Seconds an ffprobe or ffmpeg invocation may run before it is killed
    pub(crate) process_timeout: u64,

    /// Megabytes
    pub(crate) video_max_file_size: usize,

    /// Megabytes
    pub(crate) image_max_file_size: usize,

    pub(crate) assets_root: PathBuf,
}

impl Media {
    pub(crate) fn video_limit(&self) -> u64 {
        megabytes(self.video_max_file_size)
    }

    pub(crate) fn image_limit(&self) -> u64 {
        megabytes(self.image_max_file_size)
    }
}

const MEGABYTES: u64 = 1024 * 1024;

fn megabytes(size: usize) -> u64 {
    u64::try_from(size)
        .unwrap_or(u64::MAX)
        .saturating_mul(MEGABYTES)
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Sled {
    pub(crate) path: PathBuf,

    pub(crate) cache_capacity: u64,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct Store {
    pub(crate) bucket_name: String,

    pub(crate) region: String,

    /// Set for S3-compatible providers such as minio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) endpoint: Option<Url>,

    pub(crate) use_path_style: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) access_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) secret_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session_token: Option<String>,

    pub(crate) url_style: UrlStyle,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) distribution_url: Option<Url>,

    /// Seconds a signed video URL stays valid
    pub(crate) signature_duration: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("url_style is distribution but no distribution_url is configured")]
pub(crate) struct MissingDistribution;

impl Store {
    pub(crate) fn playback(&self) -> Result<Playback, MissingDistribution> {
        match self.url_style {
            UrlStyle::Signed => Ok(Playback::Signed),
            UrlStyle::Direct => Ok(Playback::Direct {
                region: self.region.clone(),
            }),
            UrlStyle::Distribution => self
                .distribution_url
                .clone()
                .map(|base| Playback::Distribution { base })
                .ok_or(MissingDistribution),
        }
    }

    pub(crate) fn signature_duration(&self) -> Duration {
        Duration::from_secs(self.signature_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::Media;

    #[test]
    fn huge_limits_saturate() {
        let media = Media {
            process_timeout: 30,
            video_max_file_size: usize::MAX,
            image_max_file_size: usize::MAX / 2,
            assets_root: "assets".into(),
        };

        assert_eq!(media.video_limit(), u64::MAX);
        assert_eq!(media.image_limit(), u64::MAX);
    }
}
