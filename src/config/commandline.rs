use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use url::Url;

use crate::config::primitives::{LogFormat, Targets, UrlStyle};

impl Args {
    pub(super) fn into_output(self) -> Output {
        let Args {
            config_file,
            log_format,
            log_targets,
            opentelemetry_url,
            opentelemetry_service_name,
            opentelemetry_targets,
            save_to,
            command,
        } = self;

        let tracing = Tracing {
            logging: Logging {
                format: log_format,
                targets: log_targets,
            },
            opentelemetry: OpenTelemetry {
                url: opentelemetry_url,
                service_name: opentelemetry_service_name,
                targets: opentelemetry_targets,
            },
        };

        match command {
            Command::Run(Run {
                address,
                api_key,
                user_header,
                temporary_directory,
                public_url,
                metrics_prometheus_address,
                media_process_timeout,
                media_video_max_file_size,
                media_image_max_file_size,
                media_assets_root,
                repo_path,
                repo_cache_capacity,
                store,
            }) => {
                let server = Server {
                    address,
                    api_key,
                    user_header,
                    temporary_directory,
                    public_url,
                };

                let metrics = Metrics {
                    prometheus_address: metrics_prometheus_address,
                };

                let media = Media {
                    process_timeout: media_process_timeout,
                    video_max_file_size: media_video_max_file_size,
                    image_max_file_size: media_image_max_file_size,
                    assets_root: media_assets_root,
                };

                let repo = Sled {
                    path: repo_path,
                    cache_capacity: repo_cache_capacity,
                }
                .set()
                .map(Repo::Sled);

                Output {
                    config_format: ConfigFormat {
                        server,
                        tracing,
                        metrics,
                        media,
                        repo,
                        store,
                    },
                    save_to,
                    config_file,
                }
            }
        }
    }
}

pub(super) struct Output {
    pub(super) config_format: ConfigFormat,
    pub(super) save_to: Option<PathBuf>,
    pub(super) config_file: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct ConfigFormat {
    server: Server,
    tracing: Tracing,
    metrics: Metrics,
    media: Media,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<Repo>,
    store: ObjectStorage,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Server {
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<SocketAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temporary_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_url: Option<Url>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Tracing {
    logging: Logging,
    opentelemetry: OpenTelemetry,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Logging {
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<LogFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<Targets>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct OpenTelemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<Targets>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    prometheus_address: Option<SocketAddr>,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Media {
    #[serde(skip_serializing_if = "Option::is_none")]
    process_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_max_file_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_max_file_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets_root: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
enum Repo {
    Sled(Sled),
}

/// Run the tubely media server
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(super) struct Args {
    /// Path to the tubely configuration file
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Format of logs printed to stdout
    #[arg(long)]
    log_format: Option<LogFormat>,
    /// Log levels to print to stdout, respects RUST_LOG formatting
    #[arg(long)]
    log_targets: Option<Targets>,

    /// URL to send OpenTelemetry traces
    #[arg(long)]
    opentelemetry_url: Option<Url>,
    /// Service Name to use for OpenTelemetry
    #[arg(long)]
    opentelemetry_service_name: Option<String>,
    /// Log levels to use for OpenTelemetry, respects RUST_LOG formatting
    #[arg(long)]
    opentelemetry_targets: Option<Targets>,

    /// File to save the current configuration for reproducible runs
    #[arg(long)]
    save_to: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the tubely web server
    Run(Run),
}

#[derive(Debug, Parser)]
struct Run {
    /// The address and port to bind the tubely web server
    #[arg(short, long)]
    address: Option<SocketAddr>,

    /// The API KEY required to access internal routes
    #[arg(long)]
    api_key: Option<String>,

    /// The header in which the authenticating gateway forwards the caller's user id
    #[arg(long)]
    user_header: Option<String>,

    /// The directory uploads are staged in while they are processed
    #[arg(long)]
    temporary_directory: Option<PathBuf>,

    /// The externally visible base URL of this server, used for thumbnail links
    #[arg(long)]
    public_url: Option<Url>,

    /// Whether to enable the prometheus scrape endpoint
    #[arg(long)]
    metrics_prometheus_address: Option<SocketAddr>,

    /// Timeout, in seconds, for each ffprobe or ffmpeg invocation
    #[arg(long)]
    media_process_timeout: Option<u64>,

    /// The maximum size, in megabytes, of an uploaded video
    #[arg(long)]
    media_video_max_file_size: Option<usize>,

    /// The maximum size, in megabytes, of an uploaded thumbnail
    #[arg(long)]
    media_image_max_file_size: Option<usize>,

    /// The directory thumbnails are written to and served from
    #[arg(long)]
    media_assets_root: Option<PathBuf>,

    /// The path to store the sled database
    #[arg(long)]
    repo_path: Option<PathBuf>,

    /// The cache capacity, in bytes, allowed to sled for in-memory operations
    #[arg(long)]
    repo_cache_capacity: Option<u64>,

    #[command(flatten)]
    store: ObjectStorage,
}

/// Configuration for Object Storage
#[derive(Clone, Debug, Default, Parser, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct ObjectStorage {
    /// The bucket in which to store videos
    #[arg(long = "store-bucket-name")]
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket_name: Option<String>,

    /// The region the bucket is located in
    #[arg(long = "store-region")]
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,

    /// The base endpoint for S3-compatible object storage
    ///
    /// Examples:
    /// - `http://localhost:9000`
    /// - `https://s3.dualstack.eu-west-1.amazonaws.com`
    #[arg(long = "store-endpoint")]
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<Url>,

    /// Determines whether to use path style or virtualhost style for accessing objects
    ///
    /// When this is true, objects will be fetched from {endpoint}/{bucket_name}/{object}
    /// When false, objects will be fetched from {bucket_name}.{endpoint}/{object}
    #[arg(long = "store-use-path-style")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_path_style: bool,

    /// The Access Key for the user accessing the bucket
    #[arg(long = "store-access-key")]
    #[serde(skip_serializing_if = "Option::is_none")]
    access_key: Option<String>,

    /// The secret key for the user accessing the bucket
    #[arg(long = "store-secret-key")]
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,

    /// The session token for accessing the bucket
    #[arg(long = "store-session-token")]
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,

    /// What to record as a video's URL once it is uploaded
    #[arg(long = "store-url-style")]
    #[serde(skip_serializing_if = "Option::is_none")]
    url_style: Option<UrlStyle>,

    /// The CDN base URL used when url_style is `distribution`
    #[arg(long = "store-distribution-url")]
    #[serde(skip_serializing_if = "Option::is_none")]
    distribution_url: Option<Url>,

    /// How long signed video URLs are valid (in seconds)
    ///
    /// This defaults to one hour
    #[arg(long = "store-signature-duration")]
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_duration: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
struct Sled {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    cache_capacity: Option<u64>,
}

impl Sled {
    fn set(self) -> Option<Self> {
        let any_set = self.path.is_some() || self.cache_capacity.is_some();

        if any_set {
            Some(self)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Args, Output};

    #[test]
    fn unset_flags_are_not_serialized() {
        let args = Args::try_parse_from(["tubely", "run"]).expect("Parsed args");

        let Output {
            config_format,
            save_to,
            config_file,
        } = args.into_output();

        assert!(save_to.is_none());
        assert!(config_file.is_none());

        let value = serde_json::to_value(&config_format).expect("Serialized");
        assert_eq!(value["server"], serde_json::json!({}));
        assert_eq!(value["store"], serde_json::json!({}));
        assert!(value.get("repo").is_none());
    }

    #[test]
    fn store_flags() {
        let args = Args::try_parse_from([
            "tubely",
            "run",
            "--store-bucket-name",
            "videos",
            "--store-url-style",
            "distribution",
            "--store-distribution-url",
            "https://d111111abcdef8.cloudfront.net",
            "--repo-path",
            "/tmp/sled",
        ])
        .expect("Parsed args");

        let value = serde_json::to_value(&args.into_output().config_format).expect("Serialized");

        assert_eq!(value["store"]["bucket_name"], "videos");
        assert_eq!(value["store"]["url_style"], "distribution");
        assert_eq!(value["repo"]["type"], "sled");
        assert_eq!(value["repo"]["path"], "/tmp/sled");
    }
}
