
use std::path::Path;

use crate::{aspect_ratio::AspectRatio, ffmpeg::FfMpegError, process::Process};

use super::{Dimensions, Inspector};

#[derive(Debug, serde::Deserialize)]
struct FfMpegDiscovery {
    streams: Vec<FfMpegStream>,
}

#[derive(Debug, serde::Deserialize)]
struct FfMpegStream {
    #[serde(default)]
    width: u32,

    #[serde(default)]
    height: u32,
}

/// Inspects videos with `ffprobe`
#[derive(Clone, Debug)]
pub(crate) struct FfProbe {
    timeout: u64,
}

impl FfProbe {
    pub(crate) fn new(timeout: u64) -> Self {
        FfProbe { timeout }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn dimensions(&self, path: &Path) -> Result<Dimensions, FfMpegError> {
        let input_file_str = path.to_str().ok_or(FfMpegError::Path)?;

        let process = Process::run(
            "ffprobe",
            &[
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                input_file_str,
            ],
            self.timeout,
        )
        .map_err(FfMpegError::Process)?;

        let output = process.read_output().await.map_err(FfMpegError::Process)?;

        parse_dimensions(&output)
    }
}

#[async_trait::async_trait(?Send)]
impl Inspector for FfProbe {
    async fn inspect(&self, path: &Path) -> Result<AspectRatio, FfMpegError> {
        let dimensions = self.dimensions(path).await?;

        let aspect_ratio = dimensions.aspect_ratio();

        tracing::debug!(
            width = dimensions.width,
            height = dimensions.height,
            %aspect_ratio,
            "Inspected video"
        );

        Ok(aspect_ratio)
    }
}

fn parse_dimensions(output: &[u8]) -> Result<Dimensions, FfMpegError> {
    let discovery: FfMpegDiscovery = serde_json::from_slice(output).map_err(FfMpegError::Json)?;

    Ok(first_visual_stream(discovery))
}

fn first_visual_stream(FfMpegDiscovery { streams }: FfMpegDiscovery) -> Dimensions {
    streams
        .into_iter()
        .find(|stream| stream.width != 0 && stream.height != 0)
        .map(|FfMpegStream { width, height }| Dimensions { width, height })
        .unwrap_or_default()
}
