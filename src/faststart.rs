use std::path::Path;

use crate::{ffmpeg::FfMpegError, process::Process};

/// Suffix for the remuxed copy written next to the staged upload
pub(crate) const PROCESSING_SUFFIX: &str = ".processing";

/// Rewrites a staged video so playback can begin before the whole file is downloaded
#[async_trait::async_trait(?Send)]
pub(crate) trait Rewriter: Send + Sync {
    /// Write a fast-start copy of `input` to `output`, leaving `input` untouched
    async fn rewrite(&self, input: &Path, output: &Path) -> Result<(), FfMpegError>;
}

/// Remuxes mp4 containers with `ffmpeg`, moving the `moov` atom to the front
#[derive(Clone, Debug)]
pub(crate) struct FfMpegFastStart {
    timeout: u64,
}

impl FfMpegFastStart {
    pub(crate) fn new(timeout: u64) -> Self {
        FfMpegFastStart { timeout }
    }
}

#[async_trait::async_trait(?Send)]
impl Rewriter for FfMpegFastStart {
    #[tracing::instrument(skip(self))]
    async fn rewrite(&self, input: &Path, output: &Path) -> Result<(), FfMpegError> {
        let input_file_str = input.to_str().ok_or(FfMpegError::Path)?;
        let output_file_str = output.to_str().ok_or(FfMpegError::Path)?;

        let process = Process::run(
            "ffmpeg",
            &[
                "-hide_banner",
                "-v",
                "error",
                "-y",
                "-i",
                input_file_str,
                "-c",
                "copy",
                "-movflags",
                "faststart",
                "-f",
                "mp4",
                output_file_str,
            ],
            self.timeout,
        )
        .map_err(FfMpegError::Process)?;

        process.wait().await.map_err(FfMpegError::Process)?;

        Ok(())
    }
}
