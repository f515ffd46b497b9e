mod ffmpeg;

use std::path::Path;

use crate::{aspect_ratio::AspectRatio, ffmpeg::FfMpegError};

pub(crate) use self::ffmpeg::FfProbe;

/// Pixel size of the primary video stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Dimensions {
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Dimensions {
    pub(crate) fn aspect_ratio(self) -> AspectRatio {
        AspectRatio::classify(self.width, self.height)
    }
}

/// Reads a staged video and reports which aspect ratio bucket it belongs to
#[async_trait::async_trait(?Send)]
pub(crate) trait Inspector: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<AspectRatio, FfMpegError>;
}
