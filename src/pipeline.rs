
use std::sync::Arc;

use actix_web::web::Bytes;
use futures_core::Stream;
use mime::Mime;
use uuid::Uuid;

use crate::{
    aspect_ratio::AspectRatio,
    blob_address::{BlobAddress, Playback},
    discover::Inspector,
    error::{Error, UploadError},
    faststart::{Rewriter, PROCESSING_SUFFIX},
    file::File,
    future::WithMetrics,
    media_type::UploadKind,
    repo::{ArcRepo, VideoRecord},
    staging::{random_name, ArcTmpDir, StagingError, TmpFile},
    store::{ArcBlobClient, StoreError},
};

/// The steps a video upload moves through, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    Validating,
    Staging,
    Inspecting,
    Rewriting,
    Uploading,
    Persisting,
    Done,
    Failed,
}

impl Stage {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Staging => "staging",
            Self::Inspecting => "inspecting",
            Self::Rewriting => "rewriting",
            Self::Uploading => "uploading",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records every stage transition, and the failure if the upload never reaches `Done`
///
/// Dropping an unfinished `Progress` counts as a failure in whatever stage was active, which
/// also covers requests cancelled mid-flight.
struct Progress {
    stage: Stage,
    finished: bool,
}

impl Progress {
    fn start() -> Self {
        metrics::counter!(crate::init_metrics::PIPELINE_STAGE, "stage" => Stage::Validating.as_str())
            .increment(1);

        Progress {
            stage: Stage::Validating,
            finished: false,
        }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "Pipeline transition");
        metrics::counter!(crate::init_metrics::PIPELINE_STAGE, "stage" => stage.as_str())
            .increment(1);

        self.stage = stage;
    }

    fn done(mut self) {
        self.enter(Stage::Done);
        self.finished = true;

        metrics::counter!(crate::init_metrics::PIPELINE_DONE).increment(1);
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(stage = %self.stage, to = %Stage::Failed, "Video upload failed");
            metrics::counter!(crate::init_metrics::PIPELINE_FAILED, "stage" => self.stage.as_str())
                .increment(1);
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PipelineConfig {
    /// Bucket every processed video is written to
    pub(crate) bucket: String,

    pub(crate) playback: Playback,

    /// Bytes
    pub(crate) max_file_size: u64,
}

/// Takes an uploaded video from the request body to a durable object referenced by its record
#[derive(Clone)]
pub(crate) struct UploadPipeline {
    config: Arc<PipelineConfig>,
    repo: ArcRepo,
    blobs: ArcBlobClient,
    inspector: Arc<dyn Inspector>,
    rewriter: Arc<dyn Rewriter>,
    tmp_dir: ArcTmpDir,
}

impl UploadPipeline {
    pub(crate) fn new(
        config: PipelineConfig,
        repo: ArcRepo,
        blobs: ArcBlobClient,
        inspector: Arc<dyn Inspector>,
        rewriter: Arc<dyn Rewriter>,
        tmp_dir: ArcTmpDir,
    ) -> Self {
        UploadPipeline {
            config: Arc::new(config),
            repo,
            blobs,
            inspector,
            rewriter,
            tmp_dir,
        }
    }

    /// Run a single video upload to completion
    ///
    /// Staged files are removed on every exit path. Nothing is retried.
    #[tracing::instrument(name = "Upload video", skip(self, stream))]
    pub(crate) async fn upload_video<S>(
        &self,
        video_id: Uuid,
        requester: Uuid,
        content_type: &str,
        stream: S,
    ) -> Result<VideoRecord, Error>
    where
        S: Stream<Item = std::io::Result<Bytes>>,
    {
        let mut progress = Progress::start();

        let content_type = UploadKind::Video.validate(content_type)?;
        let mut record = crate::validate::owned_video(&self.repo, video_id, requester).await?;

        progress.enter(Stage::Staging);
        let staged = self
            .stage(&content_type, stream)
            .with_metrics(
                crate::init_metrics::PIPELINE_STAGE_DURATION,
                Stage::Staging.as_str(),
            )
            .await?;

        progress.enter(Stage::Inspecting);
        let aspect_ratio = self
            .inspector
            .inspect(&staged)
            .with_metrics(
                crate::init_metrics::PIPELINE_STAGE_DURATION,
                Stage::Inspecting.as_str(),
            )
            .await
            .map_err(UploadError::Inspect)?;

        progress.enter(Stage::Rewriting);
        let processed = staged.sibling(PROCESSING_SUFFIX);
        self.rewriter
            .rewrite(&staged, &processed)
            .with_metrics(
                crate::init_metrics::PIPELINE_STAGE_DURATION,
                Stage::Rewriting.as_str(),
            )
            .await
            .map_err(UploadError::Rewrite)?;

        discard(staged).await;

        progress.enter(Stage::Uploading);
        let res = self
            .upload(&processed, aspect_ratio, &content_type)
            .with_metrics(
                crate::init_metrics::PIPELINE_STAGE_DURATION,
                Stage::Uploading.as_str(),
            )
            .await;

        discard(processed).await;

        let address = res?;

        progress.enter(Stage::Persisting);
        record.set_video_url(address.playback_url(&self.config.playback));

        let res = self
            .repo
            .update_video(&record)
            .with_metrics(
                crate::init_metrics::PIPELINE_STAGE_DURATION,
                Stage::Persisting.as_str(),
            )
            .await;

        if let Err(e) = res {
            tracing::warn!(
                bucket = address.bucket(),
                key = address.key(),
                "Uploaded object is not referenced by any video record"
            );
            metrics::counter!(crate::init_metrics::PIPELINE_ORPHANED_BLOB).increment(1);

            return Err(UploadError::Persistence(e).into());
        }

        progress.done();

        metrics::counter!(crate::init_metrics::FILES, "kind" => UploadKind::Video.field_name())
            .increment(1);

        tracing::info!(
            bucket = address.bucket(),
            key = address.key(),
            %aspect_ratio,
            "Uploaded video"
        );

        Ok(record)
    }

    async fn stage<S>(&self, content_type: &Mime, stream: S) -> Result<TmpFile, Error>
    where
        S: Stream<Item = std::io::Result<Bytes>>,
    {
        let staged = self.tmp_dir.tmp_file(content_type.essence_str())?;

        let mut file = File::create(&staged)
            .await
            .map_err(StagingError::Create)?;

        let written = file
            .write_from_stream(stream, self.config.max_file_size)
            .await?;

        if written == 0 {
            return Err(StagingError::Empty.into());
        }

        file.close().await.map_err(StagingError::Write)?;

        tracing::debug!(written, "Staged upload");

        Ok(staged)
    }

    async fn upload(
        &self,
        processed: &TmpFile,
        aspect_ratio: AspectRatio,
        content_type: &Mime,
    ) -> Result<BlobAddress, Error> {
        let name = random_name(content_type.essence_str())?;
        let address = BlobAddress::new(self.config.bucket.as_str(), format!("{aspect_ratio}/{name}"))?;

        let mut reader = File::open(processed)
            .await
            .map_err(StoreError::Io)
            .map_err(UploadError::Storage)?
            .into_inner();

        self.blobs
            .put(&address, &mut reader, content_type.essence_str())
            .await
            .map_err(UploadError::Storage)?;

        Ok(address)
    }
}

async fn discard(file: TmpFile) {
    let path = file.to_path_buf();

    if let Err(e) = file.cleanup().await {
        tracing::warn!("Failed to remove staged file {path:?}: {e}");
    }
}
