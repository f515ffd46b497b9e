mod aspect_ratio;
mod blob_address;
mod config;
mod discover;
mod error;
mod error_code;
mod extract;
mod faststart;
mod ffmpeg;
mod file;
mod future;
mod init_metrics;
mod init_tracing;
mod media_type;
mod middleware;
mod pipeline;
mod process;
mod repo;
mod staging;
mod store;
mod stream;
mod thumbnail;
mod validate;

use actix_form_data::{Field, Form, FormData, Multipart, Value};
use actix_web::{
    http::header::{CacheControl, CacheDirective},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::Instrument;
use tracing_actix_web::TracingLogger;
use uuid::Uuid;

use self::{
    blob_address::resolve_video_url,
    config::Configuration,
    discover::FfProbe,
    error::{Error, UploadError},
    extract::{Requester, UserHeader, VideoId},
    faststart::FfMpegFastStart,
    init_tracing::init_tracing,
    media_type::UploadKind,
    middleware::Internal,
    pipeline::{PipelineConfig, UploadPipeline},
    repo::{ArcRepo, Repo, VideoRecord, VideoRepo},
    staging::TmpDir,
    store::{object_store::ObjectStore, ArcBlobClient, BlobClient},
    stream::form_field,
    thumbnail::Assets,
    validate::ValidationError,
};

const MEGABYTES: usize = 1024 * 1024;
const DAYS: u32 = 24 * 60 * 60;

/// A fully merged tubely configuration, ready to serve
pub struct TubelyConfiguration {
    config: Configuration,
}

fn upload_target(req: &HttpRequest) -> Result<(VideoId, Requester), ValidationError> {
    Ok((VideoId::from_path(req)?, Requester::from_request_headers(req)?))
}

struct VideoUpload(Value<VideoRecord>);

impl FormData for VideoUpload {
    type Item = VideoRecord;
    type Error = Error;

    fn form(req: &HttpRequest) -> Form<Self::Item, Self::Error> {
        let pipeline = req
            .app_data::<web::Data<UploadPipeline>>()
            .expect("No pipeline in request")
            .clone();
        let config = req
            .app_data::<web::Data<Configuration>>()
            .expect("No configuration in request");

        let target = upload_target(req);

        // A single file field named 'video'
        Form::new()
            .max_files(1)
            .max_file_size(config.media.video_max_file_size.saturating_mul(MEGABYTES))
            .transform_error(transform_error)
            .field(
                UploadKind::Video.field_name(),
                Field::file(move |filename, content_type, stream| {
                    let pipeline = pipeline.clone();
                    let target = target.clone();

                    let span = tracing::info_span!("video-upload", ?filename);

                    Box::pin(
                        async move {
                            let (VideoId(video_id), Requester(requester)) = target?;

                            pipeline
                                .upload_video(
                                    video_id,
                                    requester,
                                    content_type.as_ref(),
                                    form_field(stream),
                                )
                                .await
                        }
                        .instrument(span),
                    )
                }),
            )
    }

    fn extract(value: Value<Self::Item>) -> Result<Self, Self::Error> {
        Ok(VideoUpload(value))
    }
}

struct ThumbnailUpload(Value<VideoRecord>);

impl FormData for ThumbnailUpload {
    type Item = VideoRecord;
    type Error = Error;

    fn form(req: &HttpRequest) -> Form<Self::Item, Self::Error> {
        let repo = req
            .app_data::<web::Data<ArcRepo>>()
            .expect("No repo in request")
            .clone();
        let assets = req
            .app_data::<web::Data<Assets>>()
            .expect("No assets in request")
            .clone();
        let config = req
            .app_data::<web::Data<Configuration>>()
            .expect("No configuration in request");

        let target = upload_target(req);

        // A single file field named 'thumbnail'
        Form::new()
            .max_files(1)
            .max_file_size(config.media.image_max_file_size.saturating_mul(MEGABYTES))
            .transform_error(transform_error)
            .field(
                UploadKind::Thumbnail.field_name(),
                Field::file(move |filename, content_type, stream| {
                    let repo = repo.clone();
                    let assets = assets.clone();
                    let target = target.clone();

                    let span = tracing::info_span!("thumbnail-upload", ?filename);

                    Box::pin(
                        async move {
                            let (VideoId(video_id), Requester(requester)) = target?;

                            assets
                                .upload_thumbnail(
                                    &**repo,
                                    video_id,
                                    requester,
                                    content_type.as_ref(),
                                    form_field(stream),
                                )
                                .await
                        }
                        .instrument(span),
                    )
                }),
            )
    }

    fn extract(value: Value<Self::Item>) -> Result<Self, Self::Error> {
        Ok(ThumbnailUpload(value))
    }
}

fn uploaded(value: Value<VideoRecord>, kind: UploadKind) -> Result<VideoRecord, Error> {
    let file = value
        .map()
        .and_then(|mut m| m.remove(kind.field_name()))
        .and_then(|field| field.file())
        .ok_or(UploadError::NoFiles)?;

    Ok(file.result)
}

/// Run an uploaded video through the ingestion pipeline
///
/// The video id and requester are extracted ahead of the multipart body.
#[tracing::instrument(name = "Uploaded video", skip_all)]
async fn upload_video(
    _: VideoId,
    _: Requester,
    Multipart(VideoUpload(value)): Multipart<VideoUpload>,
    blobs: web::Data<ArcBlobClient>,
    config: web::Data<Configuration>,
) -> Result<HttpResponse, Error> {
    let record = uploaded(value, UploadKind::Video)?;
    let record = resolve_video_url(record, &**blobs, config.store.signature_duration()).await?;

    Ok(HttpResponse::Accepted().json(&record))
}

#[tracing::instrument(name = "Uploaded thumbnail", skip_all)]
async fn upload_thumbnail(
    _: VideoId,
    _: Requester,
    Multipart(ThumbnailUpload(value)): Multipart<ThumbnailUpload>,
) -> Result<HttpResponse, Error> {
    let record = uploaded(value, UploadKind::Thumbnail)?;

    Ok(HttpResponse::Ok().json(&record))
}

#[tracing::instrument(name = "Fetching video", skip(repo, blobs, config))]
async fn video(
    VideoId(video_id): VideoId,
    repo: web::Data<ArcRepo>,
    blobs: web::Data<ArcBlobClient>,
    config: web::Data<Configuration>,
) -> Result<HttpResponse, Error> {
    let record = repo
        .video(video_id)
        .await?
        .ok_or(ValidationError::NotFound(video_id))?;

    let record = resolve_video_url(record, &**blobs, config.store.signature_duration()).await?;

    Ok(HttpResponse::Ok().json(&record))
}

#[tracing::instrument(name = "Serving asset", skip(assets))]
async fn asset(
    filename: web::Path<String>,
    assets: web::Data<Assets>,
) -> Result<HttpResponse, Error> {
    let (content_type, bytes) = assets.read(&filename).await?;

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(CacheControl(vec![
            CacheDirective::Public,
            CacheDirective::MaxAge(DAYS),
            CacheDirective::Extension("immutable".to_owned(), None),
        ]))
        .body(bytes))
}

#[derive(Debug, serde::Deserialize)]
struct NewVideo {
    user_id: Uuid,
    title: String,
    #[serde(default)]
    description: String,
}

#[tracing::instrument(name = "Creating video", skip(repo))]
async fn create_video(
    new_video: web::Json<NewVideo>,
    repo: web::Data<ArcRepo>,
) -> Result<HttpResponse, Error> {
    let NewVideo {
        user_id,
        title,
        description,
    } = new_video.into_inner();

    let record = VideoRecord::new(user_id, title, description);
    repo.create_video(&record).await?;

    Ok(HttpResponse::Created().json(&record))
}

async fn healthz(
    repo: web::Data<ArcRepo>,
    blobs: web::Data<ArcBlobClient>,
) -> Result<HttpResponse, Error> {
    repo.health_check().await?;
    blobs.health_check().await?;
    Ok(HttpResponse::Ok().finish())
}

fn transform_error(error: actix_form_data::Error) -> actix_web::Error {
    let error: Error = error.into();
    let error: actix_web::Error = error.into();
    error
}

#[derive(Clone)]
struct State {
    config: Configuration,
    repo: ArcRepo,
    blobs: ArcBlobClient,
    pipeline: UploadPipeline,
    assets: Assets,
}

fn configure_endpoints(config: &mut web::ServiceConfig, state: State) {
    let State {
        config: configuration,
        repo,
        blobs,
        pipeline,
        assets,
    } = state;

    config
        .app_data(web::Data::new(UserHeader(
            configuration.server.user_header.clone(),
        )))
        .app_data(web::Data::new(repo))
        .app_data(web::Data::new(blobs))
        .app_data(web::Data::new(pipeline))
        .app_data(web::Data::new(assets))
        .app_data(web::Data::new(configuration.clone()))
        .route("/healthz", web::get().to(healthz))
        .service(web::resource("/assets/{filename}").route(web::get().to(asset)))
        .service(
            web::scope("/api")
                .service(web::resource("/videos/{video_id}").route(web::get().to(video)))
                .service(
                    web::resource("/videos/{video_id}/video").route(web::post().to(upload_video)),
                )
                .service(
                    web::resource("/thumbnail_upload/{video_id}")
                        .route(web::post().to(upload_thumbnail)),
                ),
        )
        .service(
            web::scope("/internal")
                .wrap(Internal(configuration.server.api_key.clone()))
                .service(web::resource("/videos").route(web::post().to(create_video))),
        );
}

async fn launch(state: State) -> std::io::Result<()> {
    let address = state.config.server.address;

    tracing::info!(%address, "Starting tubely");

    HttpServer::new(move || {
        let state = state.clone();

        App::new()
            .wrap(TracingLogger::default())
            .configure(move |sc| configure_endpoints(sc, state))
    })
    .bind(address)?
    .run()
    .await
}

impl TubelyConfiguration {
    /// Build the tubely configuration from commandline arguments
    pub fn build_default() -> color_eyre::Result<Self> {
        Ok(TubelyConfiguration {
            config: config::configure()?,
        })
    }

    /// Install the default tubely tracer
    ///
    /// This is probably not useful for 3rd party applications that install their own tracing
    /// subscribers.
    pub fn install_tracing(self) -> color_eyre::Result<Self> {
        init_tracing(&self.config.tracing)?;
        Ok(self)
    }

    pub fn install_metrics(self) -> color_eyre::Result<Self> {
        if let Some(addr) = self.config.metrics.prometheus_address {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()?;
        }

        init_metrics::init_metrics();

        Ok(self)
    }

    /// Run the tubely server until it is shut down
    pub async fn run(self) -> color_eyre::Result<()> {
        let TubelyConfiguration { config } = self;

        let tmp_dir = TmpDir::init(&config.server.temporary_directory).await?;

        let repo = Repo::open(config.repo.clone())?.to_arc();

        let store = ObjectStore::build(&config.store)?;
        let bucket = store.bucket().to_owned();
        let blobs: ArcBlobClient = Arc::new(store);

        let assets = Assets::init(
            config.media.assets_root.clone(),
            config.server.public_url.clone(),
            config.media.image_limit(),
        )
        .await?;

        let pipeline = UploadPipeline::new(
            PipelineConfig {
                bucket,
                playback: config.store.playback()?,
                max_file_size: config.media.video_limit(),
            },
            repo.clone(),
            blobs.clone(),
            Arc::new(FfProbe::new(config.media.process_timeout)),
            Arc::new(FfMpegFastStart::new(config.media.process_timeout)),
            tmp_dir.clone(),
        );

        launch(State {
            config,
            repo,
            blobs,
            pipeline,
            assets,
        })
        .await?;

        tmp_dir.cleanup().await?;

        Ok(())
    }
}
