mod asset_key;
mod auth;
mod config;
mod discover;
mod error;
mod error_code;
mod faststart;
mod formats;
mod future;
mod init_metrics;
mod init_tracing;
mod orientation;
mod process;
mod repo;
mod serde_str;
mod state;
mod store;
mod tmp_file;
mod upload;

use std::{path::PathBuf, sync::Arc};

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use self::{
    asset_key::RandomNames,
    auth::ApiKeys,
    config::{Configuration, Operation},
    discover::FfProbe,
    error::{Error, UploadError},
    faststart::FastStart,
    init_tracing::init_tracing,
    repo::{NewVideo, Repo, Video},
    state::State,
    store::{object_store::ObjectStore, Store},
    tmp_file::TmpDir,
    upload::UploadRequest,
};

pub use self::config::TubelyConfiguration;

#[tracing::instrument(name = "Create video", skip(state, token, description))]
async fn create_video<S: Store>(
    state: &State<S>,
    token: &str,
    title: String,
    description: String,
) -> Result<Video, Error> {
    let user_id = state.auth.authenticate(token)?;

    let video = state
        .repo
        .create_video(NewVideo {
            user_id,
            title,
            description,
        })
        .await?;

    tracing::info!("Created video {}", video.id);

    Ok(video)
}

async fn upload_file<S: Store>(
    state: &State<S>,
    token: String,
    video_id: Uuid,
    content_type: String,
    file: PathBuf,
) -> Result<Video, Error> {
    let file = tokio::fs::File::open(&file)
        .await
        .map_err(UploadError::Stage)?;

    upload::upload_video(
        state,
        UploadRequest {
            video_id,
            token,
            content_type,
            stream: ReaderStream::new(file),
            deadline: None,
        },
    )
    .await
}

async fn video<S: Store>(state: &State<S>, video_id: Uuid) -> Result<Video, Error> {
    state
        .repo
        .video(video_id)
        .await?
        .ok_or_else(|| UploadError::MissingVideo.into())
}

async fn build_store(config: &Configuration) -> color_eyre::Result<ObjectStore> {
    let store = match config.store.clone() {
        config::Store::Filesystem(filesystem) => ObjectStore::build_filesystem(filesystem).await?,
        config::Store::ObjectStorage(object_storage) => ObjectStore::build(object_storage)?,
    };

    store.health_check().await?;

    Ok(store)
}

async fn execute<S: Store>(state: &State<S>, operation: Operation) -> Result<Video, Error> {
    match operation {
        Operation::CreateVideo {
            token,
            title,
            description,
        } => create_video(state, &token, title, description).await,
        Operation::UploadVideo {
            token,
            video_id,
            content_type,
            file,
        } => upload_file(state, token, video_id, content_type, file).await,
        Operation::Video { video_id } => video(state, video_id).await,
    }
}

impl TubelyConfiguration {
    /// Build the tubely configuration from commandline arguments
    ///
    /// This is probably not useful for 3rd party applications that handle their own commandline
    pub fn build_default() -> color_eyre::Result<Self> {
        config::configure()
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

            init_metrics::init_metrics();
        }

        Ok(self)
    }

    /// Run the requested operation, printing the resulting video record as JSON
    ///
    /// Failures are printed as an error report before being returned.
    pub async fn run(self) -> color_eyre::Result<()> {
        let TubelyConfiguration { config, operation } = self;

        let tmp_dir = TmpDir::init(&config.media.temporary_directory).await?;
        let repo = Repo::open(config.repo.clone())?;
        let store = build_store(&config).await?;

        let state = State {
            media: config.media.clone(),
            tmp_dir: tmp_dir.clone(),
            repo: repo.to_arc(),
            store,
            auth: Arc::new(ApiKeys::new(config.auth.api_keys.clone())),
            prober: Arc::new(FfProbe::new(config.media.process_timeout)),
            normalizer: Arc::new(FastStart::new(config.media.process_timeout)),
            names: Arc::new(RandomNames),
        };

        let res = execute(&state, operation).await;
        drop(state);

        match repo {
            Repo::Sled(sled_repo) => sled_repo.flush().await?,
        }

        tmp_dir.cleanup().await?;

        match res {
            Ok(video) => {
                println!("{}", serde_json::to_string_pretty(&video)?);
                Ok(())
            }
            Err(e) => {
                let code = e.error_code();

                if e.is_client_error() {
                    tracing::warn!(code = code.as_str(), "Request rejected: {e}");
                } else {
                    tracing::error!(code = code.as_str(), "Upload failed\n{e:?}");
                }

                println!("{}", serde_json::to_string_pretty(&e.report())?);
                Err(e.into())
            }
        }
    }
}
