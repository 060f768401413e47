
use std::{
    future::Future,
    path::Path,
    sync::OnceLock,
    time::{Duration, Instant},
};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    asset_key::AssetKey,
    error::{Error, UploadError},
    faststart,
    formats::VideoFormat,
    future::WithTimeout,
    orientation::Orientation,
    repo::Video,
    state::State,
    store::Store,
    tmp_file::TmpFile,
};

const MEGABYTES: u64 = 1024 * 1024;

/// One request to attach a video file to an existing record
pub(crate) struct UploadRequest<S> {
    pub(crate) video_id: Uuid,
    pub(crate) token: String,
    pub(crate) content_type: String,
    pub(crate) stream: S,
    pub(crate) deadline: Option<Duration>,
}

#[derive(Clone, Copy, Debug)]
enum Stage {
    Staging,
    Probing,
    Normalizing,
    Uploading,
    RecordUpdate,
}

impl Stage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Probing => "probing",
            Self::Normalizing => "normalizing",
            Self::Uploading => "uploading",
            Self::RecordUpdate => "record-update",
        }
    }
}

struct MetricsGuard {
    start: Instant,
    armed: bool,
}

impl MetricsGuard {
    fn guard() -> Self {
        metrics::counter!(crate::init_metrics::UPLOAD_START).increment(1);

        Self {
            start: Instant::now(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for MetricsGuard {
    fn drop(&mut self) {
        metrics::histogram!(crate::init_metrics::UPLOAD_DURATION, "completed" => (!self.armed).to_string())
            .record(self.start.elapsed().as_secs_f64());
        metrics::counter!(crate::init_metrics::UPLOAD_END, "completed" => (!self.armed).to_string())
            .increment(1);
    }
}

async fn in_stage<F>(stage: Stage, future: F) -> F::Output
where
    F: Future,
{
    let start = Instant::now();

    let out = future
        .instrument(tracing::debug_span!("Upload stage", stage = stage.as_str()))
        .await;

    metrics::histogram!(crate::init_metrics::UPLOAD_STAGE, "stage" => stage.as_str())
        .record(start.elapsed().as_secs_f64());

    out
}

/// Validate, stage, probe, remux and store an uploaded video, then point its record at it
///
/// Temporary files are only allocated once the request has been validated, and every one of
/// them is gone by the time this returns.
#[tracing::instrument(name = "Upload video", skip(state, request), fields(video_id = %request.video_id))]
pub(crate) async fn upload_video<S, St>(
    state: &State<S>,
    request: UploadRequest<St>,
) -> Result<Video, Error>
where
    S: Store,
    St: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let UploadRequest {
        video_id,
        token,
        content_type,
        stream,
        deadline,
    } = request;

    let (video, format) = validate(state, video_id, &token, &content_type).await?;

    let staged = state.tmp_dir.tmp_file(Some(format.file_extension()));
    let normalized = state.tmp_dir.tmp_file(Some(format.file_extension()));

    let guard = MetricsGuard::guard();

    let stored = OnceLock::new();
    let pipeline = process(state, video, format, stream, &staged, &normalized, &stored);

    let res = match deadline.or(state.media.upload_timeout.map(Duration::from_secs)) {
        Some(deadline) => pipeline.with_timeout(deadline).await.unwrap_or_else(|_| {
            if let Some(key) = stored.get() {
                tracing::warn!(
                    "Stored {key} but the deadline passed before video {video_id} was updated, the object is orphaned"
                );
            }

            Err(UploadError::DeadlineExceeded.into())
        }),
        None => pipeline.await,
    };

    for tmp_file in [staged, normalized] {
        if let Err(e) = tmp_file.cleanup().await {
            tracing::warn!("Failed to remove temporary file: {e}");
        }
    }

    if res.is_ok() {
        guard.disarm();
    }

    res
}

#[tracing::instrument(level = "debug", skip(state, token))]
async fn validate<S>(
    state: &State<S>,
    video_id: Uuid,
    token: &str,
    content_type: &str,
) -> Result<(Video, VideoFormat), Error>
where
    S: Store,
{
    let user_id = state.auth.authenticate(token)?;

    let video = state
        .repo
        .video(video_id)
        .await?
        .ok_or(UploadError::MissingVideo)?;

    if video.user_id != user_id {
        return Err(UploadError::Unauthorized.into());
    }

    let format = content_type
        .parse::<mime::Mime>()
        .ok()
        .and_then(|media_type| VideoFormat::from_media_type(&media_type))
        .ok_or_else(|| UploadError::InvalidContentType(content_type.to_string()))?;

    Ok((video, format))
}

async fn process<S, St>(
    state: &State<S>,
    mut video: Video,
    format: VideoFormat,
    stream: St,
    staged: &TmpFile,
    normalized: &TmpFile,
    stored: &OnceLock<AssetKey>,
) -> Result<Video, Error>
where
    S: Store,
    St: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let limit = state.media.max_file_size as u64 * MEGABYTES;

    in_stage(Stage::Staging, write_staged(stream, staged, limit)).await?;

    let geometry = in_stage(Stage::Probing, state.prober.probe(staged)).await?;
    let orientation = Orientation::from(geometry);
    tracing::debug!(
        width = geometry.width(),
        height = geometry.height(),
        orientation = orientation.directory(),
        "Classified video"
    );

    if let Err(e) = in_stage(
        Stage::Normalizing,
        faststart::normalize(&*state.normalizer, staged, normalized),
    )
    .await
    {
        if let Some(diagnostics) = e.diagnostics() {
            tracing::warn!("ffmpeg rejected video {}: {diagnostics}", video.id);
        }

        return Err(e.into());
    }

    let key = AssetKey::generate(format, orientation, &*state.names);
    let video_url = state.store.public_url(&key)?;

    in_stage(Stage::Uploading, async {
        let file = tokio::fs::File::open(&**normalized).await?;

        state
            .store
            .save_async_read(&key, file, &format.media_type())
            .await?;

        Ok(()) as Result<(), Error>
    })
    .await?;

    let _ = stored.set(key.clone());

    video.video_url = Some(video_url);
    video.updated_at = OffsetDateTime::now_utc();

    if let Err(e) = in_stage(Stage::RecordUpdate, state.repo.update_video(&video)).await {
        tracing::warn!("Stored {key} but failed to update video {}, the object is orphaned", video.id);
        return Err(e.into());
    }

    metrics::counter!(crate::init_metrics::VIDEOS).increment(1);
    metrics::counter!(crate::init_metrics::VIDEO_ORIENTATION, "orientation" => orientation.directory())
        .increment(1);

    tracing::info!("Uploaded video {} to {key}", video.id);

    Ok(video)
}

async fn write_staged<St>(mut stream: St, staged: &Path, limit: u64) -> Result<(), Error>
where
    St: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let mut file = tokio::fs::File::create(staged)
        .await
        .map_err(UploadError::Stage)?;

    let mut written: u64 = 0;

    while let Some(res) = stream.next().await {
        let mut bytes = res.map_err(UploadError::Stage)?;

        written += bytes.len() as u64;
        if written > limit {
            return Err(UploadError::FileTooLarge(limit).into());
        }

        file.write_all_buf(&mut bytes)
            .await
            .map_err(UploadError::Stage)?;
    }

    file.flush().await.map_err(UploadError::Stage)?;

    Ok(())
}
